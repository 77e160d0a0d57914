//! Bench configuration.
//!
//! The configuration is read from a JSON file. Every field has a default, so
//! the file only needs to list the settings that differ from the defaults.
//!
//! ```
//! # fn main() -> anyhow::Result<()> {
//! use rxchain_bench::config::BenchConfig;
//! let config = BenchConfig::from_json(r#"{ "chain_delay_ms": 5, "policy": "golden" }"#)?;
//! assert_eq!(config.filter_samples, [0x100, 0x200, 0x300, 0x400, 0x500]);
//! # Ok(())
//! # }
//! ```

use crate::regmap::AddressMap;
use anyhow::{Context, Result};
use rxchain_json::AcceptPolicy;
use rxchain_model::ChainConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Bench configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BenchConfig {
    /// Bus address map.
    pub map: AddressMap,
    /// Golden model configuration.
    pub chain: ChainConfig,
    /// Time to wait for each bus response, in milliseconds.
    pub response_timeout_ms: u64,
    /// Time given to the filter chain to process a sample, in milliseconds.
    pub chain_delay_ms: u64,
    /// Time given to the AES core to complete a run, in milliseconds.
    pub aes_delay_ms: u64,
    /// Duration of each power analysis traffic loop, in seconds.
    pub power_duration_s: f64,
    /// Samples sent through the filter chain.
    pub filter_samples: Vec<u32>,
    /// Acceptance policy for the filter chain test.
    pub policy: AcceptPolicy,
    /// AES key.
    pub aes_key: [u32; 4],
    /// AES plaintext.
    pub aes_plaintext: [u32; 4],
}

impl Default for BenchConfig {
    fn default() -> BenchConfig {
        BenchConfig {
            map: AddressMap::default(),
            chain: ChainConfig::default(),
            response_timeout_ms: 1000,
            chain_delay_ms: 20,
            aes_delay_ms: 50,
            power_duration_s: 10.0,
            filter_samples: vec![0x100, 0x200, 0x300, 0x400, 0x500],
            policy: AcceptPolicy::default(),
            aes_key: [0xffff_ffff; 4],
            aes_plaintext: [0x1234_5678, 0x9abc_def0, 0x0f1e_2d3c, 0x4b5a_6978],
        }
    }
}

impl BenchConfig {
    /// Parses and validates a configuration in JSON format.
    pub fn from_json(json: &str) -> Result<BenchConfig> {
        let config: BenchConfig =
            serde_json::from_str(json).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    #[tracing::instrument(level = "debug")]
    pub async fn load(path: &Path) -> Result<BenchConfig> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = BenchConfig::from_json(&json)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        tracing::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Checks that the configuration values are usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (2..=32).contains(&self.chain.sample_bits),
            "sample width {} out of range",
            self.chain.sample_bits
        );
        anyhow::ensure!(self.chain.settle_cycles > 0, "settle_cycles must be positive");
        anyhow::ensure!(
            self.response_timeout_ms > 0,
            "response timeout must be positive"
        );
        anyhow::ensure!(
            self.power_duration_s.is_finite() && self.power_duration_s >= 0.0,
            "invalid power analysis duration {}",
            self.power_duration_s
        );
        anyhow::ensure!(!self.filter_samples.is_empty(), "no filter samples");
        Ok(())
    }

    /// Returns the bus response timeout.
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Returns the filter chain processing delay.
    pub fn chain_delay(&self) -> Duration {
        Duration::from_millis(self.chain_delay_ms)
    }

    /// Returns the AES processing delay.
    pub fn aes_delay(&self) -> Duration {
        Duration::from_millis(self.aes_delay_ms)
    }

    /// Returns the duration of a power analysis traffic loop.
    pub fn power_duration(&self) -> Duration {
        Duration::from_secs_f64(self.power_duration_s)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rxchain_model::DfeSlicer;

    #[test]
    fn defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.response_timeout(), Duration::from_secs(1));
        assert_eq!(config.chain_delay(), Duration::from_millis(20));
        assert_eq!(config.aes_delay(), Duration::from_millis(50));
        assert_eq!(config.power_duration(), Duration::from_secs(10));
        assert_eq!(config.policy, AcceptPolicy::Connectivity);
        assert_eq!(config.chain, ChainConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn empty_json() {
        assert_eq!(BenchConfig::from_json("{}").unwrap(), BenchConfig::default());
    }

    #[test]
    fn nested_json() {
        let config = BenchConfig::from_json(
            r#"{
                "map": { "sys": 3758161920 },
                "chain": { "dfe_slicer": "sign", "settle_cycles": 30 },
                "filter_samples": [2048],
                "policy": "read_only"
            }"#,
        )
        .unwrap();
        assert_eq!(config.map.sys, 0xe001_0000);
        assert_eq!(config.map.filter, 0x4000_0000);
        assert_eq!(config.chain.dfe_slicer, DfeSlicer::Sign);
        assert_eq!(config.chain.settle_cycles, 30);
        assert_eq!(config.chain.sample_bits, 12);
        assert_eq!(config.filter_samples, [0x800]);
        assert_eq!(config.policy, AcceptPolicy::ReadOnly);
    }

    #[test]
    fn invalid() {
        assert!(BenchConfig::from_json(r#"{"chain": {"sample_bits": 40}}"#).is_err());
        assert!(BenchConfig::from_json(r#"{"filter_samples": []}"#).is_err());
        assert!(BenchConfig::from_json(r#"{"response_timeout_ms": 0}"#).is_err());
        assert!(BenchConfig::from_json(r#"{"policy": "lenient"}"#).is_err());
        assert!(BenchConfig::from_json("[").is_err());
    }

    #[tokio::test]
    async fn load_file() {
        let path = std::env::temp_dir().join(format!("rxchain-bench-{}.json", std::process::id()));
        tokio::fs::write(&path, r#"{"aes_delay_ms": 1}"#).await.unwrap();
        let config = BenchConfig::load(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(config.aes_delay(), Duration::from_millis(1));
        assert!(BenchConfig::load(Path::new("/nonexistent.json")).await.is_err());
    }
}
