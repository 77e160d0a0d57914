//! Bench session report.
//!
//! This module collects the results of the tests run during a bench session
//! and writes them as a JSON document following the [`rxchain_json::Report`]
//! schema.

use anyhow::{Context, Result};
use chrono::prelude::*;
use rxchain_json::{ChainSettings, Report, Summary, TestResult};
use rxchain_model::ChainConfig;
use std::path::Path;

const TOOL: &str = concat!("rxchain-bench v", env!("CARGO_PKG_VERSION"));

/// Bench session.
///
/// A session accumulates test results and keeps the pass/fail count.
///
/// # Examples
/// ```
/// use rxchain_bench::report::Session;
/// use rxchain_json::{GoldenRun, TestResult};
/// use rxchain_model::ChainConfig;
///
/// let mut session = Session::new("simulated SoC", &ChainConfig::default());
/// session.record(TestResult::Golden(GoldenRun {
///     samples: vec![0x100],
///     outputs: vec![4050],
/// }));
/// println!("{}", session.to_json());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    datetime: DateTime<Utc>,
    link: String,
    chain: ChainConfig,
    tests: Vec<TestResult>,
    summary: Summary,
}

impl Session {
    /// Starts a session.
    ///
    /// The session start time is set to the current time.
    pub fn new(link: &str, chain: &ChainConfig) -> Session {
        Session {
            datetime: Utc::now(),
            link: link.to_string(),
            chain: *chain,
            tests: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Sets the session start time.
    pub fn set_datetime(&mut self, datetime: DateTime<Utc>) {
        self.datetime = datetime;
    }

    /// Adds the result of a test and counts its checks.
    pub fn record(&mut self, result: TestResult) {
        for pass in checks(&result) {
            self.summary.record(pass);
        }
        self.tests.push(result);
    }

    /// Returns the test results recorded so far.
    pub fn tests(&self) -> &[TestResult] {
        &self.tests
    }

    /// Returns the pass/fail count.
    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// Builds the report document.
    pub fn report(&self) -> Report {
        Report {
            tool: TOOL.to_string(),
            git_version: git_version::git_version!(fallback = "unknown").to_string(),
            datetime: self.datetime.to_rfc3339_opts(SecondsFormat::Millis, true),
            link: self.link.clone(),
            chain: ChainSettings {
                sample_bits: self.chain.sample_bits,
                settle_cycles: self.chain.settle_cycles,
                dfe_slicer: self.chain.dfe_slicer.to_string(),
            },
            tests: self.tests.clone(),
            summary: self.summary,
        }
    }

    /// Returns the report in JSON format.
    pub fn to_json(&self) -> String {
        // the report only contains plain data, which always serializes
        let mut s = serde_json::to_string_pretty(&self.report()).unwrap_or_default();
        s.push('\n');
        s
    }

    /// Writes the report to a file.
    pub async fn write(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_json())
            .await
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::info!("report written to {}", path.display());
        Ok(())
    }

    /// Logs the pass/fail count.
    pub fn log_summary(&self) {
        let Summary { passed, failed } = self.summary;
        if self.summary.all_passed() {
            tracing::info!("{} tests run: {passed} checks passed", self.tests.len());
        } else {
            tracing::warn!(
                "{} tests run: {passed} checks passed, {failed} failed",
                self.tests.len()
            );
        }
    }
}

// Returns the outcome of each individual check in a test result.
fn checks(result: &TestResult) -> Vec<bool> {
    match result {
        TestResult::Ram(ram) => ram.banks.iter().map(|bank| bank.pass).collect(),
        TestResult::Filter(filter) => filter
            .samples
            .iter()
            .map(|sample| sample.verdict.is_pass())
            .collect(),
        TestResult::Aes(aes) => vec![aes.pass],
        TestResult::Power(power) => vec![power.transport_errors == 0],
        // the golden model run has nothing to compare with
        TestResult::Golden(_) => Vec::new(),
    }
}
