//! Golden model run.
//!
//! This runs a test vector through the golden model only, without accessing
//! the hardware. It is useful to obtain the expected outputs of a vector
//! before a bench session.

use rxchain_json::GoldenRun;
use rxchain_model::fixed::mask;
use rxchain_model::{ChainConfig, FilterChainModel};

/// Returns the settled output of the golden model for each sample.
#[tracing::instrument(name = "golden", level = "info", skip_all)]
pub fn run(chain: &ChainConfig, samples: &[u32]) -> GoldenRun {
    let mut model = FilterChainModel::new(*chain);
    let outputs = model.run_vector(samples);
    let width_mask = mask(chain.sample_bits);
    for (sample, output) in samples.iter().zip(&outputs) {
        tracing::info!("{:#05x} -> {output:#05x}", sample & width_mask);
    }
    GoldenRun {
        samples: samples.iter().map(|s| s & width_mask).collect(),
        outputs,
    }
}
