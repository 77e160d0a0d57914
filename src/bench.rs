//! Bench routines.
//!
//! Each routine exercises one slave of the SoC through a [`Soc`] driver and
//! returns its result in the [`rxchain_json`] report schema. Bus failures are
//! logged and recorded in the result, but they never abort a routine, so that
//! a partially working SoC still produces a complete report.
//!
//! [`Soc`]: crate::soc::Soc

pub mod aes;
pub mod filter;
pub mod golden;
pub mod power;
pub mod ram;

// Logs a failed bus operation whose result is not needed afterwards.
fn log_failure(result: anyhow::Result<()>) {
    if let Err(err) = result {
        tracing::warn!("{err:#}");
    }
}

// Returns the value of a bus read, logging the failure if it could not be read.
fn read_or_log(result: anyhow::Result<u32>) -> Option<u32> {
    result.map_err(|err| tracing::warn!("{err:#}")).ok()
}
