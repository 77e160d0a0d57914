//! Power analysis traffic generator.
//!
//! The bus is kept busy with a fixed traffic pattern, first with clock gating
//! disabled and then with clock gating enabled, so that the FPGA supply
//! current can be measured in both modes. In interactive sessions the
//! operator is asked to confirm before each loop starts.

use super::log_failure;
use crate::config::BenchConfig;
use crate::console::Console;
use crate::soc::{RamBank, Soc};
use rxchain_json::PowerTest;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;

/// Word written to RAM1 by the traffic loop.
pub const RAM_PATTERN: u32 = 0xaaaa_5555;
/// Sample pushed into the filter chain by the traffic loop.
pub const FILTER_SAMPLE: u32 = 0x123;

/// Runs both traffic loops.
#[tracing::instrument(name = "power", level = "info", skip_all)]
pub async fn run<S: AsyncRead + AsyncWrite + Unpin>(
    soc: &mut Soc<S>,
    config: &BenchConfig,
    mut console: Option<&mut Console>,
) -> PowerTest {
    let duration = config.power_duration();
    let errors_before = soc.bus_stats().errors;

    tracing::info!("step 1: disabling clock gating (high power mode)");
    log_failure(soc.set_clock_gating(false).await);
    confirm(&mut console, "Press ENTER to start traffic loop (gating OFF)...").await;
    let gating_off_operations = traffic(soc, duration).await;
    tracing::info!("done, {gating_off_operations} operations performed");

    tracing::info!("step 2: enabling clock gating (low power mode)");
    log_failure(soc.set_clock_gating(true).await);
    confirm(&mut console, "Press ENTER to start traffic loop (gating ON)...").await;
    let gating_on_operations = traffic(soc, duration).await;
    tracing::info!("done, {gating_on_operations} operations performed");

    let transport_errors = soc.bus_stats().errors - errors_before;
    if transport_errors > 0 {
        tracing::warn!("{transport_errors} bus transactions failed");
    }
    PowerTest {
        duration: config.power_duration_s,
        gating_off_operations,
        gating_on_operations,
        transport_errors,
    }
}

async fn confirm(console: &mut Option<&mut Console>, message: &str) {
    if let Some(console) = console {
        if let Err(err) = console.prompt(message).await {
            tracing::warn!("failed to read from console: {err:#}");
        }
    }
}

// Returns the number of iterations of the traffic pattern performed.
async fn traffic<S: AsyncRead + AsyncWrite + Unpin>(
    soc: &mut Soc<S>,
    duration: Duration,
) -> u64 {
    tracing::info!("running traffic for {} s", duration.as_secs_f64());
    let start = Instant::now();
    let mut operations = 0;
    while start.elapsed() < duration {
        // failures are counted by the bus
        let _ = soc.ram_write(RamBank::Ram1, 0, RAM_PATTERN).await;
        let _ = soc.ram_read(RamBank::Ram1, 0).await;
        let _ = soc.filter_push(FILTER_SAMPLE).await;
        let _ = soc.filter_pop().await;
        operations += 1;
    }
    operations
}
