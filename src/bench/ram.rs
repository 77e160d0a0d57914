//! RAM read-back test.

use super::{log_failure, read_or_log};
use crate::soc::{RamBank, Soc};
use rxchain_json::{RamBankCheck, RamTest};
use tokio::io::{AsyncRead, AsyncWrite};

/// Test pattern written to each bank.
pub const PATTERNS: [(RamBank, u32); 2] = [
    (RamBank::Ram1, 0xdead_beef),
    (RamBank::Ram2, 0xcafe_babe),
];

/// Writes a pattern to the first word of each RAM bank and reads it back.
#[tracing::instrument(name = "ram", level = "info", skip_all)]
pub async fn run<S: AsyncRead + AsyncWrite + Unpin>(soc: &mut Soc<S>) -> RamTest {
    let mut banks = Vec::with_capacity(PATTERNS.len());
    for (bank, written) in PATTERNS {
        let address = bank.base(soc.map());
        tracing::info!("writing {written:#010x} to {bank} ({address:#010x})");
        log_failure(soc.ram_write(bank, 0, written).await);
        let read = read_or_log(soc.ram_read(bank, 0).await);
        let pass = read == Some(written);
        match read {
            Some(read) if pass => tracing::info!("{bank} read back {read:#010x}: PASS"),
            Some(read) => tracing::warn!("{bank} read back {read:#010x}: FAIL"),
            None => tracing::warn!("{bank}: FAIL (read error)"),
        }
        banks.push(RamBankCheck {
            bank: bank.to_string(),
            address,
            written,
            read,
            pass,
        });
    }
    RamTest { banks }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::AhbBus;
    use crate::sim::{self, SimOptions};
    use std::time::Duration;

    #[tokio::test]
    async fn simulated_ram() {
        let mut soc = Soc::new(
            AhbBus::new(sim::spawn(SimOptions::default()), Duration::from_millis(200)),
            Default::default(),
        );
        let result = run(&mut soc).await;
        assert_eq!(result.banks.len(), 2);
        assert!(result.banks.iter().all(|bank| bank.pass));
        assert_eq!(result.banks[1].address, 0x1000_0000);
        assert_eq!(result.banks[1].read, Some(0xcafe_babe));
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_read() {
        let mut options = SimOptions::default();
        options.silent_reads.insert(0x1000_0000);
        let mut soc = Soc::new(
            AhbBus::new(sim::spawn(options), Duration::from_millis(200)),
            Default::default(),
        );
        let result = run(&mut soc).await;
        assert!(result.banks[0].pass);
        assert!(!result.banks[1].pass);
        assert_eq!(result.banks[1].read, None);
    }
}
