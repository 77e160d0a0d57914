//! SoC driver.
//!
//! This module contains [`Soc`], a typed driver for the slaves on the SoC
//! bus. It translates operations such as "push a sample into the filter
//! chain" into register accesses through an [`AhbBus`].

use crate::bus::{AhbBus, BusStats};
use crate::regmap::{aes, filter, sys, word, AddressMap};
use anyhow::{Context, Result};
use rxchain_json::StageTaps;
use tokio::io::{AsyncRead, AsyncWrite};

/// RAM bank.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RamBank {
    /// First RAM bank.
    Ram1,
    /// Second RAM bank.
    Ram2,
}

impl RamBank {
    /// Returns the base address of the bank.
    pub fn base(self, map: &AddressMap) -> u32 {
        match self {
            RamBank::Ram1 => map.ram1,
            RamBank::Ram2 => map.ram2,
        }
    }
}

impl std::fmt::Display for RamBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.write_str(match self {
            RamBank::Ram1 => "RAM1",
            RamBank::Ram2 => "RAM2",
        })
    }
}

/// Filter chain status register.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FilterStatus {
    /// Samples waiting in the input FIFO.
    pub input_fifo: u32,
    /// Samples waiting in the output FIFO.
    pub output_fifo: u32,
}

impl From<u32> for FilterStatus {
    fn from(value: u32) -> FilterStatus {
        FilterStatus {
            input_fifo: (value >> filter::STATUS_IN_COUNT_SHIFT) & filter::STATUS_COUNT_MASK,
            output_fifo: (value >> filter::STATUS_OUT_COUNT_SHIFT) & filter::STATUS_COUNT_MASK,
        }
    }
}

/// SoC driver.
#[derive(Debug)]
pub struct Soc<S> {
    bus: AhbBus<S>,
    map: AddressMap,
}

macro_rules! impl_tap_readers {
    ($($stage:ident => $offset:ident),*) => {
        paste::paste! {
            $(
                #[doc = concat!("Reads the ", stringify!($stage), " stage debug tap.")]
                pub async fn [<read_ $stage _out>](&mut self) -> Result<u32> {
                    self.filter_read(filter::$offset)
                        .await
                        .context(concat!("failed to read ", stringify!($stage), " tap"))
                }
            )*

            /// Reads every stage debug tap.
            ///
            /// Taps that cannot be read are reported as `None`, and the
            /// remaining ones are still read.
            pub async fn read_taps(&mut self) -> StageTaps {
                StageTaps {
                    $(
                        $stage: match self.[<read_ $stage _out>]().await {
                            Ok(value) => Some(value),
                            Err(err) => {
                                tracing::warn!("{err:#}");
                                None
                            }
                        },
                    )*
                }
            }
        }
    };
}

impl<S: AsyncRead + AsyncWrite + Unpin> Soc<S> {
    /// Creates a driver for a SoC reached through `bus`.
    pub fn new(bus: AhbBus<S>, map: AddressMap) -> Soc<S> {
        tracing::debug!(?map, "SoC driver created");
        Soc { bus, map }
    }

    /// Returns the address map.
    pub fn map(&self) -> &AddressMap {
        &self.map
    }

    /// Returns the bus transaction counters.
    pub fn bus_stats(&self) -> BusStats {
        self.bus.stats()
    }

    /// Gives access to the underlying bus.
    pub fn bus_mut(&mut self) -> &mut AhbBus<S> {
        &mut self.bus
    }

    /// Writes a word at `offset` bytes into a RAM bank.
    pub async fn ram_write(&mut self, bank: RamBank, offset: u32, data: u32) -> Result<()> {
        self.bus
            .write(bank.base(&self.map) + offset, data)
            .await
            .with_context(|| format!("failed to write {bank}"))
    }

    /// Reads the word at `offset` bytes into a RAM bank.
    pub async fn ram_read(&mut self, bank: RamBank, offset: u32) -> Result<u32> {
        self.bus
            .read(bank.base(&self.map) + offset)
            .await
            .with_context(|| format!("failed to read {bank}"))
    }

    async fn filter_read(&mut self, offset: u32) -> Result<u32> {
        self.bus.read(self.map.filter + offset).await
    }

    async fn filter_write(&mut self, offset: u32, data: u32) -> Result<()> {
        self.bus.write(self.map.filter + offset, data).await
    }

    /// Pushes a sample into the filter chain input FIFO.
    pub async fn filter_push(&mut self, sample: u32) -> Result<()> {
        self.filter_write(filter::DATA, sample)
            .await
            .context("failed to push filter sample")
    }

    /// Pops a sample from the filter chain output FIFO.
    ///
    /// The hardware returns zero if the FIFO is empty.
    pub async fn filter_pop(&mut self) -> Result<u32> {
        self.filter_read(filter::DATA)
            .await
            .context("failed to read filter output")
    }

    /// Sets the filter chain control register.
    pub async fn filter_set_control(&mut self, enable: bool, bypass: bool) -> Result<()> {
        let mut value = 0;
        if enable {
            value |= filter::CONTROL_ENABLE;
        }
        if bypass {
            value |= filter::CONTROL_BYPASS;
        }
        self.filter_write(filter::CONTROL, value)
            .await
            .context("failed to write filter control")
    }

    /// Reads the filter chain status register.
    pub async fn filter_status(&mut self) -> Result<FilterStatus> {
        Ok(self
            .filter_read(filter::STATUS)
            .await
            .context("failed to read filter status")?
            .into())
    }

    impl_tap_readers!(ctle => CTLE_OUT,
                      dc_offset => DC_OFFSET_OUT,
                      fir_eq => FIR_EQ_OUT,
                      dfe => DFE_OUT,
                      glitch => GLITCH_OUT,
                      lpf => LPF_OUT);

    async fn aes_write_block(&mut self, offset: u32, block: &[u32; 4]) -> Result<()> {
        for (n, &value) in block.iter().enumerate() {
            self.bus
                .write(self.map.aes + word(offset, n), value)
                .await?;
        }
        Ok(())
    }

    /// Loads the AES key.
    pub async fn aes_set_key(&mut self, key: &[u32; 4]) -> Result<()> {
        self.aes_write_block(aes::KEY, key)
            .await
            .context("failed to write AES key")
    }

    /// Loads the AES input block.
    pub async fn aes_set_plaintext(&mut self, plaintext: &[u32; 4]) -> Result<()> {
        self.aes_write_block(aes::PLAINTEXT, plaintext)
            .await
            .context("failed to write AES plaintext")
    }

    /// Starts an AES run on the loaded key and input block.
    pub async fn aes_start(&mut self) -> Result<()> {
        self.bus
            .write(self.map.aes + aes::CONTROL, aes::CONTROL_START)
            .await
            .context("failed to start AES")
    }

    /// Reads the AES output block.
    pub async fn aes_ciphertext(&mut self) -> Result<[u32; 4]> {
        let mut block = [0; 4];
        for (n, value) in block.iter_mut().enumerate() {
            *value = self
                .bus
                .read(self.map.aes + word(aes::CIPHERTEXT, n))
                .await
                .context("failed to read AES ciphertext")?;
        }
        Ok(block)
    }

    /// Enables or disables clock gating of idle slaves.
    pub async fn set_clock_gating(&mut self, enable: bool) -> Result<()> {
        self.bus
            .write(self.map.sys + sys::CLOCK_GATING, u32::from(enable))
            .await
            .context("failed to write clock gating register")?;
        tracing::info!("clock gating {}", if enable { "enabled" } else { "disabled" });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_fields() {
        let status = FilterStatus::from(0x0000_0302);
        assert_eq!(
            status,
            FilterStatus {
                input_fifo: 2,
                output_fifo: 3
            }
        );
    }

    #[test]
    fn bank_bases() {
        let map = AddressMap::default();
        assert_eq!(RamBank::Ram1.base(&map), 0);
        assert_eq!(RamBank::Ram2.base(&map), 0x1000_0000);
        assert_eq!(RamBank::Ram2.to_string(), "RAM2");
    }
}
