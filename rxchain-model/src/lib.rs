//! rxchain-model is the golden model of the rxchain wireline receiver filter
//! chain. It reproduces, tick by tick, the fixed-point arithmetic of the
//! hardware description, so that the bench tool can predict what the FPGA
//! should output for a given input sequence.
//!
//! The chain is formed by seven stages, applied in this fixed order:
//!
//! CTLE → DC-offset → FIR-EQ → DFE → Glitch → LPF → FEC delay
//!
//! Each stage implements [`Stage`]. The [`FilterChainModel`] owns one
//! instance of each of them and advances all of them exactly once per clock
//! tick.
//!
//! # DFE slicer
//!
//! The default [`DfeSlicer::Hysteresis`] does not follow the hardware. The
//! hardware slicer takes the sign of the output register on every tick,
//! which makes the DFE oscillate forever on a zero or DC input. The default
//! slicer holds its decision while the register is within the feedback tap,
//! so that every constant input settles. To compare bit for bit against the
//! FPGA use [`DfeSlicer::Sign`] instead (`--dfe-slicer sign` on the bench
//! command line).
//!
//! # Examples
//!
//! ```
//! use rxchain_model::{ChainConfig, FilterChainModel};
//!
//! let mut model = FilterChainModel::new(ChainConfig::default());
//! // a zero input is a fixed point of every stage
//! assert_eq!(model.run_sample(0, 30), 0);
//! ```

#![warn(missing_docs)]

pub mod chain;
pub mod config;
pub mod ctle;
pub mod dc_offset;
pub mod dfe;
pub mod fec;
pub mod fir_eq;
pub mod fixed;
pub mod glitch;
pub mod lpf;
pub mod stage;

pub use chain::{FilterChainModel, StageOutputs};
pub use config::{ChainConfig, DfeSlicer};
pub use stage::Stage;
