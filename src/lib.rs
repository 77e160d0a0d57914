//! rxchain-bench is the bring-up bench of the rxchain FPGA SoC. It drives the
//! SoC through the register bus bridge exposed on a serial link, runs tests on
//! its RAM banks, receiver filter chain and AES core, and compares the filter
//! chain outputs with the [`rxchain_model`] golden model.
//!
//! The bench can also run against a simulated SoC, which serves the same bus
//! protocol and can inject known hardware defects.

#![warn(missing_docs)]

pub mod app;
pub mod args;
pub mod bench;
pub mod bus;
pub mod config;
pub mod console;
pub mod protocol;
pub mod regmap;
pub mod report;
pub mod serial;
pub mod sim;
pub mod soc;
