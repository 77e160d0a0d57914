//! rxchain-bench CLI arguments.
//!
//! This module contains the definition of the CLI arguments for the
//! rxchain-bench application.

use crate::serial::{LinkTarget, DEFAULT_BAUD};
use crate::sim::SimDefect;
use clap::{Parser, Subcommand};
use rxchain_json::AcceptPolicy;
use rxchain_model::DfeSlicer;
use std::path::PathBuf;

/// rxchain-bench CLI arguments.
#[derive(Parser, Debug, Clone, Eq, PartialEq, Hash)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Serial port of the bus bridge
    #[clap(long, conflicts_with_all = ["tcp", "simulate"])]
    pub port: Option<PathBuf>,
    /// Baud rate of the serial port
    #[clap(long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,
    /// Address of a TCP serial bridge (host:port)
    #[clap(long, conflicts_with = "simulate")]
    pub tcp: Option<String>,
    /// Run against a simulated SoC instead of the hardware
    #[clap(long)]
    pub simulate: bool,
    /// Defect injected in the simulated SoC (undriven_output, bypass, silent_output)
    #[clap(long, requires = "simulate")]
    pub simulate_defect: Option<SimDefect>,
    /// Configuration file in JSON format
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Acceptance policy for the filter chain test (read_only, connectivity, golden)
    #[clap(long, value_parser = parse_policy)]
    pub policy: Option<AcceptPolicy>,
    /// DFE slicer of the golden model (sign, hysteresis)
    #[clap(long, value_parser = parse_slicer)]
    pub dfe_slicer: Option<DfeSlicer>,
    /// Write a JSON report of the session to this file
    #[clap(long)]
    pub report: Option<PathBuf>,
    /// Test to run (defaults to the interactive menu)
    #[clap(subcommand)]
    pub command: Option<Command>,
}

/// rxchain-bench commands.
#[derive(Subcommand, Debug, Clone, Eq, PartialEq, Hash)]
pub enum Command {
    /// Interactive test menu
    Menu,
    /// RAM read-back test
    Ram,
    /// Filter chain test
    Filter,
    /// AES round-trip test
    Aes,
    /// Power analysis traffic loops
    Power {
        /// Duration of each loop in seconds
        #[clap(long)]
        duration: Option<u32>,
    },
    /// RAM, filter chain and AES tests
    All,
    /// Run samples through the golden model only
    Golden {
        /// Samples, in decimal or 0x-prefixed hexadecimal (defaults to the
        /// configured filter samples)
        #[clap(value_parser = parse_sample)]
        samples: Vec<u32>,
    },
}

impl Command {
    /// Returns `true` if the command accesses the hardware.
    pub fn needs_link(&self) -> bool {
        !matches!(self, Command::Golden { .. })
    }
}

impl Args {
    /// Returns the hardware link selected in the arguments.
    ///
    /// This is `None` if neither a serial port nor a TCP bridge is given.
    pub fn link_target(&self) -> Option<LinkTarget> {
        if let Some(addr) = &self.tcp {
            Some(LinkTarget::Tcp(addr.clone()))
        } else {
            self.port.as_ref().map(|path| LinkTarget::Tty {
                path: path.clone(),
                baud: self.baud,
            })
        }
    }
}

/// Parses a sample given in decimal or in hexadecimal with a `0x` prefix.
pub fn parse_sample(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|err| format!("invalid sample {s}: {err}"))
}

fn parse_policy(s: &str) -> Result<AcceptPolicy, String> {
    s.parse()
        .map_err(|()| format!("invalid policy {s} (expected read_only, connectivity or golden)"))
}

fn parse_slicer(s: &str) -> Result<DfeSlicer, String> {
    s.parse()
        .map_err(|()| format!("invalid DFE slicer {s} (expected sign or hysteresis)"))
}
