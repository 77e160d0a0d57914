//! SoC register map.
//!
//! This module contains the base addresses of the slaves on the SoC bus, and
//! the register offsets inside each slave. The base addresses are part of the
//! bench configuration, since they depend on how the bus decoder was built.
//! The offsets inside a slave are fixed by its RTL.

use serde::{Deserialize, Serialize};

/// Base addresses of the bus slaves.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(default)]
pub struct AddressMap {
    /// First RAM bank (slave 1).
    pub ram1: u32,
    /// Second RAM bank (slave 2).
    pub ram2: u32,
    /// Filter chain (slave 3).
    pub filter: u32,
    /// AES cipher (slave 4).
    pub aes: u32,
    /// System control block.
    pub sys: u32,
}

impl Default for AddressMap {
    fn default() -> AddressMap {
        AddressMap {
            ram1: 0x0000_0000,
            ram2: 0x1000_0000,
            filter: 0x4000_0000,
            aes: 0x5000_0000,
            sys: 0xe000_0000,
        }
    }
}

/// Filter chain register offsets.
pub mod filter {
    /// Data register.
    ///
    /// Writes push a sample into the input FIFO. Reads pop the output FIFO
    /// (zero when empty).
    pub const DATA: u32 = 0x00;
    /// Control register.
    pub const CONTROL: u32 = 0x08;
    /// Status register (read-only).
    pub const STATUS: u32 = 0x0c;
    /// CTLE output debug tap.
    pub const CTLE_OUT: u32 = 0x20;
    /// DC-offset tracker output debug tap.
    pub const DC_OFFSET_OUT: u32 = 0x24;
    /// FIR equalizer output debug tap.
    pub const FIR_EQ_OUT: u32 = 0x28;
    /// DFE output debug tap.
    pub const DFE_OUT: u32 = 0x2c;
    /// Glitch filter output debug tap.
    pub const GLITCH_OUT: u32 = 0x30;
    /// LPF output debug tap.
    pub const LPF_OUT: u32 = 0x34;

    /// Control register: chain enable bit.
    pub const CONTROL_ENABLE: u32 = 1 << 0;
    /// Control register: bypass bit. When set, samples go straight from the
    /// input FIFO to the output FIFO.
    pub const CONTROL_BYPASS: u32 = 1 << 1;

    /// Status register: input FIFO occupancy field.
    pub const STATUS_IN_COUNT_SHIFT: u32 = 0;
    /// Status register: output FIFO occupancy field.
    pub const STATUS_OUT_COUNT_SHIFT: u32 = 8;
    /// Width mask of the occupancy fields.
    pub const STATUS_COUNT_MASK: u32 = 0xff;
}

/// AES cipher register offsets.
pub mod aes {
    /// First key word. The key occupies four consecutive words.
    pub const KEY: u32 = 0x00;
    /// First plaintext word. The plaintext occupies four consecutive words.
    pub const PLAINTEXT: u32 = 0x10;
    /// Control register. Writing 1 starts a run.
    pub const CONTROL: u32 = 0x20;
    /// First ciphertext word. The ciphertext occupies four consecutive words.
    pub const CIPHERTEXT: u32 = 0x30;
    /// Control register: start bit.
    pub const CONTROL_START: u32 = 1;
    /// Number of words in a key, plaintext or ciphertext block.
    pub const BLOCK_WORDS: usize = 4;
}

/// System control block register offsets.
pub mod sys {
    /// Clock gating enable register. Writing 1 enables gating of idle
    /// slaves, 0 keeps every clock running.
    pub const CLOCK_GATING: u32 = 0x00;
}

/// Returns the byte offset of word `n` of a block of consecutive words.
pub const fn word(base: u32, n: usize) -> u32 {
    base + 4 * n as u32
}
