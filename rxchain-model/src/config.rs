//! Golden model configuration.

use serde::{Deserialize, Serialize};

/// Default sample width in bits.
pub const DEFAULT_SAMPLE_BITS: u32 = 12;

/// Default number of ticks used to settle the chain on a held sample.
///
/// The slowest element is the DC-offset tracker, whose leaky integrator needs
/// about a hundred ticks to absorb a full-scale step. Over the whole 12-bit
/// input range the chain output stops changing within 110 ticks.
pub const DEFAULT_SETTLE_CYCLES: usize = 128;

/// Configuration of a [`FilterChainModel`](crate::FilterChainModel).
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(default)]
pub struct ChainConfig {
    /// Width of the samples, in bits.
    pub sample_bits: u32,
    /// Number of ticks that [`FilterChainModel::settle`](crate::FilterChainModel::settle)
    /// holds a sample for.
    pub settle_cycles: usize,
    /// Slicer used by the DFE to take decisions.
    pub dfe_slicer: DfeSlicer,
}

impl Default for ChainConfig {
    fn default() -> ChainConfig {
        ChainConfig {
            sample_bits: DEFAULT_SAMPLE_BITS,
            settle_cycles: DEFAULT_SETTLE_CYCLES,
            dfe_slicer: DfeSlicer::default(),
        }
    }
}

/// DFE slicer.
///
/// The slicer turns the DFE output register into the decision that drives
/// the feedback tap.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DfeSlicer {
    /// Decision is +1 when the output register is non-negative and -1
    /// otherwise.
    ///
    /// This is the rule written in the hardware description. The decision is
    /// never zero after the first tick, so an input smaller than the feedback
    /// tap (which is what the DC-offset tracker leaves once it has converged)
    /// makes the DFE oscillate with a period of six ticks.
    Sign,
    /// Decision follows the sign of the output register only when its
    /// magnitude exceeds the feedback tap, and holds otherwise.
    ///
    /// The reset decision is zero, so a zero input stays at zero, and every
    /// constant input reaches a steady output.
    #[default]
    Hysteresis,
}

impl std::str::FromStr for DfeSlicer {
    type Err = ();

    fn from_str(s: &str) -> Result<DfeSlicer, ()> {
        Ok(match s {
            "sign" => DfeSlicer::Sign,
            "hysteresis" => DfeSlicer::Hysteresis,
            _ => return Err(()),
        })
    }
}

impl std::fmt::Display for DfeSlicer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                DfeSlicer::Sign => "sign",
                DfeSlicer::Hysteresis => "hysteresis",
            }
        )
    }
}
