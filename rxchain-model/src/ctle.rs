//! Continuous-time linear equalizer emulation.
//!
//! The CTLE boosts high-frequency content by adding a fraction of the last
//! sample-to-sample difference to the input. The boosted value is held for
//! one extra register before it reaches the output.

use crate::fixed::sign_clip;
use crate::stage::Stage;

/// Log2 of the inverse of the boost factor applied to the difference term.
pub const ALPHA_SHIFT: u32 = 2;

/// CTLE stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ctle {
    bits: u32,
    prev_input: i64,
    prev_diff: i64,
    prev_boosted: i64,
}

impl Ctle {
    /// Creates a CTLE stage whose output is clipped to `bits` bits.
    pub fn new(bits: u32) -> Ctle {
        Ctle {
            bits,
            prev_input: 0,
            prev_diff: 0,
            prev_boosted: 0,
        }
    }
}

impl Stage for Ctle {
    const LATENCY: usize = 3;

    fn clock(&mut self, input: i32) -> i32 {
        let input = i64::from(input);
        let diff = input - self.prev_input;
        let boosted = input + (self.prev_diff >> ALPHA_SHIFT);
        let output = sign_clip(self.prev_boosted, self.bits);
        self.prev_input = input;
        self.prev_diff = diff;
        self.prev_boosted = boosted;
        output
    }

    fn reset(&mut self) {
        *self = Ctle::new(self.bits);
    }
}
