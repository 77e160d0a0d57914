//! FIR equalizer.
//!
//! A 7-tap FIR with fixed integer coefficients. The accumulator is scaled
//! by an arithmetic right shift of [`SCALE_SHIFT`] bits, so the centre tap
//! (256) has unit gain.

use crate::fixed::sign_clip;
use crate::stage::Stage;

/// Number of taps.
pub const TAPS: usize = 7;

/// Filter coefficients, applied to the history from the most recent sample
/// to the oldest.
pub const COEFFICIENTS: [i64; TAPS] = [-32, -64, 128, 256, 128, -64, -32];

/// Right shift applied to the accumulator.
pub const SCALE_SHIFT: u32 = 8;

/// FIR equalizer stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirEq {
    bits: u32,
    // most recent sample first
    history: [i32; TAPS],
}

impl FirEq {
    /// Creates a FIR equalizer whose output is clipped to `bits` bits.
    pub fn new(bits: u32) -> FirEq {
        FirEq {
            bits,
            history: [0; TAPS],
        }
    }
}

impl Stage for FirEq {
    const LATENCY: usize = 1;

    fn clock(&mut self, input: i32) -> i32 {
        let acc = self
            .history
            .iter()
            .zip(COEFFICIENTS.iter())
            .map(|(&x, &c)| i64::from(x) * c)
            .sum::<i64>();
        let output = sign_clip(acc >> SCALE_SHIFT, self.bits);
        self.history.rotate_right(1);
        self.history[0] = input;
        output
    }

    fn reset(&mut self) {
        self.history = [0; TAPS];
    }
}
