//! Low-pass filter.
//!
//! A 5-tap FIR with taps (1, 2, 3, 2, 1), normalized by a truncating
//! division by their sum. The hardware pipelines the computation in three
//! register stages: accumulate, divide, clip. Each tick advances every
//! sub-stage by one step, so a sample entering the history on tick `n` is
//! accumulated on tick `n + 1`, divided on tick `n + 2` and reaches the
//! output on tick `n + 3`.

use crate::fixed::{sign_clip, trunc_div};
use crate::stage::Stage;

/// Number of taps.
pub const TAPS: usize = 5;

/// Filter taps.
pub const WEIGHTS: [i64; TAPS] = [1, 2, 3, 2, 1];

/// Sum of [`WEIGHTS`], used as divisor.
pub const DIVISOR: i64 = 9;

/// LPF stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lpf {
    bits: u32,
    history: [i32; TAPS],
    accumulator: i64,
    quotient: i64,
}

impl Lpf {
    /// Creates a LPF whose output is clipped to `bits` bits.
    pub fn new(bits: u32) -> Lpf {
        Lpf {
            bits,
            history: [0; TAPS],
            accumulator: 0,
            quotient: 0,
        }
    }
}

impl Stage for Lpf {
    const LATENCY: usize = 3;

    fn clock(&mut self, input: i32) -> i32 {
        let output = sign_clip(self.quotient, self.bits);
        self.quotient = trunc_div(self.accumulator, DIVISOR);
        self.accumulator = self
            .history
            .iter()
            .zip(WEIGHTS.iter())
            .map(|(&x, &w)| i64::from(x) * w)
            .sum();
        self.history.rotate_right(1);
        self.history[0] = input;
        output
    }

    fn reset(&mut self) {
        *self = Lpf::new(self.bits);
    }
}
