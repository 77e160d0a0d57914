//! DC-offset tracker.

use crate::fixed::sign_clip;
use crate::stage::Stage;

/// Log2 of the time constant of the running average.
pub const ALPHA_SHIFT: u32 = 4;

/// DC-offset tracker stage.
///
/// Subtracts a leaky-integrator estimate of the input mean. The subtracted
/// average is the one held before the current input updates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DcOffset {
    bits: u32,
    average: i64,
}

impl DcOffset {
    /// Creates a DC-offset tracker whose output is clipped to `bits` bits.
    pub fn new(bits: u32) -> DcOffset {
        DcOffset { bits, average: 0 }
    }

    /// Returns the current running average.
    pub fn average(&self) -> i64 {
        self.average
    }
}

impl Stage for DcOffset {
    const LATENCY: usize = 1;

    fn clock(&mut self, input: i32) -> i32 {
        let input = i64::from(input);
        let output = sign_clip(input - self.average, self.bits);
        self.average += (input - self.average) >> ALPHA_SHIFT;
        output
    }

    fn reset(&mut self) {
        self.average = 0;
    }
}
