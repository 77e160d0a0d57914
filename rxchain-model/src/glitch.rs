//! Glitch filter.

use crate::fixed::sign_clip;
use crate::stage::Stage;

/// Minimum jump between consecutive samples that is treated as a glitch.
///
/// A jump of exactly this magnitude is not a glitch.
pub const THRESHOLD: i64 = 512;

/// Glitch filter stage.
///
/// When the input jumps from the previous sample by more than [`THRESHOLD`],
/// the output is the median of the input and the two previous inputs.
/// Otherwise the input is passed unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glitch {
    bits: u32,
    last1: i32,
    last2: i32,
}

fn median3(a: i32, b: i32, c: i32) -> i32 {
    a.max(b).min(a.min(b).max(c))
}

impl Glitch {
    /// Creates a glitch filter whose output is clipped to `bits` bits.
    pub fn new(bits: u32) -> Glitch {
        Glitch {
            bits,
            last1: 0,
            last2: 0,
        }
    }
}

impl Stage for Glitch {
    const LATENCY: usize = 1;

    fn clock(&mut self, input: i32) -> i32 {
        let jump = (i64::from(input) - i64::from(self.last1)).abs();
        let value = if jump > THRESHOLD {
            median3(input, self.last1, self.last2)
        } else {
            input
        };
        self.last2 = self.last1;
        self.last1 = input;
        sign_clip(value.into(), self.bits)
    }

    fn reset(&mut self) {
        self.last1 = 0;
        self.last2 = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run(inputs: &[i32]) -> Vec<i32> {
        let mut glitch = Glitch::new(12);
        inputs.iter().map(|&x| glitch.clock(x)).collect()
    }

    #[test]
    fn median() {
        assert_eq!(median3(1, 2, 3), 2);
        assert_eq!(median3(3, 1, 2), 2);
        assert_eq!(median3(2, 3, 1), 2);
        assert_eq!(median3(-5, -5, 7), -5);
    }

    #[test]
    fn identical_inputs_pass_through() {
        assert_eq!(run(&[5, 5, 5, 5]), [5, 5, 5, 5]);
        assert_eq!(run(&[-2000; 3])[2..], [-2000]);
    }

    #[test]
    fn spike_is_replaced_by_median() {
        assert_eq!(run(&[0, 0, 1000, 1000, 1000]), [0, 0, 0, 1000, 1000]);
        assert_eq!(run(&[100, 100, -600, 100, 100]), [100; 5]);
    }

    #[test]
    fn jump_at_threshold_is_kept() {
        assert_eq!(run(&[0, 0, 512, 0]), [0, 0, 512, 0]);
    }
}
