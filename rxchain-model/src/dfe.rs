//! Decision-feedback equalizer.
//!
//! The DFE subtracts from its input a feedback term equal to the previous
//! decision times [`FEEDBACK_TAP`]. Decisions are taken on the output register
//! by a slicer, whose behaviour is selected with [`DfeSlicer`].
//!
//! The registers form a three tick loop: an output is sliced into a decision
//! on the next tick, the decision becomes the feedback one tick later, and the
//! feedback is subtracted from the input on the tick after that.

use crate::config::DfeSlicer;
use crate::fixed::sign_clip;
use crate::stage::Stage;

/// Magnitude of the feedback tap.
pub const FEEDBACK_TAP: i64 = 64;

/// DFE stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfe {
    bits: u32,
    slicer: DfeSlicer,
    // -1, 0 (only before the first decision is taken) or +1
    decision: i8,
    feedback: i64,
    output: i32,
}

impl DfeSlicer {
    fn decide(self, previous: i8, output: i32) -> i8 {
        let output = i64::from(output);
        match self {
            DfeSlicer::Sign => {
                if output >= 0 {
                    1
                } else {
                    -1
                }
            }
            DfeSlicer::Hysteresis => {
                if output > FEEDBACK_TAP {
                    1
                } else if output < -FEEDBACK_TAP {
                    -1
                } else {
                    previous
                }
            }
        }
    }
}

impl Dfe {
    /// Creates a DFE whose output is clipped to `bits` bits.
    pub fn new(bits: u32, slicer: DfeSlicer) -> Dfe {
        Dfe {
            bits,
            slicer,
            decision: 0,
            feedback: 0,
            output: 0,
        }
    }

    /// Returns the current decision.
    pub fn decision(&self) -> i8 {
        self.decision
    }
}

impl Stage for Dfe {
    const LATENCY: usize = 1;

    fn clock(&mut self, input: i32) -> i32 {
        let output = sign_clip(i64::from(input) - self.feedback, self.bits);
        self.feedback = i64::from(self.decision) * FEEDBACK_TAP;
        self.decision = self.slicer.decide(self.decision, self.output);
        self.output = output;
        output
    }

    fn reset(&mut self) {
        *self = Dfe::new(self.bits, self.slicer);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run(slicer: DfeSlicer, inputs: &[i32]) -> Vec<i32> {
        let mut dfe = Dfe::new(12, slicer);
        inputs.iter().map(|&x| dfe.clock(x)).collect()
    }

    #[test]
    fn sign_slicer_limit_cycle() {
        // zero input never settles with the hardware slicer
        assert_eq!(
            run(DfeSlicer::Sign, &[0; 10]),
            [0, 0, -64, -64, -64, 64, 64, 64, -64, -64]
        );
    }

    #[test]
    fn sign_slicer_large_input() {
        assert_eq!(
            run(DfeSlicer::Sign, &[200; 8]),
            [200, 200, 136, 136, 136, 136, 136, 136]
        );
    }

    #[test]
    fn hysteresis_keeps_zero() {
        assert_eq!(run(DfeSlicer::Hysteresis, &[0; 10]), [0; 10]);
    }

    #[test]
    fn hysteresis_is_symmetric() {
        assert_eq!(
            run(DfeSlicer::Hysteresis, &[200; 8]),
            [200, 200, 200, 136, 136, 136, 136, 136]
        );
        assert_eq!(
            run(DfeSlicer::Hysteresis, &[-200; 8]),
            [-200, -200, -200, -136, -136, -136, -136, -136]
        );
    }

    #[test]
    fn hysteresis_holds_decision_for_small_input() {
        let inputs: Vec<i32> = [200; 5].into_iter().chain([10; 10]).collect();
        let out = run(DfeSlicer::Hysteresis, &inputs);
        assert_eq!(&out[..5], [200, 200, 200, 136, 136]);
        assert!(out[5..].iter().all(|&y| y == -54));
    }
}
