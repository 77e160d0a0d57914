//! Forward error correction pass-through.
//!
//! Without injected errors the FEC encoder and decoder do not modify the data,
//! so the model reduces them to their latency.

use crate::stage::Stage;

/// FEC delay stage: a first-in first-out buffer of depth 2.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Fec {
    fifo: [i32; 2],
}

impl Fec {
    /// Creates an empty FEC delay.
    pub fn new() -> Fec {
        Fec::default()
    }
}

impl Stage for Fec {
    const LATENCY: usize = 2;

    fn clock(&mut self, input: i32) -> i32 {
        let output = self.fifo[1];
        self.fifo = [input, self.fifo[0]];
        output
    }

    fn reset(&mut self) {
        self.fifo = [0; 2];
    }
}
