//! Filter stage abstraction.

/// A stage of the filter chain.
///
/// A stage holds only its own registers. Each call to [`Stage::clock`]
/// corresponds to a rising clock edge: the stage consumes one sample and
/// produces one sample, and its registers are updated. No stage reads the
/// registers of another stage.
pub trait Stage {
    /// Number of register stages of the block in hardware.
    ///
    /// Stages whose output is computed from their freshly updated state
    /// respond sooner than this in the model.
    const LATENCY: usize;

    /// Advances the stage by one clock tick.
    fn clock(&mut self, input: i32) -> i32;

    /// Returns all the registers of the stage to zero.
    fn reset(&mut self);
}
