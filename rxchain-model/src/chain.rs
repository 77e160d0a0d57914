//! Filter chain orchestrator.
//!
//! This module contains [`FilterChainModel`], which composes the seven stages
//! of the chain and is the entry point used by the bench to obtain golden
//! values.

use crate::config::ChainConfig;
use crate::ctle::Ctle;
use crate::dc_offset::DcOffset;
use crate::dfe::Dfe;
use crate::fec::Fec;
use crate::fir_eq::FirEq;
use crate::fixed::{sign_extend, to_unsigned};
use crate::glitch::Glitch;
use crate::lpf::Lpf;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

/// Golden model of the filter chain.
///
/// The model owns one instance of each stage. A call to
/// [`FilterChainModel::clock`] is one tick of the synchronous pipeline: the
/// input goes through every stage in order, each stage using its registers
/// from the previous tick.
///
/// The model is never reset implicitly. Successive calls to
/// [`FilterChainModel::run_sample`] continue from the state left by the
/// previous call, in the same way that the hardware keeps filtering between
/// samples written by the bench. Use [`FilterChainModel::reset`] or build a
/// new model to start from zero.
///
/// # Examples
///
/// ```
/// use rxchain_model::{ChainConfig, FilterChainModel};
///
/// let mut model = FilterChainModel::new(ChainConfig::default());
/// let settled = model.settle(0x100);
/// // once settled, holding the same sample does not change the output
/// assert_eq!(model.settle(0x100), settled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChainModel {
    config: ChainConfig,
    ctle: Ctle,
    dc_offset: DcOffset,
    fir_eq: FirEq,
    dfe: Dfe,
    glitch: Glitch,
    lpf: Lpf,
    fec: Fec,
    last_output: i32,
}

/// Outputs of every stage during one tick.
///
/// The hardware exposes the first six of them as debug registers.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StageOutputs<T = i32> {
    /// CTLE output.
    pub ctle: T,
    /// DC-offset tracker output.
    pub dc_offset: T,
    /// FIR equalizer output.
    pub fir_eq: T,
    /// DFE output.
    pub dfe: T,
    /// Glitch filter output.
    pub glitch: T,
    /// LPF output.
    pub lpf: T,
    /// FEC delay output, which is the chain output.
    pub fec: T,
}

impl<T> StageOutputs<T> {
    /// Applies `f` to the output of every stage.
    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> StageOutputs<U> {
        StageOutputs {
            ctle: f(self.ctle),
            dc_offset: f(self.dc_offset),
            fir_eq: f(self.fir_eq),
            dfe: f(self.dfe),
            glitch: f(self.glitch),
            lpf: f(self.lpf),
            fec: f(self.fec),
        }
    }
}

impl FilterChainModel {
    /// Nominal pipeline depth of the hardware chain, in ticks.
    ///
    /// This is the sum of the register stages of each block. It is an upper
    /// bound on the delay seen in the model, where several stages feed their
    /// new state straight to the output. See
    /// [`FilterChainModel::RESPONSE_DELAY`].
    pub const LATENCY: usize = Ctle::LATENCY
        + DcOffset::LATENCY
        + FirEq::LATENCY
        + Dfe::LATENCY
        + Glitch::LATENCY
        + Lpf::LATENCY
        + Fec::LATENCY;

    /// Number of ticks after which a step at the input first changes the
    /// model output.
    pub const RESPONSE_DELAY: usize = 7;

    /// Creates a model with all its registers set to zero.
    ///
    /// # Panics
    ///
    /// Panics if `config.sample_bits` is not in `2..=32`.
    pub fn new(config: ChainConfig) -> FilterChainModel {
        let bits = config.sample_bits;
        assert!((2..=32).contains(&bits), "invalid sample width {bits}");
        FilterChainModel {
            config,
            ctle: Ctle::new(bits),
            dc_offset: DcOffset::new(bits),
            fir_eq: FirEq::new(bits),
            dfe: Dfe::new(bits, config.dfe_slicer),
            glitch: Glitch::new(bits),
            lpf: Lpf::new(bits),
            fec: Fec::new(),
            last_output: 0,
        }
    }

    /// Returns the configuration of the model.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Returns every register of the chain to zero.
    pub fn reset(&mut self) {
        self.ctle.reset();
        self.dc_offset.reset();
        self.fir_eq.reset();
        self.dfe.reset();
        self.glitch.reset();
        self.lpf.reset();
        self.fec.reset();
        self.last_output = 0;
    }

    /// Advances the chain by one tick and returns its output.
    ///
    /// A change at the input first reaches the output
    /// [`FilterChainModel::RESPONSE_DELAY`] ticks later.
    pub fn clock(&mut self, input: i32) -> i32 {
        self.clock_traced(input).fec
    }

    /// Advances the chain by one tick and returns the output of every stage.
    pub fn clock_traced(&mut self, input: i32) -> StageOutputs {
        let ctle = self.ctle.clock(input);
        let dc_offset = self.dc_offset.clock(ctle);
        let fir_eq = self.fir_eq.clock(dc_offset);
        let dfe = self.dfe.clock(fir_eq);
        let glitch = self.glitch.clock(dfe);
        let lpf = self.lpf.clock(glitch);
        let fec = self.fec.clock(lpf);
        self.last_output = fec;
        StageOutputs {
            ctle,
            dc_offset,
            fir_eq,
            dfe,
            glitch,
            lpf,
            fec,
        }
    }

    /// Holds `sample` at the input for `cycles` ticks and returns the final
    /// output.
    ///
    /// `sample` is a bus word: only its `sample_bits` least significant bits
    /// are used, and they are interpreted as a two's complement number. The
    /// output is returned in the same format, masked to `sample_bits`. If
    /// `cycles` is zero the chain is not clocked and the output of the last
    /// tick is returned.
    pub fn run_sample(&mut self, sample: u32, cycles: usize) -> u32 {
        self.run_sample_traced(sample, cycles).fec
    }

    /// Same as [`FilterChainModel::run_sample`], but returns the output of
    /// every stage during the final tick, masked to `sample_bits`.
    ///
    /// If `cycles` is zero only the chain output is known, and the remaining
    /// stage outputs are reported as zero.
    pub fn run_sample_traced(&mut self, sample: u32, cycles: usize) -> StageOutputs<u32> {
        let bits = self.config.sample_bits;
        let input = sign_extend(sample, bits);
        let mut outputs = StageOutputs {
            fec: self.last_output,
            ..Default::default()
        };
        for _ in 0..cycles {
            outputs = self.clock_traced(input);
        }
        outputs.map(|x| to_unsigned(x, bits))
    }

    /// Holds `sample` for the configured number of settle cycles.
    pub fn settle(&mut self, sample: u32) -> u32 {
        self.run_sample(sample, self.config.settle_cycles)
    }

    /// Holds `sample` for the configured number of settle cycles and returns
    /// the output of every stage.
    pub fn settle_traced(&mut self, sample: u32) -> StageOutputs<u32> {
        self.run_sample_traced(sample, self.config.settle_cycles)
    }

    /// Returns the settled output for each sample of a test vector.
    ///
    /// Samples are applied in order, each one held for the configured number
    /// of settle cycles, without resetting the chain in between.
    pub fn run_vector(&mut self, samples: &[u32]) -> Vec<u32> {
        samples.iter().map(|&sample| self.settle(sample)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::DfeSlicer;

    fn model() -> FilterChainModel {
        FilterChainModel::new(ChainConfig::default())
    }

    #[test]
    fn latency() {
        assert_eq!(FilterChainModel::LATENCY, 12);
    }

    #[test]
    fn response_delay() {
        for sample in [256, -256, 2047] {
            let mut model = model();
            let first = (0..FilterChainModel::LATENCY)
                .position(|_| model.clock(sample) != 0)
                .unwrap();
            assert_eq!(first, FilterChainModel::RESPONSE_DELAY, "step {sample}");
        }
    }

    #[test]
    fn zero_is_a_fixed_point() {
        let mut model = model();
        assert_eq!(model.run_sample(0, 30), 0);
        assert_eq!(model, self::model());
    }

    #[test]
    fn step_response() {
        let mut model = model();
        let out: Vec<i32> = (0..16).map(|_| model.clock(256)).collect();
        assert_eq!(
            out,
            [0, 0, 0, 0, 0, 0, 0, -3, -18, -30, 0, 113, 265, 361, 347, 263]
        );
    }

    #[test]
    fn thirty_cycle_vector() {
        let mut model = model();
        assert_eq!(model.run_sample(0x100, 30), 46);
    }

    #[test]
    fn settled_output_is_stable() {
        for sample in [0x100, 0x123, 0x500, 0x7ff, 0x800, 0xf00] {
            let mut model = model();
            let settled = model.settle(sample);
            for _ in 0..50 {
                assert_eq!(model.run_sample(sample, 1), settled);
            }
            assert_eq!(model.settle(sample), settled);
        }
    }

    #[test]
    fn settled_values() {
        let mut model = model();
        // the DC-offset tracker removes the level, leaving only the
        // floor residual and the DFE decision
        assert_eq!(model.settle(0x100), 4050);
        assert_eq!(model.settle(0x800), 64);
        assert_eq!(model.settle(0x800), 64);
    }

    #[test]
    fn settles_after_full_scale_step() {
        let mut model = model();
        model.settle(0x800);
        let settled = model.settle(0x7ea);
        assert_eq!(model.settle(0x7ea), settled);
    }

    #[test]
    fn vector_carries_memory() {
        let mut model = model();
        assert_eq!(
            model.run_vector(&[0x100, 0x200, 0x300, 0x400, 0x500]),
            [4050; 5]
        );
        let mut fresh = self::model();
        let per_sample: Vec<u32> = [0x100, 0x200, 0x300, 0x400, 0x500]
            .iter()
            .map(|&s| fresh.run_sample(s, 30))
            .collect();
        assert_eq!(per_sample, [46, 65, 68, 68, 68]);
    }

    #[test]
    fn zero_cycles_returns_last_output() {
        let mut model = model();
        assert_eq!(model.run_sample(0x100, 0), 0);
        let out = model.run_sample(0x100, 30);
        assert_eq!(model.run_sample(0x300, 0), out);
    }

    #[test]
    fn traced_taps_agree_with_output() {
        let mut model = model();
        let taps = model.settle_traced(0x100);
        assert_eq!(taps.fec, 4050);
        assert_eq!(taps.lpf, 4050);
        assert_eq!(taps.ctle, 0x100);
    }

    #[test]
    fn reset_returns_to_zero_state() {
        let mut model = model();
        model.settle(0x555);
        model.reset();
        assert_eq!(model, self::model());
    }

    #[test]
    fn sign_slicer_does_not_settle_on_zero() {
        let mut model = FilterChainModel::new(ChainConfig {
            dfe_slicer: DfeSlicer::Sign,
            ..Default::default()
        });
        assert_eq!(model.run_sample(0, 30), 4075);
    }

    #[test]
    #[should_panic]
    fn rejects_invalid_width() {
        FilterChainModel::new(ChainConfig {
            sample_bits: 40,
            ..Default::default()
        });
    }

    fn model_with_width(bits: u32) -> FilterChainModel {
        FilterChainModel::new(ChainConfig {
            sample_bits: bits,
            ..Default::default()
        })
    }

    fn all_taps(taps: &StageOutputs<u32>) -> [u32; 7] {
        [
            taps.ctle,
            taps.dc_offset,
            taps.fir_eq,
            taps.dfe,
            taps.glitch,
            taps.lpf,
            taps.fec,
        ]
    }

    fn assert_stable(model: &mut FilterChainModel, sample: u32, settled: u32) {
        for _ in 0..50 {
            assert_eq!(model.run_sample(sample, 1), settled, "sample {sample:#x}");
        }
    }

    #[test]
    fn width_8() {
        let mask = 0xff;
        let cases = [(0x80, 64), (0x7f, 210), (0x40, 210), (0x10, 17), (0xff, 1)];
        for (sample, expected) in cases {
            let mut model = model_with_width(8);
            let taps = model.settle_traced(sample);
            assert_eq!(taps.fec, expected, "sample {sample:#x}");
            assert_eq!(taps.ctle, sample);
            assert!(all_taps(&taps).iter().all(|&x| x <= mask));
            assert_stable(&mut model, sample, expected);
        }
        assert_eq!(model_with_width(8).run_sample(0, 30), 0);
    }

    #[test]
    fn width_8_sign_extension() {
        let mut model = model_with_width(8);
        let taps = model.settle_traced(0x80);
        assert_eq!(
            taps,
            StageOutputs {
                ctle: 128,
                dc_offset: 0,
                fir_eq: 0,
                dfe: 64,
                glitch: 64,
                lpf: 64,
                fec: 64,
            }
        );
        // only the low byte of the bus word is used
        let mut model = model_with_width(8);
        assert_eq!(model.settle(0xff80), 64);
    }

    #[test]
    fn width_16() {
        for (sample, expected) in [(0x40, 65490), (0x10, 17), (0xffff, 1)] {
            let mut model = model_with_width(16);
            let taps = model.settle_traced(sample);
            assert_eq!(taps.fec, expected, "sample {sample:#x}");
            assert_eq!(taps.ctle, sample);
            assert!(all_taps(&taps).iter().all(|&x| x <= 0xffff));
            assert_stable(&mut model, sample, expected);
        }
        assert_eq!(model_with_width(16).run_sample(0, 30), 0);
    }

    #[test]
    fn width_16_full_scale() {
        // full scale inputs need more than the default settle time at 16 bits
        for (sample, expected) in [(0x8000, 64), (0x7fff, 65490)] {
            let mut model = FilterChainModel::new(ChainConfig {
                sample_bits: 16,
                settle_cycles: 256,
                ..Default::default()
            });
            let taps = model.settle_traced(sample);
            assert_eq!(taps.ctle, sample);
            assert_eq!(taps.fec, expected, "sample {sample:#x}");
            assert!(all_taps(&taps).iter().all(|&x| x <= 0xffff));
            assert_stable(&mut model, sample, expected);
        }
    }
}
