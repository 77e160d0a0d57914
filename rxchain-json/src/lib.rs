//! rxchain-json contains the JSON schemas used by rxchain-bench for its
//! configuration enums and for the reports of a bench run.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// Bench report JSON schema.
///
/// This is the document written by `rxchain-bench --report`. It contains the
/// results of every test run in a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    /// Tool name and version.
    pub tool: String,
    /// Git version of the tool.
    pub git_version: String,
    /// Session start time, in RFC 3339 format (UTC).
    pub datetime: String,
    /// Description of the link used to reach the SoC.
    pub link: String,
    /// Golden model settings.
    pub chain: ChainSettings,
    /// Results of each test, in the order in which they were run.
    pub tests: Vec<TestResult>,
    /// Pass/fail count.
    pub summary: Summary,
}

/// Golden model settings JSON schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChainSettings {
    /// Sample width in bits.
    pub sample_bits: u32,
    /// Ticks for which each sample is held.
    pub settle_cycles: usize,
    /// DFE slicer.
    pub dfe_slicer: String,
}

/// Pass/fail count of a bench session.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Summary {
    /// Number of checks that passed.
    pub passed: u32,
    /// Number of checks that failed.
    pub failed: u32,
}

impl Summary {
    /// Adds the outcome of one check.
    pub fn record(&mut self, pass: bool) {
        if pass {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Returns `true` if no check failed.
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Result of a test.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum TestResult {
    /// RAM read-back test.
    Ram(RamTest),
    /// Filter chain test.
    Filter(FilterTest),
    /// AES round-trip test.
    Aes(AesTest),
    /// Power analysis traffic run.
    Power(PowerTest),
    /// Golden model run (no hardware access).
    Golden(GoldenRun),
}

/// RAM test JSON schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RamTest {
    /// One entry per RAM bank.
    pub banks: Vec<RamBankCheck>,
}

/// Write and read-back check on a RAM bank.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RamBankCheck {
    /// Bank name.
    pub bank: String,
    /// Bus address.
    pub address: u32,
    /// Written word.
    pub written: u32,
    /// Read-back word, or `None` if the transport failed.
    pub read: Option<u32>,
    /// Whether the check passed.
    pub pass: bool,
}

/// Filter chain test JSON schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FilterTest {
    /// Acceptance policy used to judge the samples.
    pub policy: AcceptPolicy,
    /// Results for each sample.
    pub samples: Vec<FilterSample>,
}

/// Result for one sample of the filter chain test.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FilterSample {
    /// Input sample, masked to the sample width.
    pub input: u32,
    /// Golden model prediction of the chain output.
    pub golden: u32,
    /// Golden model prediction of the stage debug taps.
    pub golden_taps: StageTaps,
    /// Chain output read from the hardware, or `None` if the read failed.
    pub observed: Option<u32>,
    /// Stage debug taps read from the hardware.
    pub observed_taps: StageTaps,
    /// Outcome.
    pub verdict: Verdict,
}

/// Stage debug taps.
///
/// Each value is `None` if it could not be read.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct StageTaps {
    /// CTLE output.
    pub ctle: Option<u32>,
    /// DC-offset tracker output.
    pub dc_offset: Option<u32>,
    /// FIR equalizer output.
    pub fir_eq: Option<u32>,
    /// DFE output.
    pub dfe: Option<u32>,
    /// Glitch filter output.
    pub glitch: Option<u32>,
    /// LPF output.
    pub lpf: Option<u32>,
}

/// AES round-trip test JSON schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AesTest {
    /// Key words.
    pub key: [u32; 4],
    /// Plaintext words.
    pub plaintext: [u32; 4],
    /// Ciphertext read after the first run, if it could be read.
    pub ciphertext: Option<[u32; 4]>,
    /// Result of running the cipher again on the ciphertext, if it could be
    /// read.
    pub decrypted: Option<[u32; 4]>,
    /// Whether the round trip returned the plaintext.
    pub pass: bool,
}

/// Power analysis run JSON schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PowerTest {
    /// Duration of each traffic loop in seconds.
    pub duration: f64,
    /// Traffic loop iterations with clock gating disabled.
    pub gating_off_operations: u64,
    /// Traffic loop iterations with clock gating enabled.
    pub gating_on_operations: u64,
    /// Bus transactions that failed during both loops.
    pub transport_errors: u64,
}

/// Golden model run JSON schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GoldenRun {
    /// Input samples.
    pub samples: Vec<u32>,
    /// Settled output for each sample.
    pub outputs: Vec<u32>,
}

/// Acceptance policy for the filter chain test.
///
/// The policy decides whether a value read from the chain output passes.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AcceptPolicy {
    /// Any value that could be read passes.
    ReadOnly,
    /// The value must differ from the input (no bypass) and from zero (no
    /// stuck output).
    #[default]
    Connectivity,
    /// The value must equal the golden model prediction.
    Golden,
}

/// Outcome of a filter chain sample.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The sample passed.
    Pass,
    /// The chain output could not be read.
    ReadError,
    /// The chain output equals its input.
    Bypass,
    /// The chain output is zero.
    StuckZero,
    /// The chain output differs from the golden model.
    GoldenMismatch,
}

impl Verdict {
    /// Returns `true` for [`Verdict::Pass`].
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }
}

macro_rules! impl_str_conv {
    ($ty:ty, $($s:expr => $v:ident),*) => {
        impl std::str::FromStr for $ty {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, ()> {
                Ok(match s {
                    $(
                        $s => <$ty>::$v,
                    )*
                        _ => return Err(()),
                })
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
                write!(f, "{}", match self {
                    $(
                        <$ty>::$v => $s,
                    )*
                })
            }
        }
    }
}

impl_str_conv!(AcceptPolicy,
               "read_only" => ReadOnly,
               "connectivity" => Connectivity,
               "golden" => Golden);

impl_str_conv!(Verdict,
               "pass" => Pass,
               "read_error" => ReadError,
               "bypass" => Bypass,
               "stuck_zero" => StuckZero,
               "golden_mismatch" => GoldenMismatch);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn policy_str_conv_matches_serde() {
        for policy in [
            AcceptPolicy::ReadOnly,
            AcceptPolicy::Connectivity,
            AcceptPolicy::Golden,
        ] {
            let json = serde_json::to_string(&policy).unwrap();
            assert_eq!(json, format!("\"{policy}\""));
            assert_eq!(policy.to_string().parse::<AcceptPolicy>(), Ok(policy));
        }
        assert!("strict".parse::<AcceptPolicy>().is_err());
    }

    #[test]
    fn test_result_is_tagged() {
        let result = TestResult::Golden(GoldenRun {
            samples: vec![0x100],
            outputs: vec![4050],
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["test"], "golden");
        assert_eq!(json["outputs"][0], 4050);
        let back: TestResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn summary_counts() {
        let mut summary = Summary::default();
        summary.record(true);
        summary.record(false);
        summary.record(true);
        assert_eq!(
            summary,
            Summary {
                passed: 2,
                failed: 1
            }
        );
        assert!(!summary.all_passed());
    }
}
