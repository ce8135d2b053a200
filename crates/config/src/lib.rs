// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Maximum number of interrupt lines a CLIC can expose.
pub const CLIC_MAX_INTERRUPTS: usize = 4096;
/// Number of interrupt lines used when a config does not say otherwise.
pub const CLIC_DEFAULT_INTERRUPTS: usize = 64;
/// Widest supported priority field, in bits.
pub const CLIC_MAX_IPRIOLEN: u8 = 8;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_num_interrupts() -> usize {
    CLIC_DEFAULT_INTERRUPTS
}

fn default_num_harts() -> usize {
    1
}

fn default_ipriolen() -> u8 {
    CLIC_MAX_IPRIOLEN
}

/// How a hart's threshold input takes part in arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Threshold is carried to the hart port but never filters candidates.
    #[default]
    Ignore,
    /// Only lines with `priority > threshold` compete.
    PriorityAbove,
    /// Only lines with `priority < threshold` compete.
    PriorityBelow,
}

/// What the controller does with an asserted claim input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimPolicy {
    /// Claim is exposed on the hart port only; software clears pending bits.
    #[default]
    PassThrough,
    /// A claim clears the pending bit of the offered winner if it is edge triggered.
    ClearEdgePending,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClicConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Number of interrupt lines (N).
    #[serde(default = "default_num_interrupts")]
    pub num_interrupts: usize,
    /// Number of hart contexts (M).
    #[serde(default = "default_num_harts")]
    pub num_harts: usize,
    /// Implemented priority bits; higher bits of a priority write are dropped.
    #[serde(default = "default_ipriolen")]
    pub ipriolen: u8,
    #[serde(default)]
    pub threshold_policy: ThresholdPolicy,
    #[serde(default)]
    pub claim_policy: ClaimPolicy,
}

impl Default for ClicConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            num_interrupts: CLIC_DEFAULT_INTERRUPTS,
            num_harts: 1,
            ipriolen: CLIC_MAX_IPRIOLEN,
            threshold_policy: ThresholdPolicy::default(),
            claim_policy: ClaimPolicy::default(),
        }
    }
}

impl ClicConfig {
    pub fn new(num_interrupts: usize, num_harts: usize, ipriolen: u8) -> Self {
        Self {
            num_interrupts,
            num_harts,
            ipriolen,
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open CLIC config at {:?}", path.as_ref()))?;
        let config: Self = serde_yaml::from_reader(f).context("Failed to parse CLIC config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }
        if self.num_interrupts == 0 || self.num_interrupts > CLIC_MAX_INTERRUPTS {
            anyhow::bail!(
                "num_interrupts must be in 1..={}, got {}",
                CLIC_MAX_INTERRUPTS,
                self.num_interrupts
            );
        }
        if self.num_harts == 0 {
            anyhow::bail!("num_harts must be at least 1");
        }
        if self.ipriolen == 0 || self.ipriolen > CLIC_MAX_IPRIOLEN {
            anyhow::bail!(
                "ipriolen must be in 1..={}, got {}",
                CLIC_MAX_IPRIOLEN,
                self.ipriolen
            );
        }
        Ok(())
    }

    /// Mask selecting the implemented priority bits.
    pub fn priority_mask(&self) -> u8 {
        let bits = self.ipriolen.min(CLIC_MAX_IPRIOLEN);
        ((1u16 << bits) - 1) as u8
    }

    /// The all-ones priority value, i.e. the least urgent encodable level.
    pub fn max_priority(&self) -> u8 {
        self.priority_mask()
    }
}

/// Register values applied to one line, either before the run or inside a step.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LineSetup {
    pub line: usize,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub attributes: Option<u8>,
}

/// Per-hart inputs driven by the consuming core.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HartDrive {
    pub hart: usize,
    #[serde(default)]
    pub claim: Option<bool>,
    #[serde(default)]
    pub threshold: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WinnerExpectation {
    pub hart: usize,
    /// Expected winning line; absent means no line may be offered.
    #[serde(default)]
    pub line: Option<usize>,
    #[serde(default)]
    pub priority: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PendingExpectation {
    pub line: usize,
    pub value: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WinnerAssertion {
    pub winner: WinnerExpectation,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PendingAssertion {
    pub pending: PendingExpectation,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Expectation {
    Winner(WinnerAssertion),
    Pending(PendingAssertion),
}

fn default_ticks() -> u64 {
    1
}

/// One stimulus step. Register writes, pending changes, input levels and hart
/// drives are applied in that order, then the controller is ticked `ticks`
/// times and the expectations are checked.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StimulusStep {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default)]
    pub writes: Vec<LineSetup>,
    #[serde(default)]
    pub set_pending: Vec<usize>,
    #[serde(default)]
    pub clear_pending: Vec<usize>,
    #[serde(default)]
    pub inputs: BTreeMap<usize, bool>,
    #[serde(default)]
    pub harts: Vec<HartDrive>,
    #[serde(default)]
    pub expect: Vec<Expectation>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StimulusScript {
    pub schema_version: String,
    #[serde(default)]
    pub clic: ClicConfig,
    #[serde(default)]
    pub lines: Vec<LineSetup>,
    pub steps: Vec<StimulusStep>,
}

impl StimulusScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read stimulus script at {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let script: Self =
            serde_yaml::from_str(contents).context("Failed to parse stimulus script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }
        self.clic.validate().context("Invalid clic section")?;

        let n = self.clic.num_interrupts;
        let m = self.clic.num_harts;
        let check_line = |line: usize, what: &str| -> Result<()> {
            if line >= n {
                anyhow::bail!("{} references line {} but num_interrupts is {}", what, line, n);
            }
            Ok(())
        };
        let check_hart = |hart: usize, what: &str| -> Result<()> {
            if hart >= m {
                anyhow::bail!("{} references hart {} but num_harts is {}", what, hart, m);
            }
            Ok(())
        };

        for setup in &self.lines {
            check_line(setup.line, "lines")?;
        }

        if self.steps.is_empty() {
            tracing::warn!("Stimulus script has no steps");
        }

        for (i, step) in self.steps.iter().enumerate() {
            let what = format!("steps[{}]", i);
            for w in &step.writes {
                check_line(w.line, &what)?;
            }
            for &line in step.set_pending.iter().chain(step.clear_pending.iter()) {
                check_line(line, &what)?;
            }
            for &line in step.inputs.keys() {
                check_line(line, &what)?;
            }
            for drive in &step.harts {
                check_hart(drive.hart, &what)?;
            }
            for exp in &step.expect {
                match exp {
                    Expectation::Winner(WinnerAssertion { winner }) => {
                        check_hart(winner.hart, &what)?;
                        if let Some(line) = winner.line {
                            check_line(line, &what)?;
                        }
                    }
                    Expectation::Pending(PendingAssertion { pending }) => {
                        check_line(pending.line, &what)?
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_controller() {
        let cfg = ClicConfig::default();
        assert_eq!(cfg.num_interrupts, 64);
        assert_eq!(cfg.num_harts, 1);
        assert_eq!(cfg.ipriolen, 8);
        assert_eq!(cfg.max_priority(), 0xFF);
        assert_eq!(cfg.threshold_policy, ThresholdPolicy::Ignore);
        assert_eq!(cfg.claim_policy, ClaimPolicy::PassThrough);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_priority_mask_follows_ipriolen() {
        assert_eq!(ClicConfig::new(4, 1, 3).priority_mask(), 0b111);
        assert_eq!(ClicConfig::new(4, 1, 1).priority_mask(), 0b1);
        assert_eq!(ClicConfig::new(4, 1, 8).priority_mask(), 0xFF);
    }

    #[test]
    fn test_config_limits() {
        assert!(ClicConfig::new(0, 1, 8).validate().is_err());
        assert!(ClicConfig::new(CLIC_MAX_INTERRUPTS + 1, 1, 8)
            .validate()
            .is_err());
        assert!(ClicConfig::new(CLIC_MAX_INTERRUPTS, 1, 8).validate().is_ok());
        assert!(ClicConfig::new(4, 0, 8).validate().is_err());
        assert!(ClicConfig::new(4, 1, 0).validate().is_err());
        assert!(ClicConfig::new(4, 1, 9).validate().is_err());
    }

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
clic:
  num_interrupts: 4
  num_harts: 2
lines:
  - line: 2
    priority: 3
    enabled: true
    attributes: 1
steps:
  - inputs: { 2: true }
    expect:
      - winner: { hart: 0, line: 2, priority: 3 }
      - pending: { line: 2, value: true }
  - ticks: 3
    harts:
      - hart: 1
        threshold: 7
"#;
        let script = StimulusScript::from_yaml(yaml).unwrap();
        assert_eq!(script.clic.num_interrupts, 4);
        assert_eq!(script.steps.len(), 2);
        assert_eq!(script.steps[0].ticks, 1);
        assert_eq!(script.steps[0].inputs.get(&2), Some(&true));
        assert_eq!(script.steps[1].ticks, 3);
        assert_eq!(script.steps[1].harts[0].threshold, Some(7));
        assert_eq!(
            script.steps[0].expect[0],
            Expectation::Winner(WinnerAssertion {
                winner: WinnerExpectation {
                    hart: 0,
                    line: Some(2),
                    priority: Some(3),
                }
            })
        );
    }

    #[test]
    fn test_script_rejects_out_of_range_line() {
        let yaml = r#"
schema_version: "1.0"
clic:
  num_interrupts: 4
steps:
  - inputs: { 4: true }
"#;
        let err = StimulusScript::from_yaml(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("line 4"));
    }

    #[test]
    fn test_script_rejects_out_of_range_hart() {
        let yaml = r#"
schema_version: "1.0"
steps:
  - expect:
      - winner: { hart: 1 }
"#;
        let err = StimulusScript::from_yaml(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("hart 1"));
    }

    #[test]
    fn test_script_rejects_unknown_schema() {
        let yaml = r#"
schema_version: "2.0"
steps: []
"#;
        assert!(StimulusScript::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_script_rejects_unknown_fields() {
        let yaml = r#"
schema_version: "1.0"
steps:
  - tick: 1
"#;
        assert!(StimulusScript::from_yaml(yaml).is_err());
    }
}
