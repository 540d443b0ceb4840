//! Engine configuration (§6, §12).
//!
//! One flat struct carrying every tunable the tree needs at construction
//! time, with JSON (de)serialization and file I/O as inherent methods:
//! unlike a tree snapshot, a malformed or semantically invalid config file
//! (e.g. `enveloppe_size: 0`) must be rejected before it ever reaches the
//! tree, so loading always runs through `validate()`.

use crate::error::Result;
use crate::judge::JudgeRule;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum `c = min(g.compat(d), e.compat(d))` to count a representative
    /// as matable, in semi-continuous mode.
    pub compatibility_threshold: f64,

    /// Minimum mean compatibility to count as a match, in continuous mode.
    pub avg_compatibility_threshold: f64,

    /// Fraction of representatives required to match in semi-continuous mode.
    pub similarity_threshold: f64,

    /// Capacity of each species' representative set (K).
    pub enveloppe_size: usize,

    /// Create a new species when no existing one matches. `false` is
    /// reserved for a future policy and is rejected by [`Config::validate`].
    pub simple_new_species: bool,

    /// Accept cross-species births (hybrids). `false` makes a hybrid birth
    /// a `PreconditionViolation` instead.
    pub ignore_hybrids: bool,

    /// Select the continuous species-matching score instead of the
    /// semi-continuous one (§4.3).
    pub full_continuous: bool,

    pub judge_rule: JudgeRule,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compatibility_threshold: 0.1,
            avg_compatibility_threshold: 0.1,
            similarity_threshold: 0.5,
            enveloppe_size: 5,
            simple_new_species: true,
            ignore_hybrids: true,
            full_continuous: false,
            judge_rule: JudgeRule::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.enveloppe_size == 0 {
            return Err(crate::error::PhyloError::ConfigurationGap(
                "enveloppe_size must be at least 1".into(),
            ));
        }
        if !self.simple_new_species {
            return Err(crate::error::PhyloError::ConfigurationGap(
                "simple_new_species=false has no implemented policy yet".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(crate::error::PhyloError::ConfigurationGap(
                "similarity_threshold must lie in [0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Serializes to a pretty-printed JSON string (§12).
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes [`Self::to_json_string`]'s output to `path`.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// Parses a `Config` from a JSON string and validates it, so a caller
    /// never has to remember to call `validate()` themselves after a load.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` and parses it via [`Self::from_json_str`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}
