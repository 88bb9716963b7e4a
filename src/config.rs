//! Configuration for the derivation core.
//!
//! Mirrors the teacher crate's `figment`-layered `Config` (`config.toml` +
//! `CHASE_`-prefixed environment variables), trimmed to the handful of
//! tunables the derivation core itself owns (spec.md §9 "Open question"s and
//! the `GBGraph` constructor flags in `examples/original_source/include/glog/gbgraph.h`).
//! The engine is a library — most hosts will just use [`ChaseConfig::default`]
//! and never touch a file.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Runtime tunables for [`crate::graph::GbGraph`] and the rule executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChaseConfig {
    /// Values at or above this threshold are reserved fresh nulls minted by
    /// existential rules (spec.md §3: `RULE_SHIFT(1)`).
    pub null_threshold: u64,

    /// Enable the per-predicate merged retain cache (spec.md §4.4.2). When
    /// disabled, `retain` always does the uncached node-by-node antijoin.
    #[serde(default = "default_true")]
    pub cache_retain_enabled: bool,

    /// When set, `retain` is skipped entirely (bag semantics instead of set
    /// semantics) — `duplAllowed` in the original `GBGraph` constructor.
    #[serde(default)]
    pub duplicates_allowed: bool,

    /// Cap on staged contributions accepted by `addNodeToBeRetained` for one
    /// predicate within one step (spec.md §4.4.5).
    #[serde(default = "default_staged_cap")]
    pub max_staged_contributions: u64,
}

fn default_true() -> bool {
    true
}

fn default_staged_cap() -> u64 {
    1 << 24
}

impl Default for ChaseConfig {
    fn default() -> Self {
        ChaseConfig {
            null_threshold: 1 << 40,
            cache_retain_enabled: true,
            duplicates_allowed: false,
            max_staged_contributions: default_staged_cap(),
        }
    }
}

impl ChaseConfig {
    /// Load configuration layered as `defaults -> config.toml -> CHASE_* env vars`.
    ///
    /// Never fails on a missing `config.toml`; a host that wants a pure
    /// in-memory config can just use [`Self::default`] instead.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(
            ChaseConfig::default(),
        ))
        .merge(Toml::file("config.toml"))
        .merge(Env::prefixed("CHASE_"))
        .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ChaseConfig::default();
        assert!(cfg.cache_retain_enabled);
        assert!(!cfg.duplicates_allowed);
        assert_eq!(cfg.max_staged_contributions, 1 << 24);
    }

    #[test]
    fn load_without_file_falls_back_to_defaults() {
        let cfg = ChaseConfig::load().expect("defaults-only load must succeed");
        assert_eq!(cfg, ChaseConfig::default());
    }
}
