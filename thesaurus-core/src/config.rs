//! Configuration types
//!
//! One immutable configuration value, validated eagerly. It can be built in
//! code, parsed from TOML, or read from `THESAURUS_*` environment variables.

use crate::{ConfigError, ThesaurusResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Visibility policy for unverified (AI-sourced) members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Only `active` members are visible.
    Strict,
    /// `active` and `ai_pending` members are visible; pending ones are
    /// flagged unverified.
    Pragmatic,
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyMode::Strict => f.write_str("strict"),
            PolicyMode::Pragmatic => f.write_str("pragmatic"),
        }
    }
}

impl FromStr for PolicyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(PolicyMode::Strict),
            "pragmatic" => Ok(PolicyMode::Pragmatic),
            other => Err(ConfigError::InvalidValue {
                field: "policy".to_string(),
                value: other.to_string(),
                reason: "policy must be 'strict' or 'pragmatic'".to_string(),
            }),
        }
    }
}

/// Governance settings handed to the policy filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    pub policy: PolicyMode,
    /// Members below this weight are never visible.
    pub min_weight: f32,
    /// Members at or above this weight are tagged preferred.
    pub preferred_threshold: f32,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            policy: PolicyMode::Strict,
            min_weight: 0.0,
            preferred_threshold: 0.8,
        }
    }
}

/// Master configuration for the synonym cache and enrichment orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThesaurusConfig {
    // Governance
    pub policy: PolicyMode,
    pub min_weight: f32,
    pub preferred_threshold: f32,

    // Enrichment
    /// Visible synonyms wanted before enrichment is skipped.
    pub min_synonyms: usize,
    /// Bound on a single suggestion call, in seconds.
    #[serde(alias = "gpt4_timeout")]
    pub suggestion_timeout_secs: u64,

    // Cache
    #[serde(alias = "cache_ttl")]
    pub cache_ttl_secs: u64,
    pub cache_max_size: usize,

    // Health
    pub hit_rate_warning_threshold: f64,
    /// Lookups required before the hit-rate warning can fire.
    pub health_min_lookups: u64,
    /// Occupancy (as a fraction of `cache_max_size`) counted as saturated.
    pub saturation_ratio: f64,
    /// Consecutive saturated health checks that signal thrashing.
    pub saturation_checks: u32,
}

impl Default for ThesaurusConfig {
    fn default() -> Self {
        Self {
            policy: PolicyMode::Strict,
            min_weight: 0.0,
            preferred_threshold: 0.8,
            min_synonyms: 5,
            suggestion_timeout_secs: 30,
            cache_ttl_secs: 3600,
            cache_max_size: 1000,
            hit_rate_warning_threshold: 0.5,
            health_min_lookups: 20,
            saturation_ratio: 0.95,
            saturation_checks: 3,
        }
    }
}

impl ThesaurusConfig {
    /// Default configuration with the given policy.
    pub fn with_policy(policy: PolicyMode) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn suggestion_timeout(&self) -> Duration {
        Duration::from_secs(self.suggestion_timeout_secs)
    }

    pub fn governance(&self) -> GovernanceConfig {
        GovernanceConfig {
            policy: self.policy,
            min_weight: self.min_weight,
            preferred_threshold: self.preferred_threshold,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> ThesaurusResult<Self> {
        let config: ThesaurusConfig = toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Create configuration from environment variables.
    ///
    /// Environment variables (all optional, defaults as in [`Default`]):
    /// - `THESAURUS_POLICY`: "strict" or "pragmatic"
    /// - `THESAURUS_MIN_SYNONYMS`
    /// - `THESAURUS_SUGGESTION_TIMEOUT`: seconds
    /// - `THESAURUS_CACHE_TTL`: seconds
    /// - `THESAURUS_CACHE_MAX_SIZE`
    /// - `THESAURUS_MIN_WEIGHT`
    /// - `THESAURUS_PREFERRED_THRESHOLD`
    /// - `THESAURUS_HIT_RATE_WARNING`
    /// - `THESAURUS_HEALTH_MIN_LOOKUPS`
    /// - `THESAURUS_SATURATION_RATIO`
    /// - `THESAURUS_SATURATION_CHECKS`
    ///
    /// A variable that is set but unparsable is an error, not a silent default.
    pub fn from_env() -> ThesaurusResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> ThesaurusResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(policy) = lookup("THESAURUS_POLICY") {
            config.policy = policy.parse()?;
        }
        override_from(&lookup, "THESAURUS_MIN_SYNONYMS", &mut config.min_synonyms)?;
        override_from(
            &lookup,
            "THESAURUS_SUGGESTION_TIMEOUT",
            &mut config.suggestion_timeout_secs,
        )?;
        override_from(&lookup, "THESAURUS_CACHE_TTL", &mut config.cache_ttl_secs)?;
        override_from(&lookup, "THESAURUS_CACHE_MAX_SIZE", &mut config.cache_max_size)?;
        override_from(&lookup, "THESAURUS_MIN_WEIGHT", &mut config.min_weight)?;
        override_from(
            &lookup,
            "THESAURUS_PREFERRED_THRESHOLD",
            &mut config.preferred_threshold,
        )?;
        override_from(
            &lookup,
            "THESAURUS_HIT_RATE_WARNING",
            &mut config.hit_rate_warning_threshold,
        )?;
        override_from(
            &lookup,
            "THESAURUS_HEALTH_MIN_LOOKUPS",
            &mut config.health_min_lookups,
        )?;
        override_from(
            &lookup,
            "THESAURUS_SATURATION_RATIO",
            &mut config.saturation_ratio,
        )?;
        override_from(
            &lookup,
            "THESAURUS_SATURATION_CHECKS",
            &mut config.saturation_checks,
        )?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - TTL, timeout, cache size, and min_synonyms are positive
    /// - min_weight, preferred_threshold, hit_rate_warning_threshold in [0.0, 1.0]
    /// - saturation_ratio in (0.0, 1.0], saturation_checks >= 1
    pub fn validate(&self) -> ThesaurusResult<()> {
        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", self.cache_ttl_secs, "must be positive"));
        }
        if self.suggestion_timeout_secs == 0 {
            return Err(invalid(
                "suggestion_timeout_secs",
                self.suggestion_timeout_secs,
                "must be positive",
            ));
        }
        if self.cache_max_size == 0 {
            return Err(invalid("cache_max_size", self.cache_max_size, "must be positive"));
        }
        if self.min_synonyms == 0 {
            return Err(invalid("min_synonyms", self.min_synonyms, "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_weight) {
            return Err(invalid("min_weight", self.min_weight, "must be between 0.0 and 1.0"));
        }
        if !(0.0..=1.0).contains(&self.preferred_threshold) {
            return Err(invalid(
                "preferred_threshold",
                self.preferred_threshold,
                "must be between 0.0 and 1.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.hit_rate_warning_threshold) {
            return Err(invalid(
                "hit_rate_warning_threshold",
                self.hit_rate_warning_threshold,
                "must be between 0.0 and 1.0",
            ));
        }
        if !(self.saturation_ratio > 0.0 && self.saturation_ratio <= 1.0) {
            return Err(invalid(
                "saturation_ratio",
                self.saturation_ratio,
                "must be greater than 0.0 and at most 1.0",
            ));
        }
        if self.saturation_checks == 0 {
            return Err(invalid(
                "saturation_checks",
                self.saturation_checks,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl fmt::Display, reason: &str) -> crate::ThesaurusError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn override_from<F, T>(lookup: &F, key: &str, target: &mut T) -> ThesaurusResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: key.to_string(),
            value: raw.clone(),
            reason: "could not be parsed".to_string(),
        })?;
    }
    Ok(())
}
