//! THESAURUS Core - Entity Types
//!
//! Pure data structures shared by every other crate: synonym groups and
//! members, term normalization, errors, configuration, and the clock
//! abstraction used for cache expiry.

pub mod clock;
pub mod config;
pub mod error;
pub mod health;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GovernanceConfig, PolicyMode, ThesaurusConfig};
pub use error::{
    ConfigError, EnrichmentError, RegistryError, ThesaurusError, ThesaurusResult,
    ValidationError,
};
pub use health::HealthStatus;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Identifier of a synonym group (UUIDv7, timestamp-sortable).
pub type GroupId = Uuid;

/// Identifier of a single group member (UUIDv7, timestamp-sortable).
pub type MemberId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 identifier.
pub fn new_entity_id() -> Uuid {
    Uuid::now_v7()
}

// ============================================================================
// TERM HANDLING
// ============================================================================

/// Longest lookup term accepted, in characters after trimming.
pub const MAX_TERM_LENGTH: usize = 200;

/// Confidence assigned to AI suggestions that arrive without one.
pub const DEFAULT_SUGGESTION_CONFIDENCE: f32 = 0.7;

/// Normalize a term for comparison and cache keys: trim, then lowercase.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Validate a lookup term and return its normalized form.
///
/// Rejects empty (or whitespace-only) terms and terms longer than
/// [`MAX_TERM_LENGTH`] characters. No I/O happens before this check.
pub fn validate_term(term: &str) -> ThesaurusResult<String> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTerm.into());
    }
    let length = trimmed.chars().count();
    if length > MAX_TERM_LENGTH {
        return Err(ValidationError::TermTooLong {
            length,
            max: MAX_TERM_LENGTH,
        }
        .into());
    }
    Ok(trimmed.to_lowercase())
}

// ============================================================================
// ENUMS
// ============================================================================

/// Governance status of a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Verified, visible under every policy.
    Active,
    /// Suggested by the AI service and awaiting human review.
    AiPending,
    /// Retired; never visible.
    Deprecated,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::AiPending => "ai_pending",
            MemberStatus::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(MemberStatus::Active),
            "ai_pending" => Ok(MemberStatus::AiPending),
            "deprecated" => Ok(MemberStatus::Deprecated),
            other => Err(ValidationError::InvalidValue {
                field: "status".to_string(),
                reason: format!("unknown member status '{}'", other),
            }),
        }
    }
}

/// Where a group member came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberSource {
    Manual,
    Imported,
    AiGenerated,
}

impl MemberSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberSource::Manual => "manual",
            MemberSource::Imported => "imported",
            MemberSource::AiGenerated => "ai_generated",
        }
    }
}

impl fmt::Display for MemberSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(MemberSource::Manual),
            "imported" => Ok(MemberSource::Imported),
            "ai_generated" => Ok(MemberSource::AiGenerated),
            other => Err(ValidationError::InvalidValue {
                field: "source".to_string(),
                reason: format!("unknown member source '{}'", other),
            }),
        }
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

/// A single term within a synonym group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymMember {
    pub member_id: MemberId,
    /// Back-reference to the owning group.
    pub group_id: GroupId,
    pub term: String,
    /// Confidence in [0.0, 1.0].
    pub weight: f32,
    pub status: MemberStatus,
    pub source: MemberSource,
    pub created_at: Timestamp,
}

impl SynonymMember {
    /// Normalized form of this member's term.
    pub fn normalized_term(&self) -> String {
        normalize_term(&self.term)
    }
}

/// Cluster of interchangeable terms for one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymGroup {
    pub group_id: GroupId,
    pub canonical_term: String,
    pub members: Vec<SynonymMember>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SynonymGroup {
    /// Create an empty group around a canonical term.
    pub fn new(canonical_term: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            group_id: new_entity_id(),
            canonical_term: canonical_term.into().trim().to_string(),
            members: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the canonical term or any member matches `normalized`.
    ///
    /// `normalized` must already be the output of [`normalize_term`].
    pub fn matches(&self, normalized: &str) -> bool {
        normalize_term(&self.canonical_term) == normalized
            || self.members.iter().any(|m| m.normalized_term() == normalized)
    }

    /// Find a member by normalized term.
    pub fn member_by_term(&self, normalized: &str) -> Option<&SynonymMember> {
        self.members.iter().find(|m| m.normalized_term() == normalized)
    }

    /// Normalized canonical term plus every normalized member term.
    pub fn normalized_terms(&self) -> Vec<String> {
        let mut terms = Vec::with_capacity(self.members.len() + 1);
        terms.push(normalize_term(&self.canonical_term));
        for member in &self.members {
            let term = member.normalized_term();
            if !terms.contains(&term) {
                terms.push(term);
            }
        }
        terms
    }
}

/// Write payload for adding a member to a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMember {
    pub term: String,
    pub weight: f32,
    pub status: MemberStatus,
    pub source: MemberSource,
}

impl NewMember {
    /// A curated, verified member.
    pub fn manual(term: impl Into<String>, weight: f32) -> Self {
        Self {
            term: term.into(),
            weight,
            status: MemberStatus::Active,
            source: MemberSource::Manual,
        }
    }

    /// An AI suggestion awaiting review. Always `ai_pending`.
    pub fn ai_suggestion(term: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            term: term.into(),
            weight: confidence
                .unwrap_or(DEFAULT_SUGGESTION_CONFIDENCE)
                .clamp(0.0, 1.0),
            status: MemberStatus::AiPending,
            source: MemberSource::AiGenerated,
        }
    }

    pub fn with_status(mut self, status: MemberStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_source(mut self, source: MemberSource) -> Self {
        self.source = source;
        self
    }
}

/// Result of an idempotent member insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberInsert {
    pub member_id: MemberId,
    /// False when the (group, normalized term) pair already existed.
    pub created: bool,
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
