//! Error types for THESAURUS operations

use thiserror::Error;
use uuid::Uuid;

/// Synonym registry errors.
///
/// These are hard failures for the call that hit them; the orchestrator
/// never retries them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Registry unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Synonym group not found: {group_id}")]
    GroupNotFound { group_id: Uuid },

    #[error("Synonym member not found: {member_id}")]
    MemberNotFound { member_id: Uuid },

    #[error("Registry lock poisoned")]
    LockPoisoned,
}

/// Suggestion service errors.
///
/// The orchestrator recovers from all of these locally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("No suggestion service configured")]
    ProviderNotConfigured,

    #[error("Suggestion call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Suggestion request to {provider} failed: {reason}")]
    Failure { provider: String, reason: String },
}

/// Input validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Term must not be empty")]
    EmptyTerm,

    #[error("Term is {length} characters long, maximum is {max}")]
    TermTooLong { length: usize, max: usize },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Master error type for all THESAURUS errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ThesaurusError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ThesaurusError {
    /// Whether the error came from the registry (the caller's lookup failed).
    pub fn is_registry(&self) -> bool {
        matches!(self, ThesaurusError::Registry(_))
    }

    /// Whether the error is a rejected input.
    pub fn is_validation(&self) -> bool {
        matches!(self, ThesaurusError::Validation(_))
    }
}

/// Result type alias for THESAURUS operations.
pub type ThesaurusResult<T> = Result<T, ThesaurusError>;

// =============================================================================
// TESTS
// =============================================================================
