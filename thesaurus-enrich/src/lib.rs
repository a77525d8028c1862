//! THESAURUS Enrich - Synonym Lookup Orchestration
//!
//! The consumer-facing layer: governance-filtered lookups served from a
//! bounded cache, best-effort AI enrichment with a bounded wait, explicit
//! invalidation, and health diagnostics.
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(
//!     ThesaurusConfig::from_env()?,
//!     Arc::new(InMemoryRegistry::new()),
//!     Arc::new(DisabledSuggestionService),
//! )?;
//! let synonyms = orchestrator.get_synonyms_for_lookup("voorlopige hechtenis", 5)?;
//! ```

pub mod governance;
pub mod health;
pub mod orchestrator;
pub mod telemetry;

pub use governance::{rank_synonyms, GovernancePolicy, VisibleSynonym};
pub use health::HealthReport;
pub use orchestrator::{EnrichmentAttempt, EnsureOutcome, Orchestrator, SynonymList};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};

pub use thesaurus_core::{
    HealthStatus, PolicyMode, ThesaurusConfig, ThesaurusError, ThesaurusResult,
};
pub use thesaurus_llm::{
    DisabledSuggestionService, StaticSuggestionService, SuggestedSynonym, SuggestionContext,
    SuggestionService,
};
pub use thesaurus_storage::{CacheStats, InMemoryRegistry, RegistryStats, SynonymRegistry};
