//! THESAURUS LLM - Suggestion Service Abstraction
//!
//! Provider-agnostic interface for AI synonym suggestion.
//! This crate defines the trait a suggestion backend must implement, the
//! timeout-bounded call used by enrichment, and lock-free call metrics.
//! Concrete model clients are user-supplied.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thesaurus_core::{
    normalize_term, EnrichmentError, ThesaurusError, ThesaurusResult,
    DEFAULT_SUGGESTION_CONFIDENCE,
};

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

/// Extra information handed to the suggestion backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionContext {
    /// Working definition of the term, if one exists yet.
    pub definition: Option<String>,
    /// Subject domain, e.g. "strafrecht".
    pub domain: Option<String>,
}

impl SuggestionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// One candidate synonym returned by a suggestion backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedSynonym {
    pub term: String,
    /// Confidence score (0.0 to 1.0), if the backend reports one.
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl SuggestedSynonym {
    pub fn new(term: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            term: term.into(),
            confidence,
        }
    }

    /// Confidence clamped to [0,1], or the default when absent or NaN.
    pub fn effective_confidence(&self) -> f32 {
        match self.confidence {
            Some(c) if !c.is_nan() => c.clamp(0.0, 1.0),
            _ => DEFAULT_SUGGESTION_CONFIDENCE,
        }
    }
}

// ============================================================================
// SUGGESTION SERVICE TRAIT
// ============================================================================

/// Trait for AI synonym suggestion backends.
/// Implementations must be thread-safe (Send + Sync).
///
/// # Example
/// ```ignore
/// struct ChatSuggester { /* ... */ }
///
/// #[async_trait]
/// impl SuggestionService for ChatSuggester {
///     async fn suggest(&self, term: &str, context: &SuggestionContext)
///         -> ThesaurusResult<Vec<SuggestedSynonym>> {
///         // Call the model
///     }
///     fn provider_name(&self) -> &str { "chat" }
/// }
/// ```
#[async_trait]
pub trait SuggestionService: Send + Sync {
    /// Produce candidate synonyms for `term`.
    ///
    /// # Returns
    /// * `Ok(Vec<SuggestedSynonym>)` - Candidates, possibly empty
    /// * `Err(ThesaurusError::Enrichment)` - If the backend fails
    async fn suggest(
        &self,
        term: &str,
        context: &SuggestionContext,
    ) -> ThesaurusResult<Vec<SuggestedSynonym>>;

    /// Name used in logs and error messages.
    fn provider_name(&self) -> &str;
}

/// Call `service` and give up after `timeout`.
///
/// Every failure is folded into an [`EnrichmentError`]: the suggestion call
/// is best-effort and its callers never propagate it. Dropping the future on
/// timeout abandons the request.
pub async fn suggest_with_timeout(
    service: &dyn SuggestionService,
    term: &str,
    context: &SuggestionContext,
    timeout: Duration,
) -> Result<Vec<SuggestedSynonym>, EnrichmentError> {
    match tokio::time::timeout(timeout, service.suggest(term, context)).await {
        Ok(Ok(candidates)) => Ok(candidates),
        Ok(Err(ThesaurusError::Enrichment(e))) => Err(e),
        Ok(Err(other)) => Err(EnrichmentError::Failure {
            provider: service.provider_name().to_string(),
            reason: other.to_string(),
        }),
        Err(_) => Err(EnrichmentError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

// ============================================================================
// BUILT-IN SERVICES
// ============================================================================

/// Service used when no backend is configured. Every call fails with
/// `ProviderNotConfigured`, so enrichment degrades to a plain lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSuggestionService;

#[async_trait]
impl SuggestionService for DisabledSuggestionService {
    async fn suggest(
        &self,
        _term: &str,
        _context: &SuggestionContext,
    ) -> ThesaurusResult<Vec<SuggestedSynonym>> {
        Err(EnrichmentError::ProviderNotConfigured.into())
    }

    fn provider_name(&self) -> &str {
        "disabled"
    }
}

/// Canned suggestions keyed by normalized term.
///
/// Useful for demos and offline runs. Unknown terms yield no candidates.
#[derive(Debug, Clone, Default)]
pub struct StaticSuggestionService {
    suggestions: HashMap<String, Vec<SuggestedSynonym>>,
}

impl StaticSuggestionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the candidates returned for `term`.
    pub fn with_suggestions(
        mut self,
        term: &str,
        candidates: impl IntoIterator<Item = SuggestedSynonym>,
    ) -> Self {
        self.suggestions
            .insert(normalize_term(term), candidates.into_iter().collect());
        self
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }
}

impl From<HashMap<String, Vec<SuggestedSynonym>>> for StaticSuggestionService {
    fn from(raw: HashMap<String, Vec<SuggestedSynonym>>) -> Self {
        raw.into_iter()
            .fold(Self::new(), |svc, (term, candidates)| {
                svc.with_suggestions(&term, candidates)
            })
    }
}

#[async_trait]
impl SuggestionService for StaticSuggestionService {
    async fn suggest(
        &self,
        term: &str,
        _context: &SuggestionContext,
    ) -> ThesaurusResult<Vec<SuggestedSynonym>> {
        Ok(self
            .suggestions
            .get(&normalize_term(term))
            .cloned()
            .unwrap_or_default())
    }

    fn provider_name(&self) -> &str {
        "static"
    }
}

// ============================================================================
// SUGGESTION METRICS
// ============================================================================

/// Counts suggestion calls and their outcomes.
/// Thread-safe via atomic operations.
#[derive(Default)]
pub struct SuggestionMetrics {
    calls: AtomicU64,
    successes: AtomicU64,
    timeouts: AtomicU64,
    failures: AtomicU64,
    candidates_received: AtomicU64,
    members_added: AtomicU64,
}

/// Point-in-time copy of [`SuggestionMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionMetricsSnapshot {
    pub calls: u64,
    pub successes: u64,
    pub timeouts: u64,
    pub failures: u64,
    pub candidates_received: u64,
    pub members_added: u64,
}

impl SuggestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed call and how many candidates it returned.
    pub fn record_success(&self, candidates: usize) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.candidates_received
            .fetch_add(candidates as u64, Ordering::Relaxed);
    }

    /// Record members actually created from suggestions.
    pub fn record_members_added(&self, added: usize) {
        self.members_added.fetch_add(added as u64, Ordering::Relaxed);
    }

    /// Record a failed call, classifying timeouts separately.
    pub fn record_error(&self, error: &EnrichmentError) {
        match error {
            EnrichmentError::Timeout { .. } => self.timeouts.fetch_add(1, Ordering::Relaxed),
            _ => self.failures.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn snapshot(&self) -> SuggestionMetricsSnapshot {
        SuggestionMetricsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            candidates_received: self.candidates_received.load(Ordering::Relaxed),
            members_added: self.members_added.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.calls,
            &self.successes,
            &self.timeouts,
            &self.failures,
            &self.candidates_received,
            &self.members_added,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for SuggestionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("SuggestionMetrics")
            .field("calls", &snapshot.calls)
            .field("successes", &snapshot.successes)
            .field("timeouts", &snapshot.timeouts)
            .field("failures", &snapshot.failures)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowService {
        delay: Duration,
    }

    #[async_trait]
    impl SuggestionService for SlowService {
        async fn suggest(
            &self,
            term: &str,
            _context: &SuggestionContext,
        ) -> ThesaurusResult<Vec<SuggestedSynonym>> {
            tokio::time::sleep(self.delay).await;
            Ok(vec![SuggestedSynonym::new(format!("{term} (slow)"), None)])
        }

        fn provider_name(&self) -> &str {
            "slow"
        }
    }

    struct RegistryFailingService;

    #[async_trait]
    impl SuggestionService for RegistryFailingService {
        async fn suggest(
            &self,
            _term: &str,
            _context: &SuggestionContext,
        ) -> ThesaurusResult<Vec<SuggestedSynonym>> {
            Err(thesaurus_core::ValidationError::EmptyTerm.into())
        }

        fn provider_name(&self) -> &str {
            "odd"
        }
    }

    #[test]
    fn test_effective_confidence() {
        assert!((SuggestedSynonym::new("a", None).effective_confidence() - 0.7).abs() < 1e-6);
        assert!((SuggestedSynonym::new("a", Some(1.7)).effective_confidence() - 1.0).abs() < 1e-6);
        assert!((SuggestedSynonym::new("a", Some(-0.3)).effective_confidence()).abs() < 1e-6);
        assert!(
            (SuggestedSynonym::new("a", Some(f32::NAN)).effective_confidence() - 0.7).abs() < 1e-6
        );
    }

    #[test]
    fn test_suggested_synonym_deserializes_without_confidence() {
        let parsed: SuggestedSynonym = serde_json::from_str(r#"{"term": "voorarrest"}"#).unwrap();
        assert_eq!(parsed, SuggestedSynonym::new("voorarrest", None));
    }

    #[test]
    fn test_context_builder() {
        let ctx = SuggestionContext::new()
            .with_definition("vrijheidsbeneming voor het vonnis")
            .with_domain("strafrecht");
        assert_eq!(ctx.domain.as_deref(), Some("strafrecht"));
        assert!(ctx.definition.is_some());
    }

    #[tokio::test]
    async fn test_disabled_service_reports_not_configured() {
        let result = suggest_with_timeout(
            &DisabledSuggestionService,
            "voorarrest",
            &SuggestionContext::default(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(result, Err(EnrichmentError::ProviderNotConfigured));
    }

    #[tokio::test]
    async fn test_static_service_is_case_insensitive() {
        let svc = StaticSuggestionService::new().with_suggestions(
            "Voorlopige Hechtenis",
            vec![SuggestedSynonym::new("bewaring", Some(0.8))],
        );
        let out = svc
            .suggest("  voorlopige hechtenis ", &SuggestionContext::default())
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(svc
            .suggest("dagvaarding", &SuggestionContext::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_timeout_abandons_slow_call() {
        let svc = SlowService {
            delay: Duration::from_millis(500),
        };
        let result = suggest_with_timeout(
            &svc,
            "voorarrest",
            &SuggestionContext::default(),
            Duration::from_millis(20),
        )
        .await;
        assert_eq!(result, Err(EnrichmentError::Timeout { timeout_ms: 20 }));
    }

    #[tokio::test]
    async fn test_fast_call_within_timeout() {
        let svc = SlowService {
            delay: Duration::from_millis(1),
        };
        let result = suggest_with_timeout(
            &svc,
            "voorarrest",
            &SuggestionContext::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(result[0].term, "voorarrest (slow)");
    }

    #[tokio::test]
    async fn test_non_enrichment_errors_become_failures() {
        let result = suggest_with_timeout(
            &RegistryFailingService,
            "x",
            &SuggestionContext::default(),
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(
            result,
            Err(EnrichmentError::Failure { ref provider, .. }) if provider == "odd"
        ));
    }

    #[test]
    fn test_metrics_classify_errors() {
        let metrics = SuggestionMetrics::new();
        metrics.record_call();
        metrics.record_error(&EnrichmentError::Timeout { timeout_ms: 10 });
        metrics.record_call();
        metrics.record_error(&EnrichmentError::ProviderNotConfigured);
        metrics.record_call();
        metrics.record_success(4);
        metrics.record_members_added(3);

        let snap = metrics.snapshot();
        assert_eq!(snap.calls, 3);
        assert_eq!(snap.timeouts, 1);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.successes, 1);
        assert_eq!(snap.candidates_received, 4);
        assert_eq!(snap.members_added, 3);

        metrics.reset();
        assert_eq!(metrics.snapshot(), SuggestionMetricsSnapshot::default());
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
