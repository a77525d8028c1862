//! THESAURUS Test Utilities
//!
//! Centralized test infrastructure for the THESAURUS workspace:
//! - Scripted suggestion service and instrumented registry
//! - Proptest generators for members and terms
//! - Test fixtures for the legal synonym scenario
//! - Assertions for error classification

// Re-export the in-memory registry from its source crate
pub use thesaurus_storage::{GroupSeed, InMemoryRegistry, RegistryStats, SynonymRegistry};

// Re-export core types for convenience
pub use thesaurus_core::{
    EnrichmentError, ManualClock, MemberSource, MemberStatus, NewMember, PolicyMode,
    RegistryError, SynonymMember, ThesaurusConfig, ThesaurusError, ThesaurusResult,
};
pub use thesaurus_llm::{SuggestedSynonym, SuggestionContext, SuggestionService};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thesaurus_core::{GroupId, MemberInsert};
use thesaurus_storage::InvalidationListener;

// ============================================================================
// SCRIPTED SUGGESTION SERVICE
// ============================================================================

/// What a [`ScriptedSuggestionService`] answers.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Candidates(Vec<SuggestedSynonym>),
    Fail(EnrichmentError),
}

/// Suggestion service with a fixed reply, an optional delay, and a call log.
#[derive(Debug)]
pub struct ScriptedSuggestionService {
    reply: ScriptedReply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    terms: Mutex<Vec<String>>,
}

impl ScriptedSuggestionService {
    /// Always return `candidates`.
    pub fn replying(candidates: Vec<SuggestedSynonym>) -> Self {
        Self::new(ScriptedReply::Candidates(candidates))
    }

    /// Always fail with `error`.
    pub fn failing(error: EnrichmentError) -> Self {
        Self::new(ScriptedReply::Fail(error))
    }

    fn new(reply: ScriptedReply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            terms: Mutex::new(Vec::new()),
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Terms received, in call order.
    pub fn requested_terms(&self) -> Vec<String> {
        self.terms.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SuggestionService for ScriptedSuggestionService {
    async fn suggest(
        &self,
        term: &str,
        _context: &SuggestionContext,
    ) -> ThesaurusResult<Vec<SuggestedSynonym>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.terms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(term.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            ScriptedReply::Candidates(candidates) => Ok(candidates.clone()),
            ScriptedReply::Fail(error) => Err(error.clone().into()),
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// INSTRUMENTED REGISTRY
// ============================================================================

/// Wraps an [`InMemoryRegistry`], counting calls and injecting failures.
#[derive(Debug, Default)]
pub struct InstrumentedRegistry {
    inner: Arc<InMemoryRegistry>,
    queries: AtomicUsize,
    writes: AtomicUsize,
    fail_queries: AtomicBool,
    fail_writes: AtomicBool,
    fail_stats: AtomicBool,
}

impl InstrumentedRegistry {
    pub fn new(inner: Arc<InMemoryRegistry>) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn inner(&self) -> &Arc<InMemoryRegistry> {
        &self.inner
    }

    /// Number of `query_members` calls so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of `add_member` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_stats(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }

    fn unavailable(operation: &str) -> ThesaurusError {
        RegistryError::Unavailable {
            reason: format!("{operation} failed (injected)"),
        }
        .into()
    }
}

impl SynonymRegistry for InstrumentedRegistry {
    fn query_members(&self, term: &str) -> ThesaurusResult<Vec<SynonymMember>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(Self::unavailable("query_members"));
        }
        self.inner.query_members(term)
    }

    fn find_or_create_group(&self, term: &str) -> ThesaurusResult<GroupId> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable("find_or_create_group"));
        }
        self.inner.find_or_create_group(term)
    }

    fn add_member(&self, group_id: GroupId, member: NewMember) -> ThesaurusResult<MemberInsert> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable("add_member"));
        }
        self.inner.add_member(group_id, member)
    }

    fn register_invalidation_listener(&self, listener: InvalidationListener) {
        self.inner.register_invalidation_listener(listener);
    }

    fn stats(&self) -> ThesaurusResult<RegistryStats> {
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(Self::unavailable("stats"));
        }
        self.inner.stats()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating THESAURUS values.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_member_status() -> impl Strategy<Value = MemberStatus> {
        prop_oneof![
            Just(MemberStatus::Active),
            Just(MemberStatus::AiPending),
            Just(MemberStatus::Deprecated),
        ]
    }

    pub fn arb_member_source() -> impl Strategy<Value = MemberSource> {
        prop_oneof![
            Just(MemberSource::Manual),
            Just(MemberSource::Imported),
            Just(MemberSource::AiGenerated),
        ]
    }

    pub fn arb_policy_mode() -> impl Strategy<Value = PolicyMode> {
        prop_oneof![Just(PolicyMode::Strict), Just(PolicyMode::Pragmatic)]
    }

    /// Weight in [0, 1].
    pub fn arb_weight() -> impl Strategy<Value = f32> {
        0.0f32..=1.0
    }

    /// One or two lowercase words, optionally with mixed case and padding.
    pub fn arb_term() -> impl Strategy<Value = String> {
        ("[a-z]{2,10}( [a-z]{2,10})?", any::<bool>(), any::<bool>()).prop_map(
            |(term, shout, pad)| {
                let term = if shout { term.to_uppercase() } else { term };
                if pad {
                    format!("  {term} ")
                } else {
                    term
                }
            },
        )
    }

    pub fn arb_new_member() -> impl Strategy<Value = NewMember> {
        (arb_term(), arb_weight(), arb_member_status(), arb_member_source()).prop_map(
            |(term, weight, status, source)| NewMember {
                term,
                weight,
                status,
                source,
            },
        )
    }

    pub fn arb_suggested_synonym() -> impl Strategy<Value = SuggestedSynonym> {
        (arb_term(), prop::option::of(-0.5f32..1.5)).prop_map(|(term, confidence)| {
            SuggestedSynonym::new(term, confidence)
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// Lookup term of the legal scenario.
    pub const LEGAL_TERM: &str = "voorlopige hechtenis";

    /// The verified synonym in the legal scenario.
    pub const LEGAL_ACTIVE_SYNONYM: &str = "preventieve detentie";

    /// The unverified synonym in the legal scenario.
    pub const LEGAL_PENDING_SYNONYM: &str = "voorarrest";

    /// Registry holding one group: "voorlopige hechtenis" with
    /// "preventieve detentie" (active, 0.9) and "voorarrest" (ai_pending, 0.6).
    pub fn legal_registry() -> Arc<InMemoryRegistry> {
        let registry = Arc::new(InMemoryRegistry::new());
        // Fixture data is known-valid.
        let _ = registry.create_group(
            LEGAL_TERM,
            vec![
                NewMember::manual(LEGAL_ACTIVE_SYNONYM, 0.9),
                NewMember::ai_suggestion(LEGAL_PENDING_SYNONYM, Some(0.6)),
            ],
        );
        registry
    }

    /// Four fresh candidates the suggestion service returns for the legal term.
    pub fn legal_suggestions() -> Vec<SuggestedSynonym> {
        vec![
            SuggestedSynonym::new("inverzekeringstelling", Some(0.85)),
            SuggestedSynonym::new("bewaring", Some(0.8)),
            SuggestedSynonym::new("gevangenhouding", Some(0.75)),
            SuggestedSynonym::new("voorlopige vrijheidsbeneming", None),
        ]
    }

    /// Context a definition generator would pass for the legal term.
    pub fn legal_context() -> SuggestionContext {
        SuggestionContext::new()
            .with_definition("vrijheidsbeneming van een verdachte voor de uitspraak")
            .with_domain("strafrecht")
    }

    /// Default configuration with the given policy.
    pub fn config(policy: PolicyMode) -> ThesaurusConfig {
        ThesaurusConfig::with_policy(policy)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for error classification.

    use super::*;

    /// Assert that a result is a validation error.
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &ThesaurusResult<T>) {
        match result {
            Err(ThesaurusError::Validation(_)) => {}
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    /// Assert that a result is a registry error.
    pub fn assert_registry_error<T: std::fmt::Debug>(result: &ThesaurusResult<T>) {
        match result {
            Err(ThesaurusError::Registry(_)) => {}
            other => panic!("expected registry error, got {:?}", other),
        }
    }

    /// Assert that every member is stored as an unverified AI suggestion.
    pub fn assert_ai_pending(members: &[SynonymMember]) {
        for member in members {
            assert_eq!(
                member.status,
                MemberStatus::AiPending,
                "member {:?} should be ai_pending",
                member.term
            );
            assert_eq!(member.source, MemberSource::AiGenerated);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
