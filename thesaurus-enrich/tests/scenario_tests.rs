//! End-to-end behavior of the orchestrator on the legal synonym scenario.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thesaurus_enrich::{EnrichmentAttempt, HealthStatus, Orchestrator, PolicyMode};
use thesaurus_test_utils::assertions::{
    assert_ai_pending, assert_registry_error, assert_validation_error,
};
use thesaurus_test_utils::fixtures::{
    config, legal_context, legal_registry, legal_suggestions, LEGAL_ACTIVE_SYNONYM,
    LEGAL_PENDING_SYNONYM, LEGAL_TERM,
};
use thesaurus_core::{GroupId, MemberId, MemberInsert, NewMember, SynonymMember};
use thesaurus_storage::InvalidationListener;
use thesaurus_test_utils::{
    EnrichmentError, InMemoryRegistry, InstrumentedRegistry, MemberStatus, RegistryStats,
    ScriptedSuggestionService, SuggestionContext, SynonymRegistry, ThesaurusConfig,
    ThesaurusResult,
};

struct Harness {
    orchestrator: Orchestrator,
    registry: Arc<InstrumentedRegistry>,
    suggester: Arc<ScriptedSuggestionService>,
}

fn harness(policy: PolicyMode, suggester: ScriptedSuggestionService) -> Harness {
    let registry = Arc::new(InstrumentedRegistry::new(legal_registry()));
    let suggester = Arc::new(suggester);
    let orchestrator = Orchestrator::new(config(policy), registry.clone(), suggester.clone())
        .expect("default config is valid");
    Harness {
        orchestrator,
        registry,
        suggester,
    }
}

fn replying() -> ScriptedSuggestionService {
    ScriptedSuggestionService::replying(legal_suggestions())
}

// ============================================================================
// LOOKUP
// ============================================================================

#[test]
fn strict_lookup_shows_only_verified_synonym() {
    let h = harness(PolicyMode::Strict, replying());
    let terms = h
        .orchestrator
        .get_synonyms_for_lookup("Voorlopige Hechtenis", 5)
        .unwrap();
    assert_eq!(terms, vec![LEGAL_ACTIVE_SYNONYM]);
}

#[test]
fn pragmatic_lookup_flags_unverified_synonym() {
    let h = harness(PolicyMode::Pragmatic, replying());
    let rows = h.orchestrator.lookup_synonyms("Voorlopige Hechtenis", 5).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].term, LEGAL_ACTIVE_SYNONYM);
    assert!(!rows[0].unverified);
    assert!(rows[0].preferred);
    assert_eq!(rows[1].term, LEGAL_PENDING_SYNONYM);
    assert!(rows[1].unverified);
}

#[test]
fn repeated_lookup_within_ttl_is_a_hit() {
    let h = harness(PolicyMode::Pragmatic, replying());
    let first = h.orchestrator.get_synonyms_for_lookup(LEGAL_TERM, 5).unwrap();
    let second = h
        .orchestrator
        .get_synonyms_for_lookup("  VOORLOPIGE hechtenis", 5)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(h.registry.query_count(), 1);
    let stats = h.orchestrator.get_cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
    assert!((stats.hit_rate - 0.5).abs() < 1e-9);
}

#[test]
fn invalid_terms_are_rejected_before_registry_access() {
    let h = harness(PolicyMode::Strict, replying());
    assert_validation_error(&h.orchestrator.get_synonyms_for_lookup("", 5));
    assert_validation_error(&h.orchestrator.get_synonyms_for_lookup(&"a".repeat(500), 5));
    assert_eq!(h.registry.query_count(), 0);
}

#[test]
fn registry_failure_aborts_only_that_lookup() {
    let h = harness(PolicyMode::Strict, replying());
    h.registry.set_fail_queries(true);
    assert_registry_error(&h.orchestrator.get_synonyms_for_lookup(LEGAL_TERM, 5));

    h.registry.set_fail_queries(false);
    assert_eq!(
        h.orchestrator.get_synonyms_for_lookup(LEGAL_TERM, 5).unwrap(),
        vec![LEGAL_ACTIVE_SYNONYM]
    );
}

#[test]
fn promotion_in_registry_is_visible_immediately() {
    let h = harness(PolicyMode::Strict, replying());
    assert_eq!(h.orchestrator.get_synonyms_for_lookup(LEGAL_TERM, 5).unwrap().len(), 1);

    let inner = h.registry.inner();
    let pending = inner.members_named(LEGAL_PENDING_SYNONYM).unwrap()[0].member_id;
    inner.set_member_status(pending, MemberStatus::Active).unwrap();

    assert_eq!(
        h.orchestrator.get_synonyms_for_lookup(LEGAL_TERM, 5).unwrap(),
        vec![LEGAL_ACTIVE_SYNONYM, LEGAL_PENDING_SYNONYM]
    );
    assert_eq!(h.registry.query_count(), 2);
}

/// Registry whose first query promotes a member after reading, so the
/// change (and its invalidation) lands between the read and the cache write.
struct PromoteDuringFirstQuery {
    inner: Arc<InMemoryRegistry>,
    member: MemberId,
    fired: AtomicBool,
}

impl SynonymRegistry for PromoteDuringFirstQuery {
    fn query_members(&self, term: &str) -> ThesaurusResult<Vec<SynonymMember>> {
        let members = self.inner.query_members(term)?;
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.inner.set_member_status(self.member, MemberStatus::Active)?;
        }
        Ok(members)
    }

    fn find_or_create_group(&self, term: &str) -> ThesaurusResult<GroupId> {
        self.inner.find_or_create_group(term)
    }

    fn add_member(&self, group_id: GroupId, member: NewMember) -> ThesaurusResult<MemberInsert> {
        self.inner.add_member(group_id, member)
    }

    fn register_invalidation_listener(&self, listener: InvalidationListener) {
        self.inner.register_invalidation_listener(listener)
    }

    fn stats(&self) -> ThesaurusResult<RegistryStats> {
        self.inner.stats()
    }
}

#[test]
fn promotion_during_a_miss_is_not_hidden_by_stale_cache() {
    let inner = legal_registry();
    let member = inner.members_named(LEGAL_PENDING_SYNONYM).unwrap()[0].member_id;
    let registry = Arc::new(PromoteDuringFirstQuery {
        inner: Arc::clone(&inner),
        member,
        fired: AtomicBool::new(false),
    });
    let orchestrator = Orchestrator::new(
        ThesaurusConfig::with_policy(PolicyMode::Strict),
        registry,
        Arc::new(replying()),
    )
    .unwrap();

    // The in-flight read predates the promotion.
    assert_eq!(
        orchestrator.get_synonyms_for_lookup(LEGAL_TERM, 5).unwrap(),
        vec![LEGAL_ACTIVE_SYNONYM]
    );
    assert_eq!(inner.stats().unwrap().count_status(MemberStatus::Active), 2);

    // It was not cached, so the next lookup sees the promotion.
    assert_eq!(
        orchestrator.get_synonyms_for_lookup(LEGAL_TERM, 5).unwrap(),
        vec![LEGAL_ACTIVE_SYNONYM, LEGAL_PENDING_SYNONYM]
    );
    let stats = orchestrator.get_cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.size), (0, 2, 1));
}

// ============================================================================
// ENRICHMENT
// ============================================================================

#[tokio::test]
async fn strict_enrichment_grows_registry_but_not_visible_list() {
    let h = harness(PolicyMode::Strict, replying());

    let outcome = h
        .orchestrator
        .ensure_synonyms(LEGAL_TERM, 5, &legal_context(), Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(h.suggester.call_count(), 1);
    assert_eq!(outcome.enrichment, EnrichmentAttempt::Succeeded);
    // Registry growth is not visible-count growth under STRICT.
    assert_eq!(outcome.ai_added_count, 4);
    assert_eq!(outcome.terms(), vec![LEGAL_ACTIVE_SYNONYM]);

    let stats = h.registry.stats().unwrap();
    assert_eq!(stats.total_members, 6);
    assert_eq!(stats.count_status(MemberStatus::AiPending), 5);
    assert_eq!(stats.count_status(MemberStatus::Active), 1);

    for candidate in legal_suggestions() {
        assert_ai_pending(&h.registry.inner().members_named(&candidate.term).unwrap());
    }

    // Pre-enrichment resolve plus the re-resolve after invalidation.
    assert_eq!(h.registry.query_count(), 2);
}

#[tokio::test]
async fn pragmatic_enrichment_returns_new_unverified_synonyms() {
    let h = harness(PolicyMode::Pragmatic, replying());

    let outcome = h
        .orchestrator
        .ensure_synonyms(LEGAL_TERM, 5, &legal_context(), Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(outcome.ai_added_count, 4);
    assert_eq!(outcome.synonyms.len(), 6);
    assert_eq!(outcome.synonyms[0].term, LEGAL_ACTIVE_SYNONYM);
    assert!(outcome.synonyms.iter().skip(1).all(|s| s.unverified));

    // The cache holds the refreshed list.
    let cached = h.orchestrator.get_synonyms_for_lookup(LEGAL_TERM, 10).unwrap();
    assert_eq!(cached.len(), 6);
    assert_eq!(h.registry.query_count(), 2);
}

#[tokio::test]
async fn enough_visible_synonyms_skip_the_suggestion_service() {
    let h = harness(PolicyMode::Pragmatic, replying());

    let outcome = h
        .orchestrator
        .ensure_synonyms(LEGAL_TERM, 2, &legal_context(), Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(h.suggester.call_count(), 0);
    assert_eq!(outcome.enrichment, EnrichmentAttempt::NotNeeded);
    assert_eq!(outcome.ai_added_count, 0);
    assert_eq!(outcome.synonyms.len(), 2);
}

#[tokio::test]
async fn suggestion_service_receives_trimmed_original_term() {
    let h = harness(PolicyMode::Strict, replying());
    h.orchestrator
        .ensure_synonyms(
            "  Voorlopige Hechtenis ",
            5,
            &SuggestionContext::default(),
            Duration::from_secs(30),
        )
        .await
        .unwrap();
    assert_eq!(h.suggester.requested_terms(), vec!["Voorlopige Hechtenis"]);
}

#[tokio::test(start_paused = true)]
async fn timeout_returns_pre_enrichment_list() {
    let h = harness(
        PolicyMode::Strict,
        replying().with_delay(Duration::from_secs(60)),
    );

    let outcome = h
        .orchestrator
        .ensure_synonyms(LEGAL_TERM, 5, &legal_context(), Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(outcome.enrichment, EnrichmentAttempt::TimedOut);
    assert_eq!(outcome.ai_added_count, 0);
    assert_eq!(outcome.terms(), vec![LEGAL_ACTIVE_SYNONYM]);
    assert_eq!(h.registry.write_count(), 0);

    let metrics = h.orchestrator.suggestion_metrics().snapshot();
    assert_eq!((metrics.calls, metrics.timeouts), (1, 1));
}

#[tokio::test]
async fn suggestion_failure_is_swallowed() {
    let h = harness(
        PolicyMode::Pragmatic,
        ScriptedSuggestionService::failing(EnrichmentError::Failure {
            provider: "scripted".into(),
            reason: "upstream 503".into(),
        }),
    );

    let outcome = h
        .orchestrator
        .ensure_synonyms(LEGAL_TERM, 5, &legal_context(), Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(outcome.enrichment, EnrichmentAttempt::Failed);
    assert_eq!(outcome.ai_added_count, 0);
    assert_eq!(outcome.synonyms.len(), 2);
    assert_eq!(h.registry.write_count(), 0);
}

#[tokio::test]
async fn registry_write_failure_propagates() {
    let h = harness(PolicyMode::Strict, replying());
    h.registry.set_fail_writes(true);

    let result = h
        .orchestrator
        .ensure_synonyms(LEGAL_TERM, 5, &legal_context(), Duration::from_secs(30))
        .await;
    assert_registry_error(&result);
}

#[tokio::test]
async fn repeated_enrichment_does_not_duplicate_members() {
    let h = harness(PolicyMode::Strict, replying());
    for _ in 0..3 {
        h.orchestrator
            .ensure_synonyms(LEGAL_TERM, 5, &legal_context(), Duration::from_secs(30))
            .await
            .unwrap();
    }

    assert_eq!(h.suggester.call_count(), 3);
    assert_eq!(h.registry.stats().unwrap().total_members, 6);
    let metrics = h.orchestrator.suggestion_metrics().snapshot();
    assert_eq!(metrics.members_added, 4);
    assert_eq!(metrics.candidates_received, 12);
}

#[tokio::test]
async fn defaults_come_from_configuration() {
    let h = harness(PolicyMode::Pragmatic, replying());
    assert_eq!(h.orchestrator.config().min_synonyms, 5);

    let outcome = h
        .orchestrator
        .ensure_synonyms_with_defaults(LEGAL_TERM, &legal_context())
        .await
        .unwrap();
    assert_eq!(outcome.enrichment, EnrichmentAttempt::Succeeded);
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

#[test]
fn health_reports_registry_totals() {
    let h = harness(PolicyMode::Strict, replying());
    let report = h.orchestrator.health_check();

    assert_eq!(report.status, HealthStatus::Healthy);
    let registry = report.registry_stats.expect("registry is reachable");
    assert_eq!(registry.total_groups, 1);
    assert_eq!(registry.total_members, 2);
}

#[test]
fn health_is_unhealthy_when_registry_stats_fail() {
    let h = harness(PolicyMode::Strict, replying());
    h.registry.set_fail_stats(true);

    let report = h.orchestrator.health_check();
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert!(report.registry_stats.is_none());
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn health_degrades_on_low_hit_rate() {
    let h = harness(PolicyMode::Strict, replying());
    for i in 0..25 {
        h.orchestrator
            .get_synonyms_for_lookup(&format!("term {i}"), 5)
            .unwrap();
    }

    let report = h.orchestrator.health_check();
    assert_eq!(report.status, HealthStatus::Degraded);
    assert!(report.warnings.iter().any(|w| w.contains("hit rate")));
}
