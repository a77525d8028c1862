//! Orchestrator: the single entry point for synonym lookups.
//!
//! Reads go cache first, then registry, then governance filter, and the
//! full filtered list is cached under the normalized term. Enrichment asks
//! the suggestion service for more candidates when too few are visible,
//! persists them as `ai_pending`, and re-resolves.
//!
//! The cache lock is never held across the suggestion call: `resolve` is
//! synchronous and finishes before anything is awaited.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thesaurus_core::{
    normalize_term, validate_term, Clock, EnrichmentError, NewMember, SystemClock,
    ThesaurusConfig, ThesaurusResult,
};
use thesaurus_llm::{
    suggest_with_timeout, SuggestedSynonym, SuggestionContext, SuggestionMetrics,
    SuggestionService,
};
use thesaurus_storage::{CacheStats, CacheStore, InvalidationListener, SynonymRegistry};

use crate::governance::{rank_synonyms, GovernancePolicy, VisibleSynonym};
use crate::health::HealthReport;

/// Cached value: the full governance-filtered, ranked list.
pub type SynonymList = Arc<Vec<VisibleSynonym>>;

/// What happened to the enrichment step of `ensure_synonyms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentAttempt {
    /// Enough synonyms were already visible.
    NotNeeded,
    Succeeded,
    TimedOut,
    Failed,
}

/// Result of `ensure_synonyms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsureOutcome {
    pub synonyms: Vec<VisibleSynonym>,
    /// Members the registry reports as newly created. May exceed the growth
    /// of `synonyms`, since new members are `ai_pending`.
    pub ai_added_count: usize,
    pub enrichment: EnrichmentAttempt,
}

impl EnsureOutcome {
    pub fn terms(&self) -> Vec<String> {
        self.synonyms.iter().map(|s| s.term.clone()).collect()
    }
}

/// Coordinates cache, registry, governance policy, and enrichment.
pub struct Orchestrator {
    config: ThesaurusConfig,
    policy: GovernancePolicy,
    cache: Arc<CacheStore<SynonymList>>,
    registry: Arc<dyn SynonymRegistry>,
    suggester: Arc<dyn SuggestionService>,
    metrics: SuggestionMetrics,
    saturated_streak: AtomicU32,
}

impl Orchestrator {
    /// Build an orchestrator on the system clock.
    pub fn new(
        config: ThesaurusConfig,
        registry: Arc<dyn SynonymRegistry>,
        suggester: Arc<dyn SuggestionService>,
    ) -> ThesaurusResult<Self> {
        Self::with_clock(config, registry, suggester, Arc::new(SystemClock))
    }

    /// Build an orchestrator whose cache reads time from `clock`.
    ///
    /// Validates `config` and subscribes the cache to registry changes.
    pub fn with_clock(
        config: ThesaurusConfig,
        registry: Arc<dyn SynonymRegistry>,
        suggester: Arc<dyn SuggestionService>,
        clock: Arc<dyn Clock>,
    ) -> ThesaurusResult<Self> {
        config.validate()?;

        let cache = Arc::new(CacheStore::new(config.cache_max_size, clock));
        registry.register_invalidation_listener(cache_listener(&cache));

        tracing::info!(
            policy = %config.policy,
            cache_max_size = config.cache_max_size,
            cache_ttl_secs = config.cache_ttl_secs,
            provider = suggester.provider_name(),
            "Synonym orchestrator ready"
        );

        Ok(Self {
            policy: GovernancePolicy::new(config.governance()),
            config,
            cache,
            registry,
            suggester,
            metrics: SuggestionMetrics::new(),
            saturated_streak: AtomicU32::new(0),
        })
    }

    pub fn config(&self) -> &ThesaurusConfig {
        &self.config
    }

    pub fn policy(&self) -> &GovernancePolicy {
        &self.policy
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Visible synonym terms for `term`, best first, at most `max_results`.
    ///
    /// Never suspends. Invalid input is rejected before the cache or the
    /// registry is touched; registry failures propagate.
    pub fn get_synonyms_for_lookup(
        &self,
        term: &str,
        max_results: usize,
    ) -> ThesaurusResult<Vec<String>> {
        Ok(self
            .lookup_synonyms(term, max_results)?
            .into_iter()
            .map(|s| s.term)
            .collect())
    }

    /// Like [`get_synonyms_for_lookup`](Self::get_synonyms_for_lookup) with
    /// weights and governance tags.
    pub fn lookup_synonyms(
        &self,
        term: &str,
        max_results: usize,
    ) -> ThesaurusResult<Vec<VisibleSynonym>> {
        let key = validate_term(term)?;
        let list = self.resolve(&key)?;
        Ok(list.iter().take(max_results).cloned().collect())
    }

    /// Cached list for a normalized key, resolving from the registry on miss.
    fn resolve(&self, key: &str) -> ThesaurusResult<SynonymList> {
        if let Some(hit) = self.cache.get(key) {
            tracing::debug!(term = %key, count = hit.len(), "Synonym cache hit");
            return Ok(hit);
        }

        tracing::debug!(term = %key, "Synonym cache miss");
        // A registry change committed while we read must win over our result.
        let generation = self.cache.generation();
        let members = self.registry.query_members(key)?;
        let visible = self
            .policy
            .apply(&members)
            .into_iter()
            .filter(|row| row.normalized_term() != key)
            .collect();
        let list: SynonymList = Arc::new(rank_synonyms(visible));

        let cached = self.cache.put_if_current(
            key.to_string(),
            Arc::clone(&list),
            self.config.cache_ttl(),
            generation,
        );
        if !cached {
            tracing::debug!(term = %key, "Registry changed during resolve, result not cached");
        }
        Ok(list)
    }

    // ========================================================================
    // ENRICHMENT
    // ========================================================================

    /// Make sure at least `min_count` synonyms are visible, asking the
    /// suggestion service when they are not.
    ///
    /// Suggestion timeouts and failures are logged and absorbed: the caller
    /// gets the pre-enrichment list with `ai_added_count = 0`. Only registry
    /// errors and invalid input are returned as errors.
    #[tracing::instrument(skip(self, context, timeout))]
    pub async fn ensure_synonyms(
        &self,
        term: &str,
        min_count: usize,
        context: &SuggestionContext,
        timeout: Duration,
    ) -> ThesaurusResult<EnsureOutcome> {
        let key = validate_term(term)?;
        let current = self.resolve(&key)?;
        if current.len() >= min_count {
            return Ok(EnsureOutcome {
                synonyms: current.to_vec(),
                ai_added_count: 0,
                enrichment: EnrichmentAttempt::NotNeeded,
            });
        }

        let original = term.trim();
        self.metrics.record_call();
        let candidates =
            match suggest_with_timeout(self.suggester.as_ref(), original, context, timeout).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    self.metrics.record_error(&e);
                    tracing::warn!(
                        term = %key,
                        provider = self.suggester.provider_name(),
                        error = %e,
                        "Synonym enrichment failed, continuing with registry synonyms"
                    );
                    let enrichment = match e {
                        EnrichmentError::Timeout { .. } => EnrichmentAttempt::TimedOut,
                        _ => EnrichmentAttempt::Failed,
                    };
                    return Ok(EnsureOutcome {
                        synonyms: current.to_vec(),
                        ai_added_count: 0,
                        enrichment,
                    });
                }
            };
        self.metrics.record_success(candidates.len());

        let added = self.persist_suggestions(&key, original, &candidates)?;
        self.metrics.record_members_added(added);

        // The registry listener has normally done this already.
        self.cache.invalidate(&key);
        let refreshed = self.resolve(&key)?;

        tracing::info!(
            term = %key,
            candidates = candidates.len(),
            added,
            visible_before = current.len(),
            visible_after = refreshed.len(),
            "Synonym enrichment completed"
        );

        Ok(EnsureOutcome {
            synonyms: refreshed.to_vec(),
            ai_added_count: added,
            enrichment: EnrichmentAttempt::Succeeded,
        })
    }

    /// [`ensure_synonyms`](Self::ensure_synonyms) with `min_synonyms` and
    /// the suggestion timeout taken from configuration.
    pub async fn ensure_synonyms_with_defaults(
        &self,
        term: &str,
        context: &SuggestionContext,
    ) -> ThesaurusResult<EnsureOutcome> {
        self.ensure_synonyms(
            term,
            self.config.min_synonyms,
            context,
            self.config.suggestion_timeout(),
        )
        .await
    }

    /// Write usable candidates as `ai_pending` members. Returns how many
    /// the registry actually created.
    fn persist_suggestions(
        &self,
        key: &str,
        original: &str,
        candidates: &[SuggestedSynonym],
    ) -> ThesaurusResult<usize> {
        let mut seen: HashSet<String> = HashSet::from([key.to_string()]);
        let usable: Vec<NewMember> = candidates
            .iter()
            .filter_map(|candidate| {
                let term = candidate.term.trim();
                if term.is_empty() || !seen.insert(normalize_term(term)) {
                    return None;
                }
                Some(NewMember::ai_suggestion(
                    term,
                    Some(candidate.effective_confidence()),
                ))
            })
            .collect();

        if usable.is_empty() {
            return Ok(0);
        }

        let group_id = self.registry.find_or_create_group(original)?;
        let mut added = 0;
        for member in usable {
            if self.registry.add_member(group_id, member)?.created {
                added += 1;
            }
        }
        Ok(added)
    }

    // ========================================================================
    // INVALIDATION & DIAGNOSTICS
    // ========================================================================

    /// Drop the cached list for `term`. Returns whether one was cached.
    pub fn invalidate(&self, term: &str) -> bool {
        self.cache.invalidate(&normalize_term(term))
    }

    /// Drop every cached list. Returns how many were cached.
    pub fn invalidate_all(&self) -> usize {
        self.cache.invalidate_all()
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn suggestion_metrics(&self) -> &SuggestionMetrics {
        &self.metrics
    }

    /// Grade cache, registry, and enrichment health.
    ///
    /// Each call counts toward the saturation streak, so the thrash warning
    /// only fires after repeated near-capacity observations.
    pub fn health_check(&self) -> HealthReport {
        let cache = self.cache.stats();
        let streak = if cache.is_near_capacity(self.config.saturation_ratio) {
            self.saturated_streak.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.saturated_streak.store(0, Ordering::Relaxed);
            0
        };

        let registry = self.registry.stats();
        if let Err(e) = &registry {
            tracing::warn!(error = %e, "Registry stats unavailable for health check");
        }

        HealthReport::assess(
            &self.config,
            cache,
            registry,
            streak,
            self.metrics.snapshot(),
        )
    }
}

/// Registry listener that invalidates through a weak handle, so the
/// registry never keeps a dropped orchestrator's cache alive.
fn cache_listener(cache: &Arc<CacheStore<SynonymList>>) -> InvalidationListener {
    let cache = Arc::downgrade(cache);
    Arc::new(move |term: Option<&str>| {
        let Some(cache) = cache.upgrade() else {
            return;
        };
        match term {
            Some(term) => {
                cache.invalidate(&normalize_term(term));
            }
            None => {
                cache.invalidate_all();
            }
        }
    })
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("policy", &self.config.policy)
            .field("cache", &self.cache)
            .field("provider", &self.suggester.provider_name())
            .finish()
    }
}
