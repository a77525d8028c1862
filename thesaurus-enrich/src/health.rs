//! Health report assembled from cache, registry, and enrichment counters.

use serde::Serialize;
use thesaurus_core::{HealthStatus, ThesaurusConfig, ThesaurusResult};
use thesaurus_llm::SuggestionMetricsSnapshot;
use thesaurus_storage::{CacheStats, RegistryStats};

/// Diagnostics returned by `Orchestrator::health_check`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub warnings: Vec<String>,
    pub cache: CacheStats,
    /// `None` when the registry could not report.
    pub registry_stats: Option<RegistryStats>,
    pub enrichment: SuggestionMetricsSnapshot,
}

impl HealthReport {
    /// Grade the observations against the configured thresholds.
    ///
    /// `saturated_streak` is the number of consecutive checks, including
    /// this one, that found the cache near capacity.
    pub fn assess(
        config: &ThesaurusConfig,
        cache: CacheStats,
        registry: ThesaurusResult<RegistryStats>,
        saturated_streak: u32,
        enrichment: SuggestionMetricsSnapshot,
    ) -> Self {
        let mut status = HealthStatus::Healthy;
        let mut warnings = Vec::new();

        let registry_stats = match registry {
            Ok(stats) => Some(stats),
            Err(e) => {
                status = status.worst(HealthStatus::Unhealthy);
                warnings.push(format!("registry stats unavailable: {e}"));
                None
            }
        };

        if cache.lookups() >= config.health_min_lookups
            && cache.hit_rate < config.hit_rate_warning_threshold
        {
            status = status.worst(HealthStatus::Degraded);
            warnings.push(format!(
                "cache hit rate {:.2} below threshold {:.2}",
                cache.hit_rate, config.hit_rate_warning_threshold
            ));
        }

        if saturated_streak >= config.saturation_checks {
            status = status.worst(HealthStatus::Degraded);
            warnings.push(format!(
                "cache at {}/{} entries for {} consecutive checks",
                cache.size, cache.max_size, saturated_streak
            ));
        }

        Self {
            status,
            warnings,
            cache,
            registry_stats,
            enrichment,
        }
    }
}
