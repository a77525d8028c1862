//! THESAURUS lookup tool
//!
//! Seeds an in-memory registry from a JSON file, runs `ensure_synonyms`
//! for each term given on the command line, and prints the results and a
//! health report as JSON.
//!
//! ```text
//! thesaurus-lookup <seed.json> <term>...
//! ```
//!
//! The seed file holds `groups` (canonical term plus members) and an
//! optional `suggestions` map used as an offline suggestion service.
//! Configuration comes from the TOML file named by `THESAURUS_CONFIG`, or
//! from `THESAURUS_*` environment variables.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thesaurus_core::{ConfigError, ThesaurusConfig, ThesaurusResult};
use thesaurus_enrich::telemetry::{init_tracing, TelemetryConfig};
use thesaurus_enrich::{
    DisabledSuggestionService, EnsureOutcome, HealthReport, Orchestrator,
    StaticSuggestionService, SuggestedSynonym, SuggestionContext, SuggestionService,
};
use thesaurus_storage::{GroupSeed, InMemoryRegistry};

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    groups: Vec<GroupSeed>,
    #[serde(default)]
    suggestions: HashMap<String, Vec<SuggestedSynonym>>,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Debug, Serialize)]
struct LookupReport<'a> {
    term: &'a str,
    #[serde(flatten)]
    outcome: EnsureOutcome,
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    lookups: Vec<LookupReport<'a>>,
    health: HealthReport,
}

#[tokio::main]
async fn main() -> ThesaurusResult<()> {
    init_tracing(&TelemetryConfig::from_env()?)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((seed_path, terms)) = args.split_first() else {
        return Err(ConfigError::MissingRequired {
            field: "usage: thesaurus-lookup <seed.json> <term>...".to_string(),
        }
        .into());
    };

    let config = load_config()?;
    let seed = load_seed(seed_path)?;

    let registry = Arc::new(InMemoryRegistry::new());
    registry.import_groups(seed.groups)?;

    let suggester: Arc<dyn SuggestionService> = if seed.suggestions.is_empty() {
        Arc::new(DisabledSuggestionService)
    } else {
        Arc::new(StaticSuggestionService::from(seed.suggestions))
    };

    let orchestrator = Orchestrator::new(config, registry, suggester)?;
    let context = SuggestionContext {
        definition: None,
        domain: seed.domain,
    };

    let mut lookups = Vec::with_capacity(terms.len());
    for term in terms {
        let outcome = orchestrator
            .ensure_synonyms_with_defaults(term, &context)
            .await?;
        lookups.push(LookupReport { term, outcome });
    }

    let report = RunReport {
        lookups,
        health: orchestrator.health_check(),
    };
    let rendered = serde_json::to_string_pretty(&report).map_err(|e| ConfigError::Parse {
        reason: format!("failed to render report: {e}"),
    })?;
    println!("{rendered}");

    Ok(())
}

fn load_config() -> ThesaurusResult<ThesaurusConfig> {
    match std::env::var("THESAURUS_CONFIG") {
        Ok(path) => {
            tracing::info!(%path, "Loading configuration file");
            let source = read_file(&path)?;
            ThesaurusConfig::from_toml_str(&source)
        }
        Err(_) => ThesaurusConfig::from_env(),
    }
}

fn load_seed(path: &str) -> ThesaurusResult<SeedFile> {
    let source = read_file(path)?;
    let seed: SeedFile = serde_json::from_str(&source).map_err(|e| ConfigError::Parse {
        reason: format!("{path}: {e}"),
    })?;
    tracing::info!(
        path,
        groups = seed.groups.len(),
        suggestions = seed.suggestions.len(),
        "Loaded seed file"
    );
    Ok(seed)
}

fn read_file(path: &str) -> ThesaurusResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ConfigError::InvalidValue {
            field: "path".to_string(),
            value: path.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
