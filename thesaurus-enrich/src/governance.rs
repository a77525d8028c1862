//! Governance policy: which registry members a caller may see.
//!
//! STRICT shows verified members only. PRAGMATIC also shows `ai_pending`
//! members, tagged `unverified` so consumers can disclaim them. Deprecated
//! members are never visible.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use thesaurus_core::{
    normalize_term, GovernanceConfig, MemberSource, MemberStatus, PolicyMode, SynonymMember,
};

/// A member that passed the policy, with display tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleSynonym {
    pub term: String,
    pub weight: f32,
    pub status: MemberStatus,
    pub source: MemberSource,
    /// Not yet verified by a curator.
    pub unverified: bool,
    /// Weight at or above the preferred threshold.
    pub preferred: bool,
}

impl VisibleSynonym {
    pub fn normalized_term(&self) -> String {
        normalize_term(&self.term)
    }
}

/// Stateless visibility filter, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GovernancePolicy {
    config: GovernanceConfig,
}

impl GovernancePolicy {
    pub fn new(config: GovernanceConfig) -> Self {
        Self { config }
    }

    pub fn mode(&self) -> PolicyMode {
        self.config.policy
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Whether the member's status may be shown under this policy.
    pub fn admits_status(&self, status: MemberStatus) -> bool {
        match (self.config.policy, status) {
            (_, MemberStatus::Active) => true,
            (PolicyMode::Pragmatic, MemberStatus::AiPending) => true,
            (PolicyMode::Strict, MemberStatus::AiPending) => false,
            (_, MemberStatus::Deprecated) => false,
        }
    }

    pub fn is_visible(&self, member: &SynonymMember) -> bool {
        // NaN weights fail the comparison and stay hidden.
        self.admits_status(member.status) && member.weight >= self.config.min_weight
    }

    /// Filter and tag members. Order is preserved.
    pub fn apply(&self, members: &[SynonymMember]) -> Vec<VisibleSynonym> {
        members
            .iter()
            .filter(|m| self.is_visible(m))
            .map(|m| VisibleSynonym {
                term: m.term.clone(),
                weight: m.weight,
                status: m.status,
                source: m.source,
                unverified: m.status == MemberStatus::AiPending,
                preferred: m.weight >= self.config.preferred_threshold,
            })
            .collect()
    }
}

/// Collapse duplicates and order for display.
///
/// One row per normalized term survives: the heaviest, with a verified row
/// winning a weight tie. Rows are then sorted by weight descending, ties
/// broken alphabetically on the normalized term.
///
/// Expects rows already filtered by [`GovernancePolicy::apply`]. Filtering
/// first means a hidden duplicate can never displace a visible row.
pub fn rank_synonyms(rows: Vec<VisibleSynonym>) -> Vec<VisibleSynonym> {
    let mut best: HashMap<String, VisibleSynonym> = HashMap::with_capacity(rows.len());
    for row in rows {
        let key = row.normalized_term();
        match best.get(&key) {
            Some(existing) if !outranks(&row, existing) => {}
            _ => {
                best.insert(key, row);
            }
        }
    }

    let mut ranked: Vec<(String, VisibleSynonym)> = best.into_iter().collect();
    ranked.sort_by(|(ka, a), (kb, b)| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(Ordering::Equal)
            .then_with(|| ka.cmp(kb))
    });
    ranked.into_iter().map(|(_, row)| row).collect()
}

fn outranks(candidate: &VisibleSynonym, current: &VisibleSynonym) -> bool {
    match candidate.weight.partial_cmp(&current.weight) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => current.unverified && !candidate.unverified,
        _ => false,
    }
}
