//! THESAURUS Storage - Registry Trait, In-Memory Registry, and Cache
//!
//! Defines the synonym registry abstraction the orchestrator reads through,
//! an in-memory implementation that enforces (group, term) uniqueness and
//! publishes change notifications, and the bounded TTL+LRU cache.

pub mod cache;

pub use cache::{CacheEntry, CacheStats, CacheStore};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thesaurus_core::{
    new_entity_id, normalize_term, GroupId, MemberId, MemberInsert, MemberSource, MemberStatus,
    NewMember, RegistryError, SynonymGroup, SynonymMember, ThesaurusResult, ValidationError,
};

// ============================================================================
// CHANGE NOTIFICATION
// ============================================================================

/// Callback invoked after a registry mutation.
///
/// `Some(term)` names a normalized term whose lookup result may have
/// changed; `None` means "anything may have changed, flush everything".
pub type InvalidationListener = Arc<dyn Fn(Option<&str>) + Send + Sync>;

// ============================================================================
// REGISTRY STATISTICS
// ============================================================================

/// Totals reported by a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_groups: usize,
    pub total_members: usize,
    pub counts_by_status: BTreeMap<MemberStatus, usize>,
    pub counts_by_source: BTreeMap<MemberSource, usize>,
}

impl RegistryStats {
    pub fn count_status(&self, status: MemberStatus) -> usize {
        self.counts_by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn count_source(&self, source: MemberSource) -> usize {
        self.counts_by_source.get(&source).copied().unwrap_or(0)
    }
}

// ============================================================================
// REGISTRY TRAIT
// ============================================================================

/// Authoritative store of synonym groups.
///
/// Implementations enforce their own write consistency: `add_member` must be
/// idempotent on (group, normalized term).
pub trait SynonymRegistry: Send + Sync {
    /// All members of every group whose canonical term or any member matches
    /// `term` case-insensitively.
    fn query_members(&self, term: &str) -> ThesaurusResult<Vec<SynonymMember>>;

    /// The first group matching `term`, or a new group with `term` as its
    /// canonical term.
    fn find_or_create_group(&self, term: &str) -> ThesaurusResult<GroupId>;

    /// Add a member to a group, deduplicating by normalized term.
    fn add_member(&self, group_id: GroupId, member: NewMember) -> ThesaurusResult<MemberInsert>;

    /// Register a change-notification callback.
    fn register_invalidation_listener(&self, listener: InvalidationListener);

    /// Group and member totals.
    fn stats(&self) -> ThesaurusResult<RegistryStats>;
}

// ============================================================================
// SEED FORMAT
// ============================================================================

/// One group in a bulk import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSeed {
    pub canonical_term: String,
    #[serde(default)]
    pub members: Vec<SeedMember>,
}

/// One member in a bulk import; status and source default to a verified
/// import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedMember {
    pub term: String,
    #[serde(default = "default_seed_weight")]
    pub weight: f32,
    #[serde(default = "default_seed_status")]
    pub status: MemberStatus,
    #[serde(default = "default_seed_source")]
    pub source: MemberSource,
}

fn default_seed_weight() -> f32 {
    1.0
}

fn default_seed_status() -> MemberStatus {
    MemberStatus::Active
}

fn default_seed_source() -> MemberSource {
    MemberSource::Imported
}

impl From<SeedMember> for NewMember {
    fn from(seed: SeedMember) -> Self {
        NewMember::manual(seed.term, seed.weight)
            .with_status(seed.status)
            .with_source(seed.source)
    }
}

// ============================================================================
// IN-MEMORY REGISTRY
// ============================================================================

/// In-memory registry for tests, demos, and embedding.
#[derive(Default)]
pub struct InMemoryRegistry {
    /// Keyed by UUIDv7, so iteration follows creation order.
    groups: RwLock<BTreeMap<GroupId, SynonymGroup>>,
    listeners: RwLock<Vec<InvalidationListener>>,
}

impl InMemoryRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_groups(&self) -> ThesaurusResult<RwLockReadGuard<'_, BTreeMap<GroupId, SynonymGroup>>> {
        self.groups
            .read()
            .map_err(|_| RegistryError::LockPoisoned.into())
    }

    fn write_groups(
        &self,
    ) -> ThesaurusResult<RwLockWriteGuard<'_, BTreeMap<GroupId, SynonymGroup>>> {
        self.groups
            .write()
            .map_err(|_| RegistryError::LockPoisoned.into())
    }

    /// Call listeners. Must be called with no registry lock held.
    fn notify(&self, terms: Option<&[String]>) {
        let listeners: Vec<InvalidationListener> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for listener in &listeners {
            match terms {
                Some(terms) => {
                    for term in terms {
                        listener(Some(term.as_str()));
                    }
                }
                None => listener(None),
            }
        }
    }

    /// Create a group with initial members and return its id.
    pub fn create_group(
        &self,
        canonical_term: &str,
        members: Vec<NewMember>,
    ) -> ThesaurusResult<GroupId> {
        if canonical_term.trim().is_empty() {
            return Err(ValidationError::EmptyTerm.into());
        }

        let affected;
        let group_id;
        {
            let mut groups = self.write_groups()?;
            let mut group = SynonymGroup::new(canonical_term);
            for member in members {
                push_member(&mut group, member)?;
            }
            group_id = group.group_id;
            affected = group.normalized_terms();
            groups.insert(group_id, group);
        }

        self.notify(Some(&affected));
        Ok(group_id)
    }

    /// Bulk import. Listeners receive a single flush-all notification.
    pub fn import_groups(&self, seeds: Vec<GroupSeed>) -> ThesaurusResult<usize> {
        let imported = seeds.len();
        {
            let mut groups = self.write_groups()?;
            for seed in seeds {
                if seed.canonical_term.trim().is_empty() {
                    return Err(ValidationError::EmptyTerm.into());
                }
                let mut group = SynonymGroup::new(seed.canonical_term);
                for member in seed.members {
                    push_member(&mut group, member.into())?;
                }
                groups.insert(group.group_id, group);
            }
        }

        tracing::info!(groups = imported, "Imported synonym groups");
        self.notify(None);
        Ok(imported)
    }

    /// Change a member's status (promotion, deprecation).
    ///
    /// Every term of the affected group is announced to listeners.
    pub fn set_member_status(&self, member_id: MemberId, status: MemberStatus) -> ThesaurusResult<()> {
        let affected = {
            let mut groups = self.write_groups()?;
            let group = groups
                .values_mut()
                .find(|g| g.members.iter().any(|m| m.member_id == member_id))
                .ok_or(RegistryError::MemberNotFound { member_id })?;

            let member = group
                .members
                .iter_mut()
                .find(|m| m.member_id == member_id)
                .ok_or(RegistryError::MemberNotFound { member_id })?;

            if member.status == status {
                return Ok(());
            }
            member.status = status;
            group.updated_at = Utc::now();
            group.normalized_terms()
        };

        self.notify(Some(&affected));
        Ok(())
    }

    /// Get a copy of a group.
    pub fn group(&self, group_id: GroupId) -> ThesaurusResult<Option<SynonymGroup>> {
        Ok(self.read_groups()?.get(&group_id).cloned())
    }

    /// Find a member anywhere in the registry by normalized term.
    pub fn members_named(&self, term: &str) -> ThesaurusResult<Vec<SynonymMember>> {
        let normalized = normalize_term(term);
        Ok(self
            .read_groups()?
            .values()
            .filter_map(|g| g.member_by_term(&normalized).cloned())
            .collect())
    }

    pub fn group_count(&self) -> usize {
        self.groups.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }
}

/// Append a member unless the group already has that normalized term.
fn push_member(group: &mut SynonymGroup, member: NewMember) -> ThesaurusResult<MemberInsert> {
    let term = member.term.trim();
    if term.is_empty() {
        return Err(ValidationError::EmptyTerm.into());
    }
    let normalized = normalize_term(term);
    if let Some(existing) = group.member_by_term(&normalized) {
        return Ok(MemberInsert {
            member_id: existing.member_id,
            created: false,
        });
    }

    let now = Utc::now();
    let member_id = new_entity_id();
    group.members.push(SynonymMember {
        member_id,
        group_id: group.group_id,
        term: term.to_string(),
        weight: member.weight.clamp(0.0, 1.0),
        status: member.status,
        source: member.source,
        created_at: now,
    });
    group.updated_at = now;

    Ok(MemberInsert {
        member_id,
        created: true,
    })
}

impl SynonymRegistry for InMemoryRegistry {
    fn query_members(&self, term: &str) -> ThesaurusResult<Vec<SynonymMember>> {
        let normalized = normalize_term(term);
        let groups = self.read_groups()?;
        Ok(groups
            .values()
            .filter(|g| g.matches(&normalized))
            .flat_map(|g| g.members.iter().cloned())
            .collect())
    }

    fn find_or_create_group(&self, term: &str) -> ThesaurusResult<GroupId> {
        let normalized = normalize_term(term);
        if normalized.is_empty() {
            return Err(ValidationError::EmptyTerm.into());
        }

        let mut groups = self.write_groups()?;
        if let Some(existing) = groups.values().find(|g| g.matches(&normalized)) {
            return Ok(existing.group_id);
        }

        // An empty group changes no lookup result, so nobody is notified.
        let group = SynonymGroup::new(term);
        let group_id = group.group_id;
        groups.insert(group_id, group);
        tracing::debug!(term = %normalized, %group_id, "Created synonym group");
        Ok(group_id)
    }

    fn add_member(&self, group_id: GroupId, member: NewMember) -> ThesaurusResult<MemberInsert> {
        let (insert, affected) = {
            let mut groups = self.write_groups()?;
            let group = groups
                .get_mut(&group_id)
                .ok_or(RegistryError::GroupNotFound { group_id })?;
            let insert = push_member(group, member)?;
            (insert, group.normalized_terms())
        };

        if insert.created {
            self.notify(Some(&affected));
        }
        Ok(insert)
    }

    fn register_invalidation_listener(&self, listener: InvalidationListener) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    fn stats(&self) -> ThesaurusResult<RegistryStats> {
        let groups = self.read_groups()?;
        let mut stats = RegistryStats {
            total_groups: groups.len(),
            ..Default::default()
        };
        for member in groups.values().flat_map(|g| g.members.iter()) {
            stats.total_members += 1;
            *stats.counts_by_status.entry(member.status).or_insert(0) += 1;
            *stats.counts_by_source.entry(member.source).or_insert(0) += 1;
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRegistry")
            .field("groups", &self.group_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
