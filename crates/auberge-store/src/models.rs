//! Cache entries, per-collection state and mutation descriptors.

use chrono::{DateTime, Utc};
use serde::Serialize;

use auberge_shared::{CatalogEntity, EntityDraft, EntityId, EntityPatch, OrderEntry};

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

/// A collection snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    /// Entities in display order.
    pub items: Vec<CatalogEntity>,
    /// When the snapshot was last confirmed by the server. `None` for a
    /// snapshot that only exists through optimistic changes.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn fetched(items: Vec<CatalogEntity>) -> Self {
        Self {
            items,
            fetched_at: Some(Utc::now()),
        }
    }

    pub fn get(&self, id: &EntityId) -> Option<&CatalogEntity> {
        self.items.iter().find(|e| &e.id == id)
    }
}

// ---------------------------------------------------------------------------
// Collection state
// ---------------------------------------------------------------------------

/// Lifecycle of one cached collection.
///
/// `Empty -> Loading -> Ready -> Revalidating -> Ready`, and
/// `Ready -> Error -> Ready` when a background refresh fails. The last good
/// snapshot survives `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionState {
    Empty,
    Loading,
    Ready,
    Revalidating,
    Error,
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// A catalog change applied locally before the server confirms it.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create(EntityDraft),
    Update { id: EntityId, patch: EntityPatch },
    Toggle { id: EntityId, active: bool },
    Reorder(Vec<OrderEntry>),
    Delete { id: EntityId },
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Create(_) => "create",
            Mutation::Update { .. } => "update",
            Mutation::Toggle { .. } => "toggle",
            Mutation::Reorder(_) => "reorder",
            Mutation::Delete { .. } => "delete",
        }
    }
}

/// Server confirmation of a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Created(CatalogEntity),
    Updated(CatalogEntity),
    Reordered(Vec<OrderEntry>),
    Deleted(EntityId),
}

/// Result of a revalidation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidationOutcome {
    /// The response replaced the snapshot.
    Applied { seq: u64, items: usize },
    /// The response was older than the snapshot and was dropped.
    Discarded { seq: u64, latest: u64 },
}
