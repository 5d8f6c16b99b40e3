use serde::Serialize;

use auberge_shared::Collection;

pub const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreEventKind {
    /// A server snapshot replaced the cached one.
    Refreshed,
    /// An optimistic change was applied locally.
    Optimistic,
    /// A rejected mutation was undone.
    RolledBack,
    /// A background refresh failed; the previous snapshot is kept.
    RevalidationFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreEvent {
    pub collection: Collection,
    pub kind: StoreEventKind,
}

impl StoreEvent {
    pub fn new(collection: Collection, kind: StoreEventKind) -> Self {
        Self { collection, kind }
    }
}
