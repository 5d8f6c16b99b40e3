//! The in-memory catalog cache.
//!
//! One [`Slot`] per collection holds the current snapshot plus the sequence
//! bookkeeping that keeps out-of-order responses from overwriting newer
//! state:
//!
//! - every revalidation is tagged with the next `issued_seq`;
//! - a response is applied only if its sequence is above `applied_seq` and
//!   no mutation is awaiting the server;
//! - an optimistic mutation fences all revalidations issued before it by
//!   raising `applied_seq` to `issued_seq`.
//!
//! Outstanding mutations are kept as a list on top of `base`, the snapshot
//! they were applied to. A rejection rebuilds the snapshot from `base` and
//! the mutations still outstanding, so overlapping rollbacks never bring
//! back each other's changes.
//!
//! Reads never block on the network. `list`/`get` return the snapshot and
//! start a background revalidation unless one is already in flight, in
//! which case callers join it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use auberge_shared::{
    CatalogEntity, Collection, EntityDraft, EntityId, EntityPatch, OrderEntry, TransportError,
};

use crate::api::CatalogApi;
use crate::error::{Result, StoreError};
use crate::events::{StoreEvent, StoreEventKind, EVENT_CAPACITY};
use crate::models::{CacheEntry, CollectionState, Mutation, MutationOutcome, RevalidationOutcome};
use crate::reorder::{apply_order, normalize_order, sort_by_order};

type SharedRevalidation = Shared<BoxFuture<'static, Result<RevalidationOutcome>>>;

#[derive(Default)]
struct Slot {
    entry: Option<CacheEntry>,
    /// Last sequence number handed to a revalidation.
    issued_seq: u64,
    /// Responses at or below this sequence are stale.
    applied_seq: u64,
    /// Revalidations that have not resolved yet.
    pending: usize,
    /// Mutations awaiting the server, in the order they were applied.
    outstanding: Vec<(u64, Request)>,
    next_mutation: u64,
    /// Snapshot underneath the outstanding mutations.
    base: Option<CacheEntry>,
    /// A confirmed mutation skipped its refresh while others were outstanding.
    refresh_owed: bool,
    /// The most recent non-stale revalidation failed.
    failed: bool,
    /// The revalidation new readers join.
    in_flight: Option<(u64, SharedRevalidation)>,
}

impl Slot {
    fn state(&self) -> CollectionState {
        match (self.entry.is_some(), self.pending > 0, self.failed) {
            (false, true, _) => CollectionState::Loading,
            (true, true, _) => CollectionState::Revalidating,
            (_, false, true) => CollectionState::Error,
            (true, false, false) => CollectionState::Ready,
            (false, false, false) => CollectionState::Empty,
        }
    }

    fn items(&self) -> Vec<CatalogEntity> {
        self.entry
            .as_ref()
            .map(|e| e.items.clone())
            .unwrap_or_default()
    }

    fn begin_mutation(&mut self, request: Request) -> u64 {
        if self.outstanding.is_empty() {
            self.base = self.entry.clone();
        }
        let entry = self.entry.get_or_insert_with(unconfirmed);
        request.replay(&mut entry.items);

        self.applied_seq = self.issued_seq;
        self.next_mutation += 1;
        self.outstanding.push((self.next_mutation, request));
        self.next_mutation
    }

    fn settle(&mut self, op: u64) {
        self.outstanding.retain(|(id, _)| *id != op);
    }

    /// Fold a confirmed mutation into `base` so later rollbacks keep it.
    fn confirm(&mut self, request: &Request, outcome: &MutationOutcome) {
        if let Some(entry) = self.entry.as_mut() {
            merge_confirmed(&mut entry.items, request, outcome);
        }
        if self.outstanding.is_empty() {
            self.base = None;
            return;
        }
        let base = self.base.get_or_insert_with(unconfirmed);
        request.replay(&mut base.items);
        merge_confirmed(&mut base.items, request, outcome);
    }

    /// Rebuild the snapshot from `base` and the mutations still outstanding.
    fn rebuild(&mut self) {
        if self.outstanding.is_empty() {
            self.entry = self.base.take();
            return;
        }
        let mut entry = self.base.clone().unwrap_or_else(unconfirmed);
        for (_, request) in &self.outstanding {
            request.replay(&mut entry.items);
        }
        self.entry = Some(entry);
    }
}

fn unconfirmed() -> CacheEntry {
    CacheEntry {
        items: Vec::new(),
        fetched_at: None,
    }
}

/// The server request derived from a locally applied mutation.
#[derive(Clone)]
enum Request {
    Create { pending: EntityId, draft: EntityDraft },
    Update { id: EntityId, patch: EntityPatch },
    Reorder(Vec<OrderEntry>),
    Delete { id: EntityId },
}

impl Request {
    /// Apply the local effect. Entities that have gone away are skipped.
    fn replay(&self, items: &mut Vec<CatalogEntity>) {
        match self {
            Request::Create { pending, draft } => {
                let order_index = items
                    .iter()
                    .map(|e| e.order_index + 1)
                    .max()
                    .unwrap_or(0);
                items.push(draft.clone().into_entity(pending.clone(), order_index));
            }
            Request::Update { id, patch } => {
                if let Some(entity) = items.iter_mut().find(|e| &e.id == id) {
                    patch.apply_to(entity);
                }
            }
            Request::Reorder(order) => {
                let order = normalize_order(items, order);
                apply_order(items, &order);
            }
            Request::Delete { id } => items.retain(|e| &e.id != id),
        }
    }
}

struct Inner {
    api: Arc<dyn CatalogApi>,
    slots: Mutex<HashMap<Collection, Slot>>,
    events: broadcast::Sender<StoreEvent>,
}

/// Cache of rooms, services and gallery items mirrored from the server.
///
/// Cheap to clone; clones share the same snapshots.
#[derive(Clone)]
pub struct CatalogStore {
    inner: Arc<Inner>,
}

impl CatalogStore {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                api,
                slots: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<Collection, Slot>> {
        self.inner.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, collection: Collection, kind: StoreEventKind) {
        // no subscribers is fine
        let _ = self.inner.events.send(StoreEvent::new(collection, kind));
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Current snapshot of `collection`; schedules a background revalidation.
    pub fn list(&self, collection: Collection) -> Vec<CatalogEntity> {
        let items = self.list_cached(collection);
        self.schedule_revalidation(collection);
        items
    }

    /// Cached entity; schedules a background revalidation.
    pub fn get(&self, collection: Collection, id: &EntityId) -> Option<CatalogEntity> {
        let entity = self.get_cached(collection, id);
        self.schedule_revalidation(collection);
        entity
    }

    /// Snapshot without triggering a refresh.
    pub fn list_cached(&self, collection: Collection) -> Vec<CatalogEntity> {
        self.slots()
            .get(&collection)
            .map(Slot::items)
            .unwrap_or_default()
    }

    pub fn get_cached(&self, collection: Collection, id: &EntityId) -> Option<CatalogEntity> {
        self.slots()
            .get(&collection)
            .and_then(|slot| slot.entry.as_ref())
            .and_then(|entry| entry.get(id).cloned())
    }

    pub fn snapshot(&self, collection: Collection) -> Option<CacheEntry> {
        self.slots()
            .get(&collection)
            .and_then(|slot| slot.entry.clone())
    }

    pub fn state(&self, collection: Collection) -> CollectionState {
        self.slots()
            .get(&collection)
            .map(Slot::state)
            .unwrap_or(CollectionState::Empty)
    }

    // ------------------------------------------------------------------
    // Revalidation
    // ------------------------------------------------------------------

    /// Start a revalidation in the background unless one is in flight.
    pub fn schedule_revalidation(&self, collection: Collection) {
        drop(self.join_or_start(collection));
    }

    /// Revalidate `collection`, joining an in-flight request if there is one.
    pub async fn revalidate(&self, collection: Collection) -> Result<RevalidationOutcome> {
        self.join_or_start(collection).await
    }

    /// Issue a new revalidation even if one is in flight. Older in-flight
    /// responses become stale.
    pub async fn refetch(&self, collection: Collection) -> Result<RevalidationOutcome> {
        let shared = {
            let mut slots = self.slots();
            let slot = slots.entry(collection).or_default();
            self.start_locked(collection, slot)
        };
        shared.await
    }

    fn join_or_start(&self, collection: Collection) -> SharedRevalidation {
        let mut slots = self.slots();
        let slot = slots.entry(collection).or_default();
        if let Some((_, ref shared)) = slot.in_flight {
            return shared.clone();
        }
        self.start_locked(collection, slot)
    }

    fn start_locked(&self, collection: Collection, slot: &mut Slot) -> SharedRevalidation {
        slot.issued_seq += 1;
        slot.pending += 1;
        let seq = slot.issued_seq;

        let store = self.clone();
        let shared = async move { store.run_revalidation(collection, seq).await }
            .boxed()
            .shared();
        slot.in_flight = Some((seq, shared.clone()));

        // Driven to completion even if every caller stops waiting.
        tokio::spawn(shared.clone());

        debug!(collection = %collection, seq, "Revalidation started");
        shared
    }

    async fn run_revalidation(
        &self,
        collection: Collection,
        seq: u64,
    ) -> Result<RevalidationOutcome> {
        let response = self.inner.api.list(collection).await;

        let mut slots = self.slots();
        let slot = slots.entry(collection).or_default();
        slot.pending = slot.pending.saturating_sub(1);
        if matches!(slot.in_flight, Some((s, _)) if s == seq) {
            slot.in_flight = None;
        }
        let stale = seq <= slot.applied_seq || !slot.outstanding.is_empty();
        let latest = slot.applied_seq;

        match response {
            Ok(_) if stale => {
                drop(slots);
                debug!(collection = %collection, seq, latest, "Discarding stale revalidation");
                Ok(RevalidationOutcome::Discarded { seq, latest })
            }
            Ok(mut items) => {
                sort_by_order(&mut items);
                let count = items.len();
                slot.entry = Some(CacheEntry::fetched(items));
                slot.applied_seq = seq;
                slot.failed = false;
                drop(slots);

                debug!(collection = %collection, seq, items = count, "Snapshot refreshed");
                self.emit(collection, StoreEventKind::Refreshed);
                Ok(RevalidationOutcome::Applied { seq, items: count })
            }
            Err(e) => {
                if !stale {
                    slot.failed = true;
                }
                drop(slots);

                warn!(
                    collection = %collection,
                    seq,
                    error = %e,
                    "Revalidation failed, keeping last snapshot"
                );
                if !stale {
                    self.emit(collection, StoreEventKind::RevalidationFailed);
                }
                Err(StoreError::Transport(e))
            }
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Apply `mutation` to the local snapshot immediately, then send it to
    /// the server. On success the snapshot is refreshed from the server. On
    /// failure only this mutation is undone; with nothing else outstanding
    /// that restores the exact pre-mutation snapshot.
    pub async fn apply_optimistic(
        &self,
        collection: Collection,
        mutation: Mutation,
    ) -> Result<MutationOutcome> {
        let kind = mutation.kind();

        let (op, request) = {
            let mut slots = self.slots();
            let slot = slots.entry(collection).or_default();
            let current = slot.entry.as_ref().map(|e| e.items.as_slice()).unwrap_or(&[]);
            let request = prepare(current, mutation)?;
            (slot.begin_mutation(request.clone()), request)
        };
        self.emit(collection, StoreEventKind::Optimistic);
        debug!(collection = %collection, kind, op, "Optimistic mutation applied");

        let response = self.send(collection, &request).await;

        let refresh = {
            let mut slots = self.slots();
            let slot = slots.entry(collection).or_default();
            slot.settle(op);
            match response {
                Ok(ref outcome) => slot.confirm(&request, outcome),
                Err(_) => slot.rebuild(),
            }
            if slot.outstanding.is_empty() {
                std::mem::take(&mut slot.refresh_owed) || response.is_ok()
            } else {
                slot.refresh_owed |= response.is_ok();
                false
            }
        };

        match response {
            Ok(outcome) => {
                info!(collection = %collection, kind, "Mutation confirmed");
                if refresh {
                    self.refresh_after_mutation(collection).await;
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!(collection = %collection, kind, error = %e, "Mutation rejected, rolled back");
                self.emit(collection, StoreEventKind::RolledBack);
                if refresh {
                    self.refresh_after_mutation(collection).await;
                }
                Err(StoreError::Transport(e))
            }
        }
    }

    async fn refresh_after_mutation(&self, collection: Collection) {
        if let Err(e) = self.refetch(collection).await {
            warn!(collection = %collection, error = %e, "Refresh after mutation failed");
        }
    }

    async fn send(
        &self,
        collection: Collection,
        request: &Request,
    ) -> std::result::Result<MutationOutcome, TransportError> {
        let api = &self.inner.api;
        match request {
            Request::Create { draft, .. } => api
                .create(collection, draft)
                .await
                .map(MutationOutcome::Created),
            Request::Update { id, patch } => api
                .update(collection, id, patch)
                .await
                .map(MutationOutcome::Updated),
            Request::Reorder(order) => api
                .reorder(collection, order)
                .await
                .map(|()| MutationOutcome::Reordered(order.clone())),
            Request::Delete { id } => api
                .remove(collection, id)
                .await
                .map(|()| MutationOutcome::Deleted(id.clone())),
        }
    }
}

/// Validate `mutation` against `items` and derive the server request.
fn prepare(items: &[CatalogEntity], mutation: Mutation) -> Result<Request> {
    match mutation {
        Mutation::Create(draft) => {
            if let Some(ref main) = draft.main_ref {
                if !draft.media_refs.contains(main) {
                    return Err(StoreError::InvalidEntity(format!(
                        "main image {main} is not one of the media refs"
                    )));
                }
            }
            Ok(Request::Create {
                pending: EntityId::pending(),
                draft,
            })
        }
        Mutation::Update { id, patch } => {
            let mut entity = find_confirmed(items, &id)?.clone();
            patch.apply_to(&mut entity);
            if patch.main_ref.is_some() && entity.main_ref.is_none() {
                return Err(StoreError::InvalidEntity(format!(
                    "main image of {id} must be one of its media refs"
                )));
            }
            Ok(Request::Update { id, patch })
        }
        Mutation::Toggle { id, active } => {
            find_confirmed(items, &id)?;
            Ok(Request::Update {
                id,
                patch: EntityPatch::toggle(active),
            })
        }
        Mutation::Reorder(requested) => Ok(Request::Reorder(normalize_order(items, &requested))),
        Mutation::Delete { id } => {
            find_confirmed(items, &id)?;
            Ok(Request::Delete { id })
        }
    }
}

fn find_confirmed<'a>(items: &'a [CatalogEntity], id: &EntityId) -> Result<&'a CatalogEntity> {
    if id.is_pending() {
        return Err(StoreError::InvalidEntity(format!(
            "{id} is not confirmed by the server yet"
        )));
    }
    items
        .iter()
        .find(|e| &e.id == id)
        .ok_or_else(|| StoreError::UnknownEntity(id.clone()))
}

/// Swap provisional local state for the server's copy ahead of the refresh.
fn merge_confirmed(items: &mut [CatalogEntity], request: &Request, outcome: &MutationOutcome) {
    let (target, confirmed) = match (request, outcome) {
        (Request::Create { pending, .. }, MutationOutcome::Created(item)) => (pending, item),
        (Request::Update { id, .. }, MutationOutcome::Updated(item)) => (id, item),
        _ => return,
    };
    if let Some(slot) = items.iter_mut().find(|e| &e.id == target) {
        *slot = confirmed.clone();
    }
}
