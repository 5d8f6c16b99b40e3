//! The persistence API as seen by the store.

use async_trait::async_trait;

use auberge_shared::{
    CatalogEntity, Collection, EntityDraft, EntityId, EntityPatch, OrderEntry, TransportError,
};

/// Per-collection CRUD on the persistence service.
///
/// Implementations must bypass any intermediate HTTP cache on `list`.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list(&self, collection: Collection) -> Result<Vec<CatalogEntity>, TransportError>;

    async fn create(
        &self,
        collection: Collection,
        draft: &EntityDraft,
    ) -> Result<CatalogEntity, TransportError>;

    async fn update(
        &self,
        collection: Collection,
        id: &EntityId,
        patch: &EntityPatch,
    ) -> Result<CatalogEntity, TransportError>;

    async fn reorder(
        &self,
        collection: Collection,
        order: &[OrderEntry],
    ) -> Result<(), TransportError>;

    async fn remove(&self, collection: Collection, id: &EntityId) -> Result<(), TransportError>;
}
