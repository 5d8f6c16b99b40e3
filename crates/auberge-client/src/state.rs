//! Application state shared by the UI layer.
//!
//! [`AppState`] owns the catalog store and the upload coordinator, both
//! wired to the HTTP collaborators named in [`ClientConfig`]. Views mount
//! their collections through [`AppState::mount_view`] and keep the returned
//! handle for as long as they are on screen.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;

use auberge_media::{AbortSignal, FfmpegTools, ThumbnailExtractor};
use auberge_shared::{Collection, EntityId, EntityPatch, MediaAsset};
use auberge_store::{
    CatalogApi, CatalogStore, InvalidationTriggers, Mutation, StoreError, TriggerHandle, Visibility,
};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{build_client, HttpCatalogApi, HttpStorage};
use crate::upload::{StorageBackend, UploadCoordinator, UploadOptions, UploadReceipt};

pub struct AppState<St = HttpStorage> {
    pub config: ClientConfig,
    pub store: CatalogStore,
    pub uploads: UploadCoordinator<St, FfmpegTools>,
}

impl AppState {
    /// Wire the HTTP collaborators described by `config`.
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let client = build_client(config.request_timeout).context("Failed to build HTTP client")?;

        let api = HttpCatalogApi::new(client.clone(), config.api_base_url.clone());
        let storage = HttpStorage::new(client, config.upload_url.clone());

        info!(
            api = %config.api_base_url,
            upload = %config.upload_url,
            "Client state initialised"
        );

        Ok(Self::with_backends(config, Arc::new(api), storage))
    }
}

impl<St: StorageBackend> AppState<St> {
    pub fn with_backends(config: ClientConfig, api: Arc<dyn CatalogApi>, storage: St) -> Self {
        let uploads = UploadCoordinator::new(
            storage,
            config.ffmpeg_tools(),
            ThumbnailExtractor::new(config.extractor_config()),
        );
        Self {
            store: CatalogStore::new(api),
            uploads,
            config,
        }
    }

    /// Upload options for assets attached to `collection`.
    pub fn upload_options(&self, collection: Collection) -> UploadOptions {
        UploadOptions {
            max_size_bytes: self.config.max_upload_bytes,
            max_image_bytes: self.config.max_image_bytes,
            ..UploadOptions::for_collection(collection)
        }
    }

    /// Start revalidation triggers for a view showing `collections`.
    pub fn mount_view(
        &self,
        collections: Vec<Collection>,
        visibility: watch::Receiver<Visibility>,
    ) -> TriggerHandle {
        InvalidationTriggers::mount(
            self.store.clone(),
            collections,
            self.config.trigger_config(),
            visibility,
        )
    }

    /// Upload `asset` and append it to the media of entity `id`.
    ///
    /// The first image attached to a room or service becomes its main image.
    /// Nothing is uploaded for an entity the store does not hold.
    pub async fn attach_media(
        &self,
        collection: Collection,
        id: &EntityId,
        asset: MediaAsset,
        abort: AbortSignal,
    ) -> Result<UploadReceipt> {
        let current = self
            .store
            .get_cached(collection, id)
            .ok_or_else(|| StoreError::UnknownEntity(id.clone()))?;

        let options = self.upload_options(collection);
        let receipt = self.uploads.submit(asset, &options, abort).await?;

        let mut media_refs = current.media_refs.clone();
        media_refs.push(receipt.url.clone());
        let main_ref = (collection.has_main_ref() && current.main_image().is_none())
            .then(|| receipt.url.clone());

        let patch = EntityPatch {
            media_refs: Some(media_refs),
            main_ref,
            ..EntityPatch::default()
        };
        self.store
            .apply_optimistic(collection, Mutation::Update { id: id.clone(), patch })
            .await?;

        Ok(receipt)
    }
}
