//! HTTP implementations of the persistence and storage collaborators.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use auberge_media::Thumbnail;
use auberge_shared::wire::{Ack, StoredMedia};
use auberge_shared::{
    ApiResult, CatalogEntity, Collection, EntityDraft, EntityId, EntityPatch, OrderEntry,
    TransportError,
};
use auberge_store::CatalogApi;

use crate::upload::{StorageBackend, UploadRequest};

pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// Persistence API at `{base_url}/{collection}`.
#[derive(Debug, Clone)]
pub struct HttpCatalogApi {
    client: Client,
    base_url: String,
}

impl HttpCatalogApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.path())
    }

    fn entity_url(&self, collection: Collection, id: &EntityId) -> String {
        format!("{}/{}/{}", self.base_url, collection.path(), id)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn list(&self, collection: Collection) -> Result<Vec<CatalogEntity>, TransportError> {
        let response = self
            .client
            .get(self.collection_url(collection))
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await;
        read_envelope(response, Some("items")).await
    }

    async fn create(
        &self,
        collection: Collection,
        draft: &EntityDraft,
    ) -> Result<CatalogEntity, TransportError> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .json(draft)
            .send()
            .await;
        read_envelope(response, Some("item")).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &EntityId,
        patch: &EntityPatch,
    ) -> Result<CatalogEntity, TransportError> {
        let response = self
            .client
            .put(self.entity_url(collection, id))
            .json(patch)
            .send()
            .await;
        read_envelope(response, Some("item")).await
    }

    async fn reorder(
        &self,
        collection: Collection,
        order: &[OrderEntry],
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .post(format!("{}/reorder", self.collection_url(collection)))
            .json(order)
            .send()
            .await;
        read_envelope::<Ack>(response, None).await.map(|_| ())
    }

    async fn remove(&self, collection: Collection, id: &EntityId) -> Result<(), TransportError> {
        let response = self
            .client
            .delete(self.entity_url(collection, id))
            .send()
            .await;
        read_envelope::<Ack>(response, None).await.map(|_| ())
    }
}

/// Storage service accepting multipart uploads.
#[derive(Debug, Clone)]
pub struct HttpStorage {
    client: Client,
    upload_url: String,
}

impl HttpStorage {
    pub fn new(client: Client, upload_url: impl Into<String>) -> Self {
        Self {
            client,
            upload_url: upload_url.into(),
        }
    }
}

#[async_trait]
impl StorageBackend for HttpStorage {
    async fn upload(&self, request: &UploadRequest) -> Result<StoredMedia, TransportError> {
        let asset = &request.asset;
        let content_type = if asset.content_type.is_empty() {
            "application/octet-stream"
        } else {
            asset.content_type.as_str()
        };

        let file = Part::bytes(asset.bytes.to_vec())
            .file_name(asset.file_name.clone())
            .mime_str(content_type)
            .map_err(|e| TransportError::Malformed(format!("invalid content type: {e}")))?;

        let mut form = Form::new()
            .part("file", file)
            .text("checksum", request.checksum.clone());

        if let Some(ref folder) = request.folder {
            form = form.text("folder", folder.clone());
        }

        if let Some(ref thumbnail) = request.thumbnail {
            let part = Part::bytes(thumbnail.jpeg.to_vec())
                .file_name(thumbnail_file_name(&asset.file_name))
                .mime_str(Thumbnail::CONTENT_TYPE)
                .map_err(|e| TransportError::Malformed(e.to_string()))?;
            form = form.part("thumbnail", part);
        }

        debug!(
            file_name = %asset.file_name,
            size = asset.bytes.len(),
            with_thumbnail = request.thumbnail.is_some(),
            "Uploading asset"
        );

        let response = self.client.post(&self.upload_url).multipart(form).send().await;
        read_envelope(response, None).await
    }
}

/// `tour.mp4` -> `tour-thumb.jpg`
fn thumbnail_file_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    format!("{stem}-thumb.jpg")
}

/// Map a response to its envelope payload. Non-2xx statuses become
/// [`TransportError::Http`], keeping the collaborator's message if it sent one.
async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Result<Response>,
    field: Option<&str>,
) -> Result<T, TransportError> {
    let response = response.map_err(transport_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(transport_error)?;

    if !status.is_success() {
        let message = match ApiResult::<Ack>::decode(&body, None) {
            Ok(ApiResult::Err { message: Some(message) }) => message,
            _ => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        return Err(TransportError::Http {
            status: status.as_u16(),
            message,
        });
    }

    ApiResult::decode(&body, field)?.into_result()
}

fn transport_error(e: reqwest::Error) -> TransportError {
    if e.is_decode() {
        TransportError::Malformed(e.to_string())
    } else {
        TransportError::Unreachable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_file_name() {
        assert_eq!(thumbnail_file_name("tour.mp4"), "tour-thumb.jpg");
        assert_eq!(thumbnail_file_name("clip.final.webm"), "clip.final-thumb.jpg");
        assert_eq!(thumbnail_file_name("noext"), "noext-thumb.jpg");
    }

    #[test]
    fn test_urls() {
        let api = HttpCatalogApi::new(Client::new(), "http://localhost:3000/api/");
        assert_eq!(
            api.collection_url(Collection::Services),
            "http://localhost:3000/api/services"
        );
        assert_eq!(
            api.entity_url(Collection::Rooms, &EntityId::from("r-7")),
            "http://localhost:3000/api/rooms/r-7"
        );
    }
}
