//! Asset upload with thumbnail generation for videos.
//!
//! [`UploadCoordinator::submit`] validates the asset locally, extracts a
//! thumbnail when the asset is a video, and hands both to the storage
//! backend. A video without a usable frame is still uploaded.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use tracing::{debug, info, warn};

use auberge_media::{AbortSignal, Extraction, SamplerFactory, Thumbnail, ThumbnailExtractor};
use auberge_shared::constants::DEFAULT_MAX_UPLOAD_SIZE;
use auberge_shared::wire::StoredMedia;
use auberge_shared::{Collection, MediaAsset, MimeClass, TransportError};

use crate::error::{ClientError, Result, ValidationError};

/// Everything the storage backend receives for one asset.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub asset: MediaAsset,
    pub thumbnail: Option<Thumbnail>,
    /// Destination folder hint.
    pub folder: Option<String>,
    /// Hex BLAKE3 digest of the asset bytes.
    pub checksum: String,
}

/// The storage collaborator.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn upload(
        &self,
        request: &UploadRequest,
    ) -> std::result::Result<StoredMedia, TransportError>;
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub allowed_kinds: Vec<MimeClass>,
    pub max_size_bytes: usize,
    /// Narrower ceiling applied to images only.
    pub max_image_bytes: Option<usize>,
    pub folder: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            allowed_kinds: vec![MimeClass::Image, MimeClass::Video],
            max_size_bytes: DEFAULT_MAX_UPLOAD_SIZE,
            max_image_bytes: None,
            folder: None,
        }
    }
}

impl UploadOptions {
    pub fn for_collection(collection: Collection) -> Self {
        Self {
            folder: Some(collection.upload_folder().to_string()),
            ..Self::default()
        }
    }

    pub fn only(mut self, kind: MimeClass) -> Self {
        self.allowed_kinds = vec![kind];
        self
    }

    pub fn with_max_size(mut self, max_size_bytes: usize) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    fn limit_for(&self, kind: MimeClass) -> usize {
        match (kind, self.max_image_bytes) {
            (MimeClass::Image, Some(max)) => max.min(self.max_size_bytes),
            _ => self.max_size_bytes,
        }
    }
}

/// What the caller gets back after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub mime_class: MimeClass,
}

/// Check kind and size. Runs before any network or decode work.
pub fn validate(
    asset: &MediaAsset,
    options: &UploadOptions,
) -> std::result::Result<MimeClass, ValidationError> {
    if asset.bytes.is_empty() {
        return Err(ValidationError::Empty);
    }

    let kind = asset.mime_class().ok_or_else(|| {
        let shown = if asset.content_type.is_empty() {
            asset.file_name.clone()
        } else {
            asset.content_type.clone()
        };
        ValidationError::UnknownType(shown)
    })?;

    if !options.allowed_kinds.contains(&kind) {
        return Err(ValidationError::KindNotAllowed { kind });
    }

    let max = options.limit_for(kind);
    let size = asset.size_bytes();
    if size > max {
        return Err(ValidationError::TooLarge { size, max });
    }

    Ok(kind)
}

pub struct UploadCoordinator<St, F> {
    storage: St,
    samplers: F,
    extractor: ThumbnailExtractor,
}

impl<St: StorageBackend, F: SamplerFactory> UploadCoordinator<St, F> {
    pub fn new(storage: St, samplers: F, extractor: ThumbnailExtractor) -> Self {
        Self {
            storage,
            samplers,
            extractor,
        }
    }

    /// Validate, thumbnail (videos only) and store `asset`.
    ///
    /// Aborting `abort` stops thumbnail extraction and any pending transfer;
    /// the generated thumbnail is discarded when the transfer fails.
    pub async fn submit(
        &self,
        asset: MediaAsset,
        options: &UploadOptions,
        mut abort: AbortSignal,
    ) -> Result<UploadReceipt> {
        let kind = validate(&asset, options)?;

        let thumbnail = match kind {
            MimeClass::Video => self.thumbnail_for(&asset, abort.clone()).await?,
            MimeClass::Image => None,
        };
        if abort.is_aborted() {
            return Err(ClientError::Aborted);
        }

        let checksum = blake3::hash(&asset.bytes).to_hex().to_string();
        let file_name = asset.file_name.clone();
        let size = asset.size_bytes();
        let inline_thumbnail = thumbnail.as_ref().map(data_url);

        let request = UploadRequest {
            asset,
            thumbnail,
            folder: options.folder.clone(),
            checksum,
        };

        let stored = tokio::select! {
            biased;
            _ = abort.aborted() => return Err(ClientError::Aborted),
            stored = self.storage.upload(&request) => stored?,
        };

        let receipt = UploadReceipt {
            thumbnail_url: stored.thumbnail_url.or(inline_thumbnail),
            mime_class: stored.mime_class.unwrap_or(kind),
            url: stored.url,
        };

        info!(
            file_name = %file_name,
            size,
            kind = %kind,
            checksum = %request.checksum,
            has_thumbnail = receipt.thumbnail_url.is_some(),
            "Upload complete"
        );

        Ok(receipt)
    }

    async fn thumbnail_for(
        &self,
        asset: &MediaAsset,
        abort: AbortSignal,
    ) -> Result<Option<Thumbnail>> {
        let sampler = match self.samplers.open(&asset.bytes) {
            Ok(sampler) => sampler,
            Err(e) => {
                warn!(file_name = %asset.file_name, error = %e, "Cannot open video for thumbnail");
                return Ok(None);
            }
        };

        match self.extractor.extract(sampler, abort).await {
            Extraction::Ready(thumbnail) => Ok(Some(thumbnail)),
            Extraction::None(reason) => {
                debug!(file_name = %asset.file_name, ?reason, "Uploading without thumbnail");
                Ok(None)
            }
            Extraction::Aborted => Err(ClientError::Aborted),
        }
    }
}

/// Inline reference for a thumbnail the storage service did not persist.
fn data_url(thumbnail: &Thumbnail) -> String {
    format!(
        "data:{};base64,{}",
        Thumbnail::CONTENT_TYPE,
        BASE64.encode(&thumbnail.jpeg)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use auberge_media::{
        AbortController, DecodeError, ExtractorConfig, FrameSampler, SamplePoint,
        ThumbnailCandidate, VideoMetadata,
    };
    use bytes::Bytes;

    /// Reports a tiny gray frame, or never becomes ready.
    struct StillSampler {
        ready: bool,
    }

    #[async_trait]
    impl FrameSampler for StillSampler {
        async fn load_metadata(&mut self) -> std::result::Result<VideoMetadata, DecodeError> {
            Ok(VideoMetadata {
                duration_secs: 12.0,
                width: 4,
                height: 4,
            })
        }

        async fn capture(
            &mut self,
            point: SamplePoint,
        ) -> std::result::Result<ThumbnailCandidate, DecodeError> {
            if self.ready {
                Ok(ThumbnailCandidate::new(point, 4, 4, vec![128; 4 * 4 * 3]))
            } else {
                Ok(ThumbnailCandidate::not_ready(point))
            }
        }
    }

    #[derive(Default)]
    struct StillFactory {
        never_ready: bool,
        opened: AtomicUsize,
    }

    impl SamplerFactory for StillFactory {
        type Sampler = StillSampler;

        fn open(&self, _source: &Bytes) -> std::result::Result<StillSampler, DecodeError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(StillSampler {
                ready: !self.never_ready,
            })
        }
    }

    #[derive(Default)]
    struct RecordingStorage {
        requests: Mutex<Vec<UploadRequest>>,
        persist_thumbnails: bool,
        fail: bool,
    }

    impl RecordingStorage {
        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl StorageBackend for Arc<RecordingStorage> {
        async fn upload(
            &self,
            request: &UploadRequest,
        ) -> std::result::Result<StoredMedia, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(TransportError::Rejected("Bucket quota exceeded".into()));
            }
            let thumbnail_url = match (&request.thumbnail, self.persist_thumbnails) {
                (Some(_), true) => Some(format!("/uploads/{}.jpg", request.asset.file_name)),
                _ => None,
            };
            Ok(StoredMedia {
                url: format!("/uploads/{}", request.asset.file_name),
                thumbnail_url,
                mime_class: None,
            })
        }
    }

    fn coordinator(
        storage: &Arc<RecordingStorage>,
        factory: StillFactory,
    ) -> UploadCoordinator<Arc<RecordingStorage>, StillFactory> {
        UploadCoordinator::new(
            storage.clone(),
            factory,
            ThumbnailExtractor::new(ExtractorConfig::default().without_delay()),
        )
    }

    fn video(size: usize) -> MediaAsset {
        MediaAsset::new("tour.mp4", "video/mp4", vec![0u8; size])
    }

    #[tokio::test]
    async fn test_video_upload_returns_thumbnail() {
        let storage = Arc::new(RecordingStorage {
            persist_thumbnails: true,
            ..Default::default()
        });
        let uploads = coordinator(&storage, StillFactory::default());
        let options = UploadOptions::default()
            .only(MimeClass::Video)
            .with_max_size(5_000_000);

        let receipt = uploads
            .submit(video(2_000_000), &options, AbortSignal::never())
            .await
            .unwrap();

        assert_eq!(receipt.url, "/uploads/tour.mp4");
        assert_eq!(receipt.thumbnail_url.as_deref(), Some("/uploads/tour.mp4.jpg"));
        assert_eq!(receipt.mime_class, MimeClass::Video);

        let sent = storage.requests.lock().unwrap();
        let thumbnail = sent[0].thumbnail.as_ref().unwrap();
        assert_eq!(&thumbnail.jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(sent[0].checksum.len(), 64);
    }

    #[tokio::test]
    async fn test_oversized_video_fails_before_any_work() {
        let storage = Arc::new(RecordingStorage::default());
        let uploads = coordinator(&storage, StillFactory::default());
        let options = UploadOptions::default()
            .only(MimeClass::Video)
            .with_max_size(1_000_000);

        let err = uploads
            .submit(video(2_000_000), &options, AbortSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::TooLarge { size: 2_000_000, max: 1_000_000 })
        ));
        assert_eq!(storage.calls(), 0);
        assert_eq!(uploads.samplers.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_video_without_frame_uploads_without_thumbnail() {
        let storage = Arc::new(RecordingStorage::default());
        let uploads = coordinator(
            &storage,
            StillFactory {
                never_ready: true,
                ..Default::default()
            },
        );

        let receipt = uploads
            .submit(video(1_024), &UploadOptions::default(), AbortSignal::never())
            .await
            .unwrap();

        assert_eq!(receipt.thumbnail_url, None);
        assert!(storage.requests.lock().unwrap()[0].thumbnail.is_none());
    }

    #[tokio::test]
    async fn test_unpersisted_thumbnail_is_inlined() {
        let storage = Arc::new(RecordingStorage::default());
        let uploads = coordinator(&storage, StillFactory::default());

        let receipt = uploads
            .submit(video(1_024), &UploadOptions::default(), AbortSignal::never())
            .await
            .unwrap();

        let inline = receipt.thumbnail_url.unwrap();
        assert!(inline.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_images_skip_thumbnail_extraction() {
        let storage = Arc::new(RecordingStorage::default());
        let uploads = coordinator(&storage, StillFactory::default());
        let asset = MediaAsset::new("lobby.webp", "", vec![1u8; 64]);

        let receipt = uploads
            .submit(
                asset,
                &UploadOptions::for_collection(Collection::Gallery),
                AbortSignal::never(),
            )
            .await
            .unwrap();

        assert_eq!(receipt.mime_class, MimeClass::Image);
        assert_eq!(uploads.samplers.opened.load(Ordering::SeqCst), 0);
        assert_eq!(storage.requests.lock().unwrap()[0].folder.as_deref(), Some("gallery"));
    }

    #[tokio::test]
    async fn test_disallowed_and_unknown_kinds_are_rejected() {
        let storage = Arc::new(RecordingStorage::default());
        let uploads = coordinator(&storage, StillFactory::default());
        let images_only = UploadOptions::default().only(MimeClass::Image);

        let err = uploads
            .submit(video(10), &images_only, AbortSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::KindNotAllowed { kind: MimeClass::Video })
        ));

        let pdf = MediaAsset::new("rates.pdf", "application/pdf", vec![1u8; 10]);
        let err = uploads
            .submit(pdf, &UploadOptions::default(), AbortSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(ValidationError::UnknownType(_))));
        assert_eq!(storage.calls(), 0);
    }

    #[test]
    fn test_image_limit_only_narrows_images() {
        let options = UploadOptions {
            max_image_bytes: Some(100),
            ..UploadOptions::default()
        };
        let photo = MediaAsset::new("a.jpg", "image/jpeg", vec![1u8; 200]);
        let clip = MediaAsset::new("a.mp4", "video/mp4", vec![1u8; 200]);

        assert_eq!(
            validate(&photo, &options),
            Err(ValidationError::TooLarge { size: 200, max: 100 })
        );
        assert_eq!(validate(&clip, &options), Ok(MimeClass::Video));
        assert_eq!(
            validate(&MediaAsset::new("a.jpg", "image/jpeg", Vec::new()), &options),
            Err(ValidationError::Empty)
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_surfaced() {
        let storage = Arc::new(RecordingStorage {
            fail: true,
            ..Default::default()
        });
        let uploads = coordinator(&storage, StillFactory::default());

        let err = uploads
            .submit(video(1_024), &UploadOptions::default(), AbortSignal::never())
            .await
            .unwrap_err();

        match err {
            ClientError::Transport(TransportError::Rejected(message)) => {
                assert_eq!(message, "Bucket quota exceeded")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_aborted_upload_never_reaches_storage() {
        let storage = Arc::new(RecordingStorage::default());
        let uploads = coordinator(&storage, StillFactory::default());
        let controller = AbortController::new();
        controller.abort();

        let err = uploads
            .submit(video(1_024), &UploadOptions::default(), controller.signal())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Aborted));
        assert_eq!(storage.calls(), 0);
    }
}
