//! Best-effort thumbnail extraction.
//!
//! The extractor walks the sampling schedule in order. A point whose frame
//! comes back with 0x0 dimensions is retried up to `max_attempts` times with
//! `retry_delay` between attempts; a capture that does not settle within
//! `settle_timeout` abandons the point. The first valid frame is encoded and
//! ends the run. Decode errors end the run with "none".

use std::time::Duration;

use auberge_shared::constants::{
    DEFAULT_FRAME_ATTEMPTS, DEFAULT_FRAME_RETRY_DELAY_MS, DEFAULT_FRAME_SETTLE_MS,
    THUMBNAIL_JPEG_QUALITY, THUMBNAIL_MAX_HEIGHT, THUMBNAIL_MAX_WIDTH, THUMBNAIL_SAMPLE_FRACTIONS,
};
use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::encode::encode_jpeg;
use crate::schedule::sample_schedule;
use crate::video::{FrameSampler, Thumbnail, ThumbnailCandidate};

/// Extractor configuration
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub fractions: Vec<f64>,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub settle_timeout: Duration,
    pub jpeg_quality: u8,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            fractions: THUMBNAIL_SAMPLE_FRACTIONS.to_vec(),
            max_attempts: DEFAULT_FRAME_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_FRAME_RETRY_DELAY_MS),
            settle_timeout: Duration::from_millis(DEFAULT_FRAME_SETTLE_MS),
            jpeg_quality: THUMBNAIL_JPEG_QUALITY,
            max_width: THUMBNAIL_MAX_WIDTH,
            max_height: THUMBNAIL_MAX_HEIGHT,
        }
    }
}

impl ExtractorConfig {
    /// Same bounds, no waiting between attempts.
    pub fn without_delay(mut self) -> Self {
        self.retry_delay = Duration::ZERO;
        self
    }
}

/// Why a run produced no thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoThumbnail {
    /// Every schedule point was tried without a usable frame.
    Exhausted,
    /// The source could not be probed, seeked or captured.
    Decode(String),
    /// A frame was captured but could not be encoded.
    Encode(String),
}

/// Result of one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Ready(Thumbnail),
    None(NoThumbnail),
    /// The owning upload was aborted.
    Aborted,
}

impl Extraction {
    pub fn thumbnail(self) -> Option<Thumbnail> {
        match self {
            Extraction::Ready(thumb) => Some(thumb),
            _ => None,
        }
    }
}

/// Drives a [`FrameSampler`] across the sampling schedule.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailExtractor {
    config: ExtractorConfig,
}

impl ThumbnailExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run one extraction. The sampler is consumed; nothing it spawned
    /// outlives this call.
    pub async fn extract<S: FrameSampler>(
        &self,
        mut sampler: S,
        mut abort: AbortSignal,
    ) -> Extraction {
        if abort.is_aborted() {
            return Extraction::Aborted;
        }

        let meta = tokio::select! {
            biased;
            _ = abort.aborted() => return Extraction::Aborted,
            meta = sampler.load_metadata() => meta,
        };
        let meta = match meta {
            Ok(meta) => meta,
            Err(e) => {
                warn!(error = %e, "Video metadata unavailable, skipping thumbnail");
                return Extraction::None(NoThumbnail::Decode(e.to_string()));
            }
        };

        let schedule = sample_schedule(&meta, &self.config.fractions);
        debug!(
            duration = meta.duration_secs,
            points = schedule.len(),
            "Sampling video for thumbnail"
        );

        'points: for (index, point) in schedule.iter().enumerate() {
            for attempt in 1..=self.config.max_attempts {
                let capture =
                    tokio::time::timeout(self.config.settle_timeout, sampler.capture(*point));
                let outcome = tokio::select! {
                    biased;
                    _ = abort.aborted() => return Extraction::Aborted,
                    outcome = capture => outcome,
                };

                let candidate = match outcome {
                    Err(_) => {
                        debug!(
                            index,
                            attempt,
                            at = point.at_secs,
                            "Capture did not settle, advancing"
                        );
                        continue 'points;
                    }
                    Ok(Err(e)) => {
                        warn!(index, error = %e, "Video decode failed, skipping thumbnail");
                        return Extraction::None(NoThumbnail::Decode(e.to_string()));
                    }
                    Ok(Ok(candidate)) => candidate,
                };

                if candidate.is_valid() {
                    return self.encode(candidate, index).await;
                }

                debug!(index, attempt, "Frame dimensions not ready");
                if attempt < self.config.max_attempts && !self.config.retry_delay.is_zero() {
                    tokio::select! {
                        biased;
                        _ = abort.aborted() => return Extraction::Aborted,
                        _ = tokio::time::sleep(self.config.retry_delay) => {}
                    }
                }
            }
        }

        info!(points = schedule.len(), "No usable frame in any sample point");
        Extraction::None(NoThumbnail::Exhausted)
    }

    async fn encode(&self, candidate: ThumbnailCandidate, index: usize) -> Extraction {
        let quality = self.config.jpeg_quality;
        let (max_w, max_h) = (self.config.max_width, self.config.max_height);

        let encoded = tokio::task::spawn_blocking(move || {
            encode_jpeg(candidate, quality, max_w, max_h)
        })
        .await;

        match encoded {
            Ok(Ok(thumb)) => {
                debug!(
                    index,
                    width = thumb.width,
                    height = thumb.height,
                    size = thumb.jpeg.len(),
                    "Thumbnail encoded"
                );
                Extraction::Ready(thumb)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Thumbnail encoding failed");
                Extraction::None(NoThumbnail::Encode(e.to_string()))
            }
            Err(e) => {
                warn!(error = %e, "Thumbnail encoding task failed");
                Extraction::None(NoThumbnail::Encode(e.to_string()))
            }
        }
    }
}
