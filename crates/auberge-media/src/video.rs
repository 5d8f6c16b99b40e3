use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Video probe error: {0}")]
    Probe(String),

    #[error("Frame capture error: {0}")]
    Capture(String),

    #[error("Thumbnail encode error: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stream properties reported by the decoder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoMetadata {
    /// Zero, NaN and infinite durations are all "unknown".
    pub fn has_known_duration(&self) -> bool {
        self.duration_secs.is_finite() && self.duration_secs > 0.0
    }
}

/// A timestamp to capture. `fraction` is `None` for the fixed fallback
/// point used when the duration is unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub fraction: Option<f64>,
    pub at_secs: f64,
}

impl SamplePoint {
    pub fn at_fraction(fraction: f64, duration_secs: f64) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        Self {
            fraction: Some(fraction),
            at_secs: fraction * duration_secs,
        }
    }

    pub fn fixed(at_secs: f64) -> Self {
        Self {
            fraction: None,
            at_secs,
        }
    }
}

/// One captured frame, RGB8 row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailCandidate {
    pub timestamp_fraction: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ThumbnailCandidate {
    pub fn new(point: SamplePoint, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            timestamp_fraction: point.fraction,
            width,
            height,
            pixels,
        }
    }

    /// Frame copied before the decoder knew its dimensions.
    pub fn not_ready(point: SamplePoint) -> Self {
        Self::new(point, 0, 0, Vec::new())
    }

    /// Nonzero dimensions and a buffer that matches them.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() == self.width as usize * self.height as usize * 3
    }
}

/// The encoded result of an extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub jpeg: Bytes,
    pub width: u32,
    pub height: u32,
    pub timestamp_fraction: Option<f64>,
}

impl Thumbnail {
    pub const CONTENT_TYPE: &'static str = "image/jpeg";
}

/// Seeks a single video source and copies frames out of it.
///
/// A sampler owns its decoder; an extraction run takes it by value so it is
/// never shared between runs.
#[async_trait]
pub trait FrameSampler: Send {
    /// Load stream metadata. Errors are terminal for the run.
    async fn load_metadata(&mut self) -> Result<VideoMetadata, DecodeError>;

    /// Seek to `point` and copy the current frame. Returns a
    /// [`ThumbnailCandidate::not_ready`] candidate rather than an error when
    /// the decoder has no dimensions yet.
    async fn capture(&mut self, point: SamplePoint) -> Result<ThumbnailCandidate, DecodeError>;
}

/// Opens a fresh sampler over an asset's bytes.
pub trait SamplerFactory: Send + Sync {
    type Sampler: FrameSampler + 'static;

    fn open(&self, source: &Bytes) -> Result<Self::Sampler, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_durations() {
        for d in [0.0, f64::NAN, f64::INFINITY, -1.0] {
            let meta = VideoMetadata {
                duration_secs: d,
                width: 1920,
                height: 1080,
            };
            assert!(!meta.has_known_duration(), "duration {d} should be unknown");
        }
    }

    #[test]
    fn test_candidate_validity() {
        let point = SamplePoint::at_fraction(0.5, 10.0);
        assert!(!ThumbnailCandidate::not_ready(point).is_valid());
        assert!(ThumbnailCandidate::new(point, 2, 1, vec![0; 6]).is_valid());
        // buffer shorter than the reported dimensions
        assert!(!ThumbnailCandidate::new(point, 2, 2, vec![0; 6]).is_valid());
    }

    #[test]
    fn test_sample_point_clamps() {
        let p = SamplePoint::at_fraction(1.5, 10.0);
        assert_eq!(p.fraction, Some(1.0));
        assert_eq!(p.at_secs, 10.0);
    }
}
