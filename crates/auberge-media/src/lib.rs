//! # auberge-media
//!
//! Thumbnail extraction for uploaded video assets.
//!
//! A [`FrameSampler`] captures raw frames at chosen timestamps; the
//! [`ThumbnailExtractor`] drives it across a sampling schedule with bounded
//! per-point retries and yields at most one encoded JPEG, or an explicit
//! "none" when no usable frame exists.

pub mod abort;
pub mod encode;
pub mod extractor;
pub mod ffmpeg;
pub mod schedule;
pub mod video;

pub use abort::{AbortController, AbortSignal};
pub use extractor::{Extraction, ExtractorConfig, NoThumbnail, ThumbnailExtractor};
pub use ffmpeg::{FfmpegSampler, FfmpegTools};
pub use video::{
    DecodeError, FrameSampler, SamplePoint, SamplerFactory, Thumbnail, ThumbnailCandidate,
    VideoMetadata,
};
