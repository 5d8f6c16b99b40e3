//! [`FrameSampler`] backed by the ffmpeg CLI.
//!
//! The asset is written to a scratch file once; `ffprobe` reports the
//! stream metadata and each capture runs `ffmpeg -ss <t> -frames:v 1` with
//! raw `rgb24` output on stdout. Child processes are killed when a capture
//! future is dropped (timeout or abort).

use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::video::{
    DecodeError, FrameSampler, SamplePoint, SamplerFactory, ThumbnailCandidate, VideoMetadata,
};

/// Locations of the ffmpeg binaries.
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl SamplerFactory for FfmpegTools {
    type Sampler = FfmpegSampler;

    fn open(&self, source: &Bytes) -> Result<FfmpegSampler, DecodeError> {
        FfmpegSampler::from_bytes(source, self.clone())
    }
}

pub struct FfmpegSampler {
    source: NamedTempFile,
    tools: FfmpegTools,
    meta: Option<VideoMetadata>,
}

impl FfmpegSampler {
    pub fn from_bytes(data: &[u8], tools: FfmpegTools) -> Result<Self, DecodeError> {
        let mut source = NamedTempFile::new()?;
        source.write_all(data)?;
        source.flush()?;

        Ok(Self {
            source,
            tools,
            meta: None,
        })
    }

    fn source_path(&self) -> Result<&str, DecodeError> {
        self.source
            .path()
            .to_str()
            .ok_or_else(|| DecodeError::Probe("Invalid temp file path".into()))
    }
}

#[async_trait]
impl FrameSampler for FfmpegSampler {
    async fn load_metadata(&mut self) -> Result<VideoMetadata, DecodeError> {
        let output = Command::new(&self.tools.ffprobe)
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries",
                "stream=width,height:stream_tags=rotate:stream_side_data=rotation:format=duration",
                "-of", "json",
                self.source_path()?,
            ])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DecodeError::Probe(format!("ffprobe failed: {}", stderr.trim())));
        }

        let meta = parse_probe(&output.stdout)?;
        debug!(
            duration = meta.duration_secs,
            width = meta.width,
            height = meta.height,
            "Probed video"
        );
        self.meta = Some(meta);
        Ok(meta)
    }

    async fn capture(&mut self, point: SamplePoint) -> Result<ThumbnailCandidate, DecodeError> {
        let Some(meta) = self.meta else {
            return Ok(ThumbnailCandidate::not_ready(point));
        };

        let seek = format!("{:.3}", point.at_secs.max(0.0));
        let output = Command::new(&self.tools.ffmpeg)
            .args([
                "-v", "error",
                "-ss", seek.as_str(), // seek before input for fast keyframe seek
                "-i", self.source_path()?,
                "-frames:v", "1",
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DecodeError::Capture(format!("ffmpeg failed: {}", stderr.trim())));
        }

        Ok(candidate_from_raw(point, meta, output.stdout))
    }
}

/// A raw frame is only usable when it matches the probed dimensions;
/// anything else (typically an empty read past a keyframe) is "not ready".
fn candidate_from_raw(point: SamplePoint, meta: VideoMetadata, raw: Vec<u8>) -> ThumbnailCandidate {
    let expected = meta.width as usize * meta.height as usize * 3;
    if expected == 0 || raw.len() != expected {
        return ThumbnailCandidate::not_ready(point);
    }
    ThumbnailCandidate::new(point, meta.width, meta.height, raw)
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    tags: Option<ProbeTags>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

impl ProbeStream {
    /// Display rotation in degrees. Newer ffprobe reports it as display
    /// matrix side data, older builds as a `rotate` tag.
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_deref())
                    .and_then(|r| r.trim().parse().ok())
            })
            .unwrap_or(0.0)
    }
}

#[derive(Deserialize)]
struct ProbeTags {
    #[serde(default)]
    rotate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeSideData {
    #[serde(default)]
    rotation: Option<f64>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

fn parse_probe(json: &[u8]) -> Result<VideoMetadata, DecodeError> {
    let probe: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| DecodeError::Probe(format!("unreadable ffprobe output: {e}")))?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| DecodeError::Probe("no video stream".into()))?;

    // "N/A" and missing durations both mean unknown
    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(f64::NAN);

    // ffmpeg autorotates its output, so report the displayed dimensions
    let quarter_turns = (stream.rotation() / 90.0).round() as i64;
    let (width, height) = if quarter_turns.rem_euclid(2) == 1 {
        (stream.height, stream.width)
    } else {
        (stream.width, stream.height)
    };

    Ok(VideoMetadata {
        duration_secs,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe() {
        let json = br#"{
            "programs": [],
            "streams": [{"width": 1920, "height": 1080}],
            "format": {"duration": "12.480000"}
        }"#;
        let meta = parse_probe(json).unwrap();
        assert_eq!((meta.width, meta.height), (1920, 1080));
        assert!((meta.duration_secs - 12.48).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_rotated_portrait_reports_displayed_size() {
        let json = br#"{
            "streams": [{
                "width": 1920,
                "height": 1080,
                "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]
            }],
            "format": {"duration": "8.0"}
        }"#;
        let meta = parse_probe(json).unwrap();
        assert_eq!((meta.width, meta.height), (1080, 1920));

        // a full-frame capture of the autorotated output is accepted
        let point = SamplePoint::at_fraction(0.5, 8.0);
        let candidate = candidate_from_raw(point, meta, vec![0; 1080 * 1920 * 3]);
        assert!(candidate.is_valid());
        assert_eq!((candidate.width, candidate.height), (1080, 1920));
    }

    #[test]
    fn test_parse_probe_rotate_tag() {
        let json = br#"{"streams":[{"width":640,"height":360,"tags":{"rotate":"270"}}]}"#;
        let meta = parse_probe(json).unwrap();
        assert_eq!((meta.width, meta.height), (360, 640));

        let json = br#"{"streams":[{"width":640,"height":360,"tags":{"rotate":"180"}}]}"#;
        let meta = parse_probe(json).unwrap();
        assert_eq!((meta.width, meta.height), (640, 360));
    }

    #[test]
    fn test_parse_probe_unknown_duration() {
        let json = br#"{"streams":[{"width":640,"height":360}],"format":{"duration":"N/A"}}"#;
        let meta = parse_probe(json).unwrap();
        assert!(!meta.has_known_duration());
    }

    #[test]
    fn test_parse_probe_without_video_stream() {
        let json = br#"{"streams":[],"format":{"duration":"3.0"}}"#;
        assert!(matches!(parse_probe(json), Err(DecodeError::Probe(_))));
    }

    #[test]
    fn test_short_read_is_not_ready() {
        let meta = VideoMetadata {
            duration_secs: 4.0,
            width: 2,
            height: 2,
        };
        let point = SamplePoint::at_fraction(0.5, 4.0);
        assert!(!candidate_from_raw(point, meta, Vec::new()).is_valid());
        assert!(candidate_from_raw(point, meta, vec![0; 12]).is_valid());
    }

    #[test]
    fn test_sampler_writes_scratch_file() {
        let sampler =
            FfmpegSampler::from_bytes(b"not really a video", FfmpegTools::default()).unwrap();
        let on_disk = std::fs::read(sampler.source_path().unwrap()).unwrap();
        assert_eq!(on_disk, b"not really a video");
    }
}
