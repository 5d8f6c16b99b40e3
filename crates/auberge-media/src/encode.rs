use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;

use crate::video::{DecodeError, Thumbnail, ThumbnailCandidate};

/// Encode a valid candidate as JPEG, downscaled to fit `max_width` x
/// `max_height` with the aspect ratio preserved.
pub fn encode_jpeg(
    candidate: ThumbnailCandidate,
    quality: u8,
    max_width: u32,
    max_height: u32,
) -> Result<Thumbnail, DecodeError> {
    if !candidate.is_valid() {
        return Err(DecodeError::Encode(format!(
            "invalid frame {}x{} ({} bytes)",
            candidate.width,
            candidate.height,
            candidate.pixels.len()
        )));
    }

    let timestamp_fraction = candidate.timestamp_fraction;
    let frame = RgbImage::from_raw(candidate.width, candidate.height, candidate.pixels)
        .ok_or_else(|| DecodeError::Encode("pixel buffer does not match dimensions".into()))?;

    let (width, height) = fit_within(frame.width(), frame.height(), max_width, max_height);
    let frame = if (width, height) != frame.dimensions() {
        image::imageops::resize(&frame, width, height, FilterType::Triangle)
    } else {
        frame
    };

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(&frame)
        .map_err(|e| DecodeError::Encode(e.to_string()))?;

    Ok(Thumbnail {
        jpeg: Bytes::from(out.into_inner()),
        width,
        height,
        timestamp_fraction,
    })
}

fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}
