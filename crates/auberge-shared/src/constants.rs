/// Hard ceiling on an uploaded asset when no narrower limit is set (100 MiB)
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Fractions of the clip duration probed for a thumbnail, in order.
/// The first point sits just past zero to skip black leading frames.
pub const THUMBNAIL_SAMPLE_FRACTIONS: [f64; 7] = [0.001, 0.15, 0.25, 0.35, 0.50, 0.65, 0.80];

/// Timestamp used when the clip duration is unknown (zero, NaN or infinite)
pub const FALLBACK_SAMPLE_SECS: f64 = 0.5;

/// Attempts per sample point while the decoder reports 0x0 dimensions
pub const DEFAULT_FRAME_ATTEMPTS: u32 = 5;

/// Delay between attempts on the same sample point
pub const DEFAULT_FRAME_RETRY_DELAY_MS: u64 = 300;

/// How long one capture may take before its sample point is abandoned
pub const DEFAULT_FRAME_SETTLE_MS: u64 = 1_500;
pub const MIN_FRAME_SETTLE_MS: u64 = 100;

/// JPEG quality of generated thumbnails (0-100)
pub const THUMBNAIL_JPEG_QUALITY: u8 = 85;

/// Bounding box for generated thumbnails
pub const THUMBNAIL_MAX_WIDTH: u32 = 640;
pub const THUMBNAIL_MAX_HEIGHT: u32 = 360;

/// Periodic revalidation bounds while a view is mounted
pub const DEFAULT_REVALIDATE_INTERVAL_SECS: u64 = 20;
pub const MIN_REVALIDATE_INTERVAL_SECS: u64 = 15;
pub const MAX_REVALIDATE_INTERVAL_SECS: u64 = 30;

/// Prefix of ids assigned to optimistically created entities
pub const PENDING_ID_PREFIX: &str = "pending-";
