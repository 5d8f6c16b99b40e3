use auberge_shared::constants::FALLBACK_SAMPLE_SECS;

use crate::video::{SamplePoint, VideoMetadata};

/// Timestamps to probe, in order. Falls back to a single fixed point when
/// the duration is unknown.
pub fn sample_schedule(meta: &VideoMetadata, fractions: &[f64]) -> Vec<SamplePoint> {
    if !meta.has_known_duration() || fractions.is_empty() {
        return vec![SamplePoint::fixed(FALLBACK_SAMPLE_SECS)];
    }

    fractions
        .iter()
        .map(|&f| SamplePoint::at_fraction(f, meta.duration_secs))
        .collect()
}
