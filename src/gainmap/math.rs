//! Scalar gain encoding and decoding.
//!
//! [`encode_gain`] turns an (SDR nits, HDR nits) pair into one stored map
//! byte; [`gain_factor`] and [`GainLut`] turn a stored value plus a display
//! boost back into the multiplicative factor applied to linear RGB.

use crate::types::GainMapMetadata;

/// Encode the luminance ratio of an (SDR, HDR) pixel pair as a gain map
/// byte.
///
/// The ratio floors at 1.0 when the SDR luminance is zero, clamps into the
/// metadata's content boost range, and is rescaled from
/// `[log2_min, log2_max]` to `[0, 255]` with round-to-nearest. Saturates at
/// the range boundaries; never wraps.
#[inline]
pub fn encode_gain(
    sdr_nits: f32,
    hdr_nits: f32,
    metadata: &GainMapMetadata,
    log2_min: f32,
    log2_max: f32,
) -> u8 {
    let mut gain = 1.0;
    if sdr_nits > 0.0 {
        gain = hdr_nits / sdr_nits;
    }
    let gain = gain.clamp(metadata.min_content_boost, metadata.max_content_boost);

    let normalized = if log2_max > log2_min {
        (gain.log2() - log2_min) / (log2_max - log2_min)
    } else {
        0.5
    };
    (normalized * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Multiplicative gain factor for a normalized stored gain value in
/// `[0, 1]`.
///
/// Recovers the log2 boost by interpolating between the metadata's min and
/// max content boost, then scales the exponent by
/// `log2(display_boost) / log2(max_content_boost)` so the effective boost
/// never exceeds the display boost. Callers clamp `display_boost` to the
/// metadata's max content boost beforehand.
#[inline]
pub fn gain_factor(gain: f32, metadata: &GainMapMetadata, display_boost: f32) -> f32 {
    let log2_min = metadata.min_content_boost.log2();
    let log2_max = metadata.max_content_boost.log2();
    let log_boost = log2_min * (1.0 - gain) + log2_max * gain;
    let weight = if log2_max > 0.0 {
        display_boost.log2() / log2_max
    } else {
        1.0
    };
    (log_boost * weight).exp2()
}

/// Apply a gain value to a linear RGB pixel.
#[inline]
pub fn apply_gain(
    rgb: [f32; 3],
    gain: f32,
    metadata: &GainMapMetadata,
    display_boost: f32,
) -> [f32; 3] {
    let factor = gain_factor(gain, metadata, display_boost);
    [rgb[0] * factor, rgb[1] * factor, rgb[2] * factor]
}

/// Precomputed gain factors for all 256 stored gain bytes.
///
/// Built once per apply call, keyed by the clamped display boost, so the
/// per-pixel path avoids `log2`/`exp2` entirely.
pub struct GainLut {
    table: Box<[f32; 256]>,
}

impl GainLut {
    /// Build the table for the given metadata and clamped display boost.
    pub fn new(metadata: &GainMapMetadata, display_boost: f32) -> Self {
        let mut table = Box::new([0.0f32; 256]);
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = gain_factor(i as f32 / 255.0, metadata, display_boost);
        }
        Self { table }
    }

    /// Gain factor for a normalized stored gain value, rounded to the
    /// nearest of the 256 precomputed entries.
    #[inline]
    pub fn lookup(&self, gain: f32) -> f32 {
        self.table[(gain.clamp(0.0, 1.0) * 255.0 + 0.5) as usize]
    }

    /// Apply the looked-up factor to a linear RGB pixel.
    #[inline]
    pub fn apply(&self, rgb: [f32; 3], gain: f32) -> [f32; 3] {
        let factor = self.lookup(gain);
        [rgb[0] * factor, rgb[1] * factor, rgb[2] * factor]
    }
}
