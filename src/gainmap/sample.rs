//! Block sampling and gain map upsampling.
//!
//! Generation downsamples the full-resolution sources by box-averaging each
//! scale x scale block. Application upsamples the coarse gain map back to
//! full resolution with Shepard's inverse-distance weighting over the four
//! surrounding texels; the weights depend only on the sub-pixel position
//! within a block, so they are precomputed once per apply call.

use crate::types::{GainMap, P010View, Yuv420View};

/// Box-average of the `scale x scale` SDR block that corresponds to a gain
/// map coordinate. Gamma-domain YUV.
pub(crate) fn sample_yuv420(
    image: &Yuv420View<'_>,
    scale: usize,
    map_x: usize,
    map_y: usize,
) -> [f32; 3] {
    let mut total = [0.0f32; 3];
    for dy in 0..scale {
        for dx in 0..scale {
            let p = image.get(map_x * scale + dx, map_y * scale + dy);
            total[0] += p[0];
            total[1] += p[1];
            total[2] += p[2];
        }
    }
    let n = (scale * scale) as f32;
    [total[0] / n, total[1] / n, total[2] / n]
}

/// Box-average of the `scale x scale` HDR block that corresponds to a gain
/// map coordinate. Gamma-domain YUV.
pub(crate) fn sample_p010(
    image: &P010View<'_>,
    scale: usize,
    map_x: usize,
    map_y: usize,
) -> [f32; 3] {
    let mut total = [0.0f32; 3];
    for dy in 0..scale {
        for dx in 0..scale {
            let p = image.get(map_x * scale + dx, map_y * scale + dy);
            total[0] += p[0];
            total[1] += p[1];
            total[2] += p[2];
        }
    }
    let n = (scale * scale) as f32;
    [total[0] / n, total[1] / n, total[2] / n]
}

/// Nearest-texel gain map lookup for non-integral scale ratios.
///
/// The coarser fallback path: no interpolation, just the closest texel,
/// clamped to the map bounds. Integral ratios use [`ShepardsIdw::sample`]
/// instead.
pub fn sample_map_nearest(map: &GainMap, map_scale_factor: f32, x: usize, y: usize) -> f32 {
    let map_x = (x as f32 / map_scale_factor).round() as usize;
    let map_y = (y as f32 / map_scale_factor).round() as usize;
    map.texel(
        map_x.min(map.width as usize - 1),
        map_y.min(map.height as usize - 1),
    )
}

/// Precomputed Shepard's inverse-distance weights for gain map upsampling.
///
/// For every sub-pixel position within a `scale x scale` block, four weights
/// cover the surrounding texels: lower/lower, lower/upper, upper/lower,
/// upper/upper. Separate tables handle positions whose right or bottom
/// neighbor is clamped to the map edge.
///
/// See <https://en.wikipedia.org/wiki/Inverse_distance_weighting>.
pub struct ShepardsIdw {
    scale: usize,
    weights: Vec<f32>,
    weights_no_right: Vec<f32>,
    weights_no_bottom: Vec<f32>,
    weights_corner: Vec<f32>,
}

impl ShepardsIdw {
    /// Build the weight tables for an integral map scale factor.
    pub fn new(scale: usize) -> Self {
        Self {
            scale,
            weights: Self::fill(scale, 1, 1),
            weights_no_right: Self::fill(scale, 0, 1),
            weights_no_bottom: Self::fill(scale, 1, 0),
            weights_corner: Self::fill(scale, 0, 0),
        }
    }

    /// Weight table for one edge configuration. `inc_x`/`inc_y` place the
    /// upper texel one cell away, or on top of the lower texel when that
    /// neighbor is clamped.
    fn fill(scale: usize, inc_x: usize, inc_y: usize) -> Vec<f32> {
        let mut weights = Vec::with_capacity(scale * scale * 4);
        for dy in 0..scale {
            for dx in 0..scale {
                let px = dx as f32 / scale as f32;
                let py = dy as f32 / scale as f32;
                let d1 = squared_distance(px, py, 0.0, 0.0);
                if d1 == 0.0 {
                    weights.extend_from_slice(&[1.0, 0.0, 0.0, 0.0]);
                    continue;
                }
                let w1 = 1.0 / d1;
                let w2 = 1.0 / squared_distance(px, py, 0.0, inc_y as f32);
                let w3 = 1.0 / squared_distance(px, py, inc_x as f32, 0.0);
                let w4 = 1.0 / squared_distance(px, py, inc_x as f32, inc_y as f32);
                let total = w1 + w2 + w3 + w4;
                weights.extend_from_slice(&[w1 / total, w2 / total, w3 / total, w4 / total]);
            }
        }
        weights
    }

    /// Interpolated gain value, in `[0, 1]`, at a full-resolution pixel
    /// position. `x`/`y` are image coordinates; the map scale factor is the
    /// one the table was built for.
    pub fn sample(&self, map: &GainMap, x: usize, y: usize) -> f32 {
        let map_w = map.width as usize;
        let map_h = map.height as usize;

        let x_lower = x / self.scale;
        let y_lower = y / self.scale;
        let no_right = x_lower + 1 >= map_w;
        let no_bottom = y_lower + 1 >= map_h;
        let x_upper = (x_lower + 1).min(map_w - 1);
        let y_upper = (y_lower + 1).min(map_h - 1);

        let e1 = map.texel(x_lower, y_lower);
        let e2 = map.texel(x_lower, y_upper);
        let e3 = map.texel(x_upper, y_lower);
        let e4 = map.texel(x_upper, y_upper);

        let table = match (no_right, no_bottom) {
            (false, false) => &self.weights,
            (true, false) => &self.weights_no_right,
            (false, true) => &self.weights_no_bottom,
            (true, true) => &self.weights_corner,
        };
        let idx = ((y % self.scale) * self.scale + (x % self.scale)) * 4;
        e1 * table[idx] + e2 * table[idx + 1] + e3 * table[idx + 2] + e4 * table[idx + 3]
    }
}

#[inline]
fn squared_distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    dx * dx + dy * dy
}
