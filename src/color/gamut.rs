//! Color gamut primaries, luminance weighting, and gamut conversion.
//!
//! Reference matrices (D65) for BT.709/sRGB, Display P3, and
//! BT.2100/BT.2020. Gamut-to-gamut conversion composes the RGB→XYZ and
//! XYZ→RGB constants so every direction is derived from the same tables the
//! round-trip tests pin down.

#![allow(clippy::excessive_precision)]

use crate::types::ColorGamut;

/// 3x3 matrix for linear RGB transformations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3x3(pub [[f32; 3]; 3]);

impl Matrix3x3 {
    /// Identity matrix.
    pub const IDENTITY: Self = Self([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    /// Apply to an RGB vector: `[R', G', B'] = M * [R, G, B]`.
    #[inline]
    pub fn transform(&self, rgb: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        [
            m[0][0] * rgb[0] + m[0][1] * rgb[1] + m[0][2] * rgb[2],
            m[1][0] * rgb[0] + m[1][1] * rgb[1] + m[1][2] * rgb[2],
            m[2][0] * rgb[0] + m[2][1] * rgb[1] + m[2][2] * rgb[2],
        ]
    }

    /// Matrix product `self * other`.
    pub fn multiply(&self, other: &Self) -> Self {
        let a = &self.0;
        let b = &other.0;
        let mut out = [[0.0f32; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
            }
        }
        Self(out)
    }
}

/// BT.709 / sRGB RGB to XYZ (D65) - IEC 61966-2-1.
pub const BT709_TO_XYZ: Matrix3x3 = Matrix3x3([
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
]);

/// XYZ to BT.709 / sRGB RGB (D65).
pub const XYZ_TO_BT709: Matrix3x3 = Matrix3x3([
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
]);

/// Display P3 RGB to XYZ (D65).
pub const P3_TO_XYZ: Matrix3x3 = Matrix3x3([
    [0.4865709, 0.2656677, 0.1982173],
    [0.2289746, 0.6917385, 0.0792869],
    [0.0000000, 0.0451134, 1.0439444],
]);

/// XYZ to Display P3 RGB (D65).
pub const XYZ_TO_P3: Matrix3x3 = Matrix3x3([
    [2.4934969, -0.9313836, -0.4027108],
    [-0.8294890, 1.7626641, 0.0236247],
    [0.0358458, -0.0761724, 0.9568845],
]);

/// BT.2100 / BT.2020 RGB to XYZ (D65).
pub const BT2100_TO_XYZ: Matrix3x3 = Matrix3x3([
    [0.6369580, 0.1446169, 0.1688810],
    [0.2627002, 0.6779981, 0.0593017],
    [0.0000000, 0.0280727, 1.0609851],
]);

/// XYZ to BT.2100 / BT.2020 RGB (D65).
pub const XYZ_TO_BT2100: Matrix3x3 = Matrix3x3([
    [1.7166512, -0.3556708, -0.2533663],
    [-0.6666844, 1.6164812, 0.0157685],
    [0.0176399, -0.0427706, 0.9421031],
]);

fn to_xyz(gamut: ColorGamut) -> Matrix3x3 {
    match gamut {
        ColorGamut::Bt709 => BT709_TO_XYZ,
        ColorGamut::DisplayP3 => P3_TO_XYZ,
        ColorGamut::Bt2100 => BT2100_TO_XYZ,
    }
}

fn from_xyz(gamut: ColorGamut) -> Matrix3x3 {
    match gamut {
        ColorGamut::Bt709 => XYZ_TO_BT709,
        ColorGamut::DisplayP3 => XYZ_TO_P3,
        ColorGamut::Bt2100 => XYZ_TO_BT2100,
    }
}

/// Matrix converting linear RGB from one gamut to another.
///
/// Identity when source and target agree; otherwise the composition through
/// XYZ. Total over the gamut enum.
pub fn gamut_conversion_matrix(from: ColorGamut, to: ColorGamut) -> Matrix3x3 {
    if from == to {
        return Matrix3x3::IDENTITY;
    }
    from_xyz(to).multiply(&to_xyz(from))
}

/// Luminance coefficients for a gamut: the middle row of its RGB→XYZ matrix.
pub fn luma_coefficients(gamut: ColorGamut) -> [f32; 3] {
    to_xyz(gamut).0[1]
}

/// Relative luminance of a linear RGB value in the given gamut.
#[inline]
pub fn rgb_to_luminance(rgb: [f32; 3], gamut: ColorGamut) -> f32 {
    let k = luma_coefficients(gamut);
    k[0] * rgb[0] + k[1] * rgb[1] + k[2] * rgb[2]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 2e-3;

    fn rgb_approx_eq(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < EPSILON)
    }

    #[test]
    fn xyz_matrices_are_inverses() {
        let primaries = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        for (to, from) in [
            (BT709_TO_XYZ, XYZ_TO_BT709),
            (P3_TO_XYZ, XYZ_TO_P3),
            (BT2100_TO_XYZ, XYZ_TO_BT2100),
        ] {
            for rgb in primaries {
                let back = from.transform(to.transform(rgb));
                assert!(rgb_approx_eq(rgb, back), "{:?} -> {:?}", rgb, back);
            }
        }
    }

    #[test]
    fn same_gamut_is_identity() {
        for gamut in [ColorGamut::Bt709, ColorGamut::DisplayP3, ColorGamut::Bt2100] {
            assert_eq!(
                gamut_conversion_matrix(gamut, gamut),
                Matrix3x3::IDENTITY
            );
        }
    }

    #[test]
    fn conversion_round_trips() {
        let rgb = [0.5, 0.3, 0.8];
        for (a, b) in [
            (ColorGamut::Bt709, ColorGamut::DisplayP3),
            (ColorGamut::Bt709, ColorGamut::Bt2100),
            (ColorGamut::DisplayP3, ColorGamut::Bt2100),
        ] {
            let there = gamut_conversion_matrix(a, b).transform(rgb);
            let back = gamut_conversion_matrix(b, a).transform(there);
            assert!(rgb_approx_eq(rgb, back), "{:?} <-> {:?}", a, b);
        }
    }

    #[test]
    fn white_is_preserved_across_gamuts() {
        // All three gamuts share the D65 white point.
        let white = [1.0, 1.0, 1.0];
        for (a, b) in [
            (ColorGamut::Bt709, ColorGamut::DisplayP3),
            (ColorGamut::Bt709, ColorGamut::Bt2100),
            (ColorGamut::Bt2100, ColorGamut::DisplayP3),
        ] {
            let converted = gamut_conversion_matrix(a, b).transform(white);
            assert!(rgb_approx_eq(white, converted), "{:?} -> {:?}", a, b);
        }
    }

    #[test]
    fn luminance_weights_sum_to_one() {
        for gamut in [ColorGamut::Bt709, ColorGamut::DisplayP3, ColorGamut::Bt2100] {
            let white = rgb_to_luminance([1.0, 1.0, 1.0], gamut);
            assert!((white - 1.0).abs() < EPSILON, "{:?}: {}", gamut, white);
            assert_eq!(rgb_to_luminance([0.0, 0.0, 0.0], gamut), 0.0);
        }
    }

    #[test]
    fn green_luminance_differs_per_gamut() {
        let green = [0.0, 1.0, 0.0];
        assert!((rgb_to_luminance(green, ColorGamut::Bt709) - 0.7152).abs() < 1e-3);
        assert!((rgb_to_luminance(green, ColorGamut::Bt2100) - 0.6780).abs() < 1e-3);
    }
}
