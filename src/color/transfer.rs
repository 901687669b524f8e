//! Opto-electronic transfer functions.
//!
//! - OETF: linear light → encoded signal
//! - inverse OETF: encoded signal → linear light
//!
//! Reference standards:
//! - sRGB: IEC 61966-2-1
//! - PQ: SMPTE ST 2084, ITU-R BT.2100
//! - HLG: ITU-R BT.2100, ARIB STD-B67
//!
//! Every function exists in closed form and as a quantized lookup table.
//! The two strategies sit behind [`InverseOetf`] / [`ForwardOetf`], chosen
//! once at construction; table error stays within output quantization
//! noise (see the module tests).

#![allow(clippy::excessive_precision)]

use crate::types::ColorTransfer;

// ============================================================================
// sRGB (IEC 61966-2-1)
// ============================================================================

/// sRGB OETF: linear `[0, 1]` → encoded `[0, 1]`.
#[inline]
pub fn srgb_oetf(linear: f32) -> f32 {
    if linear <= 0.0031308 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

/// sRGB inverse OETF: encoded `[0, 1]` → linear `[0, 1]`.
#[inline]
pub fn srgb_inv_oetf(encoded: f32) -> f32 {
    if encoded <= 0.04045 {
        encoded / 12.92
    } else {
        ((encoded + 0.055) / 1.055).powf(2.4)
    }
}

// ============================================================================
// PQ (SMPTE ST 2084 / ITU-R BT.2100)
// ============================================================================

const PQ_M1: f32 = 2610.0 / 16384.0; // 0.1593017578125
const PQ_M2: f32 = 2523.0 / 4096.0 * 128.0; // 78.84375
const PQ_C1: f32 = 3424.0 / 4096.0; // 0.8359375
const PQ_C2: f32 = 2413.0 / 4096.0 * 32.0; // 18.8515625
const PQ_C3: f32 = 2392.0 / 4096.0 * 32.0; // 18.6875

/// PQ OETF: linear `[0, 1]` (1.0 = 10000 nits) → encoded `[0, 1]`.
#[inline]
pub fn pq_oetf(linear: f32) -> f32 {
    if linear <= 0.0 {
        return 0.0;
    }
    let y_m1 = linear.powf(PQ_M1);
    ((PQ_C1 + PQ_C2 * y_m1) / (1.0 + PQ_C3 * y_m1)).powf(PQ_M2)
}

/// PQ inverse OETF: encoded `[0, 1]` → linear `[0, 1]` (1.0 = 10000 nits).
#[inline]
pub fn pq_inv_oetf(encoded: f32) -> f32 {
    if encoded <= 0.0 {
        return 0.0;
    }
    let e_inv_m2 = encoded.powf(1.0 / PQ_M2);
    let numerator = (e_inv_m2 - PQ_C1).max(0.0);
    let denominator = PQ_C2 - PQ_C3 * e_inv_m2;
    if denominator <= 0.0 {
        return 0.0;
    }
    (numerator / denominator).powf(1.0 / PQ_M1)
}

// ============================================================================
// HLG (ITU-R BT.2100 / ARIB STD-B67)
// ============================================================================

const HLG_A: f32 = 0.17883277;
const HLG_B: f32 = 0.28466892; // 1 - 4*a
const HLG_C: f32 = 0.55991073; // 0.5 - a*ln(4*a)

/// HLG OETF: scene linear `[0, 1]` → encoded `[0, 1]`.
#[inline]
pub fn hlg_oetf(linear: f32) -> f32 {
    if linear <= 0.0 {
        return 0.0;
    }
    if linear <= 1.0 / 12.0 {
        (3.0 * linear).sqrt()
    } else {
        HLG_A * (12.0 * linear - HLG_B).ln() + HLG_C
    }
}

/// HLG inverse OETF: encoded `[0, 1]` → scene linear `[0, 1]`.
#[inline]
pub fn hlg_inv_oetf(encoded: f32) -> f32 {
    if encoded <= 0.0 {
        return 0.0;
    }
    if encoded <= 0.5 {
        encoded * encoded / 3.0
    } else {
        (((encoded - HLG_C) / HLG_A).exp() + HLG_B) / 12.0
    }
}

// ============================================================================
// Strategy interface: analytic vs LUT
// ============================================================================

/// Closed-form inverse OETF for a transfer function.
#[inline]
pub fn inv_oetf(encoded: f32, transfer: ColorTransfer) -> f32 {
    match transfer {
        ColorTransfer::Srgb => srgb_inv_oetf(encoded),
        ColorTransfer::Linear => encoded,
        ColorTransfer::Hlg => hlg_inv_oetf(encoded),
        ColorTransfer::Pq => pq_inv_oetf(encoded),
    }
}

/// Closed-form OETF for a transfer function.
#[inline]
pub fn oetf(linear: f32, transfer: ColorTransfer) -> f32 {
    match transfer {
        ColorTransfer::Srgb => srgb_oetf(linear),
        ColorTransfer::Linear => linear,
        ColorTransfer::Hlg => hlg_oetf(linear),
        ColorTransfer::Pq => pq_oetf(linear),
    }
}

/// Entries in a quantized transfer table.
const TRANSFER_LUT_SIZE: usize = 4096;

/// Linearly interpolated table over the `[0, 1]` input domain.
struct TransferLut {
    table: Box<[f32]>,
}

impl TransferLut {
    fn build(f: impl Fn(f32) -> f32) -> Self {
        let table: Vec<f32> = (0..TRANSFER_LUT_SIZE)
            .map(|i| f(i as f32 / (TRANSFER_LUT_SIZE - 1) as f32))
            .collect();
        Self {
            table: table.into_boxed_slice(),
        }
    }

    #[inline]
    fn eval(&self, x: f32) -> f32 {
        let pos = x.clamp(0.0, 1.0) * (TRANSFER_LUT_SIZE - 1) as f32;
        let i = pos as usize;
        let next = (i + 1).min(TRANSFER_LUT_SIZE - 1);
        let frac = pos - i as f32;
        self.table[i] * (1.0 - frac) + self.table[next] * frac
    }
}

/// Inverse OETF evaluator, analytic or table-backed.
///
/// Built once per generate/apply call; the evaluation strategy is fixed at
/// construction so the per-pixel path has a single shape.
pub struct InverseOetf {
    transfer: ColorTransfer,
    lut: Option<TransferLut>,
}

impl InverseOetf {
    /// Create an evaluator for the given transfer function. When `use_lut`
    /// is set, evaluation goes through a quantized table instead of the
    /// closed-form transcendentals; the linear transfer never builds one.
    pub fn new(transfer: ColorTransfer, use_lut: bool) -> Self {
        let lut = (use_lut && transfer != ColorTransfer::Linear)
            .then(|| TransferLut::build(|x| inv_oetf(x, transfer)));
        Self { transfer, lut }
    }

    /// Evaluate on a single encoded channel value.
    #[inline]
    pub fn eval(&self, encoded: f32) -> f32 {
        match &self.lut {
            Some(lut) => lut.eval(encoded),
            None => inv_oetf(encoded, self.transfer),
        }
    }

    /// Evaluate on all three channels.
    #[inline]
    pub fn eval_rgb(&self, rgb: [f32; 3]) -> [f32; 3] {
        [self.eval(rgb[0]), self.eval(rgb[1]), self.eval(rgb[2])]
    }
}

/// Forward OETF evaluator, analytic or table-backed. Used on the apply path
/// to re-encode linear HDR output for HLG/PQ targets.
pub struct ForwardOetf {
    transfer: ColorTransfer,
    lut: Option<TransferLut>,
}

impl ForwardOetf {
    /// Create an evaluator for the given transfer function; see
    /// [`InverseOetf::new`].
    pub fn new(transfer: ColorTransfer, use_lut: bool) -> Self {
        let lut = (use_lut && transfer != ColorTransfer::Linear)
            .then(|| TransferLut::build(|x| oetf(x, transfer)));
        Self { transfer, lut }
    }

    /// Evaluate on a single linear channel value.
    #[inline]
    pub fn eval(&self, linear: f32) -> f32 {
        match &self.lut {
            Some(lut) => lut.eval(linear),
            None => oetf(linear, self.transfer),
        }
    }

    /// Evaluate on all three channels.
    #[inline]
    pub fn eval_rgb(&self, rgb: [f32; 3]) -> [f32; 3] {
        [self.eval(rgb[0]), self.eval(rgb[1]), self.eval(rgb[2])]
    }
}
