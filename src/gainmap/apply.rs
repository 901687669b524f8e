//! Gain map application: HDR reconstruction from an SDR base.

use half::f16;

use crate::color::{yuv_to_rgb, ForwardOetf, InverseOetf, YuvCoefficients};
use crate::gainmap::math::{apply_gain, GainLut};
use crate::gainmap::sample::ShepardsIdw;
use crate::jobs::{worker_count, JobQueue};
use crate::types::{
    ColorTransfer, Error, GainMap, GainMapMetadata, OutputFormat, PixelFormat, RawImage,
    Result, Yuv420View,
};

/// Configuration for gain map application.
#[derive(Debug, Clone)]
pub struct ApplyConfig {
    /// Evaluate transfer functions and gain factors through precomputed
    /// lookup tables instead of the closed forms.
    pub use_luts: bool,
    /// Worker threads including the calling thread. 0 selects
    /// `min(available_parallelism, 4)`.
    pub threads: usize,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            use_luts: true,
            threads: 0,
        }
    }
}

/// Output rows owned by one job. Packed formats hand out one contiguous
/// byte range; the planar format hands out the matching rows of all three
/// planes.
enum OutputRows<'a> {
    Packed(&'a mut [u8]),
    Planar {
        r: &'a mut [u8],
        g: &'a mut [u8],
        b: &'a mut [u8],
    },
}

struct RowJob<'a> {
    row_start: usize,
    rows: OutputRows<'a>,
}

/// Read-only state shared by every worker of one apply call.
struct ApplyContext<'a> {
    sdr: Yuv420View<'a>,
    gainmap: &'a GainMap,
    metadata: &'a GainMapMetadata,
    sdr_inv_oetf: InverseOetf,
    hdr_oetf: ForwardOetf,
    idw: ShepardsIdw,
    gain_lut: Option<GainLut>,
    display_boost: f32,
    output_format: OutputFormat,
    width: usize,
}

impl ApplyContext<'_> {
    /// Reconstruct the linear HDR pixel at an image position, normalized by
    /// the display boost so every output encoding sees `[0, 1]`.
    #[inline]
    fn reconstruct(&self, x: usize, y: usize) -> [f32; 3] {
        let yuv = self.sdr.get(x, y);
        // The SDR base is a decoded JPEG: always Rec.601 YUV coefficients,
        // always sRGB transfer.
        let rgb_gamma = yuv_to_rgb(yuv, YuvCoefficients::BT601);
        let rgb_sdr = self.sdr_inv_oetf.eval_rgb(rgb_gamma);

        let gain = self.idw.sample(self.gainmap, x, y);
        let rgb_hdr = match &self.gain_lut {
            Some(lut) => lut.apply(rgb_sdr, gain),
            None => apply_gain(rgb_sdr, gain, self.metadata, self.display_boost),
        };
        [
            rgb_hdr[0] / self.display_boost,
            rgb_hdr[1] / self.display_boost,
            rgb_hdr[2] / self.display_boost,
        ]
    }
}

/// Reconstruct an HDR image from an SDR base, a gain map and its metadata.
///
/// `max_display_boost` is the maximum boost the target display supports;
/// the effective boost is its minimum with the metadata's max content
/// boost. The gain map dimensions must divide the SDR dimensions by the
/// same integer factor on both axes. All inputs are validated before any
/// worker thread or output buffer is created.
pub fn apply_gainmap(
    sdr: &RawImage,
    gainmap: &GainMap,
    metadata: &GainMapMetadata,
    output_format: OutputFormat,
    max_display_boost: f32,
    config: &ApplyConfig,
) -> Result<RawImage> {
    let sdr_view = Yuv420View::new(sdr)?;
    metadata.validate_apply_profile()?;

    if !(max_display_boost >= 1.0) || !max_display_boost.is_finite() {
        return Err(Error::InvalidDisplayBoost(max_display_boost));
    }

    let (pixel_format, transfer) = match output_format {
        OutputFormat::HdrLinear => (PixelFormat::Rgba16F, ColorTransfer::Linear),
        OutputFormat::HdrLinearRgb10Bit => (PixelFormat::Rgb10Planar, ColorTransfer::Linear),
        OutputFormat::HdrHlg => (PixelFormat::Rgba1010102, ColorTransfer::Hlg),
        OutputFormat::HdrPq => (PixelFormat::Rgba1010102, ColorTransfer::Pq),
        // SDR decoding is the surrounding decoder's path, not the engine's.
        OutputFormat::Sdr => return Err(Error::InvalidOutputFormat(output_format)),
    };

    let scale_mismatch = Error::UnsupportedMapScale {
        image_w: sdr.width,
        image_h: sdr.height,
        map_w: gainmap.width,
        map_h: gainmap.height,
    };
    if sdr.width % gainmap.width != 0 || sdr.height % gainmap.height != 0 {
        return Err(scale_mismatch);
    }
    if sdr.width as u64 * gainmap.height as u64 != sdr.height as u64 * gainmap.width as u64 {
        return Err(scale_mismatch);
    }
    let map_scale_factor = (sdr.width / gainmap.width) as usize;

    let width = sdr.width as usize;
    let height = sdr.height as usize;
    let display_boost = max_display_boost.min(metadata.max_content_boost);

    let mut out = RawImage::new(sdr.width, sdr.height, pixel_format)?;
    out.gamut = sdr.gamut;
    out.transfer = transfer;

    // Queue, context and the row borrows all die with this block, freeing
    // the output image for the move out.
    {
        let context = ApplyContext {
            sdr: sdr_view,
            gainmap,
            metadata,
            sdr_inv_oetf: InverseOetf::new(ColorTransfer::Srgb, config.use_luts),
            // Identity for the linear outputs, HLG/PQ re-encode otherwise.
            hdr_oetf: ForwardOetf::new(transfer, config.use_luts),
            idw: ShepardsIdw::new(map_scale_factor),
            gain_lut: config.use_luts.then(|| GainLut::new(metadata, display_boost)),
            display_boost,
            output_format,
            width,
        };

        let threads = worker_count(config.threads);
        let rows_per_job = if threads == 1 { height } else { map_scale_factor };

        let queue = JobQueue::new();
        std::thread::scope(|s| {
            for _ in 0..threads - 1 {
                s.spawn(|| run_worker(&queue, &context));
            }
            match pixel_format {
                PixelFormat::Rgb10Planar => {
                    let plane_len = width * height * 2;
                    let (r_plane, rest) = out.data.split_at_mut(plane_len);
                    let (g_plane, b_plane) = rest.split_at_mut(plane_len);
                    let chunk_len = rows_per_job * width * 2;
                    let chunks = r_plane
                        .chunks_mut(chunk_len)
                        .zip(g_plane.chunks_mut(chunk_len))
                        .zip(b_plane.chunks_mut(chunk_len));
                    for (i, ((r, g), b)) in chunks.enumerate() {
                        queue.enqueue(RowJob {
                            row_start: i * rows_per_job,
                            rows: OutputRows::Planar { r, g, b },
                        });
                    }
                }
                _ => {
                    let bpp = if pixel_format == PixelFormat::Rgba16F { 8 } else { 4 };
                    let chunk_len = rows_per_job * width * bpp;
                    for (i, rows) in out.data.chunks_mut(chunk_len).enumerate() {
                        queue.enqueue(RowJob {
                            row_start: i * rows_per_job,
                            rows: OutputRows::Packed(rows),
                        });
                    }
                }
            }
            queue.close();
            run_worker(&queue, &context);
        });
    }

    Ok(out)
}

fn run_worker(queue: &JobQueue<RowJob<'_>>, context: &ApplyContext<'_>) {
    while let Some(job) = queue.dequeue() {
        process_rows(context, job);
    }
}

fn process_rows(context: &ApplyContext<'_>, job: RowJob<'_>) {
    match job.rows {
        OutputRows::Packed(rows) => {
            let bpp = if context.output_format == OutputFormat::HdrLinear {
                8
            } else {
                4
            };
            for (row_offset, row) in rows.chunks_mut(context.width * bpp).enumerate() {
                let y = job.row_start + row_offset;
                for x in 0..context.width {
                    let rgb = context.reconstruct(x, y);
                    match context.output_format {
                        OutputFormat::HdrLinear => {
                            write_rgba_f16(&mut row[x * 8..x * 8 + 8], rgb);
                        }
                        _ => {
                            let rgb_gamma = context.hdr_oetf.eval_rgb(rgb);
                            let packed = pack_rgba1010102(rgb_gamma);
                            row[x * 4..x * 4 + 4].copy_from_slice(&packed.to_le_bytes());
                        }
                    }
                }
            }
        }
        OutputRows::Planar { r, g, b } => {
            let row_len = context.width * 2;
            let rows = r
                .chunks_mut(row_len)
                .zip(g.chunks_mut(row_len))
                .zip(b.chunks_mut(row_len));
            for (row_offset, ((r_row, g_row), b_row)) in rows.enumerate() {
                let y = job.row_start + row_offset;
                for x in 0..context.width {
                    let rgb = context.reconstruct(x, y);
                    write_channel10(r_row, x, rgb[0]);
                    write_channel10(g_row, x, rgb[1]);
                    write_channel10(b_row, x, rgb[2]);
                }
            }
        }
    }
}

/// Pack linear RGB and opaque alpha into little-endian RGBA F16.
#[inline]
fn write_rgba_f16(out: &mut [u8], rgb: [f32; 3]) {
    out[0..2].copy_from_slice(&f16::from_f32(rgb[0]).to_le_bytes());
    out[2..4].copy_from_slice(&f16::from_f32(rgb[1]).to_le_bytes());
    out[4..6].copy_from_slice(&f16::from_f32(rgb[2]).to_le_bytes());
    out[6..8].copy_from_slice(&f16::from_f32(1.0).to_le_bytes());
}

/// Pack gamma-encoded RGB and full alpha into an RGBA1010102 word.
#[inline]
fn pack_rgba1010102(rgb: [f32; 3]) -> u32 {
    let r = (rgb[0] * 1023.0).round().clamp(0.0, 1023.0) as u32;
    let g = (rgb[1] * 1023.0).round().clamp(0.0, 1023.0) as u32;
    let b = (rgb[2] * 1023.0).round().clamp(0.0, 1023.0) as u32;
    r | (g << 10) | (b << 20) | (0x3 << 30)
}

/// Write one 10-bit linear channel sample into its plane row.
#[inline]
fn write_channel10(row: &mut [u8], x: usize, value: f32) {
    let v = (value * 1023.0).round().clamp(0.0, 1023.0) as u16;
    row[x * 2..x * 2 + 2].copy_from_slice(&v.to_le_bytes());
}
