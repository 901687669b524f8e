//! Gain map generation from an SDR + HDR image pair.

use crate::color::{
    gamut_conversion_matrix, rgb_to_luminance, yuv_to_rgb, InverseOetf, Matrix3x3,
    YuvCoefficients,
};
use crate::gainmap::math::encode_gain;
use crate::gainmap::sample::{sample_p010, sample_yuv420};
use crate::jobs::{worker_count, JobQueue, JOB_SIZE_IN_ROWS};
use crate::types::{
    nits, ColorGamut, ColorTransfer, Error, GainMap, GainMapMetadata, P010View, RawImage,
    Result, Yuv420View, GAINMAP_VERSION, MAP_SCALE_FACTOR,
};

/// Configuration for gain map generation.
#[derive(Debug, Clone)]
pub struct GainMapConfig {
    /// Decode the SDR image with BT.601 YUV coefficients regardless of its
    /// gamut (the convention for decoded JPEG bases).
    pub sdr_is_601: bool,
    /// Evaluate transfer functions through quantized lookup tables instead
    /// of the closed forms.
    pub use_luts: bool,
    /// Worker threads including the calling thread. 0 selects
    /// `min(available_parallelism, 4)`.
    pub threads: usize,
}

impl Default for GainMapConfig {
    fn default() -> Self {
        Self {
            sdr_is_601: false,
            use_luts: true,
            threads: 0,
        }
    }
}

/// One queued unit of work: a run of gain map rows and the output bytes
/// backing exactly those rows.
struct RowJob<'a> {
    map_row_start: usize,
    rows: &'a mut [u8],
}

/// Read-only state shared by every worker of one generate call.
struct GenerateContext<'a> {
    sdr: Yuv420View<'a>,
    hdr: P010View<'a>,
    sdr_coeffs: YuvCoefficients,
    hdr_coeffs: YuvCoefficients,
    sdr_inv_oetf: InverseOetf,
    hdr_inv_oetf: InverseOetf,
    hdr_gamut_conversion: Matrix3x3,
    luminance_gamut: ColorGamut,
    hdr_white_nits: f32,
    metadata: &'a GainMapMetadata,
    log2_min_boost: f32,
    log2_max_boost: f32,
    map_width: usize,
}

/// Compute a gain map and its metadata from an SDR YUV420 image and an HDR
/// P010 image of identical dimensions.
///
/// The SDR input is assumed to use the sRGB transfer function; the HDR
/// transfer function is given by `hdr_transfer` (`Linear`, `Hlg` or `Pq`).
/// The returned map is one quarter of the source resolution on each axis.
/// Both images are validated before any worker thread or output buffer is
/// created.
pub fn generate_gainmap(
    sdr: &RawImage,
    hdr: &RawImage,
    hdr_transfer: ColorTransfer,
    config: &GainMapConfig,
) -> Result<(GainMap, GainMapMetadata)> {
    if sdr.width != hdr.width || sdr.height != hdr.height {
        return Err(Error::DimensionMismatch {
            hdr_w: hdr.width,
            hdr_h: hdr.height,
            sdr_w: sdr.width,
            sdr_h: sdr.height,
        });
    }
    let sdr_view = Yuv420View::new(sdr)?;
    let hdr_view = P010View::new(hdr)?;

    let scale = MAP_SCALE_FACTOR;
    if sdr.width % scale != 0 || sdr.height % scale != 0 {
        return Err(Error::UnsupportedMapScale {
            image_w: sdr.width,
            image_h: sdr.height,
            map_w: sdr.width / scale,
            map_h: sdr.height / scale,
        });
    }
    let map_width = sdr.width / scale;
    let map_height = sdr.height / scale;

    let hdr_white_nits = match hdr_transfer {
        // Linear input clips above the HLG peak.
        ColorTransfer::Linear => nits::HLG_MAX,
        ColorTransfer::Hlg => nits::HLG_MAX,
        ColorTransfer::Pq => nits::PQ_MAX,
        ColorTransfer::Srgb => return Err(Error::InvalidTransferFunction(hdr_transfer)),
    };

    let metadata = GainMapMetadata {
        version: GAINMAP_VERSION.to_string(),
        max_content_boost: hdr_white_nits / nits::SDR_WHITE,
        min_content_boost: 1.0,
        gamma: 1.0,
        offset_sdr: 0.0,
        offset_hdr: 0.0,
        hdr_capacity_min: 1.0,
        hdr_capacity_max: hdr_white_nits / nits::SDR_WHITE,
    };

    let sdr_coeffs = if config.sdr_is_601 {
        YuvCoefficients::BT601
    } else {
        YuvCoefficients::for_gamut(sdr.gamut)
    };

    let mut map = GainMap::new(map_width, map_height)?;

    // Queue, context and the row borrows all die with this block, freeing
    // the map and metadata for the move out.
    {
        let context = GenerateContext {
            sdr: sdr_view,
            hdr: hdr_view,
            sdr_coeffs,
            hdr_coeffs: YuvCoefficients::for_gamut(hdr.gamut),
            sdr_inv_oetf: InverseOetf::new(ColorTransfer::Srgb, config.use_luts),
            hdr_inv_oetf: InverseOetf::new(hdr_transfer, config.use_luts),
            hdr_gamut_conversion: gamut_conversion_matrix(hdr.gamut, sdr.gamut),
            // Both sides use the SDR gamut's weighting; only the ratio matters.
            luminance_gamut: sdr.gamut,
            hdr_white_nits,
            metadata: &metadata,
            log2_min_boost: metadata.min_content_boost.log2(),
            log2_max_boost: metadata.max_content_boost.log2(),
            map_width: map_width as usize,
        };

        let threads = worker_count(config.threads);
        let map_rows_per_job = if threads == 1 {
            map_height as usize
        } else {
            JOB_SIZE_IN_ROWS / scale as usize
        };

        let queue = JobQueue::new();
        std::thread::scope(|s| {
            for _ in 0..threads - 1 {
                s.spawn(|| run_worker(&queue, &context));
            }
            let chunk_len = map_rows_per_job * context.map_width;
            for (i, rows) in map.data.chunks_mut(chunk_len).enumerate() {
                queue.enqueue(RowJob {
                    map_row_start: i * map_rows_per_job,
                    rows,
                });
            }
            queue.close();
            run_worker(&queue, &context);
        });
    }

    Ok((map, metadata))
}

fn run_worker(queue: &JobQueue<RowJob<'_>>, context: &GenerateContext<'_>) {
    while let Some(job) = queue.dequeue() {
        process_rows(context, job);
    }
}

fn process_rows(context: &GenerateContext<'_>, job: RowJob<'_>) {
    let scale = MAP_SCALE_FACTOR as usize;
    for (row_offset, out_row) in job.rows.chunks_mut(context.map_width).enumerate() {
        let map_y = job.map_row_start + row_offset;
        for (map_x, out) in out_row.iter_mut().enumerate() {
            let sdr_yuv = sample_yuv420(&context.sdr, scale, map_x, map_y);
            let sdr_rgb_gamma = yuv_to_rgb(sdr_yuv, context.sdr_coeffs);
            let sdr_rgb = context.sdr_inv_oetf.eval_rgb(sdr_rgb_gamma);
            let sdr_nits =
                rgb_to_luminance(sdr_rgb, context.luminance_gamut) * nits::SDR_WHITE;

            let hdr_yuv = sample_p010(&context.hdr, scale, map_x, map_y);
            let hdr_rgb_gamma = yuv_to_rgb(hdr_yuv, context.hdr_coeffs);
            let hdr_rgb = context.hdr_inv_oetf.eval_rgb(hdr_rgb_gamma);
            let hdr_rgb = context.hdr_gamut_conversion.transform(hdr_rgb);
            let hdr_nits =
                rgb_to_luminance(hdr_rgb, context.luminance_gamut) * context.hdr_white_nits;

            *out = encode_gain(
                sdr_nits,
                hdr_nits,
                context.metadata,
                context.log2_min_boost,
                context.log2_max_boost,
            );
        }
    }
}
