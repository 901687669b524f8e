//! Core types for the gain map engine.

use thiserror::Error;

use crate::limits;

/// Errors that can occur during gain map operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Image dimensions are invalid (zero).
    #[error("invalid image dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// HDR and SDR images have different dimensions.
    #[error("dimension mismatch: HDR is {hdr_w}x{hdr_h}, SDR is {sdr_w}x{sdr_h}")]
    DimensionMismatch {
        /// HDR image width.
        hdr_w: u32,
        /// HDR image height.
        hdr_h: u32,
        /// SDR image width.
        sdr_w: u32,
        /// SDR image height.
        sdr_h: u32,
    },

    /// The pixel format is recognized but not supported for this operation.
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),

    /// The transfer function is not valid for the HDR input.
    #[error("invalid HDR transfer function: {0:?}")]
    InvalidTransferFunction(ColorTransfer),

    /// The requested display boost is below 1.0.
    #[error("display boost must be >= 1.0, got {0}")]
    InvalidDisplayBoost(f32),

    /// The output format is not produced by the gain map engine.
    #[error("invalid output format: {0:?}")]
    InvalidOutputFormat(OutputFormat),

    /// Gain map metadata violates an invariant or an unsupported profile.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Gain map dimensions do not divide the image dimensions by an
    /// identical integer factor on both axes.
    #[error(
        "unsupported map scale factor: image is {image_w}x{image_h}, \
         gain map is {map_w}x{map_h}"
    )]
    UnsupportedMapScale {
        /// Base image width.
        image_w: u32,
        /// Base image height.
        image_h: u32,
        /// Gain map width.
        map_w: u32,
        /// Gain map height.
        map_h: u32,
    },

    /// Pixel data is missing, undersized, or inconsistent with the strides.
    #[error("invalid pixel data: {0}")]
    InvalidPixelData(String),

    /// Input exceeds safety limits.
    #[error("input exceeds safety limit: {0}")]
    LimitExceeded(String),
}

/// Result type for gain map operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Color gamut / color space primaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorGamut {
    /// BT.709 / sRGB primaries
    #[default]
    Bt709,
    /// Display P3 primaries
    DisplayP3,
    /// BT.2100 / BT.2020 primaries (wide gamut for HDR)
    Bt2100,
}

/// Opto-electronic transfer function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorTransfer {
    /// sRGB transfer function (IEC 61966-2-1)
    #[default]
    Srgb,
    /// Linear (gamma 1.0)
    Linear,
    /// Hybrid Log-Gamma (ITU-R BT.2100) - HDR
    Hlg,
    /// Perceptual Quantizer (SMPTE ST 2084) - HDR
    Pq,
}

/// Pixel format for raw images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 10-bit YCbCr 4:2:0, 16-bit samples with data in the upper 10 bits (HDR)
    P010,
    /// 8-bit planar YCbCr 4:2:0 (SDR)
    Yuv420,
    /// 16-bit float RGBA (HDR linear)
    Rgba16F,
    /// 10-bit planar linear RGB, 16-bit little-endian samples per plane
    Rgb10Planar,
    /// 10-bit packed RGBA (R10 G10 B10 A2), little-endian u32 per pixel
    Rgba1010102,
}

/// Target output encodings for HDR reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// SDR in 8-bit RGBA; produced by the surrounding decoder, not this engine.
    Sdr,
    /// HDR in linear RGBA F16.
    HdrLinear,
    /// HDR in planar linear 10-bit RGB; intermediate for the 10-bit HEIF
    /// encode path.
    HdrLinearRgb10Bit,
    /// HDR in RGBA1010102 with HLG transfer.
    HdrHlg,
    /// HDR in RGBA1010102 with PQ transfer.
    HdrPq,
}

/// Reference display luminance values (in nits).
pub mod nits {
    /// SDR reference white.
    pub const SDR_WHITE: f32 = 100.0;

    /// HLG nominal peak luminance.
    pub const HLG_MAX: f32 = 1000.0;

    /// PQ peak luminance.
    pub const PQ_MAX: f32 = 10000.0;
}

/// Gain map format version written into generated metadata and required by
/// the applicator.
pub const GAINMAP_VERSION: &str = "1.0";

/// Ratio between base image dimensions and generated gain map dimensions.
/// The map is quarter resolution, one sixteenth of the area.
pub const MAP_SCALE_FACTOR: u32 = 4;

/// A raw (uncompressed) image or HDR reconstruction output.
///
/// The planar stride and chroma fields mirror the loose caller-facing
/// descriptor of the surrounding pipeline: a zero stride means "equal to the
/// plane's logical width", and a `None` chroma offset means the chroma
/// plane(s) immediately follow the luma plane in `data`. Processing code
/// never reads these fields directly; it goes through a resolved view
/// (`Yuv420View` / `P010View`) that normalizes them first.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// Color gamut.
    pub gamut: ColorGamut,
    /// Transfer function of the stored samples.
    pub transfer: ColorTransfer,
    /// Pixel data (layout depends on format).
    pub data: Vec<u8>,
    /// Luma (or packed row) stride in pixels. 0 means equal to `width`.
    pub luma_stride: u32,
    /// Chroma stride in pixels. 0 derives it from the luma stride
    /// (`luma_stride` for P010, `luma_stride / 2` for YUV420).
    pub chroma_stride: u32,
    /// Byte offset of the chroma plane(s) within `data`. `None` places them
    /// immediately after the luma plane.
    pub chroma_offset: Option<usize>,
}

impl RawImage {
    /// Create a zero-filled image with tight strides.
    ///
    /// Returns an error if dimensions are zero or exceed safety limits.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        Self::validate_dimensions(width, height)?;
        let size = Self::tight_data_size(width, height, format);
        Ok(Self {
            width,
            height,
            format,
            gamut: ColorGamut::default(),
            transfer: ColorTransfer::default(),
            data: vec![0u8; size],
            luma_stride: 0,
            chroma_stride: 0,
            chroma_offset: None,
        })
    }

    /// Wrap existing pixel data with tight strides.
    ///
    /// The buffer must be at least as large as the format requires; strides
    /// and chroma placement can be adjusted on the returned value before the
    /// image is handed to the engine.
    pub fn from_data(
        width: u32,
        height: u32,
        format: PixelFormat,
        gamut: ColorGamut,
        transfer: ColorTransfer,
        data: Vec<u8>,
    ) -> Result<Self> {
        Self::validate_dimensions(width, height)?;
        let expected = Self::tight_data_size(width, height, format);
        if data.len() < expected {
            return Err(Error::InvalidPixelData(format!(
                "buffer too small: expected at least {} bytes, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            gamut,
            transfer,
            data,
            luma_stride: 0,
            chroma_stride: 0,
            chroma_offset: None,
        })
    }

    pub(crate) fn validate_dimensions(width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions(width, height));
        }
        if width > limits::MAX_IMAGE_DIMENSION || height > limits::MAX_IMAGE_DIMENSION {
            return Err(Error::LimitExceeded(format!(
                "dimension {} exceeds maximum {}",
                width.max(height),
                limits::MAX_IMAGE_DIMENSION
            )));
        }
        let total = width as u64 * height as u64;
        if total > limits::MAX_TOTAL_PIXELS {
            return Err(Error::LimitExceeded(format!(
                "total pixels {} exceeds maximum {}",
                total, limits::MAX_TOTAL_PIXELS
            )));
        }
        Ok(())
    }

    /// Buffer size for tightly packed data in the given format.
    fn tight_data_size(width: u32, height: u32, format: PixelFormat) -> usize {
        let (w, h) = (width as usize, height as usize);
        match format {
            // Y plane + two quarter-size chroma planes.
            PixelFormat::Yuv420 => w * h + 2 * ((w / 2) * (h / 2)),
            // 16-bit Y plane + 16-bit interleaved UV plane at half height.
            PixelFormat::P010 => 2 * w * h + 2 * (w * (h / 2)),
            PixelFormat::Rgba16F => w * h * 8,
            PixelFormat::Rgb10Planar => w * h * 3 * 2,
            PixelFormat::Rgba1010102 => w * h * 4,
        }
    }
}

/// Resolved, immutable view of an 8-bit YUV 4:2:0 image.
///
/// Construction normalizes the loose descriptor fields (zero strides,
/// implicit chroma placement) and validates that the buffer covers every
/// plane, so the pixel accessors cannot read out of bounds.
#[derive(Clone, Copy)]
pub(crate) struct Yuv420View<'a> {
    width: usize,
    height: usize,
    luma_stride: usize,
    chroma_stride: usize,
    luma: &'a [u8],
    cb: &'a [u8],
    cr: &'a [u8],
}

impl<'a> Yuv420View<'a> {
    pub(crate) fn new(image: &'a RawImage) -> Result<Self> {
        if image.format != PixelFormat::Yuv420 {
            return Err(Error::UnsupportedFormat(image.format));
        }
        let width = image.width as usize;
        let height = image.height as usize;

        let luma_stride = resolve_stride(image.luma_stride, width, "luma")?;
        let (chroma_offset, chroma_stride) = match image.chroma_offset {
            Some(offset) => (
                offset,
                resolve_stride(image.chroma_stride, width / 2, "chroma")?,
            ),
            // Chroma follows luma; its stride derives from the luma stride.
            None => (luma_stride * height, luma_stride / 2),
        };

        let luma_len = luma_stride * height;
        let chroma_plane_len = chroma_stride * (height / 2);
        let required = chroma_offset
            .checked_add(2 * chroma_plane_len)
            .ok_or_else(|| Error::InvalidPixelData("chroma offset overflow".into()))?;
        if image.data.len() < required || image.data.len() < luma_len {
            return Err(Error::InvalidPixelData(format!(
                "YUV420 buffer too small: need {} bytes, have {}",
                required.max(luma_len),
                image.data.len()
            )));
        }

        let chroma = &image.data[chroma_offset..];
        Ok(Self {
            width,
            height,
            luma_stride,
            chroma_stride,
            luma: &image.data[..luma_len],
            cb: &chroma[..chroma_plane_len],
            cr: &chroma[chroma_plane_len..2 * chroma_plane_len],
        })
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn height(&self) -> usize {
        self.height
    }

    /// Gamma-domain YUV sample at a pixel position. Y in `[0, 1]`, chroma
    /// centered on zero.
    #[inline]
    pub(crate) fn get(&self, x: usize, y: usize) -> [f32; 3] {
        let y_uint = self.luma[y * self.luma_stride + x];
        let chroma_idx = (y / 2) * self.chroma_stride + x / 2;
        let u_uint = self.cb[chroma_idx];
        let v_uint = self.cr[chroma_idx];
        [
            y_uint as f32 / 255.0,
            (u_uint as f32 - 128.0) / 255.0,
            (v_uint as f32 - 128.0) / 255.0,
        ]
    }
}

/// Resolved, immutable view of a 10-bit P010 image (16-bit samples, data in
/// the upper 10 bits, interleaved UV plane).
#[derive(Clone, Copy)]
pub(crate) struct P010View<'a> {
    width: usize,
    height: usize,
    luma_stride: usize,
    chroma_stride: usize,
    luma: &'a [u8],
    chroma: &'a [u8],
}

impl<'a> P010View<'a> {
    pub(crate) fn new(image: &'a RawImage) -> Result<Self> {
        if image.format != PixelFormat::P010 {
            return Err(Error::UnsupportedFormat(image.format));
        }
        let width = image.width as usize;
        let height = image.height as usize;

        let luma_stride = resolve_stride(image.luma_stride, width, "luma")?;
        let (chroma_offset, chroma_stride) = match image.chroma_offset {
            Some(offset) => (offset, resolve_stride(image.chroma_stride, width, "chroma")?),
            None => (luma_stride * height * 2, luma_stride),
        };

        let luma_len = luma_stride * height * 2;
        let chroma_len = chroma_stride * (height / 2) * 2;
        let required = chroma_offset
            .checked_add(chroma_len)
            .ok_or_else(|| Error::InvalidPixelData("chroma offset overflow".into()))?;
        if image.data.len() < required || image.data.len() < luma_len {
            return Err(Error::InvalidPixelData(format!(
                "P010 buffer too small: need {} bytes, have {}",
                required.max(luma_len),
                image.data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            luma_stride,
            chroma_stride,
            luma: &image.data[..luma_len],
            chroma: &image.data[chroma_offset..chroma_offset + chroma_len],
        })
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn sample16(plane: &[u8], index: usize) -> u16 {
        u16::from_le_bytes([plane[index * 2], plane[index * 2 + 1]]) >> 6
    }

    /// Raw 10-bit luma sample at a pixel position.
    #[inline]
    pub(crate) fn luma10(&self, x: usize, y: usize) -> u16 {
        Self::sample16(self.luma, y * self.luma_stride + x)
    }

    /// Raw 10-bit chroma pair for a pixel position.
    #[inline]
    pub(crate) fn chroma10(&self, x: usize, y: usize) -> (u16, u16) {
        let uv_idx = (y / 2) * self.chroma_stride + (x & !1);
        (
            Self::sample16(self.chroma, uv_idx),
            Self::sample16(self.chroma, uv_idx + 1),
        )
    }

    /// Gamma-domain YUV sample at a pixel position. Y in `[0, 1]`, chroma
    /// centered on zero.
    #[inline]
    pub(crate) fn get(&self, x: usize, y: usize) -> [f32; 3] {
        let y_uint = Self::sample16(self.luma, y * self.luma_stride + x);
        let uv_idx = (y / 2) * self.chroma_stride + (x & !1);
        let u_uint = Self::sample16(self.chroma, uv_idx);
        let v_uint = Self::sample16(self.chroma, uv_idx + 1);
        [
            y_uint as f32 / 1023.0,
            (u_uint as f32 - 512.0) / 1023.0,
            (v_uint as f32 - 512.0) / 1023.0,
        ]
    }
}

fn resolve_stride(stride: u32, logical_width: usize, plane: &str) -> Result<usize> {
    let stride = stride as usize;
    if stride == 0 {
        Ok(logical_width)
    } else if stride < logical_width {
        Err(Error::InvalidPixelData(format!(
            "{} stride {} is smaller than plane width {}",
            plane, stride, logical_width
        )))
    } else {
        Ok(stride)
    }
}

/// A single-channel gain map image.
///
/// Each pixel is one encoded byte representing log2-space interpolated gain
/// between the metadata's min and max content boost.
#[derive(Debug, Clone)]
pub struct GainMap {
    /// Width of the gain map.
    pub width: u32,
    /// Height of the gain map.
    pub height: u32,
    /// Encoded gain values, row-major, one byte per pixel.
    pub data: Vec<u8>,
}

impl GainMap {
    /// Create a zero-filled gain map.
    ///
    /// Returns an error if dimensions are zero or exceed safety limits.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        RawImage::validate_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize],
        })
    }

    /// Normalized gain value of a map texel, in `[0, 1]`.
    #[inline]
    pub(crate) fn texel(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width as usize + x] as f32 / 255.0
    }
}

/// Gain map metadata.
///
/// All values are stored linear. This differs from the XMP serialization,
/// where the content boosts and HDR capacities are stored in log2 space.
#[derive(Debug, Clone, PartialEq)]
pub struct GainMapMetadata {
    /// Gain map format version.
    pub version: String,
    /// Maximum content boost (HDR/SDR luminance ratio) for the map.
    pub max_content_boost: f32,
    /// Minimum content boost for the map.
    pub min_content_boost: f32,
    /// Gamma applied to the encoded map data.
    pub gamma: f32,
    /// Offset added to SDR values in map calculations.
    pub offset_sdr: f32,
    /// Offset added to HDR values in map calculations.
    pub offset_hdr: f32,
    /// Display boost at which the map starts to apply.
    pub hdr_capacity_min: f32,
    /// Display boost at which the map applies completely.
    pub hdr_capacity_max: f32,
}

impl Default for GainMapMetadata {
    fn default() -> Self {
        Self {
            version: GAINMAP_VERSION.to_string(),
            max_content_boost: 1.0,
            min_content_boost: 1.0,
            gamma: 1.0,
            offset_sdr: 0.0,
            offset_hdr: 0.0,
            hdr_capacity_min: 1.0,
            hdr_capacity_max: 1.0,
        }
    }
}

impl GainMapMetadata {
    /// Validate the general metadata invariants.
    pub fn validate(&self) -> Result<()> {
        let finite_positive = |name: &str, v: f32| -> Result<()> {
            if !v.is_finite() || v <= 0.0 {
                return Err(Error::InvalidMetadata(format!(
                    "{} must be positive finite, got {}",
                    name, v
                )));
            }
            Ok(())
        };
        finite_positive("max_content_boost", self.max_content_boost)?;
        finite_positive("min_content_boost", self.min_content_boost)?;
        finite_positive("gamma", self.gamma)?;
        if self.max_content_boost < self.min_content_boost {
            return Err(Error::InvalidMetadata(format!(
                "max_content_boost {} < min_content_boost {}",
                self.max_content_boost, self.min_content_boost
            )));
        }
        if !self.offset_sdr.is_finite() || self.offset_sdr < 0.0 {
            return Err(Error::InvalidMetadata(format!(
                "offset_sdr must be non-negative finite, got {}",
                self.offset_sdr
            )));
        }
        if !self.offset_hdr.is_finite() || self.offset_hdr < 0.0 {
            return Err(Error::InvalidMetadata(format!(
                "offset_hdr must be non-negative finite, got {}",
                self.offset_hdr
            )));
        }
        if !self.hdr_capacity_min.is_finite() || self.hdr_capacity_min < 1.0 {
            return Err(Error::InvalidMetadata(format!(
                "hdr_capacity_min must be >= 1.0, got {}",
                self.hdr_capacity_min
            )));
        }
        if !self.hdr_capacity_max.is_finite() || self.hdr_capacity_max < self.hdr_capacity_min {
            return Err(Error::InvalidMetadata(format!(
                "hdr_capacity_max {} < hdr_capacity_min {}",
                self.hdr_capacity_max, self.hdr_capacity_min
            )));
        }
        Ok(())
    }

    /// Validate the profile the applicator currently supports: version
    /// `"1.0"`, identity gamma, zero offsets, and HDR capacities equal to
    /// the content boosts.
    pub fn validate_apply_profile(&self) -> Result<()> {
        self.validate()?;
        if self.version != GAINMAP_VERSION {
            return Err(Error::InvalidMetadata(format!(
                "unsupported metadata version: {}",
                self.version
            )));
        }
        if self.gamma != 1.0 {
            return Err(Error::InvalidMetadata(format!(
                "unsupported metadata gamma: {}",
                self.gamma
            )));
        }
        if self.offset_sdr != 0.0 || self.offset_hdr != 0.0 {
            return Err(Error::InvalidMetadata(format!(
                "unsupported metadata offsets sdr, hdr: {}, {}",
                self.offset_sdr, self.offset_hdr
            )));
        }
        if self.hdr_capacity_min != self.min_content_boost
            || self.hdr_capacity_max != self.max_content_boost
        {
            return Err(Error::InvalidMetadata(format!(
                "unsupported metadata hdr capacity min, max: {}, {}",
                self.hdr_capacity_min, self.hdr_capacity_max
            )));
        }
        Ok(())
    }
}
