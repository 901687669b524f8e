//! Gain map computation and application engine for Ultra HDR images.
//!
//! Ultra HDR stores HDR content in a backwards-compatible container: a
//! standard SDR base image plus a low-resolution gain map and recovery
//! metadata. Legacy viewers see the SDR rendition; HDR-capable displays
//! reconstruct the full dynamic range by boosting the base image with the
//! gain map.
//!
//! This crate is the numeric core of that pipeline and exposes two entry
//! points:
//! - [`generate_gainmap`]: derive a quarter-resolution gain map and its
//!   metadata from an SDR YUV420 + HDR P010 image pair.
//! - [`apply_gainmap`]: reconstruct an HDR rendition (linear F16, linear
//!   10-bit planar, HLG or PQ RGBA1010102) from an SDR image, a gain map
//!   and a display boost.
//!
//! Container parsing and muxing, codec calls, ICC/XMP handling and
//! geometric editing live in the surrounding pipeline; everything crosses
//! this boundary as in-memory [`RawImage`] / [`GainMap`] /
//! [`GainMapMetadata`] values.
//!
//! Both entry points parallelize over image rows internally and return only
//! after every row is processed; see the `jobs` module. Output is
//! deterministic regardless of worker count.
//!
//! # Example
//!
//! ```ignore
//! use uhdr_gainmap::{
//!     apply_gainmap, generate_gainmap, ApplyConfig, ColorTransfer,
//!     GainMapConfig, OutputFormat,
//! };
//!
//! let (gainmap, metadata) =
//!     generate_gainmap(&sdr, &hdr, ColorTransfer::Hlg, &GainMapConfig::default())?;
//!
//! let hdr_output = apply_gainmap(
//!     &sdr,
//!     &gainmap,
//!     &metadata,
//!     OutputFormat::HdrLinear,
//!     4.0,
//!     &ApplyConfig::default(),
//! )?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod color;
pub mod gainmap;
mod jobs;
pub mod tonemap;
mod types;

// Re-export core types
pub use types::{
    nits, ColorGamut, ColorTransfer, Error, GainMap, GainMapMetadata, OutputFormat,
    PixelFormat, RawImage, Result, GAINMAP_VERSION, MAP_SCALE_FACTOR,
};

// Re-export the engine entry points and their configs
pub use gainmap::apply::{apply_gainmap, ApplyConfig};
pub use gainmap::generate::{generate_gainmap, GainMapConfig};
pub use tonemap::tone_map;

/// Safety limits for input validation and allocation.
pub mod limits {
    /// Maximum image dimension (width or height).
    pub const MAX_IMAGE_DIMENSION: u32 = 65535;

    /// Maximum total pixels (width * height).
    pub const MAX_TOTAL_PIXELS: u64 = 500_000_000; // 500 megapixels
}
