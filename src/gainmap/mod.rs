//! Gain map computation and application.
//!
//! The gain map stores the log2-scaled luminance ratio between HDR and SDR
//! renditions of the same image, allowing HDR reconstruction from the SDR
//! base at a display-chosen boost.

pub mod apply;
pub mod generate;
pub mod math;
pub mod sample;

pub use apply::*;
pub use generate::*;
pub use math::*;
pub use sample::*;
