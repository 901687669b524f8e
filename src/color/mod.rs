//! Color pipeline: YUV decoding, transfer functions, gamut handling.

pub mod gamut;
pub mod transfer;
pub mod ycbcr;

pub use gamut::*;
pub use transfer::*;
pub use ycbcr::*;
