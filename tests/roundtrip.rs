//! End-to-end gain map tests: generate from a synthetic SDR/HDR pair,
//! apply back, and check the reconstruction against the known boost.

use half::f16;
use uhdr_gainmap::color::{hlg_oetf, pq_oetf, srgb_inv_oetf};
use uhdr_gainmap::{
    apply_gainmap, generate_gainmap, nits, ApplyConfig, ColorGamut, ColorTransfer, Error,
    GainMap, GainMapConfig, OutputFormat, PixelFormat, RawImage,
};

/// Solid SDR YUV420 image: constant luma, neutral chroma, BT.709 sRGB.
fn sdr_solid(width: u32, height: u32, luma: u8) -> RawImage {
    let mut img = RawImage::new(width, height, PixelFormat::Yuv420).unwrap();
    img.gamut = ColorGamut::Bt709;
    img.transfer = ColorTransfer::Srgb;
    let luma_len = (width * height) as usize;
    img.data[..luma_len].fill(luma);
    img.data[luma_len..].fill(128);
    img
}

/// Solid HDR P010 image: constant 10-bit luma, neutral chroma.
fn hdr_solid(width: u32, height: u32, luma10: u16, gamut: ColorGamut) -> RawImage {
    let mut img = RawImage::new(width, height, PixelFormat::P010).unwrap();
    img.gamut = gamut;
    let luma_len = (width * height) as usize;
    let y_bytes = (luma10 << 6).to_le_bytes();
    let uv_bytes = (512u16 << 6).to_le_bytes();
    for i in 0..luma_len {
        img.data[i * 2..i * 2 + 2].copy_from_slice(&y_bytes);
    }
    for i in 0..(width * (height / 2)) as usize {
        let idx = luma_len * 2 + i * 2;
        img.data[idx..idx + 2].copy_from_slice(&uv_bytes);
    }
    img
}

/// SDR image with a horizontal luma gradient (exercises every block value).
fn sdr_gradient(width: u32, height: u32) -> RawImage {
    let mut img = sdr_solid(width, height, 0);
    for y in 0..height as usize {
        for x in 0..width as usize {
            img.data[y * width as usize + x] = (16 + (x * 3) % 220) as u8;
        }
    }
    img
}

/// HDR image with a vertical luma gradient.
fn hdr_gradient(width: u32, height: u32) -> RawImage {
    let mut img = hdr_solid(width, height, 0, ColorGamut::Bt2100);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let v = (64 + (y * 11) % 800) as u16;
            let bytes = (v << 6).to_le_bytes();
            let idx = (y * width as usize + x) * 2;
            img.data[idx..idx + 2].copy_from_slice(&bytes);
        }
    }
    img
}

fn read_f16_pixel(img: &RawImage, x: usize, y: usize) -> [f32; 3] {
    let idx = (y * img.width as usize + x) * 8;
    let read = |o: usize| f16::from_le_bytes([img.data[idx + o], img.data[idx + o + 1]]).to_f32();
    [read(0), read(2), read(4)]
}

/// The full scenario: a mid-gray 64x64 SDR base paired with an HLG HDR
/// image at exactly twice its linear luminance must encode a uniform map
/// for ratio 2, and applying it back at full display boost must reproduce
/// twice the SDR linear RGB (normalized by the boost).
#[test]
fn mid_gray_double_boost_round_trip() {
    let sdr = sdr_solid(64, 64, 128);

    // Build the HLG companion at 2x the SDR linear luminance.
    let sdr_linear = srgb_inv_oetf(128.0 / 255.0);
    let hdr_scene_linear = 2.0 * sdr_linear * nits::SDR_WHITE / nits::HLG_MAX;
    let hdr_encoded = hlg_oetf(hdr_scene_linear);
    let luma10 = (hdr_encoded * 1023.0).round() as u16;
    let hdr = hdr_solid(64, 64, luma10, ColorGamut::Bt2100);

    let (gainmap, metadata) =
        generate_gainmap(&sdr, &hdr, ColorTransfer::Hlg, &GainMapConfig::default()).unwrap();

    assert_eq!(gainmap.width, 16);
    assert_eq!(gainmap.height, 16);
    assert_eq!(metadata.min_content_boost, 1.0);
    assert_eq!(metadata.max_content_boost, nits::HLG_MAX / nits::SDR_WHITE);
    assert_eq!(metadata.hdr_capacity_max, metadata.max_content_boost);

    // Every map byte encodes a ratio of ~2.0.
    let log2_range = metadata.max_content_boost.log2();
    let expected_byte = (2.0f32.log2() / log2_range * 255.0).round() as i16;
    for &byte in &gainmap.data {
        assert!(
            (byte as i16 - expected_byte).abs() <= 1,
            "byte {} vs expected {}",
            byte,
            expected_byte
        );
    }

    // Apply back at full capacity: linear output is 2x the SDR linear RGB,
    // normalized by the display boost.
    let boost = metadata.max_content_boost;
    let out = apply_gainmap(
        &sdr,
        &gainmap,
        &metadata,
        OutputFormat::HdrLinear,
        boost,
        &ApplyConfig::default(),
    )
    .unwrap();

    assert_eq!(out.format, PixelFormat::Rgba16F);
    assert_eq!(out.transfer, ColorTransfer::Linear);
    let expected = 2.0 * sdr_linear / boost;
    for (x, y) in [(0, 0), (31, 7), (63, 63), (5, 60)] {
        let rgb = read_f16_pixel(&out, x, y);
        for c in rgb {
            let rel = (c - expected).abs() / expected;
            assert!(rel < 0.02, "pixel ({}, {}): {} vs {}", x, y, c, expected);
        }
    }
}

/// Same scenario through the PQ transfer at 3x luminance, checking only
/// the encoded ratio.
#[test]
fn pq_triple_boost_encodes_ratio_three() {
    let sdr = sdr_solid(32, 32, 128);
    let sdr_linear = srgb_inv_oetf(128.0 / 255.0);
    let pq_linear = 3.0 * sdr_linear * nits::SDR_WHITE / nits::PQ_MAX;
    let luma10 = (pq_oetf(pq_linear) * 1023.0).round() as u16;
    let hdr = hdr_solid(32, 32, luma10, ColorGamut::Bt2100);

    let (gainmap, metadata) =
        generate_gainmap(&sdr, &hdr, ColorTransfer::Pq, &GainMapConfig::default()).unwrap();

    assert_eq!(metadata.max_content_boost, nits::PQ_MAX / nits::SDR_WHITE);
    let log2_range = metadata.max_content_boost.log2();
    let expected_byte = (3.0f32.log2() / log2_range * 255.0).round() as i16;
    for &byte in &gainmap.data {
        assert!(
            (byte as i16 - expected_byte).abs() <= 1,
            "byte {} vs expected {}",
            byte,
            expected_byte
        );
    }
}

/// Generation is deterministic regardless of worker count.
#[test]
fn generate_is_deterministic_across_thread_counts() {
    let sdr = sdr_gradient(64, 48);
    let hdr = hdr_gradient(64, 48);

    let single = GainMapConfig {
        threads: 1,
        ..Default::default()
    };
    let pooled = GainMapConfig {
        threads: 4,
        ..Default::default()
    };

    let (map_single, meta_single) =
        generate_gainmap(&sdr, &hdr, ColorTransfer::Hlg, &single).unwrap();
    let (map_pooled, meta_pooled) =
        generate_gainmap(&sdr, &hdr, ColorTransfer::Hlg, &pooled).unwrap();

    assert_eq!(map_single.data, map_pooled.data);
    assert_eq!(meta_single, meta_pooled);
}

/// Application is deterministic regardless of worker count.
#[test]
fn apply_is_deterministic_across_thread_counts() {
    let sdr = sdr_gradient(64, 48);
    let hdr = hdr_gradient(64, 48);
    let (gainmap, metadata) =
        generate_gainmap(&sdr, &hdr, ColorTransfer::Hlg, &GainMapConfig::default()).unwrap();

    let single = ApplyConfig {
        threads: 1,
        ..Default::default()
    };
    let pooled = ApplyConfig {
        threads: 4,
        ..Default::default()
    };

    for format in [
        OutputFormat::HdrLinear,
        OutputFormat::HdrLinearRgb10Bit,
        OutputFormat::HdrHlg,
        OutputFormat::HdrPq,
    ] {
        let a = apply_gainmap(&sdr, &gainmap, &metadata, format, 4.0, &single).unwrap();
        let b = apply_gainmap(&sdr, &gainmap, &metadata, format, 4.0, &pooled).unwrap();
        assert_eq!(a.data, b.data, "{:?}", format);
    }
}

/// A gain map whose width does not divide the SDR width is rejected before
/// any output exists.
#[test]
fn apply_rejects_non_dividing_map() {
    let sdr = sdr_solid(64, 64, 128);
    let (_, metadata) = generate_gainmap(
        &sdr,
        &hdr_solid(64, 64, 400, ColorGamut::Bt2100),
        ColorTransfer::Hlg,
        &GainMapConfig::default(),
    )
    .unwrap();

    let bad_map = GainMap::new(15, 16).unwrap();
    let err = apply_gainmap(
        &sdr,
        &bad_map,
        &metadata,
        OutputFormat::HdrLinear,
        4.0,
        &ApplyConfig::default(),
    );
    assert!(matches!(err, Err(Error::UnsupportedMapScale { .. })));
}

/// Metadata outside the supported profile is rejected without processing.
#[test]
fn apply_rejects_gamma_two_metadata() {
    let sdr = sdr_solid(64, 64, 128);
    let hdr = hdr_solid(64, 64, 400, ColorGamut::Bt2100);
    let (gainmap, mut metadata) =
        generate_gainmap(&sdr, &hdr, ColorTransfer::Hlg, &GainMapConfig::default()).unwrap();

    metadata.gamma = 2.0;
    let err = apply_gainmap(
        &sdr,
        &gainmap,
        &metadata,
        OutputFormat::HdrLinear,
        4.0,
        &ApplyConfig::default(),
    );
    assert!(matches!(err, Err(Error::InvalidMetadata(_))));
}

/// A lower display boost compresses the reconstruction toward SDR.
#[test]
fn display_boost_limits_reconstruction() {
    let sdr = sdr_solid(32, 32, 128);
    let sdr_linear = srgb_inv_oetf(128.0 / 255.0);
    let hdr_scene_linear = 4.0 * sdr_linear * nits::SDR_WHITE / nits::HLG_MAX;
    let luma10 = (hlg_oetf(hdr_scene_linear) * 1023.0).round() as u16;
    let hdr = hdr_solid(32, 32, luma10, ColorGamut::Bt2100);

    let (gainmap, metadata) =
        generate_gainmap(&sdr, &hdr, ColorTransfer::Hlg, &GainMapConfig::default()).unwrap();

    // With a 2x display, the 4x content boost is capped at 2x.
    let out = apply_gainmap(
        &sdr,
        &gainmap,
        &metadata,
        OutputFormat::HdrLinear,
        2.0,
        &ApplyConfig::default(),
    )
    .unwrap();

    let rgb = read_f16_pixel(&out, 16, 16);
    // Normalized output can never exceed 1.0 = display peak.
    for c in rgb {
        assert!(c <= 1.0 + 1e-3, "exceeds display peak: {}", c);
    }
    // The boosted value sits above the straight SDR/boost baseline.
    let baseline = sdr_linear / 2.0;
    assert!(rgb[0] > baseline, "{} <= {}", rgb[0], baseline);
}
