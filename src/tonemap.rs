//! HDR to SDR tone mapping.
//!
//! The encode pipeline needs an SDR base even when the caller only supplies
//! an HDR image. This is the 10-bit P010 to 8-bit YUV420 reduction used for
//! that path: straight bit-depth truncation per plane, preserving the
//! source gamut.

use crate::types::{P010View, PixelFormat, RawImage, Result};

/// Tone map a P010 HDR image to an 8-bit YUV420 image of the same
/// dimensions.
pub fn tone_map(src: &RawImage) -> Result<RawImage> {
    let view = P010View::new(src)?;
    let width = src.width as usize;
    let height = src.height as usize;
    let mut dest = RawImage::new(src.width, src.height, PixelFormat::Yuv420)?;
    dest.gamut = src.gamut;

    let (luma, chroma) = dest.data.split_at_mut(width * height);
    for y in 0..height {
        let row = &mut luma[y * width..(y + 1) * width];
        for (x, out) in row.iter_mut().enumerate() {
            *out = (view.luma10(x, y) >> 2) as u8;
        }
    }

    let chroma_width = width / 2;
    let chroma_len = chroma_width * (height / 2);
    let (cb, cr) = chroma.split_at_mut(chroma_len);
    for cy in 0..height / 2 {
        for cx in 0..chroma_width {
            let (u, v) = view.chroma10(cx * 2, cy * 2);
            cb[cy * chroma_width + cx] = (u >> 2) as u8;
            cr[cy * chroma_width + cx] = (v >> 2) as u8;
        }
    }

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorGamut, Error};

    fn p010(width: u32, height: u32, luma10: u16, chroma10: u16) -> RawImage {
        let mut img = RawImage::new(width, height, PixelFormat::P010).unwrap();
        img.gamut = ColorGamut::Bt2100;
        let luma_len = (width * height) as usize;
        let y_bytes = (luma10 << 6).to_le_bytes();
        let uv_bytes = (chroma10 << 6).to_le_bytes();
        for i in 0..luma_len {
            img.data[i * 2..i * 2 + 2].copy_from_slice(&y_bytes);
        }
        for i in 0..(width * (height / 2)) as usize {
            let idx = luma_len * 2 + i * 2;
            img.data[idx..idx + 2].copy_from_slice(&uv_bytes);
        }
        img
    }

    #[test]
    fn truncates_ten_bit_planes_to_eight() {
        let src = p010(8, 8, 512, 700);
        let out = tone_map(&src).unwrap();

        assert_eq!(out.format, PixelFormat::Yuv420);
        assert_eq!(out.width, 8);
        assert_eq!(out.height, 8);
        assert_eq!(out.gamut, ColorGamut::Bt2100);

        // 512 >> 2 == 128, 700 >> 2 == 175.
        assert!(out.data[..64].iter().all(|&v| v == 128));
        assert!(out.data[64..64 + 16].iter().all(|&v| v == 175));
        assert!(out.data[64 + 16..].iter().all(|&v| v == 175));
    }

    #[test]
    fn honors_source_luma_stride() {
        let mut src = p010(4, 4, 0, 512);
        // Re-lay luma with stride 6, marking pixel (1, 1).
        let mut data = vec![0u8; 6 * 4 * 2 + 4 * 2 * 2];
        let marked = (400u16 << 6).to_le_bytes();
        data[(6 + 1) * 2..(6 + 1) * 2 + 2].copy_from_slice(&marked);
        let chroma_offset = 6 * 4 * 2;
        let neutral = (512u16 << 6).to_le_bytes();
        for i in 0..4 * 2 {
            data[chroma_offset + i * 2..chroma_offset + i * 2 + 2].copy_from_slice(&neutral);
        }
        src.data = data;
        src.luma_stride = 6;
        src.chroma_stride = 4;
        src.chroma_offset = Some(chroma_offset);

        let out = tone_map(&src).unwrap();
        assert_eq!(out.data[4 + 1], 100); // 400 >> 2
        assert_eq!(out.data[0], 0);
    }

    #[test]
    fn rejects_non_p010_source() {
        let src = RawImage::new(8, 8, PixelFormat::Yuv420).unwrap();
        assert!(matches!(
            tone_map(&src),
            Err(Error::UnsupportedFormat(PixelFormat::Yuv420))
        ));
    }
}
