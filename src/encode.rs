//! Producing downloadable image files.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;

/// What we learn from walking a JPEG's header segments
#[derive(Debug, Default)]
pub(crate) struct JpegHeader<'a> {
    /// Component count from the frame header
    pub components: Option<u8>,
    /// APPn segments (n in 1..=15) as (n, payload)
    pub app_segments: Vec<(u8, &'a [u8])>,
}

pub(crate) fn is_jpeg(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xD8])
}

/// Walk the marker segments up to the start of scan.
pub(crate) fn read_jpeg_header(bytes: &[u8]) -> JpegHeader<'_> {
    let mut header = JpegHeader::default();
    if !is_jpeg(bytes) {
        return header;
    }

    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            break;
        }
        let marker = bytes[pos + 1];
        // fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // markers without a length
        if marker == 0x01 || (0xD0..=0xD8).contains(&marker) {
            pos += 2;
            continue;
        }
        if marker == 0xDA || marker == 0xD9 {
            break;
        }

        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if len < 2 || pos + 2 + len > bytes.len() {
            break;
        }
        let payload = &bytes[pos + 4..pos + 2 + len];

        match marker {
            0xE1..=0xEF => header.app_segments.push((marker - 0xE0, payload)),
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                header.components = payload.get(5).copied();
            }
            _ => {}
        }
        pos += 2 + len;
    }

    header
}

fn is_icc_segment(nr: u8, payload: &[u8]) -> bool {
    nr == 2 && payload.starts_with(b"ICC_PROFILE\0")
}

/// Re-encode a JPEG at `quality`.
///
/// With `preserve_metadata`, APP1-APP15 segments are copied over, except the
/// Adobe APP14 marker (it describes the old color transform) and, for CMYK
/// sources, the ICC profile (the new file is RGB).
pub(crate) fn reencode_jpeg(
    original: &[u8],
    quality: u8,
    preserve_metadata: bool,
) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory_with_format(original, image::ImageFormat::Jpeg)
        .map_err(|e| format!("Failed to decode JPEG image: {}", e))?;
    let (width, height) = (img.width(), img.height());
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(format!("Image too large to re-encode: {}x{}", width, height));
    }

    let mut jpeg_bytes = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut jpeg_bytes, quality);

    if preserve_metadata {
        let header = read_jpeg_header(original);
        let cmyk_source = header.components == Some(4);
        for (nr, payload) in header.app_segments {
            if nr == 14 || (cmyk_source && is_icc_segment(nr, payload)) {
                continue;
            }
            encoder
                .add_app_segment(nr, payload.to_vec())
                .map_err(|e| format!("Failed to copy APP{} segment: {}", nr, e))?;
        }
    }

    if img.color().has_color() {
        let rgb = img.to_rgb8();
        encoder.set_sampling_factor(jpeg_encoder::SamplingFactor::R_4_2_0);
        encoder
            .encode(
                rgb.as_raw(),
                width as u16,
                height as u16,
                jpeg_encoder::ColorType::Rgb,
            )
            .map_err(|e| format!("Failed to encode JPEG: {}", e))?;
    } else {
        let luma = img.to_luma8();
        encoder
            .encode(
                luma.as_raw(),
                width as u16,
                height as u16,
                jpeg_encoder::ColorType::Luma,
            )
            .map_err(|e| format!("Failed to encode JPEG: {}", e))?;
    }

    Ok(jpeg_bytes)
}

/// Encode as PNG. `optimize` trades speed for the smallest lossless output.
pub(crate) fn encode_png(img: &DynamicImage, optimize: bool) -> Result<Vec<u8>, String> {
    let mut png_bytes = Vec::new();
    if optimize {
        let encoder =
            PngEncoder::new_with_quality(&mut png_bytes, CompressionType::Best, FilterType::Adaptive);
        img.write_with_encoder(encoder)
            .map_err(|e| format!("Failed to encode PNG: {}", e))?;
    } else {
        img.write_to(
            &mut std::io::Cursor::new(&mut png_bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| format!("Failed to encode PNG: {}", e))?;
    }
    Ok(png_bytes)
}
