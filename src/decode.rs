//! Decoding PDF image streams into pixels.
//!
//! Covers the stream filters, predictors and color spaces that embedded
//! raster images commonly use. Anything else is reported as an error string
//! and the caller counts the image as skipped.

use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Read;
use tracing::warn;

/// Stream content after the data filters have run
#[derive(Debug)]
pub(crate) enum StreamData {
    /// Raw samples, row by row
    Samples(Vec<u8>),
    /// A complete JPEG file (DCTDecode)
    Jpeg(Vec<u8>),
    /// A JPEG 2000 codestream (JPXDecode)
    Jpx(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

/// Parameters from a /DecodeParms dictionary
#[derive(Debug, Clone, Copy, PartialEq)]
struct PredictorParams {
    predictor: i64,
    colors: usize,
    bits_per_component: usize,
    columns: usize,
}

impl PredictorParams {
    fn from_dict(dict: &Dictionary) -> Self {
        let get = |key: &[u8], default: i64| match dict.get(key) {
            Ok(Object::Integer(n)) => *n,
            _ => default,
        };
        // out-of-range values saturate and are rejected by `row_layout`
        let size = |key: &[u8], default: i64| {
            usize::try_from(get(key, default).max(1)).unwrap_or(usize::MAX)
        };
        Self {
            predictor: get(b"Predictor", 1),
            colors: size(b"Colors", 1),
            bits_per_component: size(b"BitsPerComponent", 8),
            columns: size(b"Columns", 1),
        }
    }

    /// Bytes per row and bytes per pixel for `data_len` bytes of input.
    ///
    /// A row wider than the data itself cannot be valid.
    fn row_layout(&self, data_len: usize) -> Result<(usize, usize), String> {
        let bits_per_pixel = self
            .colors
            .checked_mul(self.bits_per_component)
            .filter(|&bits| bits <= 32 * 16)
            .ok_or_else(|| {
                format!(
                    "Invalid predictor pixel size: {} colors x {} bits",
                    self.colors, self.bits_per_component
                )
            })?;
        let row_len = bits_per_pixel
            .checked_mul(self.columns)
            .and_then(|bits| bits.checked_add(7))
            .map(|bits| bits / 8)
            .filter(|&len| len > 0 && len <= data_len)
            .ok_or_else(|| {
                format!(
                    "Invalid predictor row: {} columns for {} bytes",
                    self.columns, data_len
                )
            })?;
        Ok((row_len, ((bits_per_pixel + 7) / 8).max(1)))
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn name_of(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::Name(n) => Some(n.as_slice()),
        _ => None,
    }
}

fn integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match dict.get(key).map(|o| resolve(doc, o)) {
        Ok(Object::Integer(n)) => Some(*n),
        _ => None,
    }
}

/// Filter names in the order they must be applied
fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").map(|f| resolve(doc, f)) {
        Ok(Object::Name(n)) => vec![n.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|f| name_of(resolve(doc, f)).map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// One entry per filter; `None` where no parameters apply
fn decode_parms<'a>(doc: &'a Document, dict: &'a Dictionary, count: usize) -> Vec<Option<&'a Dictionary>> {
    let as_dict = |obj: &'a Object| match resolve(doc, obj) {
        Object::Dictionary(d) => Some(d),
        _ => None,
    };
    let mut parms = match dict.get(b"DecodeParms").map(|p| resolve(doc, p)) {
        Ok(Object::Array(arr)) => arr.iter().map(as_dict).collect(),
        Ok(other) => vec![as_dict(other)],
        Err(_) => Vec::new(),
    };
    parms.resize(count, None);
    parms
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| format!("FlateDecode failed: {}", e))?;
    Ok(decoded)
}

fn decode_ascii_hex(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;
    for &byte in data {
        if byte == b'>' {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        let nibble = (byte as char)
            .to_digit(16)
            .ok_or_else(|| format!("Invalid hex digit in ASCIIHexDecode: {:?}", byte as char))?
            as u8;
        match high.take() {
            Some(h) => out.push(h << 4 | nibble),
            None => high = Some(nibble),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = left as i16 + up as i16 - up_left as i16;
    let pa = (p - left as i16).abs();
    let pb = (p - up as i16).abs();
    let pc = (p - up_left as i16).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

fn undo_png_predictor(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, String> {
    let (row_len, bpp) = params.row_layout(data.len())?;

    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let filter = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            row[i] = match filter {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => return Err(format!("Invalid PNG predictor row type: {}", other)),
            };
        }

        out.extend_from_slice(&row);
        prev = row;
    }

    Ok(out)
}

fn undo_tiff_predictor(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, String> {
    if params.bits_per_component != 8 {
        return Err(format!(
            "Unsupported TIFF predictor depth: {} bits",
            params.bits_per_component
        ));
    }
    let (row_len, _) = params.row_layout(data.len())?;
    let mut out = data.to_vec();
    for row in out.chunks_mut(row_len) {
        for i in params.colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - params.colors]);
        }
    }
    Ok(out)
}

fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, String> {
    match params.predictor {
        1 => Ok(data),
        2 => undo_tiff_predictor(&data, params),
        10..=15 => undo_png_predictor(&data, params),
        other => Err(format!("Unsupported predictor: {}", other)),
    }
}

/// Run the stream's filter chain.
///
/// Image codecs (DCT, JPX) end the chain and hand back the encoded file.
pub(crate) fn decode_filters(doc: &Document, stream: &Stream) -> Result<StreamData, String> {
    let filters = filter_names(doc, &stream.dict);
    let parms = decode_parms(doc, &stream.dict, filters.len());
    let mut data = stream.content.clone();

    for (filter, parm) in filters.iter().zip(parms) {
        match filter.as_slice() {
            b"FlateDecode" | b"Fl" => {
                data = inflate(&data)?;
                if let Some(parm) = parm {
                    data = apply_predictor(data, &PredictorParams::from_dict(parm))?;
                }
            }
            b"ASCIIHexDecode" | b"AHx" => data = decode_ascii_hex(&data)?,
            b"DCTDecode" | b"DCT" => return Ok(StreamData::Jpeg(data)),
            b"JPXDecode" => return Ok(StreamData::Jpx(data)),
            other => {
                return Err(format!(
                    "Unsupported filter: {}",
                    String::from_utf8_lossy(other)
                ))
            }
        }
    }

    Ok(StreamData::Samples(data))
}

fn device_space(name: &[u8]) -> Result<ColorSpace, String> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
        b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
        other => Err(format!(
            "Unsupported color space: {}",
            String::from_utf8_lossy(other)
        )),
    }
}

/// Resolve a /ColorSpace entry
pub(crate) fn color_space(doc: &Document, obj: &Object) -> Result<ColorSpace, String> {
    match resolve(doc, obj) {
        Object::Name(name) => device_space(name),
        Object::Array(arr) => {
            let family = arr.first().and_then(|f| name_of(resolve(doc, f)));
            match family {
                Some(b"ICCBased") => {
                    let n = match arr.get(1).map(|s| resolve(doc, s)) {
                        Some(Object::Stream(s)) => integer(doc, &s.dict, b"N"),
                        _ => None,
                    };
                    match n {
                        Some(1) => Ok(ColorSpace::Gray),
                        Some(3) => Ok(ColorSpace::Rgb),
                        Some(4) => Ok(ColorSpace::Cmyk),
                        other => Err(format!("Unsupported ICCBased component count: {:?}", other)),
                    }
                }
                Some(b"CalGray") => Ok(ColorSpace::Gray),
                Some(b"CalRGB") => Ok(ColorSpace::Rgb),
                Some(b"Indexed") | Some(b"I") => {
                    if arr.len() < 4 {
                        return Err("Malformed Indexed color space".to_string());
                    }
                    let base = color_space(doc, &arr[1])?;
                    if matches!(base, ColorSpace::Indexed { .. }) {
                        return Err("Nested Indexed color space".to_string());
                    }
                    let hival = match resolve(doc, &arr[2]) {
                        Object::Integer(n) if (0..=255).contains(n) => *n as usize,
                        _ => return Err("Invalid Indexed hival".to_string()),
                    };
                    let lookup = match resolve(doc, &arr[3]) {
                        Object::String(bytes, _) => bytes.clone(),
                        Object::Stream(s) => match decode_filters(doc, s)? {
                            StreamData::Samples(bytes) => bytes,
                            _ => return Err("Image-encoded Indexed lookup table".to_string()),
                        },
                        _ => return Err("Invalid Indexed lookup table".to_string()),
                    };
                    Ok(ColorSpace::Indexed {
                        base: Box::new(base),
                        hival,
                        lookup,
                    })
                }
                Some(other) => device_space(other),
                None => Err("Empty color space array".to_string()),
            }
        }
        _ => Err("Invalid color space object".to_string()),
    }
}

/// Expand packed samples to one byte each.
///
/// Rows start on byte boundaries. With `scale`, values are stretched to
/// 0-255; otherwise they are kept as-is (palette indices).
fn unpack_samples(
    data: &[u8],
    width: u32,
    height: u32,
    components: usize,
    bits_per_component: usize,
    scale: bool,
) -> Result<Vec<u8>, String> {
    if !matches!(bits_per_component, 1 | 2 | 4 | 8 | 16) {
        return Err(format!("Unsupported bits per component: {}", bits_per_component));
    }
    let samples_per_row = (width as usize)
        .checked_mul(components)
        .ok_or("Image row is too large")?;
    let row_bytes = samples_per_row
        .checked_mul(bits_per_component)
        .map(|bits| (bits + 7) / 8)
        .ok_or("Image row is too large")?;
    let expected_size = row_bytes
        .checked_mul(height as usize)
        .ok_or("Image is too large")?;

    if data.len() < expected_size {
        return Err(format!(
            "Image data size mismatch: got {} expected {}",
            data.len(),
            expected_size
        ));
    }

    match bits_per_component {
        8 => Ok(data[..expected_size].to_vec()),
        16 => Ok(data[..expected_size].iter().step_by(2).copied().collect()),
        1 | 2 | 4 => {
            let max = (1u16 << bits_per_component) - 1;
            let mut out = Vec::with_capacity(samples_per_row * height as usize);
            for row in data[..expected_size].chunks(row_bytes) {
                for s in 0..samples_per_row {
                    let bit = s * bits_per_component;
                    let shift = 8 - bits_per_component - bit % 8;
                    let value = (row[bit / 8] as u16 >> shift) & max;
                    out.push(if scale { (value * 255 / max) as u8 } else { value as u8 });
                }
            }
            Ok(out)
        }
        other => Err(format!("Unsupported bits per component: {}", other)),
    }
}

fn cmyk_to_rgb(cmyk: &[u8], rgb: &mut Vec<u8>) {
    let c = cmyk[0] as f32 / 255.0;
    let m = cmyk[1] as f32 / 255.0;
    let y = cmyk[2] as f32 / 255.0;
    let k = cmyk[3] as f32 / 255.0;

    rgb.push(((1.0 - c) * (1.0 - k) * 255.0) as u8);
    rgb.push(((1.0 - m) * (1.0 - k) * 255.0) as u8);
    rgb.push(((1.0 - y) * (1.0 - k) * 255.0) as u8);
}

fn decode_inverted(doc: &Document, dict: &Dictionary) -> bool {
    match dict.get(b"Decode").map(|d| resolve(doc, d)) {
        Ok(Object::Array(arr)) if arr.len() >= 2 => {
            let num = |o: &Object| match o {
                Object::Integer(n) => *n as f32,
                Object::Real(n) => *n as f32,
                _ => 0.0,
            };
            num(&arr[0]) > num(&arr[1])
        }
        _ => false,
    }
}

/// Build an image from a stream whose filters have already run.
pub(crate) fn decode_pixels(
    doc: &Document,
    stream: &Stream,
    data: StreamData,
    width: u32,
    height: u32,
) -> Result<DynamicImage, String> {
    let data = match data {
        StreamData::Jpeg(bytes) => {
            return image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
                .map_err(|e| format!("Failed to decode JPEG image: {}", e));
        }
        StreamData::Jpx(bytes) => {
            return image::load_from_memory(&bytes)
                .map_err(|e| format!("Failed to decode JPEG2000 image: {}", e));
        }
        StreamData::Samples(bytes) => bytes,
    };

    let dict = &stream.dict;
    let is_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let bits_per_component = if is_mask {
        1
    } else {
        integer(doc, dict, b"BitsPerComponent").unwrap_or(8).max(1) as usize
    };
    let color_space = if is_mask {
        ColorSpace::Gray
    } else {
        match dict.get(b"ColorSpace") {
            Ok(cs) => color_space(doc, cs)?,
            Err(_) => ColorSpace::Rgb,
        }
    };

    match color_space {
        ColorSpace::Gray => {
            let mut samples = unpack_samples(&data, width, height, 1, bits_per_component, true)?;
            if decode_inverted(doc, dict) {
                samples.iter_mut().for_each(|s| *s = 255 - *s);
            }
            let img = GrayImage::from_raw(width, height, samples)
                .ok_or("Failed to create grayscale image from raw data")?;
            Ok(DynamicImage::ImageLuma8(img))
        }
        ColorSpace::Rgb => {
            let samples = unpack_samples(&data, width, height, 3, bits_per_component, true)?;
            let img = RgbImage::from_raw(width, height, samples)
                .ok_or("Failed to create RGB image from raw data")?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        ColorSpace::Cmyk => {
            let samples = unpack_samples(&data, width, height, 4, bits_per_component, true)?;
            let mut rgb_data = Vec::with_capacity(samples.len() / 4 * 3);
            for chunk in samples.chunks(4) {
                cmyk_to_rgb(chunk, &mut rgb_data);
            }
            let img = RgbImage::from_raw(width, height, rgb_data)
                .ok_or("Failed to create RGB image from CMYK data")?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        ColorSpace::Indexed { base, hival, lookup } => {
            let indices = unpack_samples(&data, width, height, 1, bits_per_component, false)?;
            let n = base.components();
            let mut rgb_data = Vec::with_capacity(indices.len() * 3);
            let mut entry = vec![0u8; n];
            for index in indices {
                let start = (index as usize).min(hival) * n;
                for (i, slot) in entry.iter_mut().enumerate() {
                    *slot = lookup.get(start + i).copied().unwrap_or(0);
                }
                match *base {
                    ColorSpace::Gray => rgb_data.extend_from_slice(&[entry[0]; 3]),
                    ColorSpace::Cmyk => cmyk_to_rgb(&entry, &mut rgb_data),
                    _ => rgb_data.extend_from_slice(&entry[..3]),
                }
            }
            let img = RgbImage::from_raw(width, height, rgb_data)
                .ok_or("Failed to create RGB image from indexed data")?;
            Ok(DynamicImage::ImageRgb8(img))
        }
    }
}

/// Decode an image XObject to pixels, ignoring any soft mask.
pub(crate) fn decode_image_stream(
    doc: &Document,
    stream: &Stream,
    width: u32,
    height: u32,
) -> Result<DynamicImage, String> {
    let data = decode_filters(doc, stream)?;
    decode_pixels(doc, stream, data, width, height)
}

/// Merge the stream's /SMask into `img` as an alpha channel.
///
/// Images without a soft mask, or whose mask cannot be decoded, come back
/// unchanged.
pub(crate) fn apply_soft_mask(doc: &Document, stream: &Stream, img: DynamicImage) -> DynamicImage {
    let smask = match stream.dict.get(b"SMask") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Stream(s)) => s,
            _ => return img,
        },
        _ => return img,
    };

    let mask_width = integer(doc, &smask.dict, b"Width").unwrap_or(0).max(0) as u32;
    let mask_height = integer(doc, &smask.dict, b"Height").unwrap_or(0).max(0) as u32;
    if mask_width == 0 || mask_height == 0 {
        return img;
    }

    let alpha = match decode_image_stream(doc, smask, mask_width, mask_height) {
        Ok(mask) => mask,
        Err(e) => {
            warn!("could not decode SMask: {}", e);
            return img;
        }
    };

    let alpha = if (mask_width, mask_height) != (img.width(), img.height()) {
        alpha.resize_exact(
            img.width(),
            img.height(),
            image::imageops::FilterType::Triangle,
        )
    } else {
        alpha
    };
    let alpha = alpha.to_luma8();

    let mut rgba = img.to_rgba8();
    for (pixel, a) in rgba.pixels_mut().zip(alpha.pixels()) {
        pixel.0[3] = a.0[0];
    }
    DynamicImage::ImageRgba8(rgba)
}

/// Check if an image has meaningful alpha
pub(crate) fn has_alpha(img: &DynamicImage) -> bool {
    match img {
        DynamicImage::ImageRgba8(rgba) => {
            let sample_rate = std::cmp::max(1, rgba.pixels().len() / 10000);
            rgba.pixels().step_by(sample_rate).any(|p| p.0[3] < 255)
        }
        DynamicImage::ImageLumaA8(la) => {
            let sample_rate = std::cmp::max(1, la.pixels().len() / 10000);
            la.pixels().step_by(sample_rate).any(|p| p.0[1] < 255)
        }
        other => other.color().has_alpha(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::{jpeg_bytes, zlib};
    use lopdf::{dictionary, StringFormat};
    use pretty_assertions::assert_eq;

    fn stream(dict: Dictionary, content: Vec<u8>) -> Stream {
        Stream::new(dict, content)
    }

    #[test]
    fn png_predictor_up_and_sub_rows() {
        // 3 columns, 1 byte per pixel: row 0 uses Sub, row 1 uses Up
        let encoded = vec![1, 10, 5, 5, 2, 1, 1, 1];
        let params = PredictorParams {
            predictor: 12,
            colors: 1,
            bits_per_component: 8,
            columns: 3,
        };
        let decoded = apply_predictor(encoded, &params).unwrap();
        assert_eq!(decoded, vec![10, 15, 20, 11, 16, 21]);
    }

    #[test]
    fn tiff_predictor_accumulates_per_channel() {
        let params = PredictorParams {
            predictor: 2,
            colors: 2,
            bits_per_component: 8,
            columns: 2,
        };
        let decoded = apply_predictor(vec![10, 20, 1, 2], &params).unwrap();
        assert_eq!(decoded, vec![10, 20, 11, 22]);
    }

    #[test]
    fn oversized_predictor_parameters_are_errors() {
        let huge = PredictorParams {
            predictor: 2,
            colors: usize::MAX / 4,
            bits_per_component: 8,
            columns: usize::MAX / 4,
        };
        assert!(apply_predictor(vec![1, 2, 3, 4], &huge).is_err());

        let wide = PredictorParams {
            predictor: 12,
            colors: 3,
            bits_per_component: 8,
            columns: usize::MAX / 2,
        };
        assert!(apply_predictor(vec![0; 16], &wide).is_err());

        let longer_than_data = PredictorParams {
            predictor: 15,
            colors: 1,
            bits_per_component: 8,
            columns: 1000,
        };
        assert!(apply_predictor(vec![0; 16], &longer_than_data).is_err());
    }

    #[test]
    fn predictor_parameters_saturate_instead_of_wrapping() {
        let params = PredictorParams::from_dict(&dictionary! {
            "Predictor" => 2,
            "Colors" => i64::MAX,
            "Columns" => -5,
        });
        assert_eq!(params.columns, 1);
        assert!(params.colors >= 1 << 31);
        assert!(apply_predictor(vec![0; 8], &params).is_err());
    }

    #[test]
    fn unsupported_bit_depth_is_rejected_before_sizing() {
        assert!(unpack_samples(&[0; 4], 2, 2, 1, usize::MAX, true).is_err());
        assert!(unpack_samples(&[0; 4], u32::MAX, u32::MAX, 4, 16, true).is_err());
    }

    #[test]
    fn ascii_hex_ignores_whitespace_and_pads_odd_digit() {
        assert_eq!(decode_ascii_hex(b"48 65\n6C6c 6>").unwrap(), b"Hell`".to_vec());
        assert!(decode_ascii_hex(b"zz>").is_err());
    }

    #[test]
    fn unpacks_one_bit_rows_on_byte_boundaries() {
        // width 3: each row uses the top 3 bits of one byte
        let samples = unpack_samples(&[0b1010_0000, 0b0110_0000], 3, 2, 1, 1, true).unwrap();
        assert_eq!(samples, vec![255, 0, 255, 0, 255, 255]);
    }

    #[test]
    fn short_sample_data_is_an_error() {
        assert!(unpack_samples(&[0u8; 5], 2, 2, 3, 8, true).is_err());
    }

    #[test]
    fn flate_with_png_predictor_decodes_rgb() {
        let doc = Document::with_version("1.5");
        // 2x1 RGB, PNG "None" row filter
        let raw = vec![0, 255, 0, 0, 0, 0, 255];
        let s = stream(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
                "DecodeParms" => dictionary! { "Predictor" => 15, "Colors" => 3, "Columns" => 2 },
            },
            zlib(&raw),
        );
        let img = decode_image_stream(&doc, &s, 2, 1).unwrap().to_rgb8();
        assert_eq!(img.as_raw(), &vec![255, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn indexed_palette_maps_to_rgb() {
        let doc = Document::with_version("1.5");
        let s = stream(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => vec![
                    "Indexed".into(),
                    "DeviceRGB".into(),
                    1.into(),
                    Object::String(vec![10, 20, 30, 200, 210, 220], StringFormat::Hexadecimal),
                ],
                "BitsPerComponent" => 8,
            },
            vec![1, 0],
        );
        let img = decode_image_stream(&doc, &s, 2, 1).unwrap().to_rgb8();
        assert_eq!(img.as_raw(), &vec![200, 210, 220, 10, 20, 30]);
    }

    #[test]
    fn cmyk_converts_to_rgb() {
        let doc = Document::with_version("1.5");
        let s = stream(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 8,
            },
            vec![0, 255, 255, 0],
        );
        let img = decode_image_stream(&doc, &s, 1, 1).unwrap().to_rgb8();
        assert_eq!(img.as_raw(), &vec![255, 0, 0]);
    }

    #[test]
    fn dct_stream_is_returned_untouched() {
        let doc = Document::with_version("1.5");
        let jpeg = jpeg_bytes(8, 8);
        let s = stream(dictionary! { "Filter" => "DCTDecode" }, jpeg.clone());
        match decode_filters(&doc, &s).unwrap() {
            StreamData::Jpeg(bytes) => assert_eq!(bytes, jpeg),
            other => panic!("expected JPEG, got {:?}", other),
        }
    }

    #[test]
    fn unknown_filter_is_an_error() {
        let doc = Document::with_version("1.5");
        let s = stream(dictionary! { "Filter" => "JBIG2Decode" }, vec![0; 4]);
        let err = decode_filters(&doc, &s).unwrap_err();
        assert!(err.contains("JBIG2Decode"));
    }

    #[test]
    fn soft_mask_becomes_alpha_channel() {
        let mut doc = Document::with_version("1.5");
        let mask_id = doc.add_object(stream(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0, 255],
        ));
        let s = stream(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "SMask" => mask_id,
            },
            vec![100, 100],
        );

        let img = decode_image_stream(&doc, &s, 2, 1).unwrap();
        let img = apply_soft_mask(&doc, &s, img);
        assert!(has_alpha(&img));
        let rgba = img.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0, [100, 100, 100, 0]);
        assert_eq!(rgba.get_pixel(1, 0).0, [100, 100, 100, 255]);
    }
}
