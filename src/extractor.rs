//! Pulling every embedded image out of a loaded PDF.

use lopdf::Document;
use tracing::{debug, info, warn};

use crate::config::ExtractionSettings;
use crate::decode::{apply_soft_mask, decode_filters, decode_pixels, has_alpha, StreamData};
use crate::encode::{encode_png, is_jpeg, reencode_jpeg};
use crate::error::{ExtractError, Result};
use crate::loader::{EmbeddedImage, PdfDocument};
use crate::record::{ExtractionResult, ExtractionSummary, ImageFormat, ImageRecord, Progress};

/// Sides shorter than this count as logo-sized.
const LOGO_MAX_SIDE_PX: u32 = 100;
/// Encoded files smaller than this count as logo-sized.
const LOGO_MAX_BYTES: usize = 10 * 1024;
const LOGO_ASPECT_RANGE: std::ops::RangeInclusive<f32> = 0.8..=1.2;

/// Wall-clock timer that also works in the browser
struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
    #[cfg(target_arch = "wasm32")]
    start_ms: f64,
}

impl Stopwatch {
    fn start() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            start: std::time::Instant::now(),
            #[cfg(target_arch = "wasm32")]
            start_ms: js_sys::Date::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.start.elapsed().as_millis() as u64
        }
        #[cfg(target_arch = "wasm32")]
        {
            (js_sys::Date::now() - self.start_ms).max(0.0) as u64
        }
    }
}

/// A downloadable file produced from one image XObject
struct Converted {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
    has_alpha: bool,
}

/// Small, squarish, transparent or tiny images are probably logos or icons.
pub fn looks_like_logo(width: u32, height: u32, has_alpha: bool, size_bytes: usize) -> bool {
    if width < LOGO_MAX_SIDE_PX || height < LOGO_MAX_SIDE_PX {
        return true;
    }
    let aspect = width as f32 / height as f32;
    LOGO_ASPECT_RANGE.contains(&aspect) || has_alpha || size_bytes < LOGO_MAX_BYTES
}

/// Extract all images from `document`.
///
/// Pages are visited in ascending order and images in the order the page
/// resources list them. `on_progress` runs once after each page. Images
/// that fail to decode are logged and counted in `images_skipped`; only
/// invalid settings fail the whole run. The document is consumed and
/// released when this returns.
pub fn extract<F>(
    document: PdfDocument,
    settings: &ExtractionSettings,
    mut on_progress: F,
) -> Result<ExtractionResult>
where
    F: FnMut(&Progress),
{
    settings.validate()?;

    let stopwatch = Stopwatch::start();
    let total_pages = document.page_count();
    let mut summary = ExtractionSummary::default();
    let mut images = Vec::new();

    info!(
        "extracting images from {} page(s), min size {}px, optimize {}",
        total_pages, settings.min_size_px, settings.optimize
    );

    let page_numbers: Vec<u32> = document.page_numbers().collect();
    for page_number in page_numbers {
        let page_images = document.page_images(page_number);
        debug!("page {}: {} image(s)", page_number, page_images.len());

        for (index, image) in page_images.iter().enumerate() {
            let index = index as u32;
            summary.images_found += 1;

            if let Some(record) =
                process_image(document.inner(), image, page_number, index, settings, &mut summary)
            {
                summary.images_extracted += 1;
                summary.total_bytes += record.bytes.len() as u64;
                images.push(record);
            }
        }

        summary.pages_scanned += 1;
        on_progress(&Progress {
            page: page_number,
            total_pages,
            images_found: summary.images_found,
        });
    }

    summary.elapsed_ms = stopwatch.elapsed_ms();
    info!(
        "extracted {} of {} image(s) ({} filtered, {} logos, {} skipped) in {}ms",
        summary.images_extracted,
        summary.images_found,
        summary.images_filtered,
        summary.logos_filtered,
        summary.images_skipped,
        summary.elapsed_ms
    );

    Ok(ExtractionResult { images, summary })
}

/// Filter and convert one image, updating the counters it affects.
fn process_image(
    doc: &Document,
    image: &EmbeddedImage<'_>,
    page: u32,
    index: u32,
    settings: &ExtractionSettings,
    summary: &mut ExtractionSummary,
) -> Option<ImageRecord> {
    if image.width == 0 || image.height == 0 {
        let err = ExtractError::DecodeFailure {
            page,
            index,
            reason: format!("{} has no valid dimensions", image.name),
        };
        warn!("skipping image: {}", err);
        summary.images_skipped += 1;
        return None;
    }

    if image.width.min(image.height) < settings.min_size_px {
        debug!(
            "page {} image {}: {}x{} below {}px, filtered",
            page, index, image.width, image.height, settings.min_size_px
        );
        summary.images_filtered += 1;
        return None;
    }

    let converted = match convert(doc, image, settings) {
        Ok(c) => c,
        Err(reason) => {
            let err = ExtractError::DecodeFailure {
                page,
                index,
                reason,
            };
            warn!("skipping image: {}", err);
            summary.images_skipped += 1;
            return None;
        }
    };

    if settings.filter_logos
        && looks_like_logo(
            converted.width,
            converted.height,
            converted.has_alpha,
            converted.bytes.len(),
        )
    {
        debug!(
            "page {} image {}: {}x{} looks like a logo, filtered",
            page, index, converted.width, converted.height
        );
        summary.logos_filtered += 1;
        return None;
    }

    debug!(
        "page {} image {}: {:?} {}x{}, {} bytes",
        page,
        index,
        converted.format,
        converted.width,
        converted.height,
        converted.bytes.len()
    );

    Some(ImageRecord {
        page_number: page,
        index_on_page: index,
        format: converted.format,
        width: converted.width,
        height: converted.height,
        bytes: converted.bytes,
    })
}

fn convert(
    doc: &Document,
    image: &EmbeddedImage<'_>,
    settings: &ExtractionSettings,
) -> std::result::Result<Converted, String> {
    let data = decode_filters(doc, image.stream)?;
    let has_smask = image.stream.dict.get(b"SMask").is_ok();

    // JPEGs without transparency are handed out as-is
    if let StreamData::Jpeg(jpeg) = &data {
        if !has_smask {
            if !is_jpeg(jpeg) {
                return Err("DCTDecode stream does not start with a JPEG SOI marker".to_string());
            }
            let bytes = if settings.optimize {
                reencode_jpeg(jpeg, settings.quality, settings.preserve_metadata)?
            } else {
                jpeg.clone()
            };
            return Ok(Converted {
                bytes,
                format: ImageFormat::Jpeg,
                width: image.width,
                height: image.height,
                has_alpha: false,
            });
        }
    }

    let pixels = decode_pixels(doc, image.stream, data, image.width, image.height)?;
    let pixels = apply_soft_mask(doc, image.stream, pixels);
    let alpha = has_alpha(&pixels);
    let bytes = encode_png(&pixels, settings.optimize)?;
    let format = ImageFormat::detect(&bytes).ok_or("encoded image has an unknown format")?;

    Ok(Converted {
        bytes,
        format,
        width: pixels.width(),
        height: pixels.height(),
        has_alpha: alpha,
    })
}
