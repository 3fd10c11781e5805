//! Extracted images and run summaries.

use serde::Serialize;

/// Container format of an extracted image, detected from its bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
}

impl ImageFormat {
    /// Sniff the format of encoded image bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::Gif => Some(ImageFormat::Gif),
            image::ImageFormat::Bmp => Some(ImageFormat::Bmp),
            image::ImageFormat::Tiff => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
        }
    }
}

/// One extracted image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// 1-based page the image was found on
    pub page_number: u32,
    /// Position in the page's image enumeration, before filtering
    pub index_on_page: u32,
    pub format: ImageFormat,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoded file content
    pub bytes: Vec<u8>,
}

impl ImageRecord {
    /// Name used for downloads and ZIP entries, e.g. `page001_img02.png`.
    pub fn file_name(&self) -> String {
        format!(
            "page{:03}_img{:02}.{}",
            self.page_number,
            self.index_on_page,
            self.format.extension()
        )
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Counters for one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionSummary {
    pub pages_scanned: u32,
    /// Every image enumerated, before any filtering
    pub images_found: u32,
    pub images_extracted: u32,
    /// Below the minimum size
    pub images_filtered: u32,
    /// Dropped by the logo heuristic
    pub logos_filtered: u32,
    /// Could not be decoded or encoded
    pub images_skipped: u32,
    /// Sum of the extracted images' encoded sizes
    pub total_bytes: u64,
    pub elapsed_ms: u64,
}

/// Images from one run, in page order then source order
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub images: Vec<ImageRecord>,
    pub summary: ExtractionSummary,
}

impl ExtractionResult {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageRecord> {
        self.images.get(index)
    }
}

/// Reported after each page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Page just finished, 1-based
    pub page: u32,
    pub total_pages: u32,
    /// Images enumerated so far
    pub images_found: u32,
}

impl Progress {
    /// Completed fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        if self.total_pages == 0 {
            return 1.0;
        }
        self.page as f32 / self.total_pages as f32
    }
}
