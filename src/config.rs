//! Limits, defaults and user-facing messages.

use serde::Deserialize;

use crate::error::{ExtractError, Result};

/// Maximum upload size in megabytes.
pub const MAX_FILE_SIZE_MB: usize = 50;

/// Default JPEG quality used when re-encoding.
pub const DEFAULT_QUALITY: u8 = 95;

/// Default minimum image side, in pixels.
pub const DEFAULT_MIN_SIZE_PX: u32 = 20;

pub const SUCCESS_MESSAGE: &str = "{count} image(s) extracted successfully.";
pub const NO_IMAGES_MESSAGE: &str = "No images found in this PDF.";
pub const ERROR_MESSAGE: &str = "An error occurred while processing the PDF.";

/// Success banner for `count` extracted images.
pub fn success_message(count: usize) -> String {
    SUCCESS_MESSAGE.replace("{count}", &count.to_string())
}

/// What the upload boundary accepts.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_extensions: vec!["pdf".to_string()],
        }
    }
}

impl UploadPolicy {
    pub fn is_allowed_file_name(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.allowed_extensions
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext)))
    }

    pub fn is_within_size_limit(&self, size_bytes: usize) -> bool {
        size_bytes <= self.max_bytes
    }
}

/// Options for one extraction run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// JPEG quality (1-100, only used when `optimize` is set)
    pub quality: u8,
    /// Skip images whose shorter side is below this many pixels
    pub min_size_px: u32,
    /// Re-encode images (lossy for JPEG, best compression for PNG)
    pub optimize: bool,
    /// Keep EXIF/ICC/XMP segments when re-encoding JPEGs
    pub preserve_metadata: bool,
    /// Drop small, square, transparent or tiny images
    pub filter_logos: bool,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            min_size_px: DEFAULT_MIN_SIZE_PX,
            optimize: false,
            preserve_metadata: true,
            filter_logos: false,
        }
    }
}

impl ExtractionSettings {
    pub fn validate(&self) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(ExtractError::InvalidQuality(self.quality));
        }
        Ok(())
    }

    /// Parse settings from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Format a byte count for display, e.g. `1.5 MB`.
pub fn format_file_size(size_bytes: u64) -> String {
    let mut size = size_bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}
