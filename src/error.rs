//! Error types for PDF image extraction.

use thiserror::Error;

/// Error type for loading, extracting and packaging.
///
/// The `Display` text carries detail for logs. Anything shown to a user
/// should go through [`ExtractError::user_message`] instead.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Upload exceeds the configured size limit.
    #[error("file is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    /// Not a PDF, or the PDF could not be parsed.
    #[error("invalid PDF: {0}")]
    InvalidFormat(String),

    /// The PDF is readable in principle but we refuse to process it.
    #[error("unsupported PDF: {0}")]
    Unsupported(String),

    /// A single image could not be decoded or re-encoded.
    #[error("page {page}, image {index}: {reason}")]
    DecodeFailure { page: u32, index: u32, reason: String },

    /// Building a ZIP archive failed.
    #[error("failed to build ZIP archive: {0}")]
    PackagingFailure(String),

    /// Quality outside 1-100.
    #[error("quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    /// Reading input or writing output files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session is not in a state that allows the requested action.
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

impl ExtractError {
    /// Short message for the UI. Never includes internal error text.
    pub fn user_message(&self) -> String {
        match self {
            ExtractError::TooLarge { limit, .. } => format!(
                "File too large. Maximum size is {}MB.",
                limit / (1024 * 1024)
            ),
            ExtractError::InvalidFormat(_) => {
                "This file is not a valid PDF. Only PDF files are allowed.".to_string()
            }
            ExtractError::Unsupported(_) => {
                "Password-protected PDFs are not supported.".to_string()
            }
            ExtractError::DecodeFailure { .. } => "An image could not be decoded.".to_string(),
            ExtractError::PackagingFailure(_) => "Could not create the ZIP file.".to_string(),
            ExtractError::InvalidQuality(_) => "Quality must be between 1 and 100.".to_string(),
            ExtractError::Io(_) => "Could not read or write a file.".to_string(),
            ExtractError::InvalidState { .. } => {
                "That action is not available right now.".to_string()
            }
        }
    }
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(err: zip::result::ZipError) -> Self {
        ExtractError::PackagingFailure(err.to_string())
    }
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn user_messages_hide_detail() {
        let err = ExtractError::InvalidFormat("Xref table corrupted at offset 1234".to_string());
        assert!(!err.user_message().contains("Xref"));
        assert!(err.to_string().contains("Xref"));
    }

    #[test]
    fn too_large_message_reports_limit_in_megabytes() {
        let err = ExtractError::TooLarge {
            size: 60 * 1024 * 1024,
            limit: 50 * 1024 * 1024,
        };
        assert_eq!(err.user_message(), "File too large. Maximum size is 50MB.");
    }
}
