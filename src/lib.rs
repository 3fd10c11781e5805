//! PDF Image Extractor
//!
//! Pulls embedded raster images out of PDF files, one file per image, and
//! packages them for download. JPEGs are handed out as stored; everything
//! else is decoded and written as PNG, with soft masks kept as alpha.
//!
//! A [`Session`] drives the whole flow: upload validation, extraction with
//! progress reporting, slide-by-slide browsing, selection and ZIP
//! downloads. The pieces are usable on their own too:
//!
//! ```no_run
//! use pdf_image_extractor::{extract, load, to_zip, ExtractionSettings};
//!
//! # fn main() -> pdf_image_extractor::Result<()> {
//! let bytes = std::fs::read("report.pdf")?;
//! let document = load(&bytes)?;
//! let result = extract(document, &ExtractionSettings::default(), |p| {
//!     println!("page {}/{}", p.page, p.total_pages);
//! })?;
//! let archive = to_zip(&result)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod decode;
mod encode;
pub mod error;
pub mod extractor;
pub mod loader;
pub mod navigator;
pub mod packager;
pub mod record;
pub mod session;

#[cfg(not(target_arch = "wasm32"))]
pub mod file_ops;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

#[cfg(test)]
mod test_pdf;

pub use config::{ExtractionSettings, UploadPolicy};
pub use error::{ExtractError, Result};
pub use extractor::extract;
pub use loader::{load, PdfDocument, PdfLoader};
pub use navigator::SlideNavigator;
pub use packager::{to_zip, to_zip_selected};
pub use record::{ExtractionResult, ExtractionSummary, ImageFormat, ImageRecord, Progress};
pub use session::{AppState, Download, ResultsView, Session};
