//! Bundling extracted images into ZIP archives.

use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ExtractError, Result};
use crate::record::{ExtractionResult, ImageRecord};

/// Archive name offered when downloading every image.
pub const ALL_IMAGES_ZIP: &str = "extracted_images.zip";
/// Archive name offered when downloading a selection.
pub const SELECTED_IMAGES_ZIP: &str = "selected_images.zip";

/// Package every image in `result`, in result order.
///
/// Entry timestamps are pinned to 1980-01-01 so the same result always
/// produces the same bytes.
pub fn to_zip(result: &ExtractionResult) -> Result<Vec<u8>> {
    write_archive(result.images.iter())
}

/// Package the images at `indices`, in result order.
///
/// Out-of-range indices are ignored.
pub fn to_zip_selected(result: &ExtractionResult, indices: &BTreeSet<usize>) -> Result<Vec<u8>> {
    write_archive(indices.iter().filter_map(|&i| result.get(i)))
}

fn write_archive<'a>(records: impl Iterator<Item = &'a ImageRecord>) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = 0;
    for record in records {
        zip.start_file(record.file_name(), options)?;
        zip.write_all(&record.bytes)
            .map_err(|e| ExtractError::PackagingFailure(e.to_string()))?;
        entries += 1;
    }

    let bytes = zip.finish()?.into_inner();
    debug!("packaged {} image(s) into {} byte archive", entries, bytes.len());
    Ok(bytes)
}
