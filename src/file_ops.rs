//! Reading PDFs from disk and writing extracted images back out.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::packager::to_zip;
use crate::record::ExtractionResult;

/// Read a whole file into memory.
pub fn read_pdf_file(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path)?;
    debug!("read {} bytes from {:?}", bytes.len(), path);
    Ok(bytes)
}

/// Write every image into `dir` under its download name, creating the
/// directory if needed. Returns the written paths in result order.
pub fn write_images_to_dir(result: &ExtractionResult, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(result.len());
    for record in &result.images {
        let path = dir.join(record.file_name());
        fs::write(&path, &record.bytes)?;
        written.push(path);
    }
    debug!("wrote {} image(s) to {:?}", written.len(), dir);
    Ok(written)
}

/// Package every image and save the archive at `path`.
pub fn write_zip_file(result: &ExtractionResult, path: &Path) -> Result<u64> {
    let archive = to_zip(result)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &archive)?;
    Ok(archive.len() as u64)
}
