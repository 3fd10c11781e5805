//! PDF Image Extractor CLI
//!
//! Command-line interface for pulling embedded images out of a PDF.

use anyhow::Context;
use clap::Parser;
use pdf_image_extractor::{
    config::format_file_size,
    file_ops::{read_pdf_file, write_images_to_dir, write_zip_file},
    ExtractionSettings, Session, UploadPolicy,
};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Extract embedded images from a PDF into a ZIP archive or a directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PDF file path
    #[arg(short, long)]
    input: PathBuf,

    /// Output path: a `.zip` file, or a directory for loose images.
    /// Created even when no images are found (an empty archive or directory).
    #[arg(short, long)]
    output: PathBuf,

    /// JPEG quality when re-encoding (1-100)
    #[arg(short, long)]
    quality: Option<u8>,

    /// Skip images whose shorter side is below this many pixels
    #[arg(long)]
    min_size: Option<u32>,

    /// Re-encode images to reduce their size
    #[arg(long)]
    optimize: bool,

    /// Drop EXIF/ICC/XMP metadata from re-encoded JPEGs
    #[arg(long)]
    strip_metadata: bool,

    /// Skip images that look like logos or icons
    #[arg(long)]
    filter_logos: bool,

    /// JSON settings file; flags given on the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn settings(&self) -> anyhow::Result<ExtractionSettings> {
        let mut settings = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings file {:?}", path))?;
                ExtractionSettings::from_json(&json)
                    .with_context(|| format!("Invalid settings file {:?}", path))?
            }
            None => ExtractionSettings::default(),
        };

        if let Some(quality) = self.quality {
            settings.quality = quality;
        }
        if let Some(min_size) = self.min_size {
            settings.min_size_px = min_size;
        }
        settings.optimize |= self.optimize;
        settings.filter_logos |= self.filter_logos;
        if self.strip_metadata {
            settings.preserve_metadata = false;
        }
        Ok(settings)
    }
}

fn is_zip_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = args.settings()?;
    let mut session = Session::new(UploadPolicy::default(), ExtractionSettings::default());
    session
        .update_settings(settings)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!("PDF Image Extractor");
    println!("===================");

    let bytes = read_pdf_file(&args.input)
        .with_context(|| format!("Failed to read {:?}", args.input))?;
    let file_name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    session
        .select_file(&file_name, bytes)
        .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;

    let verbose = args.verbose > 0;
    session
        .run(|p| {
            if verbose {
                println!(
                    "  page {}/{}: {} image(s) found so far",
                    p.page, p.total_pages, p.images_found
                );
            }
        })
        .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;
    let result = session
        .result()
        .context("extraction finished without a result")?;

    let summary = &result.summary;
    println!(
        "\nScanned {} page(s): {} image(s) found, {} extracted, {} below minimum size, {} logo(s) skipped, {} failed",
        summary.pages_scanned,
        summary.images_found,
        summary.images_extracted,
        summary.images_filtered,
        summary.logos_filtered,
        summary.images_skipped
    );

    if is_zip_path(&args.output) {
        let size = write_zip_file(result, &args.output)
            .with_context(|| format!("Failed to write {:?}", args.output))?;
        println!("Archive size: {}", format_file_size(size));
    } else {
        let written = write_images_to_dir(result, &args.output)
            .with_context(|| format!("Failed to write images to {:?}", args.output))?;
        if verbose {
            for path in &written {
                println!("  {}", path.display());
            }
        }
    }

    if let Some(message) = session.status_message() {
        println!("{}", message);
    }
    println!(
        "Total image size: {} in {}ms",
        format_file_size(summary.total_bytes),
        summary.elapsed_ms
    );
    println!("Output saved to: {:?}", args.output);

    Ok(())
}
