//! Opening uploaded PDFs and enumerating the images placed on each page.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use tracing::debug;

use crate::config::MAX_FILE_SIZE_MB;
use crate::error::{ExtractError, Result};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Page trees deeper than this are treated as cyclic.
const MAX_PARENT_DEPTH: usize = 32;

/// True if the `%PDF` marker appears in the first kilobyte.
pub fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(1024)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Opens PDF bytes with a size limit.
#[derive(Debug, Clone)]
pub struct PdfLoader {
    max_bytes: usize,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self::new(MAX_FILE_SIZE_MB * 1024 * 1024)
    }
}

impl PdfLoader {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Parse `bytes` into a document handle.
    ///
    /// Fails with `TooLarge` over the limit, `InvalidFormat` for anything
    /// that is not a readable PDF with at least one page, and `Unsupported`
    /// for encrypted documents.
    pub fn load(&self, bytes: &[u8]) -> Result<PdfDocument> {
        if bytes.len() > self.max_bytes {
            return Err(ExtractError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }
        if !has_pdf_header(bytes) {
            return Err(ExtractError::InvalidFormat(
                "missing %PDF header".to_string(),
            ));
        }

        let doc = Document::load_mem(bytes).map_err(|e| {
            let msg = e.to_string();
            let lower = msg.to_lowercase();
            // lopdf reports encryption problems as load errors
            if lower.contains("encrypt") || lower.contains("decrypt") || lower.contains("password") {
                ExtractError::Unsupported(msg)
            } else {
                ExtractError::InvalidFormat(msg)
            }
        })?;

        PdfDocument::from_document(doc)
    }
}

/// Load with the default 50 MB limit.
pub fn load(bytes: &[u8]) -> Result<PdfDocument> {
    PdfLoader::default().load(bytes)
}

/// An image XObject found on a page
#[derive(Debug, Clone)]
pub struct EmbeddedImage<'a> {
    pub object_id: ObjectId,
    /// Resource name the page (or a nested form) uses for it
    pub name: String,
    pub stream: &'a Stream,
    /// Width in pixels, 0 if missing
    pub width: u32,
    /// Height in pixels, 0 if missing
    pub height: u32,
}

/// A parsed, unencrypted PDF with at least one page.
#[derive(Debug)]
pub struct PdfDocument {
    doc: Document,
    pages: Vec<(u32, ObjectId)>,
}

impl PdfDocument {
    pub(crate) fn from_document(doc: Document) -> Result<Self> {
        // lopdf decrypts empty-user-password files on load and drops /Encrypt
        if doc.was_encrypted() || doc.trailer.get(b"Encrypt").is_ok() {
            return Err(ExtractError::Unsupported(
                "document is encrypted".to_string(),
            ));
        }

        let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
        if pages.is_empty() {
            return Err(ExtractError::InvalidFormat("PDF has no pages".to_string()));
        }

        debug!("loaded PDF {} with {} page(s)", doc.version, pages.len());
        Ok(Self { doc, pages })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Page numbers in ascending order, starting at 1.
    pub fn page_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.iter().map(|(number, _)| *number)
    }

    pub(crate) fn inner(&self) -> &Document {
        &self.doc
    }

    /// Images referenced from a page's resources, in dictionary order.
    ///
    /// Form XObjects are walked depth-first. Each image object is reported
    /// once per page. Unknown page numbers yield an empty list.
    pub fn page_images(&self, page_number: u32) -> Vec<EmbeddedImage<'_>> {
        let page_id = match self.pages.iter().find(|(n, _)| *n == page_number) {
            Some((_, id)) => *id,
            None => return Vec::new(),
        };

        let page_dict = match self.doc.get_object(page_id) {
            Ok(Object::Dictionary(d)) => d,
            _ => return Vec::new(),
        };

        let mut images = Vec::new();
        let mut seen = HashSet::new();
        if let Some(resources) = self.page_resources(page_dict) {
            self.collect_images(resources, &mut images, &mut seen);
        }
        images
    }

    /// Resources for a page, inherited from ancestors if the page has none
    fn page_resources<'a>(&'a self, page_dict: &'a Dictionary) -> Option<&'a Dictionary> {
        let mut current = page_dict;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Ok(resources) = current.get(b"Resources") {
                return self.resolve_dict(resources);
            }
            current = match current.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => match self.doc.get_object(*parent_id) {
                    Ok(Object::Dictionary(d)) => d,
                    _ => return None,
                },
                _ => return None,
            };
        }
        None
    }

    fn collect_images<'a>(
        &'a self,
        resources: &'a Dictionary,
        images: &mut Vec<EmbeddedImage<'a>>,
        seen: &mut HashSet<ObjectId>,
    ) {
        let xobjects = match resources.get(b"XObject").ok().and_then(|x| self.resolve_dict(x)) {
            Some(d) => d,
            None => return,
        };

        for (name, value) in xobjects.iter() {
            let obj_id = match value {
                Object::Reference(id) => *id,
                _ => continue,
            };
            if !seen.insert(obj_id) {
                continue;
            }

            let stream = match self.doc.get_object(obj_id) {
                Ok(Object::Stream(s)) => s,
                _ => continue,
            };

            match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => images.push(EmbeddedImage {
                    object_id: obj_id,
                    name: String::from_utf8_lossy(name).to_string(),
                    stream,
                    width: self.dimension(&stream.dict, b"Width"),
                    height: self.dimension(&stream.dict, b"Height"),
                }),
                Ok(b"Form") => {
                    if let Some(form_resources) =
                        stream.dict.get(b"Resources").ok().and_then(|r| self.resolve_dict(r))
                    {
                        self.collect_images(form_resources, images, seen);
                    }
                }
                _ => {}
            }
        }
    }

    fn dimension(&self, dict: &Dictionary, key: &[u8]) -> u32 {
        let value = match dict.get(key) {
            Ok(Object::Reference(id)) => self.doc.get_object(*id).ok(),
            Ok(obj) => Some(obj),
            Err(_) => None,
        };
        match value {
            Some(Object::Integer(n)) => u32::try_from(*n).unwrap_or(0),
            Some(Object::Real(n)) if *n >= 1.0 && *n < u32::MAX as f32 => *n as u32,
            _ => 0,
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match obj {
            Object::Dictionary(d) => Some(d),
            Object::Reference(id) => match self.doc.get_object(*id) {
                Ok(Object::Dictionary(d)) => Some(d),
                _ => None,
            },
            _ => None,
        }
    }
}
