//! WebAssembly bindings for the PDF image extractor

use wasm_bindgen::prelude::*;

use crate::config::ExtractionSettings;
use crate::error::ExtractError;
use crate::session::{Download, ResultsView, Session};

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Log the detailed error to the console and hand JS the short message.
fn to_js_error(err: ExtractError) -> JsError {
    web_sys::console::error_1(&JsValue::from_str(&err.to_string()));
    JsError::new(&err.user_message())
}

/// One downloadable file
#[wasm_bindgen]
pub struct DownloadJs {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl From<Download> for DownloadJs {
    fn from(download: Download) -> Self {
        Self {
            file_name: download.file_name,
            content_type: download.content_type.to_string(),
            bytes: download.bytes,
        }
    }
}

#[wasm_bindgen]
impl DownloadJs {
    /// Suggested file name, e.g. `page001_img00.jpg`
    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.file_name.clone()
    }

    /// MIME type for the Blob
    #[wasm_bindgen(getter, js_name = contentType)]
    pub fn content_type(&self) -> String {
        self.content_type.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// Upload, extract, browse and download, for one page of the web UI
#[wasm_bindgen]
pub struct ExtractorSession {
    session: Session,
}

impl Default for ExtractorSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl ExtractorSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ExtractorSession {
        ExtractorSession {
            session: Session::default(),
        }
    }

    /// Current state: `idle`, `file_selected`, `processing` or `results`
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.session.state().as_str().to_string()
    }

    /// Success, empty or error banner text
    #[wasm_bindgen(getter, js_name = statusMessage)]
    pub fn status_message(&self) -> Option<String> {
        self.session.status_message()
    }

    #[wasm_bindgen(js_name = selectFile)]
    pub fn select_file(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), JsError> {
        self.session.select_file(name, bytes).map_err(to_js_error)
    }

    /// Replace settings from JSON such as `{"quality": 80, "optimize": true}`.
    /// Missing fields take their defaults.
    #[wasm_bindgen(js_name = setSettingsJson)]
    pub fn set_settings_json(&mut self, json: &str) -> Result<(), JsError> {
        let settings = ExtractionSettings::from_json(json)
            .map_err(|e| JsError::new(&format!("Invalid settings: {}", e)))?;
        self.session.update_settings(settings).map_err(to_js_error)
    }

    /// Run extraction, calling `progress(page, totalPages, imagesFound)`
    /// after each page. Returns the number of extracted images.
    pub fn run(&mut self, progress: Option<js_sys::Function>) -> Result<usize, JsError> {
        let on_progress = |p: &crate::Progress| {
            if let Some(callback) = &progress {
                if let Err(e) = callback.call3(
                    &JsValue::NULL,
                    &JsValue::from(p.page),
                    &JsValue::from(p.total_pages),
                    &JsValue::from(p.images_found),
                ) {
                    web_sys::console::error_2(
                        &JsValue::from_str("progress callback failed:"),
                        &e,
                    );
                }
            }
        };
        self.session
            .run(on_progress)
            .map(|result| result.len())
            .map_err(to_js_error)
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// True when the run finished without finding any images
    #[wasm_bindgen(getter, js_name = noImages)]
    pub fn no_images(&self) -> bool {
        matches!(self.session.results_view(), Ok(ResultsView::NoImages))
    }

    #[wasm_bindgen(getter)]
    pub fn current(&self) -> usize {
        self.session.navigator().current()
    }

    #[wasm_bindgen(getter)]
    pub fn total(&self) -> usize {
        self.session.navigator().len()
    }

    pub fn next(&mut self) -> Result<bool, JsError> {
        self.session.next().map_err(to_js_error)
    }

    pub fn prev(&mut self) -> Result<bool, JsError> {
        self.session.prev().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = jumpTo)]
    pub fn jump_to(&mut self, index: usize) -> Result<bool, JsError> {
        self.session.jump_to(index).map_err(to_js_error)
    }

    pub fn image(&self, index: usize) -> Result<Option<DownloadJs>, JsError> {
        self.session
            .download_image(index)
            .map(|d| d.map(DownloadJs::from))
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = currentImage)]
    pub fn current_image(&self) -> Result<Option<DownloadJs>, JsError> {
        self.session
            .download_current()
            .map(|d| d.map(DownloadJs::from))
            .map_err(to_js_error)
    }

    /// All images as `extracted_images.zip`
    #[wasm_bindgen(js_name = zipAll)]
    pub fn zip_all(&self) -> Result<DownloadJs, JsError> {
        self.session
            .download_all()
            .map(DownloadJs::from)
            .map_err(to_js_error)
    }

    /// Selected images as `selected_images.zip`
    #[wasm_bindgen(js_name = zipSelected)]
    pub fn zip_selected(&self) -> Result<DownloadJs, JsError> {
        self.session
            .download_selected()
            .map(DownloadJs::from)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = toggleSelection)]
    pub fn toggle_selection(&mut self, index: usize) -> Result<bool, JsError> {
        self.session.toggle_selection(index).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = selectAll)]
    pub fn select_all(&mut self) -> Result<(), JsError> {
        self.session.select_all().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) {
        self.session.clear_selection();
    }

    #[wasm_bindgen(js_name = isSelected)]
    pub fn is_selected(&self, index: usize) -> bool {
        self.session.is_selected(index)
    }

    #[wasm_bindgen(getter, js_name = selectedCount)]
    pub fn selected_count(&self) -> usize {
        self.session.selected_count()
    }

    /// Run statistics as JSON, or `null` before a run completes
    #[wasm_bindgen(js_name = summaryJson)]
    pub fn summary_json(&self) -> Result<Option<String>, JsError> {
        match self.session.result() {
            Some(result) => serde_json::to_string(&result.summary)
                .map(Some)
                .map_err(|e| JsError::new(&e.to_string())),
            None => Ok(None),
        }
    }
}
