//! State for one user working through upload, extraction and download.
//!
//! A [`Session`] moves through `Idle -> FileSelected -> Processing -> Results`.
//! From `Results` it can go back to `Idle` with [`Session::reset`] or to
//! `FileSelected` with a new upload. Operations called from the wrong state
//! fail with [`ExtractError::InvalidState`] and change nothing.

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::config::{success_message, ExtractionSettings, UploadPolicy, NO_IMAGES_MESSAGE};
use crate::error::{ExtractError, Result};
use crate::extractor::extract;
use crate::loader::{has_pdf_header, PdfLoader};
use crate::navigator::SlideNavigator;
use crate::packager::{to_zip, to_zip_selected, ALL_IMAGES_ZIP, SELECTED_IMAGES_ZIP};
use crate::record::{ExtractionResult, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Idle,
    FileSelected,
    Processing,
    Results,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Idle => "idle",
            AppState::FileSelected => "file_selected",
            AppState::Processing => "processing",
            AppState::Results => "results",
        }
    }
}

/// What the results area should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsView {
    /// The run finished but found nothing to extract
    NoImages,
    Slides { current: usize, total: usize },
}

/// A file handed to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
struct SelectedFile {
    name: String,
    bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct Session {
    policy: UploadPolicy,
    settings: ExtractionSettings,
    state: AppState,
    file: Option<SelectedFile>,
    result: Option<ExtractionResult>,
    navigator: SlideNavigator,
    selection: BTreeSet<usize>,
    error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(UploadPolicy::default(), ExtractionSettings::default())
    }
}

impl Session {
    pub fn new(policy: UploadPolicy, settings: ExtractionSettings) -> Self {
        Self {
            policy,
            settings,
            state: AppState::Idle,
            file: None,
            result: None,
            navigator: SlideNavigator::default(),
            selection: BTreeSet::new(),
            error: None,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        self.result.as_ref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.name.as_str())
    }

    /// User-facing message from the last failed upload or run.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Banner text for the current state, if any.
    pub fn status_message(&self) -> Option<String> {
        match (&self.state, &self.result) {
            (AppState::Results, Some(result)) if result.is_empty() => {
                Some(NO_IMAGES_MESSAGE.to_string())
            }
            (AppState::Results, Some(result)) => Some(success_message(result.len())),
            _ => self.error.clone(),
        }
    }

    fn require(&self, expected: AppState, action: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(ExtractError::InvalidState {
                action,
                state: self.state.as_str(),
            });
        }
        Ok(())
    }

    fn clear_results(&mut self) {
        self.result = None;
        self.navigator = SlideNavigator::default();
        self.selection.clear();
    }

    /// Accept an upload after checking extension, size and `%PDF` magic.
    ///
    /// Any earlier result is discarded. On failure the session returns to
    /// `Idle` with the user message recorded.
    pub fn select_file(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        if self.state == AppState::Processing {
            return Err(ExtractError::InvalidState {
                action: "select a file",
                state: self.state.as_str(),
            });
        }

        self.clear_results();
        self.file = None;

        if let Err(err) = self.validate_upload(name, &bytes) {
            warn!("rejected upload {}: {}", name, err);
            self.error = Some(err.user_message());
            self.state = AppState::Idle;
            return Err(err);
        }

        info!("selected {} ({} bytes)", name, bytes.len());
        self.file = Some(SelectedFile {
            name: name.to_string(),
            bytes,
        });
        self.error = None;
        self.state = AppState::FileSelected;
        Ok(())
    }

    fn validate_upload(&self, name: &str, bytes: &[u8]) -> Result<()> {
        if !self.policy.is_allowed_file_name(name) {
            return Err(ExtractError::InvalidFormat(format!(
                "{} does not have an allowed extension",
                name
            )));
        }
        if !self.policy.is_within_size_limit(bytes.len()) {
            return Err(ExtractError::TooLarge {
                size: bytes.len(),
                limit: self.policy.max_bytes,
            });
        }
        if !has_pdf_header(bytes) {
            return Err(ExtractError::InvalidFormat(format!(
                "{} is missing the %PDF header",
                name
            )));
        }
        Ok(())
    }

    /// Extract images from the selected file.
    ///
    /// Loader errors send the session back to `Idle` with the message
    /// recorded. On success the session shows the first result slide.
    pub fn run<F>(&mut self, on_progress: F) -> Result<&ExtractionResult>
    where
        F: FnMut(&Progress),
    {
        self.require(AppState::FileSelected, "extract images")?;
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                return Err(ExtractError::InvalidState {
                    action: "extract images",
                    state: "no file is selected",
                })
            }
        };

        self.state = AppState::Processing;
        let loader = PdfLoader::new(self.policy.max_bytes);
        let outcome = loader
            .load(&file.bytes)
            .and_then(|document| extract(document, &self.settings, on_progress));

        match outcome {
            Ok(result) => {
                self.navigator = SlideNavigator::new(result.len());
                self.selection.clear();
                self.error = None;
                self.state = AppState::Results;
                self.file = Some(file);
                Ok(&*self.result.insert(result))
            }
            Err(err) => {
                warn!("extraction of {} failed: {}", file.name, err);
                self.error = Some(err.user_message());
                self.clear_results();
                self.state = AppState::Idle;
                Err(err)
            }
        }
    }

    /// Back to `Idle`, discarding file, result, selection and error.
    pub fn reset(&mut self) {
        self.clear_results();
        self.file = None;
        self.error = None;
        self.state = AppState::Idle;
    }

    /// Replace the settings for the next run.
    pub fn update_settings(&mut self, settings: ExtractionSettings) -> Result<()> {
        if self.state == AppState::Processing {
            return Err(ExtractError::InvalidState {
                action: "change settings",
                state: self.state.as_str(),
            });
        }
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn results_view(&self) -> Result<ResultsView> {
        self.require(AppState::Results, "show results")?;
        if self.navigator.is_empty() {
            return Ok(ResultsView::NoImages);
        }
        Ok(ResultsView::Slides {
            current: self.navigator.current(),
            total: self.navigator.len(),
        })
    }

    pub fn navigator(&self) -> &SlideNavigator {
        &self.navigator
    }

    pub fn next(&mut self) -> Result<bool> {
        self.require(AppState::Results, "navigate")?;
        Ok(self.navigator.next())
    }

    pub fn prev(&mut self) -> Result<bool> {
        self.require(AppState::Results, "navigate")?;
        Ok(self.navigator.prev())
    }

    pub fn jump_to(&mut self, index: usize) -> Result<bool> {
        self.require(AppState::Results, "navigate")?;
        Ok(self.navigator.jump_to(index))
    }

    fn results(&self, action: &'static str) -> Result<&ExtractionResult> {
        self.require(AppState::Results, action)?;
        self.result.as_ref().ok_or(ExtractError::InvalidState {
            action,
            state: "no result is available",
        })
    }

    /// A single image as a download. `None` if `index` is out of range.
    pub fn download_image(&self, index: usize) -> Result<Option<Download>> {
        let result = self.results("download an image")?;
        Ok(result.get(index).map(|record| Download {
            file_name: record.file_name(),
            content_type: record.mime_type(),
            bytes: record.bytes.clone(),
        }))
    }

    /// The image under the navigator cursor.
    pub fn download_current(&self) -> Result<Option<Download>> {
        self.download_image(self.navigator.current())
    }

    pub fn download_all(&self) -> Result<Download> {
        let result = self.results("download all images")?;
        Ok(Download {
            file_name: ALL_IMAGES_ZIP.to_string(),
            content_type: "application/zip",
            bytes: to_zip(result)?,
        })
    }

    pub fn download_selected(&self) -> Result<Download> {
        let result = self.results("download selected images")?;
        if self.selection.is_empty() {
            return Err(ExtractError::InvalidState {
                action: "download selected images",
                state: "nothing is selected",
            });
        }
        Ok(Download {
            file_name: SELECTED_IMAGES_ZIP.to_string(),
            content_type: "application/zip",
            bytes: to_zip_selected(result, &self.selection)?,
        })
    }

    /// Flip selection of one image. Returns whether it is now selected.
    pub fn toggle_selection(&mut self, index: usize) -> Result<bool> {
        self.require(AppState::Results, "select images")?;
        if index >= self.navigator.len() {
            return Ok(false);
        }
        if self.selection.remove(&index) {
            Ok(false)
        } else {
            self.selection.insert(index);
            Ok(true)
        }
    }

    pub fn select_all(&mut self) -> Result<()> {
        self.require(AppState::Results, "select images")?;
        self.selection = (0..self.navigator.len()).collect();
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selection.contains(&index)
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::{build_pdf, Fixture};
    use pretty_assertions::assert_eq;

    fn scenario_pdf() -> Vec<u8> {
        build_pdf(&[
            vec![
                Fixture::Jpeg { width: 50, height: 50 },
                Fixture::Rgb { width: 200, height: 200 },
            ],
            vec![Fixture::Rgb { width: 10, height: 10 }],
            vec![],
        ])
    }

    fn session_with_results() -> Session {
        let mut session = Session::default();
        session.select_file("scan.pdf", scenario_pdf()).unwrap();
        session.run(|_| {}).unwrap();
        session
    }

    #[test]
    fn full_flow_reaches_results() {
        let mut session = Session::default();
        assert_eq!(session.state(), AppState::Idle);

        session.select_file("scan.pdf", scenario_pdf()).unwrap();
        assert_eq!(session.state(), AppState::FileSelected);
        assert_eq!(session.file_name(), Some("scan.pdf"));

        let mut pages = Vec::new();
        let count = session.run(|p| pages.push(p.page)).unwrap().len();
        assert_eq!(count, 2);
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(session.state(), AppState::Results);
        assert_eq!(
            session.results_view().unwrap(),
            ResultsView::Slides { current: 0, total: 2 }
        );
        assert_eq!(
            session.status_message().as_deref(),
            Some("2 image(s) extracted successfully.")
        );
    }

    #[test]
    fn non_pdf_upload_returns_to_idle_with_message() {
        let mut session = Session::default();
        let err = session
            .select_file("fake.pdf", b"GIF89a not a pdf".to_vec())
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidFormat(_)));
        assert_eq!(session.state(), AppState::Idle);
        assert!(session.result().is_none());
        assert_eq!(
            session.error_message(),
            Some("This file is not a valid PDF. Only PDF files are allowed.")
        );
    }

    #[test]
    fn wrong_extension_is_rejected() {
        let mut session = Session::default();
        let err = session.select_file("scan.png", scenario_pdf()).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidFormat(_)));
        assert_eq!(session.state(), AppState::Idle);
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let policy = UploadPolicy {
            max_bytes: 100,
            ..UploadPolicy::default()
        };
        let mut session = Session::new(policy, ExtractionSettings::default());
        let err = session.select_file("scan.pdf", scenario_pdf()).unwrap_err();
        assert!(matches!(err, ExtractError::TooLarge { limit: 100, .. }));
        assert_eq!(session.state(), AppState::Idle);
    }

    #[test]
    fn corrupted_pdf_fails_run_and_returns_to_idle() {
        let mut session = Session::default();
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.extend_from_slice(b"garbage that is not a pdf body");
        session.select_file("broken.pdf", bytes).unwrap();

        let err = session.run(|_| {}).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidFormat(_)));
        assert_eq!(session.state(), AppState::Idle);
        assert!(session.result().is_none());
        assert!(session.status_message().is_some());
    }

    #[test]
    fn run_requires_a_selected_file() {
        let mut session = Session::default();
        let err = session.run(|_| {}).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::InvalidState { state: "idle", .. }
        ));
        assert_eq!(session.state(), AppState::Idle);
    }

    #[test]
    fn pdf_without_images_shows_empty_state() {
        let mut session = Session::default();
        session.select_file("empty.pdf", build_pdf(&[vec![]])).unwrap();
        let summary = session.run(|_| {}).unwrap().summary.clone();
        assert_eq!(summary.images_found, 0);
        assert_eq!(session.results_view().unwrap(), ResultsView::NoImages);
        assert_eq!(
            session.status_message().as_deref(),
            Some(NO_IMAGES_MESSAGE)
        );
        assert_eq!(session.download_current().unwrap(), None);
    }

    #[test]
    fn downloads_follow_the_cursor() {
        let mut session = session_with_results();
        let first = session.download_current().unwrap().unwrap();
        assert_eq!(first.file_name, "page001_img00.jpg");
        assert_eq!(first.content_type, "image/jpeg");

        assert!(session.next().unwrap());
        let second = session.download_current().unwrap().unwrap();
        assert_eq!(second.file_name, "page001_img01.png");
        assert_eq!(second.content_type, "image/png");
        assert!(!session.next().unwrap());

        assert_eq!(session.download_image(7).unwrap(), None);
    }

    #[test]
    fn zip_downloads() {
        let mut session = session_with_results();
        let all = session.download_all().unwrap();
        assert_eq!(all.file_name, ALL_IMAGES_ZIP);
        assert_eq!(all.content_type, "application/zip");

        assert!(session.download_selected().is_err());
        assert!(session.toggle_selection(1).unwrap());
        assert_eq!(session.selected_count(), 1);
        let selected = session.download_selected().unwrap();
        assert_eq!(selected.file_name, SELECTED_IMAGES_ZIP);
        assert_ne!(selected.bytes, all.bytes);

        session.select_all().unwrap();
        assert_eq!(session.selected_count(), 2);
        assert!(!session.toggle_selection(0).unwrap());
        assert!(!session.toggle_selection(99).unwrap());
        session.clear_selection();
        assert_eq!(session.selected_count(), 0);
    }

    #[test]
    fn new_upload_discards_previous_result() {
        let mut session = session_with_results();
        session.select_all().unwrap();
        session.select_file("other.pdf", scenario_pdf()).unwrap();
        assert_eq!(session.state(), AppState::FileSelected);
        assert!(session.result().is_none());
        assert_eq!(session.selected_count(), 0);
        assert!(session.download_all().is_err());
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = session_with_results();
        session.reset();
        assert_eq!(session.state(), AppState::Idle);
        assert!(session.result().is_none());
        assert!(session.file_name().is_none());
        assert!(session.status_message().is_none());
        assert!(session.results_view().is_err());
    }

    #[test]
    fn settings_are_validated() {
        let mut session = Session::default();
        let bad = ExtractionSettings {
            quality: 0,
            ..ExtractionSettings::default()
        };
        assert!(session.update_settings(bad).is_err());
        assert_eq!(session.settings().quality, 95);

        let good = ExtractionSettings {
            min_size_px: 5,
            ..ExtractionSettings::default()
        };
        session.update_settings(good).unwrap();
        session.select_file("scan.pdf", scenario_pdf()).unwrap();
        assert_eq!(session.run(|_| {}).unwrap().len(), 3);
    }
}
