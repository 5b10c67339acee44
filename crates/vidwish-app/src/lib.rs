#![warn(missing_docs)]
//! # vidwish-app
//!
//! ## Purpose
//! Orchestrates capture, validation, upload and UI state for one `vidwish`
//! booth visit.
//!
//! ## Responsibilities
//! - Gate capture and upload on the display name.
//! - Band-check chosen files before any storage call.
//! - Run the two-phase upload and project its outcome into alerts and routes.
//! - Load runtime configuration ([`config`]).
//!
//! ## Data flow
//! Name input -> [`BoothSession::start_capture`] -> recorder chunks and ticks
//! -> stop -> [`BoothSession::upload`] -> thank-you page. The file path
//! replaces the recording with [`BoothSession::choose_file`].
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Every failure that the
//! visitor must see is also projected into [`vidwish_ui::UiState`], either as
//! an inline message or as a queued alert.
//!
//! ## Security and privacy notes
//! Logs carry names, object keys and sizes, never media bytes.

pub mod config;

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;
use vidwish_capture::{CaptureController, CaptureError, CaptureState, StopOutcome};
use vidwish_core::{CoreError, MediaBlob, MediaSource, Submission, probe_duration_secs};
use vidwish_gallery::{Gallery, GalleryError};
use vidwish_ui::{CapturePhase, Notice, Route, RouteTable, UiState};
use vidwish_upload::{RecordSource, StoreError, UploadError, UploadReceipt, Uploader};
use vidwish_validate::{DurationBand, ValidationError, validate_display_name};

use crate::config::{AppConfig, ConfigError};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("VIDWISH_VERSION");

/// Start button label.
pub const START_LABEL: &str = "Start Capture";
/// Stop button label.
pub const STOP_LABEL: &str = "Stop Capture";
/// Re-record button label.
pub const RE_RECORD_LABEL: &str = "Re-record";
/// Upload button label.
pub const UPLOAD_LABEL: &str = "Upload Video";
/// Shown while an upload is in flight.
pub const LOADING_TEXT: &str = "Loading...";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Reads the playable length of a chosen file.
pub trait MediaProbe: Send + Sync {
    /// Returns the duration in seconds, or `None` when it cannot be read.
    ///
    /// # Errors
    /// Returns [`CoreError`] when the container is unreadable.
    fn duration_secs(&self, blob: &MediaBlob) -> Result<Option<f64>, CoreError>;
}

/// Probe reading the declared duration of WebM files.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebmProbe;

impl MediaProbe for WebmProbe {
    fn duration_secs(&self, blob: &MediaBlob) -> Result<Option<f64>, CoreError> {
        Ok(probe_duration_secs(blob.bytes())?)
    }
}

/// Flat projection of the booth controls for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoothControls {
    /// Start button is shown and enabled.
    pub start_enabled: bool,
    /// Stop button is shown.
    pub stop_visible: bool,
    /// Re-record button is shown.
    pub re_record_visible: bool,
    /// Upload button is shown.
    pub upload_visible: bool,
    /// Upload button is enabled.
    pub upload_enabled: bool,
    /// `Time left: N` while recording.
    pub countdown_text: Option<String>,
    /// Loading indicator text while uploading.
    pub loading_text: Option<&'static str>,
    /// Inline name message.
    pub name_message: Option<String>,
    /// Inline chosen-file message.
    pub media_message: Option<String>,
}

#[derive(Debug, Clone)]
struct ChosenFile {
    blob: MediaBlob,
    duration_secs: f64,
}

/// One visitor's pass through the booth.
pub struct BoothSession {
    capture: CaptureController,
    uploader: Uploader,
    probe: Arc<dyn MediaProbe>,
    band: DurationBand,
    chosen: Option<ChosenFile>,
    routes: RouteTable,
    ui: UiState,
}

impl BoothSession {
    /// Creates a session on the booth page with an empty name.
    pub fn new(
        capture: CaptureController,
        uploader: Uploader,
        probe: Arc<dyn MediaProbe>,
        band: DurationBand,
    ) -> Self {
        Self {
            capture,
            uploader,
            probe,
            band,
            chosen: None,
            routes: RouteTable::default(),
            ui: UiState::new(app_version()),
        }
    }

    /// Serves the pages from `routes` instead of the default table.
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Route table in use.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Follows a link to `path` and returns the page now shown.
    ///
    /// The thank-you page is terminal, so navigating away from it leaves the
    /// route unchanged.
    pub fn navigate(&mut self, path: &str) -> Route {
        let target = self.routes.resolve(path);
        if !self.ui.navigate(target) {
            debug!("booth navigation_refused from={:?} path={path}", self.ui.route);
        }
        self.ui.route
    }

    /// UI state snapshot.
    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Capture controller snapshot.
    pub fn capture(&self) -> &CaptureController {
        &self.capture
    }

    /// Removes and returns the oldest queued alert.
    pub fn next_alert(&mut self) -> Option<Notice> {
        self.ui.next_alert()
    }

    /// Updates the name input.
    pub fn set_name(&mut self, raw: &str) {
        self.ui.set_name(raw);
    }

    /// Starts a timed recording.
    ///
    /// # Errors
    /// - [`AppError::Validation`] for a blank name; nothing is requested.
    /// - [`AppError::Busy`] while media is pending, uploading or submitted.
    /// - [`AppError::Capture`] when the camera is refused; an alert is queued.
    pub fn start_capture(&mut self, now_ms: u64) -> Result<(), AppError> {
        self.ensure_name()?;
        if !self.ui.can_start_capture() {
            return Err(AppError::Busy("start recording"));
        }

        let result = self.capture.start(&self.ui.name, now_ms);
        if let Err(CaptureError::PermissionDenied(detail)) = &result {
            self.ui.push_alert(Notice::PermissionDenied(detail.clone()));
        }
        self.sync_capture();
        result.map_err(AppError::from)
    }

    /// Forwards one recorder data event.
    pub fn on_chunk(&mut self, bytes: Vec<u8>) -> bool {
        self.capture.on_data_available(bytes)
    }

    /// Advances the recording clock; fires the automatic stop when due.
    ///
    /// # Errors
    /// Propagates blob assembly failures.
    pub fn on_tick(&mut self, now_ms: u64) -> Result<Option<StopOutcome>, AppError> {
        let outcome = self.capture.on_tick(now_ms)?;
        self.sync_capture();
        Ok(outcome)
    }

    /// Stops the recording. Safe to call repeatedly.
    ///
    /// # Errors
    /// Propagates blob assembly failures.
    pub fn stop_capture(&mut self, now_ms: u64) -> Result<StopOutcome, AppError> {
        let outcome = self.capture.stop(now_ms)?;
        self.sync_capture();
        Ok(outcome)
    }

    /// Replaces any recording with a chosen file after checking its length.
    ///
    /// # Errors
    /// - [`AppError::Busy`] while recording, uploading or after submission.
    /// - [`AppError::Validation`] when the length is unknown or outside the
    ///   band; the message is shown inline and nothing is uploaded.
    pub fn choose_file(&mut self, blob: MediaBlob) -> Result<f64, AppError> {
        if self.ui.submitted || self.ui.loading || self.capture.is_recording() {
            return Err(AppError::Busy("choose a file"));
        }

        let probed = match self.probe.duration_secs(&blob) {
            Ok(duration) => duration,
            Err(error) => {
                warn!("booth file_probe failed bytes={}: {error}", blob.len());
                None
            }
        };
        let duration_secs = match self.band.check(probed) {
            Ok(duration) => duration,
            Err(error) => {
                self.ui.media_message = Some(error.to_string());
                self.chosen = None;
                self.sync_capture();
                return Err(error.into());
            }
        };

        self.capture.reset()?;
        self.chosen = Some(ChosenFile {
            blob,
            duration_secs,
        });
        self.ui.media_message = None;
        self.sync_capture();
        info!("booth file_chosen duration_secs={duration_secs:.1}");
        Ok(duration_secs)
    }

    /// Uploads the pending media and its `{name, url}` record.
    ///
    /// # Errors
    /// - [`AppError::AlreadySubmitted`] after a successful upload.
    /// - [`AppError::Validation`] for a blank name or an out-of-band file; no
    ///   storage call is made.
    /// - [`AppError::NoMedia`] when nothing was recorded or chosen.
    /// - [`AppError::Upload`] when either storage phase fails; an alert is
    ///   queued and the media is kept for a retry.
    pub fn upload(&mut self) -> Result<UploadReceipt, AppError> {
        if self.ui.submitted {
            return Err(AppError::AlreadySubmitted);
        }
        if self.ui.loading {
            return Err(AppError::Busy("upload"));
        }
        let name = self.ensure_name()?.to_string();
        let submission = self.pending_submission(&name)?;

        self.ui.loading = true;
        let result = self.uploader.upload(&submission);
        self.ui.loading = false;

        match result {
            Ok(receipt) => {
                info!(
                    "booth submission_complete name={} key={}",
                    submission.display_name(),
                    receipt.object_key
                );
                self.ui.push_alert(Notice::UploadSucceeded);
                self.ui.complete_submission();
                Ok(receipt)
            }
            Err(error) => {
                warn!(
                    "booth upload_failed phase={:?} orphaned_key={}: {error}",
                    error.phase(),
                    error.orphaned_key().unwrap_or("none")
                );
                self.ui.push_alert(Notice::UploadFailed(error.to_string()));
                Err(error.into())
            }
        }
    }

    /// Discards the pending media and returns to the live preview.
    ///
    /// # Errors
    /// Returns [`AppError::Busy`] while recording, uploading or after
    /// submission.
    pub fn re_record(&mut self) -> Result<(), AppError> {
        if self.ui.submitted || self.ui.loading || self.capture.is_recording() {
            return Err(AppError::Busy("re-record"));
        }
        self.capture.reset()?;
        self.chosen = None;
        self.ui.media_message = None;
        self.sync_capture();
        Ok(())
    }

    /// Projects the current state into button visibility and labels.
    pub fn controls(&self, now_ms: u64) -> BoothControls {
        let recording = self.capture.is_recording();
        BoothControls {
            start_enabled: self.ui.can_start_capture(),
            stop_visible: recording,
            re_record_visible: !recording && self.ui.has_media && !self.ui.submitted,
            upload_visible: !recording && self.ui.has_media,
            upload_enabled: self.ui.can_upload(),
            countdown_text: recording
                .then(|| format!("Time left: {}", self.capture.countdown(now_ms))),
            loading_text: self.ui.loading.then_some(LOADING_TEXT),
            name_message: self.ui.name_message.clone(),
            media_message: self.ui.media_message.clone(),
        }
    }

    fn ensure_name(&self) -> Result<&str, AppError> {
        Ok(validate_display_name(&self.ui.name)?)
    }

    fn pending_submission(&self, name: &str) -> Result<Submission, AppError> {
        if let Some(chosen) = &self.chosen {
            let duration_secs = self.band.check(Some(chosen.duration_secs))?;
            return Ok(Submission::new(
                name,
                chosen.blob.clone(),
                duration_secs,
                MediaSource::File,
            )?);
        }

        match self.capture.state() {
            CaptureState::Stopped {
                blob,
                duration_secs,
            } if !blob.is_empty() => Ok(Submission::new(
                name,
                blob.clone(),
                *duration_secs,
                MediaSource::Recording,
            )?),
            _ => Err(AppError::NoMedia),
        }
    }

    fn sync_capture(&mut self) {
        self.ui.capture = match self.capture.state() {
            CaptureState::Idle => CapturePhase::Idle,
            CaptureState::Requesting => CapturePhase::Requesting,
            CaptureState::Recording { .. } => CapturePhase::Recording,
            CaptureState::Stopped { .. } => CapturePhase::Stopped,
        };
        let recorded = self.capture.blob().is_some_and(|blob| !blob.is_empty());
        self.ui.has_media = self.chosen.is_some() || recorded;
    }
}

/// Loads the configured gallery page.
///
/// # Errors
/// Returns [`AppError::Gallery`] when the bulk read fails or the configured
/// threshold is rejected.
pub fn load_gallery(source: &dyn RecordSource, config: &AppConfig) -> Result<Gallery, AppError> {
    let gallery = Gallery::load(source, &config.storage.collection)?
        .with_threshold(config.gallery.visibility_threshold)?;
    Ok(gallery)
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input gate failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Capture subsystem error.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Upload sequence error.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
    /// Store error outside the upload sequence.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Gallery error.
    #[error("gallery error: {0}")]
    Gallery(#[from] GalleryError),
    /// Core model error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Media file unreadable.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Nothing recorded or chosen yet.
    #[error("record or choose a video first")]
    NoMedia,
    /// A submission already completed in this session.
    #[error("this video has already been submitted")]
    AlreadySubmitted,
    /// Action not available in the current state.
    #[error("cannot {0} right now")]
    Busy(&'static str),
}
