#![warn(missing_docs)]
//! # vidwish-ui
//!
//! ## Purpose
//! Defines the page-facing state model for the `vidwish` booth.
//!
//! ## Responsibilities
//! - Resolve paths to the booth, thank-you and gallery routes.
//! - Hold the name input, its persistent inline message, the alert queue and
//!   the loading/submitted flags.
//! - Expose guard checks for whether capture or upload may start.
//!
//! ## Data flow
//! Booth session events mutate [`UiState`], which the host renders.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors. Invalid
//! combinations are prevented by guard methods.

use std::collections::VecDeque;

use vidwish_validate::validate_display_name;

/// Default path of the gallery page.
pub const DEFAULT_GALLERY_PATH: &str = "/gallery";

/// Page shown for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Name input, camera preview and controls (`/`).
    Booth,
    /// Terminal confirmation (`/thanks`).
    Thanks,
    /// Stored video list.
    Gallery,
}

/// Path table with a configurable gallery location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    gallery_path: String,
}

impl RouteTable {
    /// Creates a table serving the gallery at `gallery_path`.
    pub fn new(gallery_path: &str) -> Self {
        let normalized = normalize_path(gallery_path);
        let gallery_path = if normalized == "/" || normalized == "/thanks" {
            DEFAULT_GALLERY_PATH.to_string()
        } else {
            normalized
        };
        Self { gallery_path }
    }

    /// Resolves a request path. Unknown paths fall back to the booth.
    pub fn resolve(&self, path: &str) -> Route {
        let path = normalize_path(path);
        if path == "/thanks" {
            Route::Thanks
        } else if path == self.gallery_path {
            Route::Gallery
        } else {
            Route::Booth
        }
    }

    /// Canonical path of a route.
    pub fn path_of(&self, route: Route) -> &str {
        match route {
            Route::Booth => "/",
            Route::Thanks => "/thanks",
            Route::Gallery => &self.gallery_path,
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(DEFAULT_GALLERY_PATH)
    }
}

fn normalize_path(raw: &str) -> String {
    let path = raw.split(['?', '#']).next().unwrap_or_default().trim();
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        return "/".to_string();
    }
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Capture stage as shown to the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    /// Live preview, nothing recorded.
    Idle,
    /// Waiting for the camera permission prompt.
    Requesting,
    /// Recording with a running countdown.
    Recording,
    /// Recorded media available for playback and upload.
    Stopped,
}

/// Modal notice queued for the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Camera or microphone access refused.
    PermissionDenied(String),
    /// Upload or metadata write failed.
    UploadFailed(String),
    /// Upload and metadata write both succeeded.
    UploadSucceeded,
}

impl Notice {
    /// Text shown in the alert.
    pub fn message(&self) -> String {
        match self {
            Notice::PermissionDenied(detail) => {
                format!("We need camera and microphone access to record: {detail}")
            }
            Notice::UploadFailed(detail) => {
                format!("Uploading your video failed, please try again: {detail}")
            }
            Notice::UploadSucceeded => "Video uploaded and data saved!".to_string(),
        }
    }
}

/// Aggregate booth page state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    /// App version string sourced from root `VERSION`.
    pub version: String,
    /// Current page.
    pub route: Route,
    /// Raw name input.
    pub name: String,
    /// Persistent inline message shown under the name input.
    pub name_message: Option<String>,
    /// Inline message for the chosen file, e.g. a duration outside the band.
    pub media_message: Option<String>,
    /// Capture stage.
    pub capture: CapturePhase,
    /// Whether recorded or chosen media is ready to upload.
    pub has_media: bool,
    /// Whether an upload is in flight.
    pub loading: bool,
    /// Whether a submission has completed; uploads are then rejected.
    pub submitted: bool,
    alerts: VecDeque<Notice>,
}

impl UiState {
    /// Creates the initial booth state. The empty name is flagged inline.
    pub fn new(version: impl Into<String>) -> Self {
        let mut state = Self {
            version: version.into(),
            route: Route::Booth,
            name: String::new(),
            name_message: None,
            media_message: None,
            capture: CapturePhase::Idle,
            has_media: false,
            loading: false,
            submitted: false,
            alerts: VecDeque::new(),
        };
        state.set_name("");
        state
    }

    /// Stores the name input and refreshes its inline message.
    pub fn set_name(&mut self, raw: impl Into<String>) {
        self.name = raw.into();
        self.name_message = validate_display_name(&self.name)
            .err()
            .map(|error| error.to_string());
    }

    /// Returns `true` when the name passes the trim check.
    pub fn name_is_valid(&self) -> bool {
        self.name_message.is_none()
    }

    /// Returns `true` when the visitor may start a recording.
    pub fn can_start_capture(&self) -> bool {
        self.route == Route::Booth
            && self.name_is_valid()
            && self.capture == CapturePhase::Idle
            && !self.has_media
            && !self.loading
            && !self.submitted
    }

    /// Returns `true` when the visitor may upload.
    pub fn can_upload(&self) -> bool {
        self.route == Route::Booth
            && self.name_is_valid()
            && self.has_media
            && matches!(self.capture, CapturePhase::Idle | CapturePhase::Stopped)
            && !self.loading
            && !self.submitted
    }

    /// Queues an alert.
    pub fn push_alert(&mut self, notice: Notice) {
        self.alerts.push_back(notice);
    }

    /// Removes and returns the oldest alert.
    pub fn next_alert(&mut self) -> Option<Notice> {
        self.alerts.pop_front()
    }

    /// Pending alerts, oldest first.
    pub fn alerts(&self) -> impl Iterator<Item = &Notice> {
        self.alerts.iter()
    }

    /// Marks the submission done and moves to the thank-you page for good.
    pub fn complete_submission(&mut self) {
        self.loading = false;
        self.submitted = true;
        self.route = Route::Thanks;
    }

    /// Navigates to `route`. Leaving the thank-you page is refused.
    pub fn navigate(&mut self, route: Route) -> bool {
        if self.route == Route::Thanks && route != Route::Thanks {
            return false;
        }
        self.route = route;
        true
    }
}
