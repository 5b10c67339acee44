//! TOML runtime configuration with environment overrides.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! stock booth: 33-second recordings, a 27 to 38 second file band and a local
//! `vidwish-data/` store.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vidwish_capture::{CaptureConfig, CaptureError, FacingMode, MediaConstraints, VideoConstraints};
use vidwish_core::{
    MAX_FILE_DURATION_SECS, MIN_FILE_DURATION_SECS, OBJECT_KEY_PREFIX, RECORDING_LIMIT_SECS,
    VIDEOS_COLLECTION, WEBM_MIME_TYPE,
};
use vidwish_gallery::VISIBILITY_THRESHOLD;
use vidwish_ui::{DEFAULT_GALLERY_PATH, RouteTable};
use vidwish_upload::UploadTarget;
use vidwish_validate::{DurationBand, ValidationError};

/// Overrides `[storage] data_dir`.
pub const DATA_DIR_ENV: &str = "VIDWISH_DATA_DIR";

/// Overrides `[gallery] route`.
pub const GALLERY_ROUTE_ENV: &str = "VIDWISH_GALLERY_ROUTE";

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Camera request and recording limit.
    pub recording: RecordingSection,
    /// Accepted file duration band.
    pub validation: ValidationSection,
    /// Local store layout.
    pub storage: StorageSection,
    /// Gallery route and autoplay threshold.
    pub gallery: GallerySection,
}

/// `[recording]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordingSection {
    /// Hard recording limit in seconds.
    pub limit_secs: u32,
    /// Ideal frame width.
    pub width: u32,
    /// Ideal frame height.
    pub height: u32,
    /// Preferred camera.
    pub facing_mode: FacingMode,
    /// Audio echo cancellation.
    pub echo_cancellation: bool,
    /// MIME type given to chosen files.
    pub mime_type: String,
}

impl Default for RecordingSection {
    fn default() -> Self {
        let constraints = MediaConstraints::default();
        Self {
            limit_secs: RECORDING_LIMIT_SECS,
            width: constraints.video.width,
            height: constraints.video.height,
            facing_mode: constraints.video.facing_mode,
            echo_cancellation: constraints.echo_cancellation,
            mime_type: WEBM_MIME_TYPE.to_string(),
        }
    }
}

/// `[validation]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSection {
    /// Shortest accepted file, inclusive.
    pub min_duration_secs: f64,
    /// Longest accepted file, inclusive.
    pub max_duration_secs: f64,
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            min_duration_secs: MIN_FILE_DURATION_SECS,
            max_duration_secs: MAX_FILE_DURATION_SECS,
        }
    }
}

/// `[storage]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    /// Root directory of the local store.
    pub data_dir: PathBuf,
    /// Metadata collection name.
    pub collection: String,
    /// Object key prefix.
    pub object_prefix: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("vidwish-data"),
            collection: VIDEOS_COLLECTION.to_string(),
            object_prefix: OBJECT_KEY_PREFIX.to_string(),
        }
    }
}

/// `[gallery]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GallerySection {
    /// Path the gallery page is served at.
    pub route: String,
    /// Visible fraction that starts playback.
    pub visibility_threshold: f64,
}

impl Default for GallerySection {
    fn default() -> Self {
        Self {
            route: DEFAULT_GALLERY_PATH.to_string(),
            visibility_threshold: VISIBILITY_THRESHOLD,
        }
    }
}

impl AppConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] when the file cannot be read, plus the
    /// errors of [`AppConfig::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// Loads `path` (or defaults) and applies process environment overrides.
    ///
    /// # Errors
    /// Same as [`AppConfig::from_file`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup`; blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|value| !value.trim().is_empty()) {
            debug!("config override {DATA_DIR_ENV}={dir}");
            self.storage.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(route) = lookup(GALLERY_ROUTE_ENV).filter(|value| !value.trim().is_empty()) {
            debug!("config override {GALLERY_ROUTE_ENV}={route}");
            self.gallery.route = route.trim().to_string();
        }
    }

    /// Checks every derived setting.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture_config()
            .map_err(|error| ConfigError::Invalid(format!("recording: {error}")))?;
        self.duration_band()
            .map_err(|error| ConfigError::Invalid(format!("validation: {error}")))?;

        let threshold = self.gallery.visibility_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "gallery: visibility_threshold {threshold} must be in (0, 1]"
            )));
        }
        if self.recording.mime_type.trim().is_empty() {
            return Err(ConfigError::Invalid("recording: mime_type is empty".to_string()));
        }
        if self.storage.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("storage: collection is empty".to_string()));
        }
        Ok(())
    }

    /// Capture settings for the controller.
    ///
    /// # Errors
    /// Returns [`CaptureError::InvalidLimit`] for a zero limit.
    pub fn capture_config(&self) -> Result<CaptureConfig, CaptureError> {
        let recording = &self.recording;
        CaptureConfig::new(
            MediaConstraints {
                audio: true,
                video: VideoConstraints {
                    width: recording.width,
                    height: recording.height,
                    facing_mode: recording.facing_mode,
                },
                echo_cancellation: recording.echo_cancellation,
            },
            recording.limit_secs,
        )
    }

    /// Accepted file duration band.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidBand`] for an inverted or
    /// non-finite band.
    pub fn duration_band(&self) -> Result<DurationBand, ValidationError> {
        DurationBand::new(
            self.validation.min_duration_secs,
            self.validation.max_duration_secs,
        )
    }

    /// Upload destination.
    pub fn upload_target(&self) -> UploadTarget {
        UploadTarget {
            collection: self.storage.collection.clone(),
            object_prefix: self.storage.object_prefix.clone(),
        }
    }

    /// Route table with the configured gallery path.
    pub fn route_table(&self) -> RouteTable {
        RouteTable::new(&self.gallery.route)
    }
}

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file unreadable.
    #[error("reading config {}: {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Malformed TOML or unknown key.
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Value out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
