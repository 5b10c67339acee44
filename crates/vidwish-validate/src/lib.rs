#![warn(missing_docs)]
//! # vidwish-validate
//!
//! ## Purpose
//! Gates capture and upload actions on visitor input.
//!
//! ## Responsibilities
//! - Accept a display name only when it is non-blank after trimming.
//! - Accept an uploaded file only when its duration lies inside the
//!   configured band (27 to 38 seconds inclusive by default).
//!
//! ## Error model
//! Each rejection is a [`ValidationError`] whose `Display` text is the inline
//! message shown next to the blocked control.

use thiserror::Error;
use vidwish_core::{MAX_FILE_DURATION_SECS, MIN_FILE_DURATION_SECS};

/// Returns the trimmed name when it holds at least one character.
///
/// # Errors
/// Returns [`ValidationError::NameRequired`] for blank input.
pub fn validate_display_name(raw: &str) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::NameRequired);
    }
    Ok(trimmed)
}

/// Inclusive range of accepted file durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationBand {
    min_secs: f64,
    max_secs: f64,
}

impl DurationBand {
    /// Creates a validated band.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidBand`] when a bound is negative or
    /// non-finite, or when `min_secs > max_secs`.
    pub fn new(min_secs: f64, max_secs: f64) -> Result<Self, ValidationError> {
        let bounds_ok = min_secs.is_finite() && max_secs.is_finite() && min_secs >= 0.0;
        if !bounds_ok || min_secs > max_secs {
            return Err(ValidationError::InvalidBand { min_secs, max_secs });
        }
        Ok(Self { min_secs, max_secs })
    }

    /// Lower bound in seconds.
    pub fn min_secs(&self) -> f64 {
        self.min_secs
    }

    /// Upper bound in seconds.
    pub fn max_secs(&self) -> f64 {
        self.max_secs
    }

    /// Returns `true` when `duration_secs` lies inside the band.
    pub fn contains(&self, duration_secs: f64) -> bool {
        duration_secs.is_finite() && duration_secs >= self.min_secs && duration_secs <= self.max_secs
    }

    /// Checks one file duration; `None` means the length could not be read.
    ///
    /// # Errors
    /// Returns [`ValidationError::DurationUnknown`] for `None` or non-finite
    /// values and [`ValidationError::DurationOutOfBand`] outside the band.
    pub fn check(&self, duration_secs: Option<f64>) -> Result<f64, ValidationError> {
        let duration_secs = match duration_secs {
            Some(value) if value.is_finite() => value,
            _ => return Err(ValidationError::DurationUnknown),
        };

        if !self.contains(duration_secs) {
            return Err(ValidationError::DurationOutOfBand {
                actual_secs: duration_secs,
                min_secs: self.min_secs,
                max_secs: self.max_secs,
            });
        }
        Ok(duration_secs)
    }
}

impl Default for DurationBand {
    fn default() -> Self {
        Self {
            min_secs: MIN_FILE_DURATION_SECS,
            max_secs: MAX_FILE_DURATION_SECS,
        }
    }
}

/// Validation failures surfaced as inline messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Display name is blank.
    #[error("Please enter your name before recording or uploading.")]
    NameRequired,
    /// File length could not be determined.
    #[error("We couldn't read the length of that video. Please choose another file.")]
    DurationUnknown,
    /// File length is outside the accepted band.
    #[error(
        "Your video is {actual_secs:.1} seconds long; it must be between {min_secs} and {max_secs} seconds."
    )]
    DurationOutOfBand {
        /// Measured duration.
        actual_secs: f64,
        /// Band lower bound.
        min_secs: f64,
        /// Band upper bound.
        max_secs: f64,
    },
    /// Configured band is unusable.
    #[error("invalid duration band: min={min_secs} max={max_secs}")]
    InvalidBand {
        /// Requested lower bound.
        min_secs: f64,
        /// Requested upper bound.
        max_secs: f64,
    },
}
