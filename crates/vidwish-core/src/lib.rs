#![warn(missing_docs)]
//! # vidwish-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `vidwish` workspace.
//!
//! ## Responsibilities
//! - Represent recorded chunks and the immutable media blob assembled from them.
//! - Build validated submissions that the uploader consumes.
//! - Encode/decode the `{name, url}` metadata record stored per video.
//! - Probe WebM containers for their declared duration ([`webm`]).
//!
//! ## Data flow
//! The recorder emits [`Chunk`] values. When recording stops the chunks are
//! assembled once into a [`MediaBlob`]. At upload time the blob and the current
//! display name become a [`Submission`]; a successful upload produces a
//! [`VideoRecord`], which the gallery later reads back as a [`StoredVideo`].
//!
//! ## Ownership and lifetimes
//! Chunks own their buffers. Blobs share one immutable buffer (`Arc<[u8]>`) so
//! the capture state, the pending submission and a retried upload can all hold
//! the same bytes without copying.
//!
//! ## Error model
//! Validation failures (empty chunk, blank name, invalid duration) and codec
//! failures return [`CoreError`] variants.
//!
//! ## Security and privacy notes
//! `Debug` output for blobs and chunks prints sizes only, never media bytes.
//!
//! ## Example
//! ```rust
//! use vidwish_core::{Chunk, MediaBlob, MediaSource, Submission, WEBM_MIME_TYPE};
//!
//! let chunks = vec![Chunk::new(vec![1, 2]).unwrap(), Chunk::new(vec![3]).unwrap()];
//! let blob = MediaBlob::from_chunks(WEBM_MIME_TYPE, &chunks).unwrap();
//! assert_eq!(blob.bytes(), &[1, 2, 3]);
//!
//! let submission = Submission::new(" Alice ", blob, 33.0, MediaSource::Recording).unwrap();
//! assert_eq!(submission.display_name(), "Alice");
//! ```

pub mod webm;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use webm::{WebmError, probe_duration_secs};

/// Hard recording limit; also the length of the on-screen countdown.
pub const RECORDING_LIMIT_SECS: u32 = 33;

/// Target message length that the accepted file band is centred on.
pub const TARGET_DURATION_SECS: f64 = 33.0;

/// Shortest accepted uploaded-file duration (inclusive).
pub const MIN_FILE_DURATION_SECS: f64 = 27.0;

/// Longest accepted uploaded-file duration (inclusive).
pub const MAX_FILE_DURATION_SECS: f64 = 38.0;

/// Document collection holding one metadata record per video.
pub const VIDEOS_COLLECTION: &str = "videos";

/// Object-store key prefix for uploaded videos.
pub const OBJECT_KEY_PREFIX: &str = "videos";

/// Container type produced by the recorder.
pub const WEBM_MIME_TYPE: &str = "video/webm";

/// One incremental unit of encoded media emitted during recording.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    bytes: Vec<u8>,
}

impl Chunk {
    /// Constructs a non-empty chunk.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyChunk`] when `bytes` is empty.
    pub fn new(bytes: Vec<u8>) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::EmptyChunk);
        }
        Ok(Self { bytes })
    }

    /// Returns chunk length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; empty chunks are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk").field("len", &self.bytes.len()).finish()
    }
}

/// Immutable handle to assembled media bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl MediaBlob {
    /// Wraps an owned buffer as a blob.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyMimeType`] when `mime_type` is blank.
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Result<Self, CoreError> {
        let mime_type = mime_type.into();
        if mime_type.trim().is_empty() {
            return Err(CoreError::EmptyMimeType);
        }
        Ok(Self {
            mime_type,
            bytes: Arc::from(bytes),
        })
    }

    /// Concatenates chunks in emission order into one blob.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyMimeType`] when `mime_type` is blank.
    pub fn from_chunks(mime_type: impl Into<String>, chunks: &[Chunk]) -> Result<Self, CoreError> {
        let total = chunks.iter().map(Chunk::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(chunk.as_bytes());
        }
        Self::new(mime_type, bytes)
    }

    /// Returns the container MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Borrows the media bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns blob length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBlob")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Where the submitted media came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaSource {
    /// Captured in-page through the camera.
    Recording,
    /// Chosen from the visitor's files.
    File,
}

/// A finished video paired with the visitor's display name.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    display_name: String,
    blob: MediaBlob,
    duration_secs: f64,
    source: MediaSource,
}

impl Submission {
    /// Builds a validated submission. The display name is stored trimmed.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyDisplayName`] for a blank name,
    /// [`CoreError::EmptyBlob`] for a zero-length blob and
    /// [`CoreError::InvalidDuration`] for a negative or non-finite duration.
    pub fn new(
        display_name: &str,
        blob: MediaBlob,
        duration_secs: f64,
        source: MediaSource,
    ) -> Result<Self, CoreError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(CoreError::EmptyDisplayName);
        }
        if blob.is_empty() {
            return Err(CoreError::EmptyBlob);
        }
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(CoreError::InvalidDuration(duration_secs));
        }

        Ok(Self {
            display_name: display_name.to_string(),
            blob,
            duration_secs,
            source,
        })
    }

    /// Returns the trimmed display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Borrows the media blob.
    pub fn blob(&self) -> &MediaBlob {
        &self.blob
    }

    /// Returns media duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Returns the media origin.
    pub fn source(&self) -> MediaSource {
        self.source
    }

    /// Builds the metadata record for this submission once its URL is known.
    pub fn to_record(&self, url: impl Into<String>) -> VideoRecord {
        VideoRecord {
            name: self.display_name.clone(),
            url: url.into(),
        }
    }
}

/// Metadata record written once per successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Visitor display name.
    pub name: String,
    /// Resolvable media location.
    pub url: String,
}

impl VideoRecord {
    /// Converts the record into a schema-less document body.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when serialization fails.
    pub fn to_document(&self) -> Result<Map<String, Value>, CoreError> {
        match serde_json::to_value(self).map_err(CoreError::Codec)? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::UnexpectedDocument(other.to_string())),
        }
    }

    /// Reads a record back from a document body. Extra fields are ignored.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when `name` or `url` is missing or not a
    /// string.
    pub fn from_document(body: &Map<String, Value>) -> Result<Self, CoreError> {
        serde_json::from_value(Value::Object(body.clone())).map_err(CoreError::Codec)
    }
}

/// A stored video as listed by the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVideo {
    /// Document id assigned by the store.
    pub id: String,
    /// Visitor display name.
    pub name: String,
    /// Resolvable media location.
    pub url: String,
}

impl StoredVideo {
    /// Pairs a document id with its decoded record.
    pub fn from_record(id: impl Into<String>, record: VideoRecord) -> Self {
        Self {
            id: id.into(),
            name: record.name,
            url: record.url,
        }
    }
}

/// Builds the object-store key for one upload (`<prefix>/<id>`).
pub fn object_key(prefix: &str, id: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return id.to_string();
    }
    format!("{prefix}/{id}")
}

/// Error type for core model validation and codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Recorder emitted a zero-length chunk.
    #[error("chunk is empty")]
    EmptyChunk,
    /// Blob MIME type cannot be blank.
    #[error("mime type is empty")]
    EmptyMimeType,
    /// Submitted blob holds no bytes.
    #[error("media blob is empty")]
    EmptyBlob,
    /// Display name is blank after trimming.
    #[error("display name is empty")]
    EmptyDisplayName,
    /// Duration is negative, infinite or NaN.
    #[error("invalid media duration: {0}")]
    InvalidDuration(f64),
    /// Record did not serialize to a JSON object.
    #[error("unexpected document shape: {0}")]
    UnexpectedDocument(String),
    /// JSON encoding/decoding error.
    #[error("record codec failure: {0}")]
    Codec(#[from] serde_json::Error),
    /// WebM container parsing error.
    #[error("webm probe failure: {0}")]
    Webm(#[from] WebmError),
}
