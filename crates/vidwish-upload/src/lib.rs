#![warn(missing_docs)]
//! # vidwish-upload
//!
//! ## Purpose
//! Persists one finished submission: media bytes to an object store, then a
//! `{name, url}` metadata record to a document store.
//!
//! ## Responsibilities
//! - Define the storage collaborators ([`ObjectStore`], [`RecordSink`],
//!   [`RecordSource`]) so backends are injected rather than global.
//! - Key every object by a fresh v4 UUID under the configured prefix.
//! - Report which phase failed, including any orphaned object key.
//! - Ship an in-process backend ([`memory::MemoryBackend`]) and a
//!   directory-backed one ([`local::LocalDirectoryBackend`]).
//!
//! ## Data flow
//! [`vidwish_core::Submission`] -> [`ObjectStore::put`] ->
//! [`ObjectStore::url_for`] -> [`RecordSink::insert`] -> [`UploadReceipt`].
//!
//! ## Error model
//! The sequence is two-phase and non-transactional. A failed object put
//! leaves nothing behind; a failed metadata insert leaves an orphaned object
//! whose key is carried by [`UploadError::MetadataWrite`]. Nothing is retried
//! here; the caller keeps the submission so the visitor can retry.
//!
//! ## Security and privacy notes
//! Logs carry object keys, sizes and digests, never media bytes.

pub mod local;
pub mod memory;

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;
use uuid::Uuid;
use vidwish_core::{
    CoreError, MediaBlob, OBJECT_KEY_PREFIX, Submission, VIDEOS_COLLECTION, object_key,
};

/// Opaque reference to a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHandle {
    /// Full object key.
    pub key: String,
}

/// One stored document as returned by a bulk read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned document id.
    pub id: String,
    /// Schema-less document body.
    pub body: Map<String, Value>,
}

/// Blob store keyed by caller-supplied unique ids.
pub trait ObjectStore: Send + Sync {
    /// Stores `blob` under `key`.
    fn put(&self, key: &str, blob: &MediaBlob) -> Result<ObjectHandle, StoreError>;

    /// Returns a durable retrieval URL for a stored object.
    fn url_for(&self, handle: &ObjectHandle) -> Result<String, StoreError>;
}

/// Append-only document sink.
pub trait RecordSink: Send + Sync {
    /// Inserts one document body and returns its id.
    fn insert(&self, collection: &str, body: Map<String, Value>) -> Result<String, StoreError>;
}

/// Bulk document reader.
pub trait RecordSource: Send + Sync {
    /// Lists every document in store-native order.
    fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;
}

/// Where uploads land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Document collection for metadata records.
    pub collection: String,
    /// Object key prefix.
    pub object_prefix: String,
}

impl Default for UploadTarget {
    fn default() -> Self {
        Self {
            collection: VIDEOS_COLLECTION.to_string(),
            object_prefix: OBJECT_KEY_PREFIX.to_string(),
        }
    }
}

/// Outcome of a completed two-phase upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Object key the media was stored under.
    pub object_key: String,
    /// Retrieval URL written into the metadata record.
    pub url: String,
    /// Metadata document id.
    pub record_id: String,
    /// Hex SHA-256 of the uploaded bytes.
    pub content_sha256: String,
    /// Uploaded size in bytes.
    pub size_bytes: usize,
}

/// Which half of the sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// Object put or URL retrieval.
    Object,
    /// Metadata record write.
    Metadata,
}

/// Two-phase uploader over injected collaborators.
#[derive(Clone)]
pub struct Uploader {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordSink>,
    target: UploadTarget,
}

impl Uploader {
    /// Creates an uploader writing to `target`.
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordSink>,
        target: UploadTarget,
    ) -> Self {
        Self {
            objects,
            records,
            target,
        }
    }

    /// Returns the configured target.
    pub fn target(&self) -> &UploadTarget {
        &self.target
    }

    /// Uploads the media and writes its metadata record.
    ///
    /// # Errors
    /// - [`UploadError::ObjectPut`] / [`UploadError::ObjectUrl`] /
    ///   [`UploadError::InvalidUrl`] when the object phase fails.
    /// - [`UploadError::Record`] / [`UploadError::MetadataWrite`] when the
    ///   metadata phase fails after the object was stored.
    pub fn upload(&self, submission: &Submission) -> Result<UploadReceipt, UploadError> {
        let blob = submission.blob();
        let key = object_key(&self.target.object_prefix, &Uuid::new_v4().to_string());
        let digest = content_digest(blob);

        let handle = self
            .objects
            .put(&key, blob)
            .map_err(|source| UploadError::ObjectPut {
                key: key.clone(),
                source,
            })?;
        info!(
            "upload object_stored key={} bytes={} sha256={digest}",
            handle.key,
            blob.len()
        );

        let url = self
            .objects
            .url_for(&handle)
            .map_err(|source| UploadError::ObjectUrl {
                key: handle.key.clone(),
                source,
            })?;
        if let Err(error) = Url::parse(&url) {
            return Err(UploadError::InvalidUrl {
                key: handle.key,
                reason: error.to_string(),
            });
        }

        let body = submission
            .to_record(url.clone())
            .to_document()
            .map_err(|source| UploadError::Record {
                orphaned_key: handle.key.clone(),
                source,
            })?;

        let record_id = match self.records.insert(&self.target.collection, body) {
            Ok(id) => id,
            Err(source) => {
                warn!(
                    "upload metadata_failed orphaned_key={} collection={}: {source}",
                    handle.key, self.target.collection
                );
                return Err(UploadError::MetadataWrite {
                    orphaned_key: handle.key,
                    source,
                });
            }
        };
        info!(
            "upload record_written id={record_id} collection={} name={}",
            self.target.collection,
            submission.display_name()
        );

        Ok(UploadReceipt {
            object_key: handle.key,
            url,
            record_id,
            content_sha256: digest,
            size_bytes: blob.len(),
        })
    }
}

/// Hex SHA-256 digest of the blob bytes.
pub fn content_digest(blob: &MediaBlob) -> String {
    hex::encode(Sha256::digest(blob.bytes()))
}

/// Storage collaborator failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or failing.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Backend refused the request.
    #[error("store rejected request: {0}")]
    Rejected(String),
    /// Requested object or collection does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Filesystem failure in a local backend.
    #[error("store io failure: {0}")]
    Io(#[from] std::io::Error),
    /// Document encoding failure.
    #[error("store codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Upload sequence failure.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Object put failed; nothing was stored.
    #[error("uploading video {key} failed: {source}")]
    ObjectPut {
        /// Intended object key.
        key: String,
        /// Backend error.
        #[source]
        source: StoreError,
    },
    /// Retrieval URL lookup failed after the object was stored.
    #[error("resolving the URL of {key} failed: {source}")]
    ObjectUrl {
        /// Stored object key.
        key: String,
        /// Backend error.
        #[source]
        source: StoreError,
    },
    /// Backend returned an unparseable URL.
    #[error("store returned an invalid URL for {key}: {reason}")]
    InvalidUrl {
        /// Stored object key.
        key: String,
        /// Parse failure.
        reason: String,
    },
    /// Metadata record could not be encoded.
    #[error("encoding the record for {orphaned_key} failed: {source}")]
    Record {
        /// Stored object key left without a record.
        orphaned_key: String,
        /// Codec error.
        #[source]
        source: CoreError,
    },
    /// Metadata insert failed after the object was stored.
    #[error("saving video details failed, {orphaned_key} has no record: {source}")]
    MetadataWrite {
        /// Stored object key left without a record.
        orphaned_key: String,
        /// Backend error.
        #[source]
        source: StoreError,
    },
}

impl UploadError {
    /// Returns the failed phase.
    pub fn phase(&self) -> UploadPhase {
        match self {
            UploadError::ObjectPut { .. }
            | UploadError::ObjectUrl { .. }
            | UploadError::InvalidUrl { .. } => UploadPhase::Object,
            UploadError::Record { .. } | UploadError::MetadataWrite { .. } => {
                UploadPhase::Metadata
            }
        }
    }

    /// Object key stored without a visible record, if any.
    pub fn orphaned_key(&self) -> Option<&str> {
        match self {
            UploadError::ObjectPut { .. } => None,
            UploadError::ObjectUrl { key, .. } | UploadError::InvalidUrl { key, .. } => Some(key),
            UploadError::Record { orphaned_key, .. }
            | UploadError::MetadataWrite { orphaned_key, .. } => Some(orphaned_key),
        }
    }
}
