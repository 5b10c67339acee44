//! Shared fixtures for upload integration tests.

use std::sync::Mutex;

use serde_json::{Map, Value};
use vidwish_core::{MediaBlob, MediaSource, Submission, WEBM_MIME_TYPE};
use vidwish_upload::{ObjectHandle, ObjectStore, RecordSink, StoreError};

/// Builds a 33-second recorded submission for `name`.
#[allow(dead_code)]
pub fn submission(name: &str) -> Submission {
    let blob = MediaBlob::new(WEBM_MIME_TYPE, vec![0x1A, 0x45, 0xDF, 0xA3, 0, 1, 2, 3])
        .expect("blob fixture should be valid");
    Submission::new(name, blob, 33.0, MediaSource::Recording)
        .expect("submission fixture should be valid")
}

/// Record sink that fails a configurable number of inserts before accepting.
#[allow(dead_code)]
#[derive(Default)]
pub struct FlakyRecords {
    failures_left: Mutex<u32>,
    accepted: Mutex<Vec<Map<String, Value>>>,
}

#[allow(dead_code)]
impl FlakyRecords {
    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: Mutex::new(times),
            accepted: Mutex::new(Vec::new()),
        }
    }

    pub fn accepted(&self) -> Vec<Map<String, Value>> {
        self.accepted.lock().expect("lock should work").clone()
    }
}

impl RecordSink for FlakyRecords {
    fn insert(&self, _collection: &str, body: Map<String, Value>) -> Result<String, StoreError> {
        let mut failures_left = self.failures_left.lock().expect("lock should work");
        if *failures_left > 0 {
            *failures_left -= 1;
            return Err(StoreError::Unavailable("document store offline".to_string()));
        }
        let mut accepted = self.accepted.lock().expect("lock should work");
        accepted.push(body);
        Ok(format!("flaky-{}", accepted.len()))
    }
}

/// Object store that refuses every put.
#[allow(dead_code)]
pub struct RejectingObjects;

impl ObjectStore for RejectingObjects {
    fn put(&self, key: &str, _blob: &MediaBlob) -> Result<ObjectHandle, StoreError> {
        Err(StoreError::Rejected(format!("quota exceeded for {key}")))
    }

    fn url_for(&self, handle: &ObjectHandle) -> Result<String, StoreError> {
        Err(StoreError::NotFound(handle.key.clone()))
    }
}

/// Object store that returns a URL the uploader cannot parse.
#[allow(dead_code)]
pub struct BadUrlObjects;

impl ObjectStore for BadUrlObjects {
    fn put(&self, key: &str, _blob: &MediaBlob) -> Result<ObjectHandle, StoreError> {
        Ok(ObjectHandle {
            key: key.to_string(),
        })
    }

    fn url_for(&self, _handle: &ObjectHandle) -> Result<String, StoreError> {
        Ok("not a url".to_string())
    }
}
