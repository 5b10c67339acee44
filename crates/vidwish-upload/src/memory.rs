//! In-process backend implementing every storage collaborator.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::{Map, Value};
use vidwish_core::MediaBlob;

use crate::{Document, ObjectHandle, ObjectStore, RecordSink, RecordSource, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<String, MediaBlob>,
    collections: BTreeMap<String, Vec<Document>>,
    next_id: u64,
}

/// Object and document store held in memory; insertion order is list order.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.objects.len())
            .unwrap_or(0)
    }

    /// Returns the stored blob for `key`.
    pub fn object(&self, key: &str) -> Option<MediaBlob> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.objects.get(key).cloned())
    }

    /// Number of documents in `collection`.
    pub fn record_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .map(|state| state.collections.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory backend lock poisoned".to_string()))
    }
}

impl ObjectStore for MemoryBackend {
    fn put(&self, key: &str, blob: &MediaBlob) -> Result<ObjectHandle, StoreError> {
        let mut state = self.lock()?;
        state.objects.insert(key.to_string(), blob.clone());
        Ok(ObjectHandle {
            key: key.to_string(),
        })
    }

    fn url_for(&self, handle: &ObjectHandle) -> Result<String, StoreError> {
        let state = self.lock()?;
        if !state.objects.contains_key(&handle.key) {
            return Err(StoreError::NotFound(handle.key.clone()));
        }
        Ok(format!("memory://objects/{}", handle.key))
    }
}

impl RecordSink for MemoryBackend {
    fn insert(&self, collection: &str, body: Map<String, Value>) -> Result<String, StoreError> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let id = format!("doc-{:06}", state.next_id);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                body,
            });
        Ok(id)
    }
}

impl RecordSource for MemoryBackend {
    fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }
}
