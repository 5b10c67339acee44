//! Shared fixtures for app integration tests.

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use vidwish_app::{BoothSession, MediaProbe};
use vidwish_capture::{CaptureConfig, CaptureController, MediaDevices, SyntheticMediaDevices};
use vidwish_core::{CoreError, MediaBlob, WEBM_MIME_TYPE};
use vidwish_upload::memory::MemoryBackend;
use vidwish_upload::{
    Document, ObjectHandle, ObjectStore, RecordSink, RecordSource, StoreError, UploadTarget,
    Uploader,
};
use vidwish_validate::DurationBand;

/// Probe that reports a fixed duration and counts calls.
#[allow(dead_code)]
pub struct FixedProbe {
    duration_secs: Option<f64>,
    calls: Mutex<u32>,
}

#[allow(dead_code)]
impl FixedProbe {
    pub fn new(duration_secs: Option<f64>) -> Self {
        Self {
            duration_secs,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().expect("probe lock should work")
    }
}

impl MediaProbe for FixedProbe {
    fn duration_secs(&self, _blob: &MediaBlob) -> Result<Option<f64>, CoreError> {
        *self.calls.lock().expect("probe lock should work") += 1;
        Ok(self.duration_secs)
    }
}

/// In-memory store that counts puts and can fail the next metadata writes.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryBackend,
    puts: Mutex<u32>,
    insert_failures: Mutex<u32>,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn failing_inserts(times: u32) -> Self {
        Self {
            insert_failures: Mutex::new(times),
            ..Self::default()
        }
    }

    pub fn puts(&self) -> u32 {
        *self.puts.lock().expect("store lock should work")
    }
}

impl ObjectStore for CountingStore {
    fn put(&self, key: &str, blob: &MediaBlob) -> Result<ObjectHandle, StoreError> {
        *self.puts.lock().expect("store lock should work") += 1;
        self.inner.put(key, blob)
    }

    fn url_for(&self, handle: &ObjectHandle) -> Result<String, StoreError> {
        self.inner.url_for(handle)
    }
}

impl RecordSink for CountingStore {
    fn insert(&self, collection: &str, body: Map<String, Value>) -> Result<String, StoreError> {
        let mut failures = self.insert_failures.lock().expect("store lock should work");
        if *failures > 0 {
            *failures -= 1;
            return Err(StoreError::Unavailable("document store offline".to_string()));
        }
        self.inner.insert(collection, body)
    }
}

impl RecordSource for CountingStore {
    fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.inner.list_all(collection)
    }
}

/// Builds a session with default configuration over the given collaborators.
#[allow(dead_code)]
pub fn session_with(
    devices: Arc<dyn MediaDevices>,
    store: Arc<CountingStore>,
    probe: Arc<dyn MediaProbe>,
) -> BoothSession {
    let capture = CaptureController::new(devices, CaptureConfig::default());
    let uploader = Uploader::new(store.clone(), store, UploadTarget::default());
    BoothSession::new(capture, uploader, probe, DurationBand::default())
}

/// Session with a granting camera and a probe that reports 33 seconds.
#[allow(dead_code)]
pub fn session(store: Arc<CountingStore>) -> BoothSession {
    session_with(
        Arc::new(SyntheticMediaDevices::new()),
        store,
        Arc::new(FixedProbe::new(Some(33.0))),
    )
}

/// Records `seconds` of one-chunk-per-second media and lets the deadline or
/// a manual stop end it.
#[allow(dead_code)]
pub fn record(session: &mut BoothSession, name: &str, seconds: u64) {
    session.set_name(name);
    session.start_capture(0).expect("capture should start");
    for second in 0..seconds {
        assert!(session.on_chunk(vec![second as u8 + 1; 16]));
        session
            .on_tick((second + 1) * 1_000)
            .expect("tick should succeed");
    }
    session.stop_capture(seconds * 1_000).expect("stop should succeed");
}

/// Blob standing in for a chosen file; probes decide its duration.
#[allow(dead_code)]
pub fn file_blob() -> MediaBlob {
    MediaBlob::new(WEBM_MIME_TYPE, vec![0x1A, 0x45, 0xDF, 0xA3, 0x80]).expect("blob fixture should be valid")
}
