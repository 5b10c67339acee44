//! Shared fixtures for gallery integration tests.

use std::sync::Mutex;

use serde_json::{Map, json};
use vidwish_gallery::{Gallery, VisibilityObserver};
use vidwish_upload::RecordSink;
use vidwish_upload::memory::MemoryBackend;

/// Observer that records every registration call.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingObserver {
    pub observed: Mutex<Vec<(String, f64)>>,
    pub disconnected: Mutex<Vec<String>>,
}

impl VisibilityObserver for RecordingObserver {
    fn observe(&self, player: &str, threshold: f64) {
        self.observed
            .lock()
            .expect("observer lock should work")
            .push((player.to_string(), threshold));
    }

    fn disconnect(&self, player: &str) {
        self.disconnected
            .lock()
            .expect("observer lock should work")
            .push(player.to_string());
    }
}

/// Inserts one `{name, url}` record per name.
#[allow(dead_code)]
pub fn seeded_backend(names: &[&str]) -> MemoryBackend {
    let backend = MemoryBackend::new();
    for name in names {
        let body = json!({"name": name, "url": format!("memory://objects/videos/{name}")});
        let body: Map<_, _> = body.as_object().expect("object literal").clone();
        backend.insert("videos", body).expect("seed insert should succeed");
    }
    backend
}

/// Loads a gallery over seeded records and returns it with the player ids.
#[allow(dead_code)]
pub fn gallery(names: &[&str]) -> (Gallery, Vec<String>) {
    let backend = seeded_backend(names);
    let gallery = Gallery::load_default(&backend).expect("gallery should load");
    let ids = gallery
        .players()
        .iter()
        .map(|player| player.id().to_string())
        .collect();
    (gallery, ids)
}
