//! Directory-backed object and document store.
//!
//! Layout under the base directory:
//! - `objects/<key>` holds the media bytes, with a `<key>.meta.json` sidecar.
//! - `collections/<collection>.jsonl` holds one `{"id", "body"}` line per
//!   inserted document, in insertion order.
//!
//! Retrieval URLs are `file://` URLs carrying the per-object token written to
//! the sidecar, so a URL stays stable for the life of the object.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;
use vidwish_core::MediaBlob;

use crate::{Document, ObjectHandle, ObjectStore, RecordSink, RecordSource, StoreError, content_digest};

const OBJECTS_DIR: &str = "objects";
const COLLECTIONS_DIR: &str = "collections";
const SIDECAR_SUFFIX: &str = ".meta.json";

/// Sidecar written next to every stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Blob MIME type.
    pub content_type: String,
    /// Object size in bytes.
    pub size: usize,
    /// Hex SHA-256 of the object bytes.
    pub sha256: String,
    /// Random token embedded in the retrieval URL.
    pub token: String,
}

/// Store rooted at one local directory.
#[derive(Debug, Clone)]
pub struct LocalDirectoryBackend {
    base_path: PathBuf,
}

impl LocalDirectoryBackend {
    /// Opens (and creates when missing) a store rooted at `base`.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] when the directories cannot be created or
    /// the base path cannot be resolved.
    pub fn new(base: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base = base.as_ref();
        fs::create_dir_all(base.join(OBJECTS_DIR))?;
        fs::create_dir_all(base.join(COLLECTIONS_DIR))?;
        let base_path = fs::canonicalize(base)?;
        info!("local store opened at {}", base_path.display());
        Ok(Self { base_path })
    }

    /// Resolved base directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Reads the sidecar of a stored object.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the object has no sidecar.
    pub fn object_meta(&self, key: &str) -> Result<ObjectMeta, StoreError> {
        let path = sidecar_path(&self.object_path(key)?);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()));
            }
            Err(error) => return Err(error.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Reads the bytes of a stored object.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when no object exists under `key`.
    pub fn read_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let plain = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain || key.ends_with(SIDECAR_SUFFIX) {
            return Err(StoreError::Rejected(format!("object key {key:?} is not a plain relative path")));
        }
        Ok(self.base_path.join(OBJECTS_DIR).join(relative))
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf, StoreError> {
        let single_segment = !collection.is_empty()
            && !collection.starts_with('.')
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !single_segment {
            return Err(StoreError::Rejected(format!("collection name {collection:?} is invalid")));
        }
        Ok(self
            .base_path
            .join(COLLECTIONS_DIR)
            .join(format!("{collection}.jsonl")))
    }
}

fn sidecar_path(object_path: &Path) -> PathBuf {
    let mut name = object_path.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

fn new_token() -> String {
    let mut token = [0_u8; 16];
    rand::rng().fill(&mut token);
    hex::encode(token)
}

impl ObjectStore for LocalDirectoryBackend {
    fn put(&self, key: &str, blob: &MediaBlob) -> Result<ObjectHandle, StoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&path)?;
        file.write_all(blob.bytes())?;
        file.sync_all()?;

        let meta = ObjectMeta {
            content_type: blob.mime_type().to_string(),
            size: blob.len(),
            sha256: content_digest(blob),
            token: new_token(),
        };
        fs::write(sidecar_path(&path), serde_json::to_vec_pretty(&meta)?)?;
        debug!("wrote {} byte(s) to {}", blob.len(), path.display());

        Ok(ObjectHandle {
            key: key.to_string(),
        })
    }

    fn url_for(&self, handle: &ObjectHandle) -> Result<String, StoreError> {
        let meta = self.object_meta(&handle.key)?;
        let path = self.object_path(&handle.key)?;
        let mut url = Url::from_file_path(&path).map_err(|()| {
            StoreError::Unavailable(format!("{} cannot be expressed as a URL", path.display()))
        })?;
        url.set_query(Some(&format!("token={}", meta.token)));
        Ok(url.to_string())
    }
}

impl RecordSink for LocalDirectoryBackend {
    fn insert(&self, collection: &str, body: Map<String, Value>) -> Result<String, StoreError> {
        let path = self.collection_path(collection)?;
        let document = Document {
            id: Uuid::new_v4().simple().to_string(),
            body,
        };
        let mut line = serde_json::to_vec(&document)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(&line)?;
        debug!("appended document {} to {}", document.id, path.display());
        Ok(document.id)
    }
}

impl RecordSource for LocalDirectoryBackend {
    fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let path = self.collection_path(collection)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut documents = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Document>(&line) {
                Ok(document) => documents.push(document),
                Err(error) => warn!(
                    "skipping malformed line {} in {}: {error}",
                    index + 1,
                    path.display()
                ),
            }
        }
        debug!("loaded {} document(s) from {}", documents.len(), path.display());
        Ok(documents)
    }
}
