//! MediaStore: content-addressed files for captured stills and clips.
//!
//! Layout:
//! ```text
//! {root}/
//! ├── objects/
//! │   └── 5c/
//! │       └── 735d76fe...        # media bytes
//! └── metadata/
//!     └── 5c/
//!         └── 735d76fe....json   # {mime_type, size}
//! ```
//!
//! Writes are idempotent: storing the same bytes twice is a no-op. Objects
//! and sidecars land through a temp file in the shard directory and a
//! rename, so an interrupted write never occupies a content address. An
//! object whose bytes no longer hash to its address is rewritten on the
//! next `put` and refused by `get`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::hash::MediaHash;
use uuid::Uuid;

/// Sidecar written next to each object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub mime_type: String,
    pub size: u64,
}

/// Everything known about one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMedia {
    pub hash: MediaHash,
    pub mime_type: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    read_only: bool,
}

impl MediaStore {
    /// Open a writable store, creating its directories.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            root: root.into(),
            read_only: false,
        };
        for dir in [store.objects_dir(), store.metadata_dir()] {
            fs::create_dir_all(&dir).map_err(StoreError::io("create directory", &dir))?;
        }
        Ok(store)
    }

    /// Open for reading only. Nothing is created on disk.
    pub fn open_read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: true,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    fn metadata_dir(&self) -> PathBuf {
        self.root.join("metadata")
    }

    fn object_path(&self, hash: &MediaHash) -> PathBuf {
        self.objects_dir().join(hash.shard()).join(hash.file_stem())
    }

    fn metadata_path(&self, hash: &MediaHash) -> PathBuf {
        self.metadata_dir()
            .join(hash.shard())
            .join(format!("{}.json", hash.file_stem()))
    }

    pub fn put(&self, data: &[u8], mime_type: &str) -> Result<MediaHash> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }

        let hash = MediaHash::of(data);
        let object = self.object_path(&hash);
        if !holds(&object, &hash, data.len() as u64) {
            if object.exists() {
                tracing::warn!(media.hash = %hash, path = %object.display(), "replacing damaged media object");
            }
            write_atomically(&object, data)?;
        }

        let sidecar = self.metadata_path(&hash);
        if !sidecar.exists() {
            let metadata = MediaMetadata {
                mime_type: mime_type.to_string(),
                size: data.len() as u64,
            };
            let json = serde_json::to_vec(&metadata).map_err(|source| StoreError::Json {
                path: sidecar.clone(),
                source,
            })?;
            write_atomically(&sidecar, &json)?;
        }

        tracing::debug!(media.hash = %hash, mime_type, size = data.len(), "media stored");
        Ok(hash)
    }

    /// Read an object back. Bytes that no longer match their address are an error.
    pub fn get(&self, hash: &MediaHash) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(hash);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path).map_err(StoreError::io("read media", &path))?;
        if MediaHash::of(&data) != *hash {
            return Err(StoreError::Corrupt {
                hash: hash.to_string(),
                path,
            });
        }
        Ok(Some(data))
    }

    pub fn contains(&self, hash: &MediaHash) -> bool {
        self.object_path(hash).exists()
    }

    /// Metadata and path for an object, if present.
    ///
    /// Objects without a sidecar report `application/octet-stream`.
    pub fn inspect(&self, hash: &MediaHash) -> Result<Option<StoredMedia>> {
        let path = self.object_path(hash);
        if !path.exists() {
            return Ok(None);
        }

        let sidecar = self.metadata_path(hash);
        let (mime_type, size_bytes) = if sidecar.exists() {
            let json = fs::read(&sidecar).map_err(StoreError::io("read metadata", &sidecar))?;
            let metadata: MediaMetadata =
                serde_json::from_slice(&json).map_err(|source| StoreError::Json {
                    path: sidecar.clone(),
                    source,
                })?;
            (metadata.mime_type, metadata.size)
        } else {
            let len = fs::metadata(&path)
                .map_err(StoreError::io("stat media", &path))?
                .len();
            ("application/octet-stream".to_string(), len)
        };

        Ok(Some(StoredMedia {
            hash: hash.clone(),
            mime_type,
            size_bytes,
            path,
        }))
    }
}

/// True when `path` already holds exactly the bytes addressed by `hash`.
fn holds(path: &Path, hash: &MediaHash, len: u64) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == len => fs::read(path).is_ok_and(|data| MediaHash::of(&data) == *hash),
        _ => false,
    }
}

/// Write to a uniquely named temp file beside `path`, then rename into place.
fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(StoreError::io("create directory", parent))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    if let Err(e) = fs::write(&staging, data) {
        let _ = fs::remove_file(&staging);
        return Err(StoreError::Io {
            action: "write",
            path: staging,
            source: e,
        });
    }
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(StoreError::Io {
            action: "rename",
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}
