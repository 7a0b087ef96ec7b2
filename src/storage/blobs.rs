// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Binary object store for uploaded file payloads.
//!
//! Objects are addressed by an opaque storage id. The filesystem backend keeps
//! each payload in its own file next to a small sidecar holding the content
//! type. Writes go through a temp file and an atomic rename, so a reader never
//! observes a partially written object.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};

use super::StoragePaths;

/// Suffix of the sidecar file holding the object's content type.
const CONTENT_TYPE_SUFFIX: &str = "type";

/// Content type recorded when the uploader did not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Error type for object store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid storage id: {0}")]
    InvalidId(String),
}

pub type BlobResult<T> = Result<T, BlobError>;

/// A stored object read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Storage backend for binary payloads.
///
/// Implementations must be safe to call from blocking worker threads; all
/// methods are synchronous.
pub trait ObjectStore: Send + Sync {
    /// Write a new object. Existing objects with the same id are replaced.
    fn put(&self, storage_id: &str, content_type: &str, data: &[u8]) -> BlobResult<()>;

    /// Read an object.
    fn get(&self, storage_id: &str) -> BlobResult<StoredBlob>;

    /// Whether an object with this id is present.
    fn exists(&self, storage_id: &str) -> bool;

    /// Size of an object in bytes.
    fn size(&self, storage_id: &str) -> BlobResult<u64>;

    /// Remove an object. Removing a missing object is `BlobError::NotFound`.
    fn delete(&self, storage_id: &str) -> BlobResult<()>;

    /// Verify the backend is reachable and writable.
    fn health_check(&self) -> BlobResult<()>;
}

/// Storage ids are generated by this service (simple UUIDs), but they also
/// arrive in request paths, so anything outside `[A-Za-z0-9_-]` is rejected
/// before it can reach the filesystem.
pub fn is_valid_storage_id(storage_id: &str) -> bool {
    !storage_id.is_empty()
        && storage_id.len() <= 64
        && storage_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Filesystem-backed object store rooted at `StoragePaths::blobs_dir`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    paths: StoragePaths,
}

impl FsObjectStore {
    /// Create the store, making sure the blob directory exists.
    pub fn open(paths: StoragePaths) -> BlobResult<Self> {
        fs::create_dir_all(paths.blobs_dir())?;
        Ok(Self { paths })
    }

    fn checked_id<'a>(&self, storage_id: &'a str) -> BlobResult<&'a str> {
        if is_valid_storage_id(storage_id) {
            Ok(storage_id)
        } else {
            Err(BlobError::InvalidId(storage_id.to_string()))
        }
    }

    fn map_not_found(storage_id: &str, e: io::Error) -> BlobError {
        if e.kind() == io::ErrorKind::NotFound {
            BlobError::NotFound(storage_id.to_string())
        } else {
            BlobError::Io(e)
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, storage_id: &str, content_type: &str, data: &[u8]) -> BlobResult<()> {
        let storage_id = self.checked_id(storage_id)?;
        let path = self.paths.blob(storage_id);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(data)?;
            writer.flush()?;
        }
        fs::write(path.with_extension(CONTENT_TYPE_SUFFIX), content_type)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn get(&self, storage_id: &str) -> BlobResult<StoredBlob> {
        let storage_id = self.checked_id(storage_id)?;
        let path = self.paths.blob(storage_id);

        let data = fs::read(&path).map_err(|e| Self::map_not_found(storage_id, e))?;
        let content_type = fs::read_to_string(path.with_extension(CONTENT_TYPE_SUFFIX))
            .unwrap_or_else(|_| DEFAULT_CONTENT_TYPE.to_string());

        Ok(StoredBlob { content_type, data })
    }

    fn exists(&self, storage_id: &str) -> bool {
        match self.checked_id(storage_id) {
            Ok(id) => File::open(self.paths.blob(id)).is_ok(),
            Err(_) => false,
        }
    }

    fn size(&self, storage_id: &str) -> BlobResult<u64> {
        let storage_id = self.checked_id(storage_id)?;
        let metadata = fs::metadata(self.paths.blob(storage_id))
            .map_err(|e| Self::map_not_found(storage_id, e))?;
        Ok(metadata.len())
    }

    fn delete(&self, storage_id: &str) -> BlobResult<()> {
        let storage_id = self.checked_id(storage_id)?;
        let path = self.paths.blob(storage_id);

        fs::remove_file(&path).map_err(|e| Self::map_not_found(storage_id, e))?;
        // Sidecar is best-effort; a missing one only loses the content type.
        let _ = fs::remove_file(path.with_extension(CONTENT_TYPE_SUFFIX));
        Ok(())
    }

    fn health_check(&self) -> BlobResult<()> {
        let test_file = self.paths.blobs_dir().join(".health_check");
        let test_data = b"health_check_data";

        fs::write(&test_file, test_data)?;
        let read_data = fs::read(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(BlobError::Io(io::Error::other("health check data mismatch")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (FsObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::open(StoragePaths::new(dir.path())).unwrap();
        (store, dir)
    }

    #[test]
    fn put_and_get_preserves_bytes_and_content_type() {
        let (store, _dir) = test_store();
        let data = b"raw bytes: \x00\x01\x02\nand more";

        store.put("abc123", "application/pdf", data).unwrap();

        let blob = store.get("abc123").unwrap();
        assert_eq!(blob.data, data);
        assert_eq!(blob.content_type, "application/pdf");
        assert!(store.exists("abc123"));
        assert_eq!(store.size("abc123").unwrap(), data.len() as u64);
    }

    #[test]
    fn delete_removes_object() {
        let (store, _dir) = test_store();
        store.put("to-delete", "text/csv", b"a,b").unwrap();

        store.delete("to-delete").unwrap();

        assert!(!store.exists("to-delete"));
        assert!(matches!(store.get("to-delete"), Err(BlobError::NotFound(_))));
        assert!(matches!(store.size("to-delete"), Err(BlobError::NotFound(_))));
    }

    #[test]
    fn deleting_missing_object_is_not_found() {
        let (store, _dir) = test_store();
        assert!(matches!(store.delete("nope"), Err(BlobError::NotFound(_))));
    }

    #[test]
    fn path_traversal_ids_are_rejected() {
        let (store, _dir) = test_store();
        assert!(matches!(
            store.put("../escape", "text/plain", b"x"),
            Err(BlobError::InvalidId(_))
        ));
        assert!(!store.exists("../../etc/passwd"));
        assert!(!is_valid_storage_id(""));
        assert!(!is_valid_storage_id("a/b"));
        assert!(is_valid_storage_id("0f8fad5bd9cb469fa16570867728950e"));
    }

    #[test]
    fn health_check_works() {
        let (store, _dir) = test_store();
        store.health_check().expect("health check should pass");
    }
}
