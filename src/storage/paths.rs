// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the on-disk data layout.

use std::path::{Path, PathBuf};

/// Default base directory for all persistent data.
pub const DATA_ROOT: &str = "./data";

/// File name of the embedded metadata database.
const METADATA_DB_FILE: &str = "metadata.redb";

/// Storage path utilities for the data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the redb metadata database.
    pub fn metadata_db(&self) -> PathBuf {
        self.root.join(METADATA_DB_FILE)
    }

    // ========== Blob Paths ==========

    /// Directory containing all uploaded binary objects.
    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    /// Path to a single binary object.
    ///
    /// Objects are sharded by the first two characters of the storage id so
    /// that no single directory grows unbounded.
    pub fn blob(&self, storage_id: &str) -> PathBuf {
        let shard = storage_id.get(..2).unwrap_or("__");
        self.blobs_dir().join(shard).join(storage_id)
    }
}
