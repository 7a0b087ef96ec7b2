// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Drive
//!
//! Organization-scoped file catalog: access control, the file lifecycle,
//! categories, derived quota, shareable links and identity records.
//!
//! Every operation takes an explicit [`RequestContext`] and runs inside one
//! metadata transaction. Nothing here knows about HTTP; the `api` layer maps
//! [`DriveError`] to status codes.
//!
//! ## File Lifecycle
//!
//! ```text
//! create ──► Active ──delete──► PendingDelete ──purge sweep──► (gone)
//!              ▲                     │
//!              └──────restore────────┘
//! ```

pub mod access;
pub mod catalog;
pub mod categories;
pub mod context;
pub mod identity;
pub mod links;
pub mod quota;
pub mod uploads;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::storage::{
    BlobError, FsObjectStore, MetaStore, ObjectStore, StoragePaths, StoreError,
};

pub use access::{FileAccess, OrgAccess};
pub use catalog::{FileQuery, FileView, NewFile};
pub use categories::ToggleOutcome;
pub use context::RequestContext;
pub use identity::{MembershipChange, UserProfile};
pub use quota::StorageUsage;
pub use uploads::UploadTicket;

/// Longest accepted id (org, file, user) in bytes.
const MAX_ID_LEN: usize = 256;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("organization storage quota exceeded")]
    QuotaExceeded,

    #[error("object store failure: {0}")]
    Upstream(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<BlobError> for DriveError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::InvalidId(id) => DriveError::InvalidInput(format!("invalid storage id: {id}")),
            BlobError::NotFound(id) => DriveError::NotFound(format!("object {id}")),
            BlobError::Io(e) => DriveError::Upstream(e.to_string()),
        }
    }
}

pub type DriveResult<T> = Result<T, DriveError>;

/// Reject ids that cannot be stored as composite-key parts.
pub(crate) fn check_id(kind: &str, id: &str) -> DriveResult<()> {
    if id.is_empty() || id.len() > MAX_ID_LEN || id.chars().any(char::is_control) {
        return Err(DriveError::InvalidInput(format!("invalid {kind} id")));
    }
    Ok(())
}

// =============================================================================
// Service
// =============================================================================

/// Tunables of the drive service.
#[derive(Debug, Clone)]
pub struct DriveSettings {
    /// Externally reachable base URL, without trailing slash
    pub public_base_url: String,
    /// Lifetime of an upload grant
    pub upload_grant_ttl: chrono::Duration,
    /// Per-organization ceiling on active bytes
    pub storage_quota_bytes: u64,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            public_base_url: crate::config::DEFAULT_PUBLIC_BASE_URL.to_string(),
            upload_grant_ttl: chrono::Duration::seconds(
                crate::config::DEFAULT_UPLOAD_GRANT_TTL_SECS as i64,
            ),
            storage_quota_bytes: crate::config::DEFAULT_STORAGE_QUOTA_MB * 1024 * 1024,
        }
    }
}

/// The file service: metadata database, object store and settings.
pub struct Drive {
    db: MetaStore,
    blobs: Arc<dyn ObjectStore>,
    settings: DriveSettings,
}

impl Drive {
    pub fn new(db: MetaStore, blobs: Arc<dyn ObjectStore>, settings: DriveSettings) -> Self {
        Self {
            db,
            blobs,
            settings,
        }
    }

    /// Open the metadata database and filesystem object store under `paths`.
    pub fn open(paths: &StoragePaths, settings: DriveSettings) -> DriveResult<Self> {
        let db = MetaStore::open(&paths.metadata_db())?;
        let blobs = FsObjectStore::open(paths.clone())?;
        Ok(Self::new(db, Arc::new(blobs), settings))
    }

    pub fn db(&self) -> &MetaStore {
        &self.db
    }

    pub fn blobs(&self) -> &dyn ObjectStore {
        self.blobs.as_ref()
    }

    pub fn settings(&self) -> &DriveSettings {
        &self.settings
    }

    /// Public download URL of a stored object.
    pub fn storage_url(&self, storage_id: &str) -> String {
        format!(
            "{}/v1/storage/{}",
            self.settings.public_base_url.trim_end_matches('/'),
            storage_id
        )
    }

    /// Download URL if the backing object still exists.
    pub fn resolve_url(&self, storage_id: &str) -> Option<String> {
        self.blobs
            .exists(storage_id)
            .then(|| self.storage_url(storage_id))
    }
}
