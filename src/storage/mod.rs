// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives under a single data directory:
//!
//! ```text
//! {DATA_DIR}/
//!   metadata.redb            # Files, users, category memberships, upload grants
//!   blobs/{xx}/{storage_id}  # Uploaded payloads, sharded by id prefix
//!   blobs/{xx}/{storage_id}.type
//! ```
//!
//! Metadata is kept in redb; binary payloads are kept in an [`ObjectStore`].
//! The two are never written in the same transaction, so the purge sweep
//! deletes the payload first and only then the metadata row.

pub mod blobs;
pub mod database;
pub mod paths;
pub mod records;

pub use blobs::{BlobError, BlobResult, FsObjectStore, ObjectStore, StoredBlob};
pub use database::{MetaStore, ReadTx, StoreError, StoreRead, StoreResult, WriteTx};
pub use paths::StoragePaths;
pub use records::{
    Category, CategoryEntry, FileRecord, FileType, OrgMembership, PendingUpload, UploadGrant,
    UserRecord,
};
