// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded metadata database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `files`: file_id → serialized FileRecord
//! - `files_by_org`: composite key (org_id|file_id) → file_id
//! - `files_pending_delete`: file_id → unix time the file was marked
//! - `files_by_shareable_link`: link → file_id
//! - `files_by_storage`: storage_id → file_id (one file per stored object)
//! - `category_members`: composite key (category|user_id|org_id|file_id) → unix time added
//! - `category_members_by_file`: composite key (file_id|category|user_id) → unix time added
//! - `users`: user_id → serialized UserRecord
//! - `users_by_token`: identity token → user_id
//! - `upload_grants`: token → serialized UploadGrant
//! - `pending_uploads`: storage_id → serialized PendingUpload
//!
//! Composite keys are joined with a NUL byte, which never appears in ids.
//!
//! ## Transactions
//!
//! Callers open one [`ReadTx`] or [`WriteTx`] per request. redb serializes
//! write transactions, so a read-modify-write done inside one `WriteTx` is
//! never interleaved with another writer.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::de::DeserializeOwned;

use super::records::{
    Category, CategoryEntry, FileRecord, PendingUpload, UploadGrant, UserRecord,
};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: file_id → serialized FileRecord (JSON bytes).
const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Index: `org_id|file_id` → file_id.
const FILES_BY_ORG: TableDefinition<&[u8], &str> = TableDefinition::new("files_by_org");

/// Index of soft-deleted files: file_id → unix timestamp of the delete.
const FILES_PENDING_DELETE: TableDefinition<&str, i64> =
    TableDefinition::new("files_pending_delete");

/// Index: shareable link → file_id (exact match lookups only).
const FILES_BY_LINK: TableDefinition<&str, &str> = TableDefinition::new("files_by_shareable_link");

/// Index: storage_id → file_id. An object backs at most one file.
const FILES_BY_STORAGE: TableDefinition<&str, &str> = TableDefinition::new("files_by_storage");

/// Membership relation: `category|user_id|org_id|file_id` → unix timestamp.
const CATEGORY_MEMBERS: TableDefinition<&[u8], i64> = TableDefinition::new("category_members");

/// Reverse membership index: `file_id|category|user_id` → unix timestamp.
/// Lets a purge find every membership row of a file without a full scan.
const CATEGORY_MEMBERS_BY_FILE: TableDefinition<&[u8], i64> =
    TableDefinition::new("category_members_by_file");

/// Primary table: user_id → serialized UserRecord (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Index: identity token → user_id.
const USERS_BY_TOKEN: TableDefinition<&str, &str> = TableDefinition::new("users_by_token");

/// One-time upload grants: token → serialized UploadGrant.
const UPLOAD_GRANTS: TableDefinition<&str, &[u8]> = TableDefinition::new("upload_grants");

/// Stored objects awaiting a file record: storage_id → serialized PendingUpload.
const PENDING_UPLOADS: TableDefinition<&str, &[u8]> = TableDefinition::new("pending_uploads");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Key Helpers
// =============================================================================

const KEY_SEPARATOR: u8 = 0;

/// Join key parts with the NUL separator, with a trailing separator so the
/// result doubles as a range prefix.
fn make_prefix(parts: &[&str]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len() + 1).sum();
    let mut key = Vec::with_capacity(len);
    for part in parts {
        key.extend_from_slice(part.as_bytes());
        key.push(KEY_SEPARATOR);
    }
    key
}

/// Full composite key: all parts joined, no trailing separator.
fn make_key(parts: &[&str]) -> Vec<u8> {
    let mut key = make_prefix(parts);
    key.pop();
    key
}

/// Exclusive upper bound for a prefix scan: the trailing separator is bumped
/// by one, which sorts after every key sharing the prefix.
fn make_prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    if let Some(last) = end.last_mut() {
        *last = KEY_SEPARATOR + 1;
    }
    end
}

/// Split a composite key back into its parts.
fn split_key(key: &[u8]) -> Vec<String> {
    key.split(|b| *b == KEY_SEPARATOR)
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect()
}

fn from_unix(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_default()
}

// =============================================================================
// Table Helpers
// =============================================================================

fn get_json<T, Tbl>(table: &Tbl, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn get_str<Tbl>(table: &Tbl, key: &str) -> StoreResult<Option<String>>
where
    Tbl: ReadableTable<&'static str, &'static str>,
{
    Ok(table.get(key)?.map(|v| v.value().to_string()))
}

/// Keys under a composite-key prefix, in key order.
fn scan_prefix_keys<Tbl, V>(table: &Tbl, prefix: &[u8]) -> StoreResult<Vec<Vec<u8>>>
where
    Tbl: ReadableTable<&'static [u8], V>,
    V: redb::Value + 'static,
{
    let end = make_prefix_end(prefix);
    let mut out = Vec::new();
    for entry in table.range(prefix..end.as_slice())? {
        let (key, _) = entry?;
        out.push(key.value().to_vec());
    }
    Ok(out)
}

/// `(key, timestamp)` pairs under a composite-key prefix, in key order.
fn scan_prefix_timestamps<Tbl>(table: &Tbl, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, i64)>>
where
    Tbl: ReadableTable<&'static [u8], i64>,
{
    let end = make_prefix_end(prefix);
    let mut out = Vec::new();
    for entry in table.range(prefix..end.as_slice())? {
        let (key, value) = entry?;
        out.push((key.value().to_vec(), value.value()));
    }
    Ok(out)
}

// =============================================================================
// Read Access
// =============================================================================

/// Lookups shared by read and write transactions.
///
/// Each method opens the tables it needs and drops them before returning,
/// so it is safe to call between writes in the same `WriteTx`.
pub trait StoreRead {
    /// Look up a file by id.
    fn file(&self, file_id: &str) -> StoreResult<Option<FileRecord>>;

    /// All files of an organization (any delete state), via the org index.
    fn files_in_org(&self, org_id: &str) -> StoreResult<Vec<FileRecord>>;

    /// Ids of every file marked for deletion.
    fn pending_delete_ids(&self) -> StoreResult<Vec<String>>;

    /// Exact-match lookup by shareable link.
    fn file_by_link(&self, link: &str) -> StoreResult<Option<FileRecord>>;

    /// File backed by the given stored object, if any.
    fn file_by_storage(&self, storage_id: &str) -> StoreResult<Option<FileRecord>>;

    /// Look up a user by internal id.
    fn user(&self, user_id: &str) -> StoreResult<Option<UserRecord>>;

    /// Look up a user by identity token.
    fn user_by_token(&self, token: &str) -> StoreResult<Option<UserRecord>>;

    /// Whether a membership row exists.
    fn is_member(
        &self,
        category: Category,
        user_id: &str,
        org_id: &str,
        file_id: &str,
    ) -> StoreResult<bool>;

    /// Every membership row of one category for a user within an org.
    fn category_entries(
        &self,
        category: Category,
        user_id: &str,
        org_id: &str,
    ) -> StoreResult<Vec<CategoryEntry>>;

    /// Look up an upload grant by token.
    fn upload_grant(&self, token: &str) -> StoreResult<Option<UploadGrant>>;

    /// Look up an unclaimed upload by storage id.
    fn pending_upload(&self, storage_id: &str) -> StoreResult<Option<PendingUpload>>;

    /// Storage ids of uploads whose claim deadline has passed.
    fn abandoned_upload_ids(&self, now: DateTime<Utc>) -> StoreResult<Vec<String>>;
}

macro_rules! impl_store_read {
    ($tx:ty) => {
        impl StoreRead for $tx {
            fn file(&self, file_id: &str) -> StoreResult<Option<FileRecord>> {
                let table = self.txn.open_table(FILES)?;
                get_json(&table, file_id)
            }

            fn files_in_org(&self, org_id: &str) -> StoreResult<Vec<FileRecord>> {
                let index = self.txn.open_table(FILES_BY_ORG)?;
                let files = self.txn.open_table(FILES)?;
                let prefix = make_prefix(&[org_id]);

                let mut out = Vec::new();
                for key in scan_prefix_keys(&index, &prefix)? {
                    let Some(file_id) = split_key(&key).pop() else {
                        continue;
                    };
                    if let Some(file) = get_json(&files, &file_id)? {
                        out.push(file);
                    }
                }
                Ok(out)
            }

            fn pending_delete_ids(&self) -> StoreResult<Vec<String>> {
                let table = self.txn.open_table(FILES_PENDING_DELETE)?;
                let mut ids = Vec::new();
                for entry in table.iter()? {
                    let (key, _) = entry?;
                    ids.push(key.value().to_string());
                }
                Ok(ids)
            }

            fn file_by_link(&self, link: &str) -> StoreResult<Option<FileRecord>> {
                let index = self.txn.open_table(FILES_BY_LINK)?;
                let Some(file_id) = get_str(&index, link)? else {
                    return Ok(None);
                };
                let files = self.txn.open_table(FILES)?;
                get_json(&files, &file_id)
            }

            fn file_by_storage(&self, storage_id: &str) -> StoreResult<Option<FileRecord>> {
                let index = self.txn.open_table(FILES_BY_STORAGE)?;
                let Some(file_id) = get_str(&index, storage_id)? else {
                    return Ok(None);
                };
                let files = self.txn.open_table(FILES)?;
                get_json(&files, &file_id)
            }

            fn user(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
                let table = self.txn.open_table(USERS)?;
                get_json(&table, user_id)
            }

            fn user_by_token(&self, token: &str) -> StoreResult<Option<UserRecord>> {
                let index = self.txn.open_table(USERS_BY_TOKEN)?;
                let Some(user_id) = get_str(&index, token)? else {
                    return Ok(None);
                };
                let users = self.txn.open_table(USERS)?;
                get_json(&users, &user_id)
            }

            fn is_member(
                &self,
                category: Category,
                user_id: &str,
                org_id: &str,
                file_id: &str,
            ) -> StoreResult<bool> {
                let table = self.txn.open_table(CATEGORY_MEMBERS)?;
                let key = make_key(&[category.as_str(), user_id, org_id, file_id]);
                let found = table.get(key.as_slice())?.is_some();
                Ok(found)
            }

            fn category_entries(
                &self,
                category: Category,
                user_id: &str,
                org_id: &str,
            ) -> StoreResult<Vec<CategoryEntry>> {
                let table = self.txn.open_table(CATEGORY_MEMBERS)?;
                let prefix = make_prefix(&[category.as_str(), user_id, org_id]);

                let mut out = Vec::new();
                for (key, added_at) in scan_prefix_timestamps(&table, &prefix)? {
                    let Some(file_id) = split_key(&key).pop() else {
                        continue;
                    };
                    out.push(CategoryEntry {
                        category,
                        file_id,
                        user_id: user_id.to_string(),
                        org_id: org_id.to_string(),
                        created_at: from_unix(added_at),
                    });
                }
                Ok(out)
            }

            fn upload_grant(&self, token: &str) -> StoreResult<Option<UploadGrant>> {
                let table = self.txn.open_table(UPLOAD_GRANTS)?;
                get_json(&table, token)
            }

            fn pending_upload(&self, storage_id: &str) -> StoreResult<Option<PendingUpload>> {
                let table = self.txn.open_table(PENDING_UPLOADS)?;
                get_json(&table, storage_id)
            }

            fn abandoned_upload_ids(&self, now: DateTime<Utc>) -> StoreResult<Vec<String>> {
                let table = self.txn.open_table(PENDING_UPLOADS)?;
                let mut ids = Vec::new();
                for entry in table.iter()? {
                    let (key, value) = entry?;
                    let upload: PendingUpload = serde_json::from_slice(value.value())?;
                    if upload.is_abandoned(now) {
                        ids.push(key.value().to_string());
                    }
                }
                Ok(ids)
            }
        }
    };
}

/// Read-only snapshot of the metadata database.
pub struct ReadTx {
    txn: ReadTransaction,
}

/// Serialized read-write transaction. Nothing is visible to other
/// transactions until [`WriteTx::commit`]; dropping it aborts.
pub struct WriteTx {
    txn: WriteTransaction,
}

impl_store_read!(ReadTx);
impl_store_read!(WriteTx);

// =============================================================================
// Writes
// =============================================================================

impl WriteTx {
    /// Make every write in this transaction durable and visible.
    pub fn commit(self) -> StoreResult<()> {
        self.txn.commit()?;
        Ok(())
    }

    /// Insert or replace a file row and keep its secondary indexes in step.
    pub fn put_file(&self, file: &FileRecord) -> StoreResult<()> {
        let previous = self.file(&file.id)?;
        let json = serde_json::to_vec(file)?;

        {
            let mut files = self.txn.open_table(FILES)?;
            files.insert(file.id.as_str(), json.as_slice())?;
        }
        {
            let mut by_org = self.txn.open_table(FILES_BY_ORG)?;
            let key = make_key(&[&file.org_id, &file.id]);
            by_org.insert(key.as_slice(), file.id.as_str())?;
        }
        {
            let mut by_storage = self.txn.open_table(FILES_BY_STORAGE)?;
            if let Some(prev) = &previous {
                if prev.storage_id != file.storage_id {
                    by_storage.remove(prev.storage_id.as_str())?;
                }
            }
            by_storage.insert(file.storage_id.as_str(), file.id.as_str())?;
        }
        {
            let mut pending = self.txn.open_table(FILES_PENDING_DELETE)?;
            if file.should_delete {
                let already = pending.get(file.id.as_str())?.is_some();
                if !already {
                    pending.insert(file.id.as_str(), file.updated_at.timestamp())?;
                }
            } else {
                pending.remove(file.id.as_str())?;
            }
        }
        {
            let mut by_link = self.txn.open_table(FILES_BY_LINK)?;
            let old_link = previous.as_ref().and_then(|p| p.shareable_link.as_deref());
            if let Some(old) = old_link {
                if file.shareable_link.as_deref() != Some(old) {
                    by_link.remove(old)?;
                }
            }
            if let Some(link) = &file.shareable_link {
                by_link.insert(link.as_str(), file.id.as_str())?;
            }
        }
        Ok(())
    }

    /// Delete a file row, its index entries, and every category membership
    /// row that references it. Returns the removed record, if any.
    pub fn remove_file(&self, file_id: &str) -> StoreResult<Option<FileRecord>> {
        let Some(file) = self.file(file_id)? else {
            return Ok(None);
        };

        {
            let mut files = self.txn.open_table(FILES)?;
            files.remove(file_id)?;
        }
        {
            let mut by_org = self.txn.open_table(FILES_BY_ORG)?;
            let key = make_key(&[&file.org_id, file_id]);
            by_org.remove(key.as_slice())?;
        }
        {
            let mut pending = self.txn.open_table(FILES_PENDING_DELETE)?;
            pending.remove(file_id)?;
        }
        {
            let mut by_storage = self.txn.open_table(FILES_BY_STORAGE)?;
            let owned = by_storage
                .get(file.storage_id.as_str())?
                .is_some_and(|v| v.value() == file_id);
            if owned {
                by_storage.remove(file.storage_id.as_str())?;
            }
        }
        if let Some(link) = &file.shareable_link {
            let mut by_link = self.txn.open_table(FILES_BY_LINK)?;
            let owned = by_link
                .get(link.as_str())?
                .is_some_and(|v| v.value() == file_id);
            if owned {
                by_link.remove(link.as_str())?;
            }
        }

        let memberships = {
            let by_file = self.txn.open_table(CATEGORY_MEMBERS_BY_FILE)?;
            scan_prefix_keys(&by_file, &make_prefix(&[file_id]))?
        };
        for key in memberships {
            let parts = split_key(&key);
            if let [_, category, user_id] = parts.as_slice() {
                if let Ok(category) = category.parse::<Category>() {
                    self.remove_membership(category, user_id, &file.org_id, file_id)?;
                }
            }
        }

        Ok(Some(file))
    }

    /// Add a file to a category for a user. Idempotent.
    pub fn put_membership(
        &self,
        category: Category,
        user_id: &str,
        org_id: &str,
        file_id: &str,
        added_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let ts = added_at.timestamp();
        {
            let mut members = self.txn.open_table(CATEGORY_MEMBERS)?;
            let key = make_key(&[category.as_str(), user_id, org_id, file_id]);
            members.insert(key.as_slice(), ts)?;
        }
        {
            let mut by_file = self.txn.open_table(CATEGORY_MEMBERS_BY_FILE)?;
            let key = make_key(&[file_id, category.as_str(), user_id]);
            by_file.insert(key.as_slice(), ts)?;
        }
        Ok(())
    }

    /// Remove a file from a category for a user. Returns whether a row existed.
    pub fn remove_membership(
        &self,
        category: Category,
        user_id: &str,
        org_id: &str,
        file_id: &str,
    ) -> StoreResult<bool> {
        let existed = {
            let mut members = self.txn.open_table(CATEGORY_MEMBERS)?;
            let key = make_key(&[category.as_str(), user_id, org_id, file_id]);
            let removed = members.remove(key.as_slice())?;
            removed.is_some()
        };
        {
            let mut by_file = self.txn.open_table(CATEGORY_MEMBERS_BY_FILE)?;
            let key = make_key(&[file_id, category.as_str(), user_id]);
            by_file.remove(key.as_slice())?;
        }
        Ok(existed)
    }

    /// Insert or replace a user and its identity-token index entry.
    pub fn put_user(&self, user: &UserRecord) -> StoreResult<()> {
        let previous = self.user(&user.id)?;
        let json = serde_json::to_vec(user)?;

        {
            let mut users = self.txn.open_table(USERS)?;
            users.insert(user.id.as_str(), json.as_slice())?;
        }
        {
            let mut by_token = self.txn.open_table(USERS_BY_TOKEN)?;
            if let Some(prev) = previous {
                if prev.token_identifier != user.token_identifier {
                    by_token.remove(prev.token_identifier.as_str())?;
                }
            }
            by_token.insert(user.token_identifier.as_str(), user.id.as_str())?;
        }
        Ok(())
    }

    /// Store a new upload grant.
    pub fn put_upload_grant(&self, grant: &UploadGrant) -> StoreResult<()> {
        let json = serde_json::to_vec(grant)?;
        let mut table = self.txn.open_table(UPLOAD_GRANTS)?;
        table.insert(grant.token.as_str(), json.as_slice())?;
        Ok(())
    }

    /// Remove and return an upload grant.
    pub fn take_upload_grant(&self, token: &str) -> StoreResult<Option<UploadGrant>> {
        let grant = self.upload_grant(token)?;
        if grant.is_some() {
            let mut table = self.txn.open_table(UPLOAD_GRANTS)?;
            table.remove(token)?;
        }
        Ok(grant)
    }

    /// Record an object written for an upload grant.
    pub fn put_pending_upload(&self, upload: &PendingUpload) -> StoreResult<()> {
        let json = serde_json::to_vec(upload)?;
        let mut table = self.txn.open_table(PENDING_UPLOADS)?;
        table.insert(upload.storage_id.as_str(), json.as_slice())?;
        Ok(())
    }

    /// Remove and return a pending upload.
    pub fn take_pending_upload(&self, storage_id: &str) -> StoreResult<Option<PendingUpload>> {
        let upload = self.pending_upload(storage_id)?;
        if upload.is_some() {
            let mut table = self.txn.open_table(PENDING_UPLOADS)?;
            table.remove(storage_id)?;
        }
        Ok(upload)
    }

    /// Drop every grant that expired before `now`. Returns how many were removed.
    pub fn remove_expired_grants(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let expired: Vec<String> = {
            let table = self.txn.open_table(UPLOAD_GRANTS)?;
            let mut tokens = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let grant: UploadGrant = serde_json::from_slice(value.value())?;
                if grant.is_expired(now) {
                    tokens.push(key.value().to_string());
                }
            }
            tokens
        };

        let mut table = self.txn.open_table(UPLOAD_GRANTS)?;
        for token in &expired {
            table.remove(token.as_str())?;
        }
        Ok(expired.len())
    }
}

// =============================================================================
// MetaStore
// =============================================================================

/// Embedded ACID metadata database.
pub struct MetaStore {
    db: Database,
}

impl MetaStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(FILES)?;
            let _ = write_txn.open_table(FILES_BY_ORG)?;
            let _ = write_txn.open_table(FILES_PENDING_DELETE)?;
            let _ = write_txn.open_table(FILES_BY_LINK)?;
            let _ = write_txn.open_table(FILES_BY_STORAGE)?;
            let _ = write_txn.open_table(CATEGORY_MEMBERS)?;
            let _ = write_txn.open_table(CATEGORY_MEMBERS_BY_FILE)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERS_BY_TOKEN)?;
            let _ = write_txn.open_table(UPLOAD_GRANTS)?;
            let _ = write_txn.open_table(PENDING_UPLOADS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin a read-only snapshot.
    pub fn read(&self) -> StoreResult<ReadTx> {
        Ok(ReadTx {
            txn: self.db.begin_read()?,
        })
    }

    /// Begin a serialized read-write transaction.
    pub fn write(&self) -> StoreResult<WriteTx> {
        Ok(WriteTx {
            txn: self.db.begin_write()?,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
