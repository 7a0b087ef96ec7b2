// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File catalog: create, list, get, rename, soft delete and restore.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::{Category, FileRecord, FileType, StoreRead};

use super::access::{assert_can_modify, require_file_access, require_org_access, resolve_org_access};
use super::quota::active_bytes;
use super::{check_id, Drive, DriveError, DriveResult, RequestContext};

/// Longest accepted file name, in characters.
const MAX_NAME_CHARS: usize = 200;

/// Metadata for a file whose bytes were already uploaded.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    /// Explicit kind; derived from `content_type` when absent
    pub file_type: Option<FileType>,
    pub content_type: Option<String>,
    /// Id returned by `complete_upload`
    pub storage_id: String,
}

/// Filters for [`Drive::list_files`]. All set filters must match.
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    /// Case-insensitive substring of the name
    pub query: Option<String>,
    /// Categories the caller must have tagged the file with
    pub categories: Vec<Category>,
    /// Return only soft-deleted files instead of only active ones
    pub deleted_only: bool,
    pub file_type: Option<FileType>,
}

/// A file plus its freshly resolved download URL.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FileView {
    #[serde(flatten)]
    pub file: FileRecord,
    /// `null` when the backing object no longer exists
    pub url: Option<String>,
}

fn normalize_name(name: &str) -> DriveResult<String> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_NAME_CHARS {
        return Err(DriveError::InvalidInput(format!(
            "name must be 1 to {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

impl Drive {
    fn view(&self, file: FileRecord) -> FileView {
        let url = self.resolve_url(&file.storage_id);
        FileView { file, url }
    }

    /// Register an uploaded object as a file of `org_id`.
    pub fn create_file(
        &self,
        ctx: &RequestContext,
        org_id: &str,
        new: NewFile,
    ) -> DriveResult<FileRecord> {
        check_id("org", org_id)?;
        let name = normalize_name(&new.name)?;
        let file_type = match (new.file_type, new.content_type.as_deref()) {
            (Some(t), _) => t,
            (None, Some(mime)) => FileType::from_mime(mime)
                .ok_or_else(|| DriveError::InvalidInput(format!("unsupported content type {mime}")))?,
            (None, None) => {
                return Err(DriveError::InvalidInput(
                    "either type or content_type is required".to_string(),
                ))
            }
        };

        let tx = self.db().write()?;
        let access = require_org_access(&tx, ctx, org_id)?;

        // An object backs one file, and only its uploader may claim it.
        if tx.file_by_storage(&new.storage_id)?.is_some() {
            return Err(DriveError::InvalidInput(
                "storage id is already registered".to_string(),
            ));
        }
        let caller = ctx.require_identity()?.token_identifier();
        let claimable = tx
            .take_pending_upload(&new.storage_id)?
            .is_some_and(|p| p.uploaded_by == caller && !p.is_abandoned(Utc::now()));
        if !claimable {
            return Err(DriveError::InvalidInput(
                "storage id does not reference an unclaimed upload".to_string(),
            ));
        }

        let size = self.blobs().size(&new.storage_id).map_err(|e| match e {
            crate::storage::BlobError::NotFound(_) => {
                DriveError::InvalidInput("storage id does not reference an upload".to_string())
            }
            other => other.into(),
        })?;

        let used = active_bytes(&tx.files_in_org(org_id)?);
        if used.saturating_add(size) > self.settings().storage_quota_bytes {
            return Err(DriveError::QuotaExceeded);
        }

        let now = Utc::now();
        let file = FileRecord {
            id: Uuid::new_v4().to_string(),
            name,
            file_type,
            org_id: org_id.to_string(),
            storage_id: new.storage_id,
            user_id: access.user.id,
            size,
            should_delete: false,
            shareable_link: None,
            created_at: now,
            updated_at: now,
        };
        tx.put_file(&file)?;
        tx.commit()?;

        info!(
            request_id = %ctx.request_id(),
            file_id = %file.id,
            org_id = %file.org_id,
            size = file.size,
            "File created"
        );
        Ok(file)
    }

    /// Files of an organization, filtered, newest first.
    ///
    /// Callers without access get an empty list rather than an error.
    pub fn list_files(
        &self,
        ctx: &RequestContext,
        org_id: &str,
        query: &FileQuery,
    ) -> DriveResult<Vec<FileView>> {
        let tx = self.db().read()?;
        let Some(access) = resolve_org_access(&tx, ctx, org_id)? else {
            return Ok(Vec::new());
        };

        let mut files = tx.files_in_org(org_id)?;

        if let Some(needle) = query.query.as_deref().map(str::to_lowercase) {
            files.retain(|f| f.name.to_lowercase().contains(&needle));
        }

        for category in &query.categories {
            let tagged: HashSet<String> = tx
                .category_entries(*category, &access.user.id, org_id)?
                .into_iter()
                .map(|e| e.file_id)
                .collect();
            files.retain(|f| tagged.contains(&f.id));
        }

        files.retain(|f| f.should_delete == query.deleted_only);

        if let Some(file_type) = query.file_type {
            files.retain(|f| f.file_type == file_type);
        }

        files.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        debug!(
            request_id = %ctx.request_id(),
            org_id = %org_id,
            count = files.len(),
            "Listed files"
        );
        Ok(files.into_iter().map(|f| self.view(f)).collect())
    }

    /// One file, if the caller may see its organization.
    pub fn get_file(&self, ctx: &RequestContext, file_id: &str) -> DriveResult<FileView> {
        let tx = self.db().read()?;
        let access = require_file_access(&tx, ctx, file_id)?;
        Ok(self.view(access.file))
    }

    /// Rename a file. Requires access to the file's organization.
    pub fn rename_file(
        &self,
        ctx: &RequestContext,
        file_id: &str,
        name: &str,
    ) -> DriveResult<FileRecord> {
        let name = normalize_name(name)?;
        let tx = self.db().write()?;
        let mut file = require_file_access(&tx, ctx, file_id)?.file;

        file.name = name;
        file.updated_at = Utc::now();
        tx.put_file(&file)?;
        tx.commit()?;

        info!(request_id = %ctx.request_id(), file_id = %file.id, "File renamed");
        Ok(file)
    }

    /// Mark a file for deletion. Owner or organization admin only.
    pub fn delete_file(&self, ctx: &RequestContext, file_id: &str) -> DriveResult<FileRecord> {
        self.set_pending_delete(ctx, file_id, true)
    }

    /// Clear the deletion mark. Owner or organization admin only.
    pub fn restore_file(&self, ctx: &RequestContext, file_id: &str) -> DriveResult<FileRecord> {
        self.set_pending_delete(ctx, file_id, false)
    }

    fn set_pending_delete(
        &self,
        ctx: &RequestContext,
        file_id: &str,
        should_delete: bool,
    ) -> DriveResult<FileRecord> {
        let tx = self.db().write()?;
        let access = require_file_access(&tx, ctx, file_id)?;
        assert_can_modify(&access)?;

        let mut file = access.file;
        if file.should_delete != should_delete {
            file.should_delete = should_delete;
            file.updated_at = Utc::now();
            tx.put_file(&file)?;
            tx.commit()?;
        }

        info!(
            request_id = %ctx.request_id(),
            file_id = %file.id,
            org_id = %file.org_id,
            should_delete,
            "File delete mark updated"
        );
        Ok(file)
    }
}
