// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shareable links: a durable public URL bound to a file record.
//!
//! Generating a link only requires that the file exists; resolving one is
//! public and matches the stored value exactly.

use chrono::Utc;
use tracing::info;

use crate::storage::StoreRead;

use super::{check_id, Drive, DriveError, DriveResult, FileView, RequestContext};

impl Drive {
    /// Bind the file's download URL to it and return the URL.
    ///
    /// Fails with `NotFound` for an unknown file and `Upstream` when the
    /// backing object cannot be resolved.
    pub fn generate_shareable_link(
        &self,
        ctx: &RequestContext,
        file_id: &str,
    ) -> DriveResult<String> {
        check_id("file", file_id)?;
        let tx = self.db().write()?;
        let mut file = tx
            .file(file_id)?
            .ok_or_else(|| DriveError::NotFound(format!("file {file_id}")))?;

        let link = self.resolve_url(&file.storage_id).ok_or_else(|| {
            DriveError::Upstream(format!("object for file {file_id} is unavailable"))
        })?;

        if file.shareable_link.as_deref() != Some(link.as_str()) {
            file.shareable_link = Some(link.clone());
            file.updated_at = Utc::now();
            tx.put_file(&file)?;
            tx.commit()?;
        }

        info!(request_id = %ctx.request_id(), file_id = %file_id, "Shareable link generated");
        Ok(link)
    }

    /// Look up a file by the exact value of its shareable link.
    pub fn resolve_shareable_link(&self, link: &str) -> DriveResult<FileView> {
        let tx = self.db().read()?;
        let file = tx
            .file_by_link(link)?
            .ok_or_else(|| DriveError::NotFound("shareable link".to_string()))?;
        let url = self.resolve_url(&file.storage_id);
        Ok(FileView { file, url })
    }
}
