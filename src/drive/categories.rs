// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-user category membership (favorites and the four folders).
//!
//! One relation keyed by `(category, user, org, file)` backs all five
//! categories; toggling flips presence of a single row.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::storage::{Category, CategoryEntry, StoreRead};

use super::access::{require_file_access, resolve_org_access};
use super::{Drive, DriveResult, RequestContext};

/// Result of a toggle: whether the file is now in the category.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub category: Category,
    pub file_id: String,
    pub active: bool,
}

impl Drive {
    /// Add the file to the category for the caller, or remove it if present.
    pub fn toggle_category(
        &self,
        ctx: &RequestContext,
        file_id: &str,
        category: Category,
    ) -> DriveResult<ToggleOutcome> {
        let tx = self.db().write()?;
        let access = require_file_access(&tx, ctx, file_id)?;
        let user_id = &access.user().id;
        let org_id = &access.file.org_id;

        let active = if tx.is_member(category, user_id, org_id, file_id)? {
            tx.remove_membership(category, user_id, org_id, file_id)?;
            false
        } else {
            tx.put_membership(category, user_id, org_id, file_id, Utc::now())?;
            true
        };
        tx.commit()?;

        debug!(
            request_id = %ctx.request_id(),
            file_id = %file_id,
            category = %category,
            active,
            "Category toggled"
        );
        Ok(ToggleOutcome {
            category,
            file_id: file_id.to_string(),
            active,
        })
    }

    /// Every row of one category for the caller in `org_id`.
    ///
    /// Rows whose file no longer exists are skipped. Callers without access
    /// get an empty list.
    pub fn list_category(
        &self,
        ctx: &RequestContext,
        org_id: &str,
        category: Category,
    ) -> DriveResult<Vec<CategoryEntry>> {
        let tx = self.db().read()?;
        let Some(access) = resolve_org_access(&tx, ctx, org_id)? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for entry in tx.category_entries(category, &access.user.id, org_id)? {
            if tx.file(&entry.file_id)?.is_some() {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
