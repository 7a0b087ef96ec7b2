// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Derived storage usage per organization.
//!
//! Usage is recomputed from the catalog on every call: the sum of sizes of
//! the organization's files that are not marked for deletion. There is no
//! cached counter to keep in step with delete or restore.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::{FileRecord, StoreRead};

use super::access::resolve_org_access;
use super::{Drive, DriveResult, RequestContext};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Storage used by one organization.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct StorageUsage {
    pub org_id: String,
    pub bytes: u64,
    pub megabytes: f64,
    pub file_count: usize,
}

/// Total size of the files not marked for deletion.
pub fn active_bytes(files: &[FileRecord]) -> u64 {
    files
        .iter()
        .filter(|f| !f.should_delete)
        .map(|f| f.size)
        .sum()
}

pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

impl Drive {
    /// Storage used by `org_id`, or `None` when the caller has no access.
    pub fn storage_used(
        &self,
        ctx: &RequestContext,
        org_id: &str,
    ) -> DriveResult<Option<StorageUsage>> {
        let tx = self.db().read()?;
        if resolve_org_access(&tx, ctx, org_id)?.is_none() {
            return Ok(None);
        }

        let files = tx.files_in_org(org_id)?;
        let bytes = active_bytes(&files);
        Ok(Some(StorageUsage {
            org_id: org_id.to_string(),
            bytes,
            megabytes: bytes_to_megabytes(bytes),
            file_count: files.iter().filter(|f| !f.should_delete).count(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OrgRole;
    use crate::drive::testing::{seed_file, seed_user, test_drive};

    #[test]
    fn megabytes_use_binary_units() {
        assert_eq!(bytes_to_megabytes(1024 * 1024), 1.0);
        assert_eq!(bytes_to_megabytes(0), 0.0);
    }

    #[test]
    fn usage_sums_active_files_only() {
        let (drive, _dir) = test_drive();
        let (ctx, _) = seed_user(&drive, "user_1", &[("org_1", OrgRole::Member)]);
        let a = seed_file(&drive, &ctx, "org_1", "a.pdf", &[0u8; 100]);
        seed_file(&drive, &ctx, "org_1", "b.png", &[0u8; 200]);
        seed_file(&drive, &ctx, "user_1", "c.pdf", &[0u8; 50]);

        let usage = drive.storage_used(&ctx, "org_1").unwrap().unwrap();
        assert_eq!(usage.bytes, 300);
        assert_eq!(usage.megabytes, 300.0 / BYTES_PER_MB);
        assert_eq!(usage.file_count, 2);

        drive.delete_file(&ctx, &a.id).unwrap();
        assert_eq!(drive.storage_used(&ctx, "org_1").unwrap().unwrap().bytes, 200);

        drive.restore_file(&ctx, &a.id).unwrap();
        assert_eq!(drive.storage_used(&ctx, "org_1").unwrap().unwrap().bytes, 300);
    }

    #[test]
    fn usage_is_hidden_without_access() {
        let (drive, _dir) = test_drive();
        let (owner, _) = seed_user(&drive, "user_1", &[("org_1", OrgRole::Member)]);
        let (outsider, _) = seed_user(&drive, "user_2", &[]);
        seed_file(&drive, &owner, "org_1", "a.pdf", b"1");

        assert_eq!(drive.storage_used(&outsider, "org_1").unwrap(), None);
        assert_eq!(
            drive.storage_used(&RequestContext::anonymous(), "org_1").unwrap(),
            None
        );
    }
}
