// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Two-step upload protocol.
//!
//! 1. An authenticated caller asks for an upload grant and receives a
//!    one-time URL.
//! 2. The client POSTs the raw bytes to that URL; the grant is consumed and
//!    a fresh storage id is returned.
//!
//! The storage id is then passed to `create_file` by the same caller before
//! the claim deadline (one grant TTL after the upload). Unclaimed objects are
//! deleted by the purge sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::blobs::DEFAULT_CONTENT_TYPE;
use crate::storage::{PendingUpload, StoredBlob, UploadGrant};

use super::{Drive, DriveError, DriveResult, RequestContext};

/// Target for a single binary upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadTicket {
    /// URL to POST the file bytes to
    pub upload_url: String,
    /// Grant token embedded in `upload_url`
    #[serde(skip)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Drive {
    /// Issue a one-time upload grant to the authenticated caller.
    pub fn issue_upload_grant(&self, ctx: &RequestContext) -> DriveResult<UploadTicket> {
        let identity = ctx.require_identity()?;
        let now = Utc::now();
        let grant = UploadGrant {
            token: Uuid::new_v4().simple().to_string(),
            issued_to: identity.token_identifier(),
            issued_at: now,
            expires_at: now + self.settings().upload_grant_ttl,
        };

        let tx = self.db().write()?;
        tx.put_upload_grant(&grant)?;
        tx.commit()?;

        Ok(UploadTicket {
            upload_url: format!(
                "{}/v1/uploads/{}",
                self.settings().public_base_url.trim_end_matches('/'),
                grant.token
            ),
            token: grant.token,
            expires_at: grant.expires_at,
        })
    }

    /// Store the bytes for a grant and return the new storage id.
    ///
    /// The grant is exchanged for a pending upload record before the bytes
    /// are written, so no write transaction is open during the blob write.
    /// If the write fails the record is dropped and the grant restored.
    pub fn complete_upload(
        &self,
        token: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> DriveResult<String> {
        let now = Utc::now();
        let tx = self.db().write()?;
        let grant = tx
            .take_upload_grant(token)?
            .ok_or_else(|| DriveError::NotFound("upload grant".to_string()))?;

        if grant.is_expired(now) {
            // Drop the stale grant even though the upload is refused.
            tx.commit()?;
            return Err(DriveError::InvalidInput("upload grant expired".to_string()));
        }

        let pending = PendingUpload {
            storage_id: Uuid::new_v4().simple().to_string(),
            uploaded_by: grant.issued_to.clone(),
            uploaded_at: now,
            claim_deadline: now + self.settings().upload_grant_ttl,
        };
        tx.put_pending_upload(&pending)?;
        tx.commit()?;

        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);
        if let Err(e) = self.blobs().put(&pending.storage_id, content_type, data) {
            if let Err(restore) = self.release_upload(&pending.storage_id, &grant) {
                warn!(
                    storage_id = %pending.storage_id,
                    error = %restore,
                    "Failed to restore upload grant"
                );
            }
            return Err(e.into());
        }

        info!(
            storage_id = %pending.storage_id,
            size = data.len(),
            content_type = %content_type,
            "Upload stored"
        );
        Ok(pending.storage_id)
    }

    /// Undo the grant exchange after a failed blob write.
    fn release_upload(&self, storage_id: &str, grant: &UploadGrant) -> DriveResult<()> {
        let tx = self.db().write()?;
        tx.take_pending_upload(storage_id)?;
        tx.put_upload_grant(grant)?;
        tx.commit()?;
        Ok(())
    }

    /// Read a stored object for download.
    pub fn download(&self, storage_id: &str) -> DriveResult<StoredBlob> {
        Ok(self.blobs().get(storage_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::testing::{ctx_for, test_drive};
    use crate::storage::StoreRead;

    fn grant_pending(drive: &Drive, token: &str) -> bool {
        drive.db().read().unwrap().upload_grant(token).unwrap().is_some()
    }

    #[test]
    fn grant_requires_authentication() {
        let (drive, _dir) = test_drive();
        assert!(matches!(
            drive.issue_upload_grant(&RequestContext::anonymous()),
            Err(DriveError::Unauthenticated)
        ));
    }

    #[test]
    fn grant_url_points_at_upload_route() {
        let (drive, _dir) = test_drive();
        let ticket = drive.issue_upload_grant(&ctx_for("user_1")).unwrap();

        assert_eq!(
            ticket.upload_url,
            format!("https://files.test/v1/uploads/{}", ticket.token)
        );
        assert!(ticket.expires_at > Utc::now());
        assert!(grant_pending(&drive, &ticket.token));
    }

    #[test]
    fn grant_is_single_use() {
        let (drive, _dir) = test_drive();
        let ticket = drive.issue_upload_grant(&ctx_for("user_1")).unwrap();

        let storage_id = drive
            .complete_upload(&ticket.token, Some("image/png"), b"png bytes")
            .unwrap();
        assert!(!grant_pending(&drive, &ticket.token));

        let blob = drive.download(&storage_id).unwrap();
        assert_eq!(blob.data, b"png bytes");
        assert_eq!(blob.content_type, "image/png");

        assert!(matches!(
            drive.complete_upload(&ticket.token, None, b"again"),
            Err(DriveError::NotFound(_))
        ));
    }

    #[test]
    fn completed_upload_awaits_claim_by_uploader() {
        let (drive, _dir) = test_drive();
        let ticket = drive.issue_upload_grant(&ctx_for("user_1")).unwrap();
        let storage_id = drive.complete_upload(&ticket.token, None, b"x").unwrap();

        let pending = drive
            .db()
            .read()
            .unwrap()
            .pending_upload(&storage_id)
            .unwrap()
            .unwrap();
        assert_eq!(pending.uploaded_by, "test|user_1");
        assert!(pending.claim_deadline > pending.uploaded_at);
        assert!(!pending.is_abandoned(Utc::now()));
    }

    #[test]
    fn failed_write_restores_grant() {
        let (drive, dir) = test_drive();
        let ticket = drive.issue_upload_grant(&ctx_for("user_1")).unwrap();

        // A regular file where the blob directory should be makes every put fail.
        let blobs_dir = crate::storage::StoragePaths::new(dir.path()).blobs_dir();
        std::fs::remove_dir_all(&blobs_dir).unwrap();
        std::fs::write(&blobs_dir, b"").unwrap();

        assert!(matches!(
            drive.complete_upload(&ticket.token, None, b"x"),
            Err(DriveError::Upstream(_))
        ));
        assert!(grant_pending(&drive, &ticket.token));
        assert!(drive
            .db()
            .read()
            .unwrap()
            .abandoned_upload_ids(Utc::now() + chrono::Duration::days(1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn expired_grant_is_refused_and_dropped() {
        let (drive, _dir) = test_drive();
        let now = Utc::now();
        let tx = drive.db().write().unwrap();
        tx.put_upload_grant(&UploadGrant {
            token: "stale".to_string(),
            issued_to: "test|user_1".to_string(),
            issued_at: now - chrono::Duration::hours(2),
            expires_at: now - chrono::Duration::hours(1),
        })
        .unwrap();
        tx.commit().unwrap();

        assert!(matches!(
            drive.complete_upload("stale", None, b"x"),
            Err(DriveError::InvalidInput(_))
        ));
        assert!(!grant_pending(&drive, "stale"));
    }

    #[test]
    fn missing_content_type_uses_default() {
        let (drive, _dir) = test_drive();
        let ticket = drive.issue_upload_grant(&ctx_for("user_1")).unwrap();
        let storage_id = drive.complete_upload(&ticket.token, Some("  "), b"x").unwrap();

        assert_eq!(
            drive.download(&storage_id).unwrap().content_type,
            DEFAULT_CONTENT_TYPE
        );
    }
}
