// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixtures shared by drive, purge and API tests.

use tempfile::TempDir;

use crate::auth::{AuthenticatedUser, OrgRole};
use crate::storage::{FileRecord, FileType, StoragePaths, UserRecord};

use super::{Drive, DriveSettings, NewFile, RequestContext};

/// Issuer used by every test identity.
pub(crate) const TEST_ISSUER: &str = "test";

pub(crate) fn test_drive() -> (Drive, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let settings = DriveSettings {
        public_base_url: "https://files.test/".to_string(),
        ..DriveSettings::default()
    };
    let drive = Drive::open(&StoragePaths::new(dir.path()), settings).expect("Failed to open drive");
    (drive, dir)
}

/// Context for a caller with the given Clerk subject.
pub(crate) fn ctx_for(subject: &str) -> RequestContext {
    RequestContext::authenticated(AuthenticatedUser {
        user_id: subject.to_string(),
        session_id: None,
        issuer: TEST_ISSUER.to_string(),
        expires_at: 0,
    })
}

/// Provision a user with the given memberships and return their context.
pub(crate) fn seed_user(
    drive: &Drive,
    subject: &str,
    orgs: &[(&str, OrgRole)],
) -> (RequestContext, UserRecord) {
    let ctx = ctx_for(subject);
    let token = format!("{TEST_ISSUER}|{subject}");
    let mut user = drive
        .provision_user(&token, Some(subject.to_string()), None)
        .unwrap();
    for (org_id, role) in orgs {
        user = drive.add_org_membership(&token, org_id, *role).unwrap();
    }
    (ctx, user)
}

fn type_for(name: &str) -> FileType {
    match name.rsplit('.').next() {
        Some("pdf") => FileType::Pdf,
        Some("png") => FileType::Png,
        Some("jpg") => FileType::Jpeg,
        Some("csv") => FileType::Csv,
        Some("mp4") => FileType::Video,
        Some("mp3") => FileType::Audio,
        _ => FileType::Zip,
    }
}

/// Upload `data` and register it as a file in `org_id`.
pub(crate) fn seed_file(
    drive: &Drive,
    ctx: &RequestContext,
    org_id: &str,
    name: &str,
    data: &[u8],
) -> FileRecord {
    let storage_id = upload(drive, ctx, data);
    drive
        .create_file(
            ctx,
            org_id,
            NewFile {
                name: name.to_string(),
                file_type: Some(type_for(name)),
                content_type: None,
                storage_id,
            },
        )
        .unwrap()
}

/// Run the two-step upload protocol and return the storage id.
pub(crate) fn upload(drive: &Drive, ctx: &RequestContext, data: &[u8]) -> String {
    let ticket = drive.issue_upload_grant(ctx).unwrap();
    drive
        .complete_upload(&ticket.token, Some("application/octet-stream"), data)
        .unwrap()
}
