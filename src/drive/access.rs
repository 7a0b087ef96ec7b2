// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Organization-scoped access control.
//!
//! Two predicates gate every per-request operation:
//!
//! - [`resolve_org_access`]: the caller has a user record and is either a
//!   member of the organization or the organization *is* their personal
//!   namespace (`org_id == subject`).
//! - [`resolve_file_access`]: the file exists and the caller has org access
//!   to the file's organization.
//!
//! Both fail closed and return `None` rather than an error, so read paths can
//! degrade to an empty answer. The `require_*` helpers turn `None` into
//! `Unauthenticated` / `Unauthorized` / `NotFound` for mutating paths.
//!
//! Delete and restore additionally go through [`assert_can_modify`]
//! (owner or organization admin).

use tracing::debug;

use crate::auth::OrgRole;
use crate::storage::{FileRecord, StoreRead, StoreResult, UserRecord};

use super::{DriveError, DriveResult, RequestContext};

/// Caller's standing in one organization.
#[derive(Debug, Clone)]
pub struct OrgAccess {
    pub user: UserRecord,
    /// Role from the membership list; `None` in the personal namespace.
    pub role: Option<OrgRole>,
}

impl OrgAccess {
    pub fn is_admin(&self) -> bool {
        self.role.is_some_and(|r| r.has_privilege(OrgRole::Admin))
    }
}

/// Caller's standing with respect to one file.
#[derive(Debug, Clone)]
pub struct FileAccess {
    pub org: OrgAccess,
    pub file: FileRecord,
}

impl FileAccess {
    pub fn user(&self) -> &UserRecord {
        &self.org.user
    }
}

/// Decide whether the caller may act within `org_id`.
pub fn resolve_org_access<T: StoreRead>(
    tx: &T,
    ctx: &RequestContext,
    org_id: &str,
) -> StoreResult<Option<OrgAccess>> {
    let Some(identity) = ctx.identity.as_ref() else {
        return Ok(None);
    };

    let Some(user) = tx.user_by_token(&identity.token_identifier())? else {
        debug!(
            request_id = %ctx.request_id(),
            subject = %identity.user_id,
            "Caller has no user record"
        );
        return Ok(None);
    };

    let role = user.role_in(org_id);
    if role.is_some() || org_id == identity.user_id {
        return Ok(Some(OrgAccess { user, role }));
    }

    debug!(
        request_id = %ctx.request_id(),
        user_id = %user.id,
        org_id = %org_id,
        "Caller is not a member of organization"
    );
    Ok(None)
}

/// Decide whether the caller may act on `file_id`.
pub fn resolve_file_access<T: StoreRead>(
    tx: &T,
    ctx: &RequestContext,
    file_id: &str,
) -> StoreResult<Option<FileAccess>> {
    let Some(file) = tx.file(file_id)? else {
        return Ok(None);
    };
    Ok(resolve_org_access(tx, ctx, &file.org_id)?.map(|org| FileAccess { org, file }))
}

/// Org access or a rejection.
pub fn require_org_access<T: StoreRead>(
    tx: &T,
    ctx: &RequestContext,
    org_id: &str,
) -> DriveResult<OrgAccess> {
    ctx.require_identity()?;
    resolve_org_access(tx, ctx, org_id)?
        .ok_or_else(|| DriveError::Unauthorized("no access to organization".to_string()))
}

/// File access or a rejection. A missing file is `NotFound`.
pub fn require_file_access<T: StoreRead>(
    tx: &T,
    ctx: &RequestContext,
    file_id: &str,
) -> DriveResult<FileAccess> {
    ctx.require_identity()?;
    let Some(file) = tx.file(file_id)? else {
        return Err(DriveError::NotFound(format!("file {file_id}")));
    };
    let org = resolve_org_access(tx, ctx, &file.org_id)?
        .ok_or_else(|| DriveError::Unauthorized("no access to file".to_string()))?;
    Ok(FileAccess { org, file })
}

/// Only the file's owner or an admin of its organization may delete or
/// restore it.
pub fn assert_can_modify(access: &FileAccess) -> DriveResult<()> {
    if access.file.user_id == access.user().id || access.org.is_admin() {
        Ok(())
    } else {
        Err(DriveError::Unauthorized(
            "only the owner or an organization admin may modify this file".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::testing::{ctx_for, seed_file, seed_user, test_drive};

    #[test]
    fn anonymous_caller_has_no_access() {
        let (drive, _dir) = test_drive();
        let tx = drive.db().read().unwrap();
        let ctx = RequestContext::anonymous();

        assert!(resolve_org_access(&tx, &ctx, "org_1").unwrap().is_none());
        assert!(matches!(
            require_org_access(&tx, &ctx, "org_1"),
            Err(DriveError::Unauthenticated)
        ));
    }

    #[test]
    fn caller_without_user_record_is_rejected() {
        let (drive, _dir) = test_drive();
        let tx = drive.db().read().unwrap();
        let ctx = ctx_for("user_ghost");

        assert!(resolve_org_access(&tx, &ctx, "org_1").unwrap().is_none());
        assert!(matches!(
            require_org_access(&tx, &ctx, "org_1"),
            Err(DriveError::Unauthorized(_))
        ));
    }

    #[test]
    fn members_and_personal_namespace_have_access() {
        let (drive, _dir) = test_drive();
        let (ctx, _) = seed_user(&drive, "user_1", &[("org_1", OrgRole::Member)]);
        let tx = drive.db().read().unwrap();

        let member = resolve_org_access(&tx, &ctx, "org_1").unwrap().unwrap();
        assert_eq!(member.role, Some(OrgRole::Member));
        assert!(!member.is_admin());

        let personal = resolve_org_access(&tx, &ctx, "user_1").unwrap().unwrap();
        assert_eq!(personal.role, None);

        assert!(resolve_org_access(&tx, &ctx, "org_2").unwrap().is_none());
        // Personal namespace is an exact match, not a substring.
        assert!(resolve_org_access(&tx, &ctx, "user_").unwrap().is_none());
    }

    #[test]
    fn file_access_follows_file_org() {
        let (drive, _dir) = test_drive();
        let (owner, _) = seed_user(&drive, "user_1", &[("org_1", OrgRole::Member)]);
        let (outsider, _) = seed_user(&drive, "user_2", &[("org_2", OrgRole::Admin)]);
        let file = seed_file(&drive, &owner, "org_1", "a.pdf", b"data");

        let tx = drive.db().read().unwrap();
        assert!(resolve_file_access(&tx, &owner, &file.id).unwrap().is_some());
        assert!(resolve_file_access(&tx, &outsider, &file.id).unwrap().is_none());
        assert!(resolve_file_access(&tx, &owner, "missing").unwrap().is_none());

        assert!(matches!(
            require_file_access(&tx, &outsider, &file.id),
            Err(DriveError::Unauthorized(_))
        ));
        assert!(matches!(
            require_file_access(&tx, &owner, "missing"),
            Err(DriveError::NotFound(_))
        ));
    }

    #[test]
    fn owner_or_admin_may_modify() {
        let (drive, _dir) = test_drive();
        let (owner, _) = seed_user(&drive, "user_1", &[("org_1", OrgRole::Member)]);
        let (member, _) = seed_user(&drive, "user_2", &[("org_1", OrgRole::Member)]);
        let (admin, _) = seed_user(&drive, "user_3", &[("org_1", OrgRole::Admin)]);
        let file = seed_file(&drive, &owner, "org_1", "a.pdf", b"data");

        let tx = drive.db().read().unwrap();
        for (ctx, allowed) in [(&owner, true), (&member, false), (&admin, true)] {
            let access = require_file_access(&tx, ctx, &file.id).unwrap();
            assert_eq!(assert_can_modify(&access).is_ok(), allowed);
        }
    }
}
