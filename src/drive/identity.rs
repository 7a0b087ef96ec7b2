// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity resolution and user provisioning.
//!
//! Request paths only *read* user records. Records are created and updated
//! by the privileged provisioning calls below, which the identity-provider
//! webhook drives.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::OrgRole;
use crate::storage::{StoreRead, UserRecord};

use super::{check_id, Drive, DriveError, DriveResult, RequestContext};

/// Public display data of a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserProfile {
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Organization membership event from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    pub token_identifier: String,
    pub org_id: String,
    pub role: OrgRole,
}

impl Drive {
    /// Look up the user behind an identity token. Never creates a record.
    pub fn get_user(&self, token_identifier: &str) -> DriveResult<UserRecord> {
        let tx = self.db().read()?;
        tx.user_by_token(token_identifier)?
            .ok_or_else(|| DriveError::NotFound("user".to_string()))
    }

    /// The caller's own record, if authenticated and provisioned.
    pub fn current_user(&self, ctx: &RequestContext) -> DriveResult<Option<UserRecord>> {
        let Some(token) = ctx.token_identifier() else {
            return Ok(None);
        };
        let tx = self.db().read()?;
        Ok(tx.user_by_token(&token)?)
    }

    /// Display name and avatar of any user. Unknown ids yield an empty profile.
    pub fn user_profile(&self, user_id: &str) -> DriveResult<UserProfile> {
        check_id("user", user_id)?;
        let tx = self.db().read()?;
        Ok(tx
            .user(user_id)?
            .map(|u| UserProfile {
                name: u.name,
                image: u.image,
            })
            .unwrap_or_default())
    }

    /// Create the user for an identity token. An existing record for the
    /// same token is updated in place, never duplicated.
    pub fn provision_user(
        &self,
        token_identifier: &str,
        name: Option<String>,
        image: Option<String>,
    ) -> DriveResult<UserRecord> {
        check_id("identity", token_identifier)?;
        let tx = self.db().write()?;

        let user = match tx.user_by_token(token_identifier)? {
            Some(mut existing) => {
                existing.name = name;
                existing.image = image;
                existing
            }
            None => UserRecord {
                id: Uuid::new_v4().simple().to_string(),
                token_identifier: token_identifier.to_string(),
                name,
                image,
                orgs: Vec::new(),
                created_at: Utc::now(),
            },
        };

        tx.put_user(&user)?;
        tx.commit()?;

        info!(user_id = %user.id, "User provisioned");
        Ok(user)
    }

    /// Refresh name and avatar of an existing user.
    pub fn update_user(
        &self,
        token_identifier: &str,
        name: Option<String>,
        image: Option<String>,
    ) -> DriveResult<UserRecord> {
        let tx = self.db().write()?;
        let mut user = tx
            .user_by_token(token_identifier)?
            .ok_or_else(|| DriveError::NotFound("user".to_string()))?;

        user.name = name;
        user.image = image;
        tx.put_user(&user)?;
        tx.commit()?;
        Ok(user)
    }

    /// Record a membership. A second event for the same org replaces the role.
    pub fn add_org_membership(
        &self,
        token_identifier: &str,
        org_id: &str,
        role: OrgRole,
    ) -> DriveResult<UserRecord> {
        check_id("org", org_id)?;
        let tx = self.db().write()?;
        let mut user = tx
            .user_by_token(token_identifier)?
            .ok_or_else(|| DriveError::NotFound("user".to_string()))?;

        user.upsert_membership(org_id, role);
        tx.put_user(&user)?;
        tx.commit()?;

        info!(user_id = %user.id, org_id = %org_id, role = %role, "Organization membership added");
        Ok(user)
    }

    /// Change the role of an existing membership.
    pub fn update_org_role(
        &self,
        token_identifier: &str,
        org_id: &str,
        role: OrgRole,
    ) -> DriveResult<UserRecord> {
        let tx = self.db().write()?;
        let mut user = tx
            .user_by_token(token_identifier)?
            .ok_or_else(|| DriveError::NotFound("user".to_string()))?;

        if !user.set_role(org_id, role) {
            return Err(DriveError::NotFound(format!("membership in {org_id}")));
        }
        tx.put_user(&user)?;
        tx.commit()?;

        info!(user_id = %user.id, org_id = %org_id, role = %role, "Organization role updated");
        Ok(user)
    }

    /// Drop a membership. Removing one the user does not hold is a no-op.
    pub fn remove_org_membership(
        &self,
        token_identifier: &str,
        org_id: &str,
    ) -> DriveResult<UserRecord> {
        let tx = self.db().write()?;
        let mut user = tx
            .user_by_token(token_identifier)?
            .ok_or_else(|| DriveError::NotFound("user".to_string()))?;

        if user.remove_membership(org_id) {
            tx.put_user(&user)?;
            tx.commit()?;
            info!(user_id = %user.id, org_id = %org_id, "Organization membership removed");
        }
        Ok(user)
    }

    /// Apply a membership event: `created` upserts, `updated` requires an
    /// existing entry.
    pub fn apply_membership(&self, change: &MembershipChange, created: bool) -> DriveResult<UserRecord> {
        if created {
            self.add_org_membership(&change.token_identifier, &change.org_id, change.role)
        } else {
            self.update_org_role(&change.token_identifier, &change.org_id, change.role)
        }
    }
}
