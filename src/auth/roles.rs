// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Organization roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role a user holds within one organization.
///
/// ## Role Hierarchy
///
/// - `Admin` - May modify any file of the organization
/// - `Member` - May read the organization's files and modify their own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    /// Organization administrator
    Admin,
    /// Regular organization member
    Member,
}

impl OrgRole {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: OrgRole) -> bool {
        match (self, required) {
            (OrgRole::Admin, _) => true,
            (OrgRole::Member, OrgRole::Member) => true,
            _ => false,
        }
    }

    /// Map a role string from the identity provider.
    ///
    /// Clerk sends organization roles as `org:admin` / `org:member`; the bare
    /// forms are accepted too. Anything that is not an admin role is a member.
    pub fn from_provider(s: &str) -> OrgRole {
        let lower = s.trim().to_lowercase();
        match lower.strip_prefix("org:").unwrap_or(&lower) {
            "admin" => OrgRole::Admin,
            _ => OrgRole::Member,
        }
    }
}

impl Default for OrgRole {
    /// Default role is Member (least privilege).
    fn default() -> Self {
        OrgRole::Member
    }
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrgRole::Admin => write!(f, "admin"),
            OrgRole::Member => write!(f, "member"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        assert!(OrgRole::Admin.has_privilege(OrgRole::Admin));
        assert!(OrgRole::Admin.has_privilege(OrgRole::Member));
    }

    #[test]
    fn member_is_not_admin() {
        assert!(!OrgRole::Member.has_privilege(OrgRole::Admin));
        assert!(OrgRole::Member.has_privilege(OrgRole::Member));
    }

    #[test]
    fn from_provider_maps_clerk_roles() {
        assert_eq!(OrgRole::from_provider("org:admin"), OrgRole::Admin);
        assert_eq!(OrgRole::from_provider("ADMIN"), OrgRole::Admin);
        assert_eq!(OrgRole::from_provider("org:member"), OrgRole::Member);
        assert_eq!(OrgRole::from_provider("org:billing_manager"), OrgRole::Member);
        assert_eq!(OrgRole::from_provider(""), OrgRole::Member);
    }

    #[test]
    fn default_role_is_member() {
        assert_eq!(OrgRole::default(), OrgRole::Member);
    }
}
