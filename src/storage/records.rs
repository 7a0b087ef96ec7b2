// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Records persisted in the metadata database.
//!
//! Every record is stored as JSON in its primary table; secondary indexes
//! (organization, pending-delete, shareable link, identity token, category
//! membership) are maintained by [`super::database::WriteTx`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::OrgRole;

// =============================================================================
// File Type
// =============================================================================

/// Coarse file kind derived from the uploaded MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Jpeg,
    Png,
    Csv,
    Pdf,
    Word,
    Powerpoint,
    Excel,
    Video,
    Audio,
    Rar,
    Zip,
}

impl FileType {
    /// Map an upload's `Content-Type` to a file kind.
    ///
    /// Parameters such as `; charset=utf-8` are ignored. Returns `None` for
    /// MIME types the catalog does not accept.
    pub fn from_mime(mime: &str) -> Option<FileType> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(FileType::Png),
            "image/jpeg" => Some(FileType::Jpeg),
            "video/mp4" | "video/mkv" => Some(FileType::Video),
            "audio/mp3" | "audio/mpeg" => Some(FileType::Audio),
            "application/pdf" => Some(FileType::Pdf),
            "text/csv" => Some(FileType::Csv),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(FileType::Word)
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(FileType::Excel)
            }
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Some(FileType::Powerpoint)
            }
            "application/zip" => Some(FileType::Zip),
            "application/x-compressed" => Some(FileType::Rar),
            _ => None,
        }
    }
}

// =============================================================================
// File Record
// =============================================================================

/// Metadata row for one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FileRecord {
    /// Unique file identifier (UUID)
    pub id: String,
    /// Display name
    pub name: String,
    /// File kind
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Owning organization (or the owner's personal namespace). Never changes.
    pub org_id: String,
    /// Id of the binary object in the object store
    pub storage_id: String,
    /// Internal id of the uploading user
    pub user_id: String,
    /// Payload size in bytes
    pub size: u64,
    /// Soft-delete marker; only files with this set are purged
    pub should_delete: bool,
    /// Durable public URL, once generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shareable_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// User Record
// =============================================================================

/// One organization a user belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct OrgMembership {
    pub org_id: String,
    pub role: OrgRole,
}

/// Internal user, provisioned from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserRecord {
    /// Internal user id (UUID)
    pub id: String,
    /// Stable external identity (`{issuer}|{subject}`), unique
    pub token_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Organization memberships, at most one entry per org
    #[serde(default)]
    pub orgs: Vec<OrgMembership>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Role held in `org_id`, if the user is a member.
    pub fn role_in(&self, org_id: &str) -> Option<OrgRole> {
        self.orgs
            .iter()
            .find(|m| m.org_id == org_id)
            .map(|m| m.role)
    }

    /// Add a membership, or replace the role if one already exists for the org.
    pub fn upsert_membership(&mut self, org_id: &str, role: OrgRole) {
        match self.orgs.iter_mut().find(|m| m.org_id == org_id) {
            Some(existing) => existing.role = role,
            None => self.orgs.push(OrgMembership {
                org_id: org_id.to_string(),
                role,
            }),
        }
    }

    /// Drop the membership for `org_id`. Returns `false` if there was none.
    pub fn remove_membership(&mut self, org_id: &str) -> bool {
        let before = self.orgs.len();
        self.orgs.retain(|m| m.org_id != org_id);
        self.orgs.len() != before
    }

    /// Change the role of an existing membership. Returns `false` if the user
    /// is not a member of `org_id`.
    pub fn set_role(&mut self, org_id: &str, role: OrgRole) -> bool {
        match self.orgs.iter_mut().find(|m| m.org_id == org_id) {
            Some(existing) => {
                existing.role = role;
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Per-user, per-organization tag sets a file can be toggled into.
///
/// Favorites sit alongside the four folders; all five share one relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Favorites,
    Documents,
    Pictures,
    Musics,
    Videos,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Favorites,
        Category::Documents,
        Category::Pictures,
        Category::Musics,
        Category::Videos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Favorites => "favorites",
            Category::Documents => "documents",
            Category::Pictures => "pictures",
            Category::Musics => "musics",
            Category::Videos => "videos",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Presence of a file in one category for one user within one organization.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CategoryEntry {
    pub category: Category,
    pub file_id: String,
    pub user_id: String,
    pub org_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Upload Grants
// =============================================================================

/// One-time permission to upload a single binary object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadGrant {
    /// Opaque token embedded in the upload URL
    pub token: String,
    /// Identity token of the caller the grant was issued to
    pub issued_to: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl UploadGrant {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// An uploaded object not yet referenced by a file record.
///
/// Only the uploader may claim it, once, before `claim_deadline`. Objects
/// still unclaimed after the deadline are deleted by the purge sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingUpload {
    pub storage_id: String,
    /// Identity token of the uploader
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub claim_deadline: DateTime<Utc>,
}

impl PendingUpload {
    pub fn is_abandoned(&self, now: DateTime<Utc>) -> bool {
        now >= self.claim_deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserRecord {
        UserRecord {
            id: "u1".to_string(),
            token_identifier: "https://clerk.test|user_1".to_string(),
            name: None,
            image: None,
            orgs: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn from_mime_maps_known_types() {
        assert_eq!(FileType::from_mime("image/png"), Some(FileType::Png));
        assert_eq!(FileType::from_mime("image/jpeg"), Some(FileType::Jpeg));
        assert_eq!(FileType::from_mime("video/mkv"), Some(FileType::Video));
        assert_eq!(FileType::from_mime("audio/mpeg"), Some(FileType::Audio));
        assert_eq!(FileType::from_mime("application/x-compressed"), Some(FileType::Rar));
        assert_eq!(
            FileType::from_mime(
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            ),
            Some(FileType::Powerpoint)
        );
    }

    #[test]
    fn from_mime_ignores_parameters_and_case() {
        assert_eq!(FileType::from_mime("Text/CSV; charset=utf-8"), Some(FileType::Csv));
        assert_eq!(FileType::from_mime("image/gif"), None);
        assert_eq!(FileType::from_mime(""), None);
    }

    #[test]
    fn file_type_serializes_lowercase() {
        let json = serde_json::to_string(&FileType::Powerpoint).unwrap();
        assert_eq!(json, "\"powerpoint\"");
    }

    #[test]
    fn upsert_membership_keeps_one_entry_per_org() {
        let mut user = sample_user();
        user.upsert_membership("org_1", OrgRole::Member);
        user.upsert_membership("org_1", OrgRole::Admin);

        assert_eq!(user.orgs.len(), 1);
        assert_eq!(user.role_in("org_1"), Some(OrgRole::Admin));
    }

    #[test]
    fn set_role_requires_existing_membership() {
        let mut user = sample_user();
        assert!(!user.set_role("org_1", OrgRole::Admin));

        user.upsert_membership("org_1", OrgRole::Member);
        assert!(user.set_role("org_1", OrgRole::Admin));
        assert_eq!(user.role_in("org_1"), Some(OrgRole::Admin));
        assert_eq!(user.role_in("org_2"), None);
    }

    #[test]
    fn remove_membership_drops_only_that_org() {
        let mut user = sample_user();
        user.upsert_membership("org_1", OrgRole::Member);
        user.upsert_membership("org_2", OrgRole::Admin);

        assert!(user.remove_membership("org_1"));
        assert!(!user.remove_membership("org_1"));
        assert_eq!(user.role_in("org_1"), None);
        assert_eq!(user.role_in("org_2"), Some(OrgRole::Admin));
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("documents".parse::<Category>(), Ok(Category::Documents));
        assert_eq!("Favorites".parse::<Category>(), Ok(Category::Favorites));
        assert!("folders".parse::<Category>().is_err());
    }

    #[test]
    fn upload_grant_expiry() {
        let now = Utc::now();
        let grant = UploadGrant {
            token: "t".to_string(),
            issued_to: "id".to_string(),
            issued_at: now,
            expires_at: now + chrono::Duration::seconds(10),
        };
        assert!(!grant.is_expired(now));
        assert!(grant.is_expired(now + chrono::Duration::seconds(10)));
    }
}
