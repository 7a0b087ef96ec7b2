// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Domain records
//! ([`FileRecord`](crate::storage::FileRecord), [`CategoryEntry`]) are
//! returned as-is; the types here only wrap or reshape them.
//!
//! ## Model Categories
//!
//! - **Files**: creation, listing filters, rename
//! - **Uploads**: grant and completion
//! - **Categories**: toggle result and listings
//! - **Links**: shareable link generation and lookup

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::drive::{FileQuery, FileView, NewFile};
use crate::storage::{Category, CategoryEntry, FileType};

// =============================================================================
// Files
// =============================================================================

/// Register an uploaded object as a file.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateFileRequest {
    /// Display name (trimmed, 1-200 characters)
    pub name: String,
    /// File kind; derived from `content_type` when omitted
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    /// MIME type of the upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Storage id returned by the upload endpoint
    pub storage_id: String,
}

impl From<CreateFileRequest> for NewFile {
    fn from(req: CreateFileRequest) -> Self {
        NewFile {
            name: req.name,
            file_type: req.file_type,
            content_type: req.content_type,
            storage_id: req.storage_id,
        }
    }
}

/// Filters for listing an organization's files.
///
/// Category flags combine with AND semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Case-insensitive substring of the file name
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub favorites: bool,
    #[serde(default)]
    pub documents: bool,
    #[serde(default)]
    pub pictures: bool,
    #[serde(default)]
    pub musics: bool,
    #[serde(default)]
    pub videos: bool,
    /// List only files marked for deletion
    #[serde(default)]
    pub deleted_only: bool,
    /// Exact file kind
    #[serde(rename = "type", default)]
    #[param(inline)]
    pub file_type: Option<FileType>,
}

impl From<ListFilesQuery> for FileQuery {
    fn from(q: ListFilesQuery) -> Self {
        let flags = [
            (q.favorites, Category::Favorites),
            (q.documents, Category::Documents),
            (q.pictures, Category::Pictures),
            (q.musics, Category::Musics),
            (q.videos, Category::Videos),
        ];
        FileQuery {
            query: q.query.filter(|s| !s.is_empty()),
            categories: flags
                .into_iter()
                .filter_map(|(set, category)| set.then_some(category))
                .collect(),
            deleted_only: q.deleted_only,
            file_type: q.file_type,
        }
    }
}

/// A page of files.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileView>,
    pub total: usize,
}

/// New display name for a file.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RenameFileRequest {
    pub name: String,
}

// =============================================================================
// Uploads
// =============================================================================

/// Result of storing an upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadCompleteResponse {
    /// Pass this to the create-file endpoint
    pub storage_id: String,
}

// =============================================================================
// Categories
// =============================================================================

/// Rows of one category for the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryListResponse {
    pub category: Category,
    pub entries: Vec<CategoryEntry>,
}

// =============================================================================
// Links
// =============================================================================

/// A generated shareable link.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShareableLinkResponse {
    pub file_id: String,
    pub link: String,
}

/// Lookup by shareable link.
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResolveLinkQuery {
    /// Exact link value
    pub link: String,
}
