// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File catalog endpoints.
//!
//! Listing and storage usage degrade to an empty answer for callers without
//! access; every other endpoint requires authentication.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    auth::{Auth, OptionalAuth},
    drive::{FileView, RequestContext, StorageUsage},
    error::ApiError,
    models::{CreateFileRequest, FileListResponse, ListFilesQuery, RenameFileRequest},
    state::AppState,
    storage::FileRecord,
};

use super::request_id;

/// Register an uploaded object as a file of the organization.
#[utoipa::path(
    post,
    path = "/v1/orgs/{org_id}/files",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(("org_id" = String, Path, description = "Organization id")),
    request_body = CreateFileRequest,
    responses(
        (status = 201, description = "File created", body = FileRecord),
        (status = 400, description = "Invalid name, type or storage id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No access to organization"),
        (status = 413, description = "Storage quota exceeded")
    )
)]
pub async fn create_file(
    Auth(user): Auth,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
    Json(request): Json<CreateFileRequest>,
) -> Result<(StatusCode, Json<FileRecord>), ApiError> {
    let ctx = RequestContext::authenticated(user).with_request_id(request_id(&headers));
    let file = state.drive.create_file(&ctx, &org_id, request.into())?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// List the organization's files.
#[utoipa::path(
    get,
    path = "/v1/orgs/{org_id}/files",
    tag = "Files",
    params(("org_id" = String, Path, description = "Organization id"), ListFilesQuery),
    responses(
        (status = 200, description = "Matching files (empty without access)", body = FileListResponse)
    )
)]
pub async fn list_files(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<FileListResponse>, ApiError> {
    let ctx = RequestContext {
        identity: user,
        request_id: request_id(&headers),
    };
    let files = state.drive.list_files(&ctx, &org_id, &query.into())?;
    let total = files.len();
    Ok(Json(FileListResponse { files, total }))
}

/// Storage used by the organization's active files.
#[utoipa::path(
    get,
    path = "/v1/orgs/{org_id}/storage",
    tag = "Files",
    params(("org_id" = String, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Usage, or null without access", body = StorageUsage)
    )
)]
pub async fn storage_used(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
) -> Result<Json<Option<StorageUsage>>, ApiError> {
    let ctx = RequestContext {
        identity: user,
        request_id: request_id(&headers),
    };
    Ok(Json(state.drive.storage_used(&ctx, &org_id)?))
}

/// Get one file with its download URL.
#[utoipa::path(
    get,
    path = "/v1/files/{file_id}",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(("file_id" = String, Path, description = "File id")),
    responses(
        (status = 200, description = "File", body = FileView),
        (status = 403, description = "No access to file"),
        (status = 404, description = "File not found")
    )
)]
pub async fn get_file(
    Auth(user): Auth,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(file_id): Path<String>,
) -> Result<Json<FileView>, ApiError> {
    let ctx = RequestContext::authenticated(user).with_request_id(request_id(&headers));
    Ok(Json(state.drive.get_file(&ctx, &file_id)?))
}

/// Rename a file.
#[utoipa::path(
    patch,
    path = "/v1/files/{file_id}",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(("file_id" = String, Path, description = "File id")),
    request_body = RenameFileRequest,
    responses(
        (status = 200, description = "Renamed file", body = FileRecord),
        (status = 400, description = "Invalid name"),
        (status = 403, description = "No access to file"),
        (status = 404, description = "File not found")
    )
)]
pub async fn rename_file(
    Auth(user): Auth,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(file_id): Path<String>,
    Json(request): Json<RenameFileRequest>,
) -> Result<Json<FileRecord>, ApiError> {
    let ctx = RequestContext::authenticated(user).with_request_id(request_id(&headers));
    Ok(Json(state.drive.rename_file(&ctx, &file_id, &request.name)?))
}

/// Mark a file for deletion (owner or organization admin).
#[utoipa::path(
    delete,
    path = "/v1/files/{file_id}",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(("file_id" = String, Path, description = "File id")),
    responses(
        (status = 200, description = "File marked for deletion", body = FileRecord),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "File not found")
    )
)]
pub async fn delete_file(
    Auth(user): Auth,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(file_id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let ctx = RequestContext::authenticated(user).with_request_id(request_id(&headers));
    Ok(Json(state.drive.delete_file(&ctx, &file_id)?))
}

/// Clear a file's deletion mark (owner or organization admin).
#[utoipa::path(
    post,
    path = "/v1/files/{file_id}/restore",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(("file_id" = String, Path, description = "File id")),
    responses(
        (status = 200, description = "File restored", body = FileRecord),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "File not found")
    )
)]
pub async fn restore_file(
    Auth(user): Auth,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(file_id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let ctx = RequestContext::authenticated(user).with_request_id(request_id(&headers));
    Ok(Json(state.drive.restore_file(&ctx, &file_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{auth_for, seed_member};
    use crate::auth::OrgRole;
    use crate::drive::testing::upload;
    use crate::state::test_state;
    use crate::storage::FileType;

    async fn create(state: &AppState, subject: &str, org_id: &str, name: &str) -> FileRecord {
        let ctx = crate::drive::testing::ctx_for(subject);
        let storage_id = upload(&state.drive, &ctx, b"bytes");
        let (status, Json(file)) = create_file(
            auth_for(subject),
            State(state.clone()),
            HeaderMap::new(),
            Path(org_id.to_string()),
            Json(CreateFileRequest {
                name: name.to_string(),
                file_type: Some(FileType::Pdf),
                content_type: None,
                storage_id,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        file
    }

    #[tokio::test]
    async fn create_then_list() {
        let (state, _dir) = test_state();
        seed_member(&state, "user_1", "org_1", OrgRole::Member);
        create(&state, "user_1", "org_1", "a.pdf").await;

        let Json(listed) = list_files(
            OptionalAuth(Some(auth_for("user_1").0)),
            State(state.clone()),
            HeaderMap::new(),
            Path("org_1".to_string()),
            Query(ListFilesQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.files[0].file.name, "a.pdf");
    }

    #[tokio::test]
    async fn anonymous_list_is_empty_not_error() {
        let (state, _dir) = test_state();
        seed_member(&state, "user_1", "org_1", OrgRole::Member);
        create(&state, "user_1", "org_1", "a.pdf").await;

        let Json(listed) = list_files(
            OptionalAuth(None),
            State(state.clone()),
            HeaderMap::new(),
            Path("org_1".to_string()),
            Query(ListFilesQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(listed.total, 0);

        let Json(usage) = storage_used(
            OptionalAuth(None),
            State(state),
            HeaderMap::new(),
            Path("org_1".to_string()),
        )
        .await
        .unwrap();
        assert!(usage.is_none());
    }

    #[tokio::test]
    async fn outsider_delete_is_forbidden() {
        let (state, _dir) = test_state();
        seed_member(&state, "user_1", "org_1", OrgRole::Member);
        seed_member(&state, "user_2", "org_2", OrgRole::Member);
        let file = create(&state, "user_1", "org_1", "a.pdf").await;

        let err = delete_file(
            auth_for("user_2"),
            State(state.clone()),
            HeaderMap::new(),
            Path(file.id.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let Json(deleted) = delete_file(
            auth_for("user_1"),
            State(state.clone()),
            HeaderMap::new(),
            Path(file.id.clone()),
        )
        .await
        .unwrap();
        assert!(deleted.should_delete);

        let Json(restored) = restore_file(
            auth_for("user_1"),
            State(state),
            HeaderMap::new(),
            Path(file.id),
        )
        .await
        .unwrap();
        assert!(!restored.should_delete);
    }

    #[tokio::test]
    async fn rename_and_get_missing_file() {
        let (state, _dir) = test_state();
        seed_member(&state, "user_1", "org_1", OrgRole::Member);
        let file = create(&state, "user_1", "org_1", "a.pdf").await;

        let Json(renamed) = rename_file(
            auth_for("user_1"),
            State(state.clone()),
            HeaderMap::new(),
            Path(file.id.clone()),
            Json(RenameFileRequest {
                name: "b.pdf".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "b.pdf");

        let err = get_file(
            auth_for("user_1"),
            State(state),
            HeaderMap::new(),
            Path("missing".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
