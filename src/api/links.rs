// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shareable link endpoints.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

use crate::{
    auth::OptionalAuth,
    drive::{FileView, RequestContext},
    error::ApiError,
    models::{ResolveLinkQuery, ShareableLinkResponse},
    state::AppState,
};

use super::request_id;

/// Generate (or return the existing) shareable link of a file.
///
/// Requires no authentication; the link only exposes the download URL.
#[utoipa::path(
    post,
    path = "/v1/files/{file_id}/share",
    tag = "Links",
    params(("file_id" = String, Path, description = "File id")),
    responses(
        (status = 200, description = "Shareable link", body = ShareableLinkResponse),
        (status = 404, description = "File not found"),
        (status = 502, description = "Backing object unavailable")
    )
)]
pub async fn generate_link(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(file_id): Path<String>,
) -> Result<Json<ShareableLinkResponse>, ApiError> {
    let ctx = RequestContext {
        identity: user,
        request_id: request_id(&headers),
    };
    let link = state.drive.generate_shareable_link(&ctx, &file_id)?;
    Ok(Json(ShareableLinkResponse { file_id, link }))
}

/// Find the file a shareable link points to.
#[utoipa::path(
    get,
    path = "/v1/shared",
    tag = "Links",
    params(ResolveLinkQuery),
    responses(
        (status = 200, description = "Linked file", body = FileView),
        (status = 404, description = "No file has this link")
    )
)]
pub async fn resolve_link(
    State(state): State<AppState>,
    Query(query): Query<ResolveLinkQuery>,
) -> Result<Json<FileView>, ApiError> {
    Ok(Json(state.drive.resolve_shareable_link(&query.link)?))
}
