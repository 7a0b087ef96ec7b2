// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Favorites and folder endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::{
    auth::{Auth, OptionalAuth},
    drive::{RequestContext, ToggleOutcome},
    error::ApiError,
    models::CategoryListResponse,
    state::AppState,
    storage::Category,
};

use super::request_id;

fn parse_category(raw: &str) -> Result<Category, ApiError> {
    raw.parse::<Category>().map_err(ApiError::bad_request)
}

/// Add the file to a category for the caller, or remove it if present.
#[utoipa::path(
    post,
    path = "/v1/files/{file_id}/categories/{category}",
    tag = "Categories",
    security(("bearer_auth" = [])),
    params(
        ("file_id" = String, Path, description = "File id"),
        ("category" = String, Path, description = "favorites, documents, pictures, musics or videos")
    ),
    responses(
        (status = 200, description = "New membership state", body = ToggleOutcome),
        (status = 400, description = "Unknown category"),
        (status = 403, description = "No access to file"),
        (status = 404, description = "File not found")
    )
)]
pub async fn toggle_category(
    Auth(user): Auth,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((file_id, category)): Path<(String, String)>,
) -> Result<Json<ToggleOutcome>, ApiError> {
    let category = parse_category(&category)?;
    let ctx = RequestContext::authenticated(user).with_request_id(request_id(&headers));
    Ok(Json(state.drive.toggle_category(&ctx, &file_id, category)?))
}

/// List the caller's rows of one category in the organization.
#[utoipa::path(
    get,
    path = "/v1/orgs/{org_id}/categories/{category}",
    tag = "Categories",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("category" = String, Path, description = "favorites, documents, pictures, musics or videos")
    ),
    responses(
        (status = 200, description = "Category rows (empty without access)", body = CategoryListResponse),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn list_category(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((org_id, category)): Path<(String, String)>,
) -> Result<Json<CategoryListResponse>, ApiError> {
    let category = parse_category(&category)?;
    let ctx = RequestContext {
        identity: user,
        request_id: request_id(&headers),
    };
    let entries = state.drive.list_category(&ctx, &org_id, category)?;
    Ok(Json(CategoryListResponse { category, entries }))
}
