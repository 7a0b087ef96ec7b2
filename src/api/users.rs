// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::{AuthenticatedUser, OptionalAuth},
    drive::{RequestContext, UserProfile},
    error::ApiError,
    state::AppState,
    storage::UserRecord,
};

use super::request_id;

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// Identity from the verified token; absent for anonymous callers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<AuthenticatedUser>,
    /// Provisioned record; absent until the identity provider has synced the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRecord>,
}

/// Get the current user and their organization memberships.
///
/// Anonymous callers get an empty response rather than an error.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security((), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
    )
)]
pub async fn get_current_user(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserMeResponse>, ApiError> {
    let ctx = RequestContext {
        identity: user,
        request_id: request_id(&headers),
    };
    let record = state.drive.current_user(&ctx)?;
    Ok(Json(UserMeResponse {
        identity: ctx.identity,
        user: record,
    }))
}

/// Public profile (name and image) of a user by internal id.
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/profile",
    tag = "Users",
    params(("user_id" = String, Path, description = "Internal user id")),
    responses(
        (status = 200, description = "Profile; empty for unknown users", body = UserProfile)
    )
)]
pub async fn get_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.drive.user_profile(&user_id)?))
}
