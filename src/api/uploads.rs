// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upload grant, upload target and object download endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    auth::Auth,
    drive::{RequestContext, UploadTicket},
    error::ApiError,
    models::UploadCompleteResponse,
    state::AppState,
};

use super::request_id;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Issue a one-time upload URL.
#[utoipa::path(
    post,
    path = "/v1/uploads",
    tag = "Uploads",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Upload URL issued", body = UploadTicket),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn issue_upload_url(
    Auth(user): Auth,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<UploadTicket>), ApiError> {
    let ctx = RequestContext::authenticated(user).with_request_id(request_id(&headers));
    let ticket = state.drive.issue_upload_grant(&ctx)?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Store raw bytes against an upload grant.
///
/// The grant token in the path is the credential; no bearer token is needed.
#[utoipa::path(
    post,
    path = "/v1/uploads/{token}",
    tag = "Uploads",
    params(("token" = String, Path, description = "Upload grant token")),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Object stored", body = UploadCompleteResponse),
        (status = 400, description = "Grant expired"),
        (status = 404, description = "Unknown or used grant")
    )
)]
pub async fn complete_upload(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadCompleteResponse>), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let storage_id = state.drive.complete_upload(&token, content_type, &body)?;
    Ok((StatusCode::CREATED, Json(UploadCompleteResponse { storage_id })))
}

/// Download a stored object.
#[utoipa::path(
    get,
    path = "/v1/storage/{storage_id}",
    tag = "Uploads",
    params(("storage_id" = String, Path, description = "Storage id")),
    responses(
        (status = 200, description = "Object bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed storage id"),
        (status = 404, description = "Object not found")
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Path(storage_id): Path<String>,
) -> Result<Response, ApiError> {
    let blob = state.drive.download(&storage_id)?;
    let content_type = HeaderValue::from_str(&blob.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok(([(header::CONTENT_TYPE, content_type)], blob.data).into_response())
}
