// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::AuthError;
use crate::drive::DriveError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<DriveError> for ApiError {
    fn from(e: DriveError) -> Self {
        match e {
            DriveError::Unauthenticated => Self::new(StatusCode::UNAUTHORIZED, e.to_string()),
            DriveError::Unauthorized(_) => Self::new(StatusCode::FORBIDDEN, e.to_string()),
            DriveError::NotFound(_) => Self::not_found(e.to_string()),
            DriveError::InvalidInput(_) => Self::bad_request(e.to_string()),
            DriveError::QuotaExceeded => Self::new(StatusCode::PAYLOAD_TOO_LARGE, e.to_string()),
            DriveError::Upstream(_) => Self::new(StatusCode::BAD_GATEWAY, e.to_string()),
            DriveError::Store(inner) => {
                error!(error = %inner, "Metadata store failure");
                Self::internal("internal storage error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::new(e.status_code(), e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreError;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");
    }

    #[test]
    fn drive_errors_map_to_statuses() {
        let cases = [
            (DriveError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (DriveError::Unauthorized("x".into()), StatusCode::FORBIDDEN),
            (DriveError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DriveError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (DriveError::QuotaExceeded, StatusCode::PAYLOAD_TOO_LARGE),
            (DriveError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn store_errors_do_not_leak_details() {
        let err = ApiError::from(DriveError::Store(StoreError::NotFound("secret path".into())));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("secret"));
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
