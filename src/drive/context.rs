// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Explicit per-request context passed into every drive operation.

use crate::auth::AuthenticatedUser;

use super::{DriveError, DriveResult};

/// Who is calling, and which request this is.
///
/// Built by the HTTP layer from the verified JWT (if any) and the
/// `x-request-id` header. Background tasks use [`RequestContext::anonymous`].
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub identity: Option<AuthenticatedUser>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: AuthenticatedUser) -> Self {
        Self {
            identity: Some(user),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// The verified caller, or `Unauthenticated`.
    pub fn require_identity(&self) -> DriveResult<&AuthenticatedUser> {
        self.identity.as_ref().ok_or(DriveError::Unauthenticated)
    }

    /// Identity token of the caller (`{issuer}|{subject}`), if authenticated.
    pub fn token_identifier(&self) -> Option<String> {
        self.identity.as_ref().map(AuthenticatedUser::token_identifier)
    }

    /// Request id for log lines, `-` when absent.
    pub fn request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }
}
