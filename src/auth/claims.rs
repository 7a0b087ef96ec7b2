// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated caller representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims extracted from a Clerk session JWT.
///
/// Only the standard OIDC claims are read; organization membership comes
/// from webhooks, not from the token.
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkClaims {
    /// Subject - the canonical Clerk user identifier
    pub sub: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer (the Clerk instance URL)
    pub iss: String,

    /// Clerk session ID
    #[serde(default)]
    pub sid: Option<String>,
}

/// Identity of the caller, extracted from a verified JWT.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Clerk user id (`sub` claim)
    pub user_id: String,

    /// Session ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Token issuer
    pub issuer: String,

    /// Token expiration (Unix timestamp, used for validation, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from Clerk claims.
    pub fn from_claims(claims: ClerkClaims) -> Self {
        Self {
            user_id: claims.sub,
            session_id: claims.sid,
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }

    /// Stable identity token, `{issuer}|{subject}`.
    ///
    /// This is the key users are stored under; two providers issuing the
    /// same subject never collide.
    pub fn token_identifier(&self) -> String {
        format!("{}|{}", self.issuer, self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> ClerkClaims {
        ClerkClaims {
            sub: "user_123".to_string(),
            exp: 1700003600,
            iss: "https://clerk.example.com".to_string(),
            sid: Some("sess_abc".to_string()),
        }
    }

    #[test]
    fn from_claims_extracts_subject_and_session() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.session_id.as_deref(), Some("sess_abc"));
        assert_eq!(user.expires_at, 1700003600);
    }

    #[test]
    fn token_identifier_joins_issuer_and_subject() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(
            user.token_identifier(),
            "https://clerk.example.com|user_123"
        );
    }
}
