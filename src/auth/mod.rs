// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Clerk JWT authentication and webhook verification.
//!
//! ## Auth Flow
//!
//! 1. The frontend authenticates the user with Clerk
//! 2. The frontend sends `Authorization: Bearer <Clerk JWT>`
//! 3. The server:
//!    - Fetches Clerk JWKS via HTTPS
//!    - Verifies JWT signature, expiry, issuer, audience
//!    - Derives the identity token `{iss}|{sub}`
//!
//! Organization roles are not read from the token. They arrive through
//! signed Clerk webhooks and are stored on the user record.
//!
//! ## Security
//!
//! - JWT verification uses HTTPS-only JWKS fetching
//! - JWKS is cached with TTL for performance
//! - Clock skew tolerance is 60 seconds
//! - Webhook deliveries must carry a valid Svix signature

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod roles;
pub mod webhook;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use jwks::JwksManager;
pub use roles::OrgRole;
pub use webhook::WebhookVerifier;
