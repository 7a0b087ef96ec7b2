// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{JwksManager, WebhookVerifier};
use crate::drive::Drive;

/// JWT verification settings.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// `None` selects development mode (no signature check)
    pub jwks: Option<Arc<JwksManager>>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// Identity-provider webhook settings.
#[derive(Clone)]
pub struct WebhookConfig {
    pub verifier: WebhookVerifier,
    /// Issuer used to build identity tokens for webhook subjects
    pub issuer: String,
}

#[derive(Clone)]
pub struct AppState {
    pub drive: Arc<Drive>,
    pub auth_config: AuthConfig,
    pub webhook: Option<WebhookConfig>,
}

impl AppState {
    pub fn new(drive: Arc<Drive>) -> Self {
        Self {
            drive,
            auth_config: AuthConfig::default(),
            webhook: None,
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    pub fn with_webhook(mut self, webhook: WebhookConfig) -> Self {
        self.webhook = Some(webhook);
        self
    }
}

/// State over a fresh temporary drive, in development auth mode.
#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    let (drive, dir) = crate::drive::testing::test_drive();
    let state = AppState::new(Arc::new(drive)).with_auth_config(AuthConfig {
        jwks: None,
        issuer: Some("test".to_string()),
        audience: None,
    });
    (state, dir)
}
