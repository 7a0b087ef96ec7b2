// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, default values, and [`Config::from_env`].
//! Configuration is loaded once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root of the metadata database and blob store | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PUBLIC_BASE_URL` | Base of download, upload and shareable URLs | `http://localhost:8080` |
//! | `CLERK_JWKS_URL` | Clerk JWKS endpoint for JWT verification | Required for production |
//! | `CLERK_ISSUER` | Expected JWT issuer; prefix of identity tokens | Required for production |
//! | `CLERK_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `CLERK_WEBHOOK_SECRET` | `whsec_...` secret for Clerk webhooks | Optional (webhook disabled) |
//! | `PURGE_INTERVAL_SECS` | Interval between purge sweeps | `60` |
//! | `PURGE_STEP_TIMEOUT_SECS` | Bound on one per-file purge step | `10` |
//! | `UPLOAD_GRANT_TTL_SECS` | Lifetime of an upload grant | `3600` |
//! | `STORAGE_QUOTA_MB` | Per-organization storage ceiling | `1000000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";
pub const CLERK_JWKS_URL_ENV: &str = "CLERK_JWKS_URL";
pub const CLERK_ISSUER_ENV: &str = "CLERK_ISSUER";
pub const CLERK_AUDIENCE_ENV: &str = "CLERK_AUDIENCE";
pub const CLERK_WEBHOOK_SECRET_ENV: &str = "CLERK_WEBHOOK_SECRET";
pub const PURGE_INTERVAL_SECS_ENV: &str = "PURGE_INTERVAL_SECS";
pub const PURGE_STEP_TIMEOUT_SECS_ENV: &str = "PURGE_STEP_TIMEOUT_SECS";
pub const UPLOAD_GRANT_TTL_SECS_ENV: &str = "UPLOAD_GRANT_TTL_SECS";
pub const STORAGE_QUOTA_MB_ENV: &str = "STORAGE_QUOTA_MB";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_PURGE_STEP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPLOAD_GRANT_TTL_SECS: u64 = 3600;
pub const DEFAULT_STORAGE_QUOTA_MB: u64 = 1_000_000;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
    pub clerk_jwks_url: Option<String>,
    pub clerk_issuer: Option<String>,
    pub clerk_audience: Option<String>,
    pub clerk_webhook_secret: Option<String>,
    pub purge_interval: Duration,
    pub purge_step_timeout: Duration,
    pub upload_grant_ttl: Duration,
    pub storage_quota_mb: u64,
    pub log_format: LogFormat,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            data_dir: var(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(crate::storage::paths::DATA_ROOT)),
            host: var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(PORT_ENV, var(PORT_ENV), DEFAULT_PORT),
            public_base_url: var(PUBLIC_BASE_URL_ENV)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            clerk_jwks_url: var(CLERK_JWKS_URL_ENV),
            clerk_issuer: var(CLERK_ISSUER_ENV),
            clerk_audience: var(CLERK_AUDIENCE_ENV),
            clerk_webhook_secret: var(CLERK_WEBHOOK_SECRET_ENV),
            purge_interval: Duration::from_secs(parse_or(
                PURGE_INTERVAL_SECS_ENV,
                var(PURGE_INTERVAL_SECS_ENV),
                DEFAULT_PURGE_INTERVAL_SECS,
            )),
            purge_step_timeout: Duration::from_secs(parse_or(
                PURGE_STEP_TIMEOUT_SECS_ENV,
                var(PURGE_STEP_TIMEOUT_SECS_ENV),
                DEFAULT_PURGE_STEP_TIMEOUT_SECS,
            )),
            upload_grant_ttl: Duration::from_secs(parse_or(
                UPLOAD_GRANT_TTL_SECS_ENV,
                var(UPLOAD_GRANT_TTL_SECS_ENV),
                DEFAULT_UPLOAD_GRANT_TTL_SECS,
            )),
            storage_quota_mb: parse_or(
                STORAGE_QUOTA_MB_ENV,
                var(STORAGE_QUOTA_MB_ENV),
                DEFAULT_STORAGE_QUOTA_MB,
            ),
            log_format: match var(LOG_FORMAT_ENV).as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Drive tunables derived from this configuration.
    pub fn drive_settings(&self) -> crate::drive::DriveSettings {
        crate::drive::DriveSettings {
            public_base_url: self.public_base_url.clone(),
            upload_grant_ttl: chrono::Duration::seconds(
                i64::try_from(self.upload_grant_ttl.as_secs()).unwrap_or(i64::MAX / 1000),
            ),
            storage_quota_bytes: self.storage_quota_mb.saturating_mul(1024 * 1024),
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, default = %default, "Invalid numeric setting, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.public_base_url, DEFAULT_PUBLIC_BASE_URL);
        assert_eq!(config.purge_interval, Duration::from_secs(60));
        assert_eq!(config.purge_step_timeout, Duration::from_secs(10));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.clerk_jwks_url.is_none());
    }

    #[test]
    fn values_are_read_and_trimmed() {
        let config = config_from(&[
            (PORT_ENV, "9000"),
            (PUBLIC_BASE_URL_ENV, "https://files.example.com/"),
            (CLERK_ISSUER_ENV, "https://clerk.example.com"),
            (STORAGE_QUOTA_MB_ENV, "2"),
            (LOG_FORMAT_ENV, "json"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.public_base_url, "https://files.example.com");
        assert_eq!(config.clerk_issuer.as_deref(), Some("https://clerk.example.com"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.drive_settings().storage_quota_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[(PORT_ENV, "eighty"), (PURGE_INTERVAL_SECS_ENV, "-5")]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.purge_interval, Duration::from_secs(60));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[(CLERK_JWKS_URL_ENV, " ")]);
        assert!(config.clerk_jwks_url.is_none());
    }
}
