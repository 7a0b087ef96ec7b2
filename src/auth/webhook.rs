// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification of identity-provider webhooks (Svix signing scheme).
//!
//! Clerk delivers user and membership events through Svix. Each request
//! carries three headers:
//!
//! - `svix-id`: unique message id
//! - `svix-timestamp`: unix seconds when the message was signed
//! - `svix-signature`: space-separated list of `v1,<base64 HMAC-SHA256>`
//!
//! The signed content is `{svix-id}.{svix-timestamp}.{raw body}` and the key
//! is the base64 part of the `whsec_...` signing secret.

use axum::http::HeaderMap;
use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of Svix signing secrets.
const SECRET_PREFIX: &str = "whsec_";

/// Accepted distance between the signature timestamp and now (5 minutes).
const TIMESTAMP_TOLERANCE_SECS: u64 = 300;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

/// Verifier for one webhook signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    /// Build a verifier from a `whsec_<base64>` secret.
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = Base64::decode_vec(encoded)
            .map_err(|_| AuthError::InternalError("webhook secret is not valid base64".into()))?;
        Ok(Self { key })
    }

    /// Verify a delivery against the signature headers.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), AuthError> {
        let id = header_str(headers, HEADER_ID)?;
        let timestamp = header_str(headers, HEADER_TIMESTAMP)?;
        let signatures = header_str(headers, HEADER_SIGNATURE)?;

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| AuthError::InvalidWebhookSignature)?;
        // Extreme timestamps overflow the difference and count as out of range.
        let skew = now.checked_sub(ts).map(i64::unsigned_abs);
        if skew.is_none_or(|skew| skew > TIMESTAMP_TOLERANCE_SECS) {
            return Err(AuthError::WebhookTimestampOutOfRange);
        }

        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.strip_prefix("v1,"))
            .filter_map(|sig| Base64::decode_vec(sig).ok())
            .any(|sig| {
                self.mac_for(id, timestamp, body)
                    .is_ok_and(|mac| mac.verify_slice(&sig).is_ok())
            });

        if matched {
            Ok(())
        } else {
            Err(AuthError::InvalidWebhookSignature)
        }
    }

    /// Compute the `v1,<base64>` signature for a message.
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<String, AuthError> {
        let tag = self.mac_for(id, timestamp, body)?.finalize().into_bytes();
        Ok(format!("v1,{}", Base64::encode_string(&tag)))
    }

    fn mac_for(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, AuthError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .map_err(|e| AuthError::InternalError(format!("webhook key: {e}")))?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AuthError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::InvalidWebhookSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    fn signed_headers(verifier: &WebhookVerifier, ts: i64, body: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let ts = ts.to_string();
        let signature = verifier.sign("msg_1", &ts, body).unwrap();
        headers.insert(HEADER_ID, HeaderValue::from_static("msg_1"));
        headers.insert(HEADER_TIMESTAMP, HeaderValue::from_str(&ts).unwrap());
        headers.insert(
            HEADER_SIGNATURE,
            HeaderValue::from_str(&format!("v1,bm9wZQ== {signature}")).unwrap(),
        );
        headers
    }

    #[test]
    fn accepts_valid_signature() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let body = br#"{"type":"user.created"}"#;
        let headers = signed_headers(&verifier, 1_700_000_000, body);

        assert!(verifier.verify(&headers, body, 1_700_000_010).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let headers = signed_headers(&verifier, 1_700_000_000, b"original");

        assert!(matches!(
            verifier.verify(&headers, b"tampered", 1_700_000_000),
            Err(AuthError::InvalidWebhookSignature)
        ));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let headers = signed_headers(&verifier, 1_700_000_000, b"{}");

        assert!(matches!(
            verifier.verify(&headers, b"{}", 1_700_000_000 + 301),
            Err(AuthError::WebhookTimestampOutOfRange)
        ));
    }

    #[test]
    fn rejects_extreme_timestamps_without_overflow() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        for (ts, now) in [
            (i64::MIN, 1_700_000_000),
            (i64::MAX, -1),
            (i64::MIN, i64::MAX),
            (i64::MAX, i64::MIN),
        ] {
            let headers = signed_headers(&verifier, ts, b"{}");
            assert!(matches!(
                verifier.verify(&headers, b"{}", now),
                Err(AuthError::WebhookTimestampOutOfRange)
            ));
        }
    }

    #[test]
    fn rejects_missing_headers() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        assert!(matches!(
            verifier.verify(&HeaderMap::new(), b"{}", 0),
            Err(AuthError::InvalidWebhookSignature)
        ));
    }

    #[test]
    fn rejects_secret_that_is_not_base64() {
        assert!(WebhookVerifier::new("whsec_***").is_err());
    }
}
