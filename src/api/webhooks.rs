// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity-provider webhook: the only path that creates users and
//! organization memberships.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    auth::OrgRole,
    drive::MembershipChange,
    error::ApiError,
    state::AppState,
};

/// Envelope of every Clerk webhook delivery.
#[derive(Debug, Deserialize)]
pub struct ClerkEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: serde_json::Value,
}

/// `data` of `user.created` / `user.updated`.
#[derive(Debug, Deserialize)]
pub struct ClerkUserData {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ClerkUserData {
    /// "First Last", or whichever part is present.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[derive(Debug, Deserialize)]
pub struct ClerkOrganization {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ClerkPublicUserData {
    pub user_id: String,
}

/// `data` of `organizationMembership.created` / `.updated`.
#[derive(Debug, Deserialize)]
pub struct ClerkMembershipData {
    pub organization: ClerkOrganization,
    pub public_user_data: ClerkPublicUserData,
    pub role: String,
}

/// `data` of `organizationMembership.deleted`.
#[derive(Debug, Deserialize)]
pub struct ClerkMembershipRef {
    pub organization: ClerkOrganization,
    pub public_user_data: ClerkPublicUserData,
}

/// Acknowledgement returned for every accepted delivery.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub event_type: String,
    /// `false` for event types this service does not act on
    pub handled: bool,
}

fn parse_data<T: for<'de> Deserialize<'de>>(event: &ClerkEvent) -> Result<T, ApiError> {
    serde_json::from_value(event.data.clone())
        .map_err(|e| ApiError::bad_request(format!("invalid {} payload: {e}", event.event_type)))
}

/// Receive a Clerk (Svix-signed) webhook.
#[utoipa::path(
    post,
    path = "/webhooks/clerk",
    tag = "Webhooks",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Invalid signature"),
        (status = 404, description = "User or membership not found"),
        (status = 503, description = "Webhook not configured")
    )
)]
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let Some(webhook) = state.webhook.as_ref() else {
        return Err(ApiError::unavailable("webhook is not configured"));
    };

    if let Err(e) = webhook
        .verifier
        .verify(&headers, &body, chrono::Utc::now().timestamp())
    {
        warn!(error = %e, "Rejected webhook delivery");
        return Err(e.into());
    }

    let event: ClerkEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid webhook body: {e}")))?;
    let token_for = |subject: &str| format!("{}|{}", webhook.issuer, subject);

    let handled = match event.event_type.as_str() {
        "user.created" => {
            let data: ClerkUserData = parse_data(&event)?;
            state
                .drive
                .provision_user(&token_for(&data.id), data.display_name(), data.image_url.clone())?;
            true
        }
        "user.updated" => {
            let data: ClerkUserData = parse_data(&event)?;
            state
                .drive
                .update_user(&token_for(&data.id), data.display_name(), data.image_url.clone())?;
            true
        }
        "organizationMembership.created" | "organizationMembership.updated" => {
            let data: ClerkMembershipData = parse_data(&event)?;
            let change = MembershipChange {
                token_identifier: token_for(&data.public_user_data.user_id),
                org_id: data.organization.id,
                role: OrgRole::from_provider(&data.role),
            };
            let created = event.event_type == "organizationMembership.created";
            state.drive.apply_membership(&change, created)?;
            true
        }
        "organizationMembership.deleted" => {
            let data: ClerkMembershipRef = parse_data(&event)?;
            state.drive.remove_org_membership(
                &token_for(&data.public_user_data.user_id),
                &data.organization.id,
            )?;
            true
        }
        _ => false,
    };

    info!(event_type = %event.event_type, handled, "Webhook processed");
    Ok(Json(WebhookAck {
        event_type: event.event_type,
        handled,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::webhook::{HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP};
    use crate::auth::WebhookVerifier;
    use crate::state::{test_state, WebhookConfig};
    use axum::http::{HeaderValue, StatusCode};
    use serde_json::json;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    fn webhook_state() -> (AppState, tempfile::TempDir) {
        let (state, dir) = test_state();
        let state = state.with_webhook(WebhookConfig {
            verifier: WebhookVerifier::new(SECRET).unwrap(),
            issuer: "test".to_string(),
        });
        (state, dir)
    }

    fn signed(state: &AppState, payload: &serde_json::Value) -> (HeaderMap, Bytes) {
        let body = serde_json::to_vec(payload).unwrap();
        let ts = chrono::Utc::now().timestamp().to_string();
        let verifier = &state.webhook.as_ref().unwrap().verifier;
        let signature = verifier.sign("msg_1", &ts, &body).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(HEADER_ID, HeaderValue::from_static("msg_1"));
        headers.insert(HEADER_TIMESTAMP, HeaderValue::from_str(&ts).unwrap());
        headers.insert(HEADER_SIGNATURE, HeaderValue::from_str(&signature).unwrap());
        (headers, Bytes::from(body))
    }

    async fn deliver(state: &AppState, payload: serde_json::Value) -> Result<WebhookAck, ApiError> {
        let (headers, body) = signed(state, &payload);
        clerk_webhook(State(state.clone()), headers, body)
            .await
            .map(|Json(ack)| ack)
    }

    #[tokio::test]
    async fn user_and_membership_events_provision_records() {
        let (state, _dir) = webhook_state();

        let ack = deliver(
            &state,
            json!({"type": "user.created", "data": {
                "id": "user_1", "first_name": "Ada", "last_name": "Lovelace",
                "image_url": "https://img.test/ada.png"
            }}),
        )
        .await
        .unwrap();
        assert!(ack.handled);

        let user = state.drive.get_user("test|user_1").unwrap();
        assert_eq!(user.name.as_deref(), Some("Ada Lovelace"));
        assert!(user.orgs.is_empty());

        deliver(
            &state,
            json!({"type": "organizationMembership.created", "data": {
                "organization": {"id": "org_1"},
                "public_user_data": {"user_id": "user_1"},
                "role": "org:member"
            }}),
        )
        .await
        .unwrap();
        deliver(
            &state,
            json!({"type": "organizationMembership.updated", "data": {
                "organization": {"id": "org_1"},
                "public_user_data": {"user_id": "user_1"},
                "role": "org:admin"
            }}),
        )
        .await
        .unwrap();

        let user = state.drive.get_user("test|user_1").unwrap();
        assert_eq!(user.orgs.len(), 1);
        assert_eq!(user.role_in("org_1"), Some(OrgRole::Admin));
    }

    #[tokio::test]
    async fn updating_unknown_membership_is_not_found() {
        let (state, _dir) = webhook_state();
        deliver(
            &state,
            json!({"type": "user.created", "data": {"id": "user_1"}}),
        )
        .await
        .unwrap();

        let err = deliver(
            &state,
            json!({"type": "organizationMembership.updated", "data": {
                "organization": {"id": "org_9"},
                "public_user_data": {"user_id": "user_1"},
                "role": "org:admin"
            }}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleted_membership_is_removed() {
        let (state, _dir) = webhook_state();
        deliver(&state, json!({"type": "user.created", "data": {"id": "user_1"}}))
            .await
            .unwrap();
        for org in ["org_1", "org_2"] {
            deliver(
                &state,
                json!({"type": "organizationMembership.created", "data": {
                    "organization": {"id": org},
                    "public_user_data": {"user_id": "user_1"},
                    "role": "org:member"
                }}),
            )
            .await
            .unwrap();
        }

        let ack = deliver(
            &state,
            json!({"type": "organizationMembership.deleted", "data": {
                "organization": {"id": "org_1"},
                "public_user_data": {"user_id": "user_1"}
            }}),
        )
        .await
        .unwrap();
        assert!(ack.handled);

        let user = state.drive.get_user("test|user_1").unwrap();
        assert_eq!(user.role_in("org_1"), None);
        assert_eq!(user.role_in("org_2"), Some(OrgRole::Member));
    }

    #[tokio::test]
    async fn unknown_events_are_acknowledged() {
        let (state, _dir) = webhook_state();
        let ack = deliver(&state, json!({"type": "session.created", "data": {}}))
            .await
            .unwrap();
        assert!(!ack.handled);
    }

    #[tokio::test]
    async fn tampered_body_is_rejected() {
        let (state, _dir) = webhook_state();
        let (headers, _) = signed(&state, &json!({"type": "user.created", "data": {"id": "a"}}));
        let forged = Bytes::from_static(br#"{"type":"user.created","data":{"id":"b"}}"#);

        let err = clerk_webhook(State(state.clone()), headers, forged)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert!(state.drive.get_user("test|b").is_err());
    }

    #[tokio::test]
    async fn unconfigured_webhook_is_unavailable() {
        let (state, _dir) = test_state();
        let err = clerk_webhook(State(state), HeaderMap::new(), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn display_name_joins_present_parts() {
        let data = ClerkUserData {
            id: "u".into(),
            first_name: Some("Ada".into()),
            last_name: None,
            image_url: None,
        };
        assert_eq!(data.display_name().as_deref(), Some("Ada"));
    }
}
