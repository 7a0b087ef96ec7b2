// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthenticatedUser, OrgRole},
    drive::{FileView, StorageUsage, ToggleOutcome, UploadTicket, UserProfile},
    models::{
        CategoryListResponse, CreateFileRequest, FileListResponse, RenameFileRequest,
        ShareableLinkResponse, UploadCompleteResponse,
    },
    state::AppState,
    storage::{Category, CategoryEntry, FileRecord, FileType, OrgMembership, UserRecord},
};

pub mod categories;
pub mod files;
pub mod health;
pub mod links;
pub mod uploads;
pub mod users;
pub mod webhooks;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id assigned by the request-id layer, for log correlation.
pub(crate) fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/uploads", post(uploads::issue_upload_url))
        .route(
            "/uploads/{token}",
            post(uploads::complete_upload)
                .layer(DefaultBodyLimit::max(uploads::MAX_UPLOAD_BYTES)),
        )
        .route("/storage/{storage_id}", get(uploads::download))
        .route(
            "/orgs/{org_id}/files",
            get(files::list_files).post(files::create_file),
        )
        .route("/orgs/{org_id}/storage", get(files::storage_used))
        .route(
            "/orgs/{org_id}/categories/{category}",
            get(categories::list_category),
        )
        .route(
            "/files/{file_id}",
            get(files::get_file)
                .patch(files::rename_file)
                .delete(files::delete_file),
        )
        .route("/files/{file_id}/restore", post(files::restore_file))
        .route(
            "/files/{file_id}/categories/{category}",
            post(categories::toggle_category),
        )
        .route("/files/{file_id}/share", post(links::generate_link))
        .route("/shared", get(links::resolve_link))
        .route("/users/me", get(users::get_current_user))
        .route("/users/{user_id}/profile", get(users::get_user_profile));

    let app = Router::new()
        .nest("/v1", v1_routes)
        .route("/webhooks/clerk", post(webhooks::clerk_webhook))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    app.merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        uploads::issue_upload_url,
        uploads::complete_upload,
        uploads::download,
        files::create_file,
        files::list_files,
        files::storage_used,
        files::get_file,
        files::rename_file,
        files::delete_file,
        files::restore_file,
        categories::toggle_category,
        categories::list_category,
        links::generate_link,
        links::resolve_link,
        users::get_current_user,
        users::get_user_profile,
        webhooks::clerk_webhook,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            FileRecord,
            FileType,
            FileView,
            Category,
            CategoryEntry,
            UserRecord,
            OrgMembership,
            OrgRole,
            AuthenticatedUser,
            UserProfile,
            StorageUsage,
            ToggleOutcome,
            UploadTicket,
            CreateFileRequest,
            RenameFileRequest,
            FileListResponse,
            UploadCompleteResponse,
            CategoryListResponse,
            ShareableLinkResponse,
            users::UserMeResponse,
            webhooks::WebhookAck,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Files", description = "Organization file catalog"),
        (name = "Categories", description = "Favorites and folders"),
        (name = "Uploads", description = "Upload grants and object download"),
        (name = "Links", description = "Shareable links"),
        (name = "Users", description = "Current user and public profiles"),
        (name = "Webhooks", description = "Identity-provider provisioning"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
