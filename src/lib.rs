// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OrgDrive - Multi-tenant File Storage Backend
//!
//! Organization-scoped file catalog with soft delete, per-user categories,
//! derived storage quota, shareable links and a periodic purge sweep.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Authentication (Clerk JWT) and identity-provider webhooks
//! - `drive` - Catalog, access control, categories, quota, uploads, links
//! - `purge` - Background removal of files marked for deletion
//! - `storage` - redb metadata store and filesystem object store

pub mod api;
pub mod auth;
pub mod config;
pub mod drive;
pub mod error;
pub mod models;
pub mod purge;
pub mod state;
pub mod storage;
