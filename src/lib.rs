// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity Gate - Authentication & Authorization Decision Point
//!
//! Answers, for every request a reverse proxy forwards, who is calling and
//! whether they may perform the request in the requested organization.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session cookie and RSA bearer token authentication
//! - `authz` - Request attributes, ACL policy enforcement, decision
//! - `store` - Organizations, service accounts and policies (redb / memory)

pub mod api;
pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod telemetry;
