// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated callers.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity is Authenticated
//! }
//! ```
//!
//! ## Path selection
//!
//! - `Authorization` header present → bearer token path
//! - otherwise a `Cookie` header carrying the session cookie → session proxy
//! - otherwise → 401

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

use super::session::session_cookie_header;
use super::{AuthError, Authenticated};
use crate::state::AppState;

/// Extractor for authenticated callers.
///
/// In skip-auth mode every request is `Authenticated::Anonymous`.
pub struct Auth(pub Authenticated);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if state.config.skip_auth {
            warn!("Skipping authentication. This is not recommended in production environments.");
            return Ok(Auth(Authenticated::Anonymous));
        }

        authenticate(parts, state)
            .await
            .map(Auth)
            .inspect_err(|e| {
                debug!(error = %e, error_code = e.error_code(), path = %parts.uri.path(), "Authentication failed");
            })
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Authenticated, AuthError> {
    if let Some(value) = parts.headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
        return state.bearer.authenticate(value).await;
    }

    if let Some(cookie) = session_cookie_header(&parts.headers, &state.config.cookie_name) {
        return state.cookies.authenticate(&cookie).await;
    }

    Err(AuthError::MissingCredentials)
}
