// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Browser session authentication through the external session proxy.
//!
//! The proxy owns the session cookie. We forward the caller's `Cookie` header
//! to its auth endpoint and trust the identity it names in
//! `X-Auth-Request-Email` when, and only when, it answers `202 Accepted`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header::COOKIE, HeaderMap, StatusCode};
use tracing::{debug, instrument, warn};

use super::{AuthError, Authenticated, Principal};

/// Response header carrying the verified identity.
pub const IDENTITY_HEADER: &str = "X-Auth-Request-Email";

/// What the session proxy said about a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub identity: Option<String>,
}

/// Capability to validate a session cookie.
#[async_trait]
pub trait SessionProxy: Send + Sync {
    /// Validate the raw `Cookie` header value.
    async fn check_session(&self, cookie: &str) -> Result<ProxyResponse, AuthError>;
}

/// Session proxy reached over HTTP.
#[derive(Clone)]
pub struct HttpSessionProxy {
    auth_url: String,
    client: reqwest::Client,
}

impl HttpSessionProxy {
    pub fn new(auth_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            auth_url: auth_url.into(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }
}

#[async_trait]
impl SessionProxy for HttpSessionProxy {
    async fn check_session(&self, cookie: &str) -> Result<ProxyResponse, AuthError> {
        let response = self
            .client
            .get(&self.auth_url)
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(|e| AuthError::SessionProxyUnavailable(e.to_string()))?;

        let identity = response
            .headers()
            .get(IDENTITY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(ProxyResponse {
            status: response.status(),
            identity,
        })
    }
}

/// Authenticates human users by their session cookie.
#[derive(Clone)]
pub struct CookieAuthenticator {
    proxy: Arc<dyn SessionProxy>,
    skip_auth: bool,
}

impl CookieAuthenticator {
    pub fn new(proxy: Arc<dyn SessionProxy>, skip_auth: bool) -> Self {
        Self { proxy, skip_auth }
    }

    #[instrument(name = "cookie_auth", skip_all)]
    pub async fn authenticate(&self, cookie: &str) -> Result<Authenticated, AuthError> {
        if self.skip_auth {
            warn!("Skipping authentication. This is not recommended in production environments.");
            return Ok(Authenticated::Anonymous);
        }

        let response = self.proxy.check_session(cookie).await?;
        if response.status != StatusCode::ACCEPTED {
            return Err(AuthError::SessionRejected(response.status.as_u16()));
        }

        let identity = response
            .identity
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingIdentityHeader(IDENTITY_HEADER))?;

        debug!(identity = %identity, "Session accepted by proxy");
        Ok(Authenticated::Principal(Principal::user(identity)))
    }
}

/// Find `name` among the request cookies and return it as `name=value`.
pub fn cookie_pair(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(key, value)| format!("{key}={value}"))
}

/// The full `Cookie` header to forward, if it carries the session cookie.
pub fn session_cookie_header(headers: &HeaderMap, name: &str) -> Option<String> {
    cookie_pair(headers, name)?;
    let joined = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    Some(joined)
}
