// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Details are for logs only. The HTTP response carries nothing beyond a
//! generic message for the status class.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failure to establish who is calling.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Neither an `Authorization` header nor a session cookie was presented
    #[error("no credentials presented")]
    MissingCredentials,
    /// Invalid authorization header format
    #[error("invalid Authorization header, it must be of form 'Authorization: Bearer <token>'")]
    InvalidAuthHeader,
    /// Token could not be parsed
    #[error("token is malformed: {0}")]
    MalformedToken(String),
    /// Token carries no `iss` claim
    #[error("missing issuer claim in unverified token")]
    MissingIssuer,
    /// Issuer is neither the bootstrap identity nor `<organization>/<name>`
    #[error("invalid issuer claim {0:?}: missing organization")]
    InvalidIssuer(String),
    /// Issuer names a service account the store does not know
    #[error("unknown issuer {0}")]
    UnknownIssuer(String),
    /// Bootstrap identity matched but no bootstrap key is configured
    #[error("missing public key in bootstrap mode")]
    MissingBootstrapKey,
    /// Token declares a signing algorithm outside the RSA family
    #[error("unexpected signing method: {0}")]
    UnsupportedAlgorithm(String),
    /// Token signature is invalid
    #[error("token signature is invalid")]
    InvalidSignature,
    /// Token has expired
    #[error("token has expired")]
    TokenExpired,
    /// Token is not yet valid
    #[error("token is not yet valid")]
    TokenNotYetValid,
    /// Session proxy answered with something other than 202
    #[error("authentication failed with session proxy: status {0}")]
    SessionRejected(u16),
    /// Session proxy could not be reached
    #[error("error forwarding request to session proxy: {0}")]
    SessionProxyUnavailable(String),
    /// Session proxy accepted the cookie but named no identity
    #[error("missing {0} header in response from session proxy")]
    MissingIdentityHeader(&'static str),
    /// Stored or configured public key cannot be decoded
    #[error("error while parsing public key: {0}")]
    InvalidKeyMaterial(String),
    /// Entity store failed or timed out
    #[error("store error when resolving issuer: {0}")]
    StoreUnavailable(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
}

impl AuthError {
    /// Stable identifier for logs and metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::MissingIssuer => "missing_issuer",
            AuthError::InvalidIssuer(_) => "invalid_issuer",
            AuthError::UnknownIssuer(_) => "unknown_issuer",
            AuthError::MissingBootstrapKey => "missing_bootstrap_key",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::SessionRejected(_) => "session_rejected",
            AuthError::SessionProxyUnavailable(_) => "session_proxy_unavailable",
            AuthError::MissingIdentityHeader(_) => "missing_identity_header",
            AuthError::InvalidKeyMaterial(_) => "invalid_key_material",
            AuthError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidKeyMaterial(_) | AuthError::StoreUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = if status == StatusCode::UNAUTHORIZED {
            "unauthorized"
        } else {
            "internal error"
        };
        (status, Json(AuthErrorBody { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn identity_failures_return_generic_401() {
        let response = AuthError::UnknownIssuer("acme/secret-bot".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"unauthorized"}"#);
        assert!(!body.contains("secret-bot"));
    }

    #[test]
    fn store_and_key_failures_are_internal() {
        assert_eq!(
            AuthError::StoreUnavailable("timeout".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::InvalidKeyMaterial("bad pem".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AuthError::SessionRejected(401).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::UnsupportedAlgorithm("HS256".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
