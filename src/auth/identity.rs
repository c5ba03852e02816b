// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token authentication.
//!
//! Resolves the key a token must be verified with from its issuer:
//!
//! - issuer == configured bootstrap user → bootstrap public key from disk
//! - issuer == `<organization>/<name>` → public key of that service account
//!
//! The principal is assembled from the trusted source (bootstrap config or
//! the stored record) and only released once the signature verifies.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::bootstrap::BootstrapConfig;
use super::token::{
    decode_public_key, parse_bearer, read_unverified_issuer, verify_signature, UnverifiedIssuer,
    VerifiedToken,
};
use super::{AuthError, Authenticated, Principal};
use crate::store::{EntityStore, Filter, StoreError};

/// Principal and key chosen for a token that has not been verified yet.
struct PendingIdentity {
    principal: Principal,
    public_key: String,
}

impl PendingIdentity {
    fn confirm(self, _proof: VerifiedToken) -> Principal {
        self.principal
    }
}

pub struct BearerAuthenticator {
    store: Arc<dyn EntityStore>,
    bootstrap: BootstrapConfig,
    skip_auth: bool,
    store_timeout: Duration,
}

impl BearerAuthenticator {
    pub fn new(
        store: Arc<dyn EntityStore>,
        bootstrap: BootstrapConfig,
        skip_auth: bool,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            bootstrap,
            skip_auth,
            store_timeout,
        }
    }

    /// Authenticate an `Authorization` header value.
    #[instrument(name = "bearer_auth", skip_all)]
    pub async fn authenticate(&self, header_value: &str) -> Result<Authenticated, AuthError> {
        if self.skip_auth {
            warn!("Skipping authentication. This is not recommended in production environments.");
            return Ok(Authenticated::Anonymous);
        }

        let token = parse_bearer(header_value)?;
        let principal = self.resolve(token).await?;
        Ok(Authenticated::Principal(principal))
    }

    /// Verify `token` and return the principal it proves.
    pub async fn resolve(&self, token: &str) -> Result<Principal, AuthError> {
        let issuer = read_unverified_issuer(token)?;
        let pending = self.pending_identity(issuer).await?;

        let key = decode_public_key(&pending.public_key)?;
        let proof = verify_signature(token, &key)?;

        Ok(pending.confirm(proof))
    }

    async fn pending_identity(&self, issuer: UnverifiedIssuer) -> Result<PendingIdentity, AuthError> {
        if let Some(bootstrap_user) = self.bootstrap.bootstrap_user().await {
            if bootstrap_user == issuer.as_str() {
                warn!(
                    "Bootstrap mode is enabled. Please ensure it is turned off in a production environment."
                );
                let public_key = self
                    .bootstrap
                    .bootstrap_public_key()
                    .await
                    .ok_or(AuthError::MissingBootstrapKey)?;
                return Ok(PendingIdentity {
                    principal: Principal::bootstrap(bootstrap_user),
                    public_key,
                });
            }
        }

        let (organization_id, name) = match issuer.as_str().split('/').collect::<Vec<_>>()[..] {
            [organization_id, name] if !organization_id.is_empty() && !name.is_empty() => {
                (organization_id, name)
            }
            _ => return Err(AuthError::InvalidIssuer(issuer.as_str().to_string())),
        };

        debug!(issuer = issuer.as_str(), "Fetching service account from store");
        let lookup = self
            .store
            .get_service_account(organization_id, name, Filter::Exists);
        let account = match tokio::time::timeout(self.store_timeout, lookup).await {
            Ok(Ok(account)) => account,
            Ok(Err(StoreError::NotFound(_))) => {
                return Err(AuthError::UnknownIssuer(issuer.as_str().to_string()))
            }
            Ok(Err(e)) => {
                return Err(AuthError::StoreUnavailable(format!(
                    "getting service account {}: {e}",
                    issuer.as_str()
                )))
            }
            Err(_) => {
                return Err(AuthError::StoreUnavailable(format!(
                    "timed out getting service account {}",
                    issuer.as_str()
                )))
            }
        };

        Ok(PendingIdentity {
            principal: Principal::service_account(account.organization_id, account.name),
            public_key: account.public_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::bootstrap::{BOOTSTRAP_PUBLIC_KEY_KEY, BOOTSTRAP_USER_KEY};
    use crate::auth::token::test_keys::*;
    use crate::auth::PrincipalKind;
    use crate::store::failing::FailingStore;
    use crate::store::{EntityStatus, InMemoryEntityStore, ServiceAccount};
    use axum::http::StatusCode;
    use jsonwebtoken::Algorithm;
    use tempfile::TempDir;

    async fn authenticator(skip_auth: bool) -> (BearerAuthenticator, TempDir) {
        let store = InMemoryEntityStore::new();
        store
            .put_service_account(ServiceAccount::new("acme", "ci", public_key_b64()))
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let auth = BearerAuthenticator::new(
            Arc::new(store),
            BootstrapConfig::new(dir.path()),
            skip_auth,
            Duration::from_secs(5),
        );
        (auth, dir)
    }

    fn enable_bootstrap(dir: &TempDir, public_key: Option<&str>) {
        std::fs::write(dir.path().join(BOOTSTRAP_USER_KEY), "bootstrap-admin\n").unwrap();
        if let Some(key) = public_key {
            std::fs::write(dir.path().join(BOOTSTRAP_PUBLIC_KEY_KEY), key).unwrap();
        }
    }

    #[tokio::test]
    async fn service_account_token_resolves_to_stored_identity() {
        let (auth, _dir) = authenticator(false).await;
        let header = format!("Bearer {}", signed_token("acme/ci"));

        let Authenticated::Principal(principal) = auth.authenticate(&header).await.unwrap() else {
            panic!("expected a principal");
        };
        assert_eq!(principal.kind(), PrincipalKind::ServiceAccount);
        assert_eq!(principal.organization_id(), "acme");
        assert_eq!(principal.subject(), "ci");
    }

    #[tokio::test]
    async fn issuer_without_org_is_rejected() {
        let (auth, _dir) = authenticator(false).await;
        let result = auth.resolve(&signed_token("ci")).await;
        assert!(matches!(result, Err(AuthError::InvalidIssuer(_))));

        let result = auth.resolve(&signed_token("acme/ci/extra")).await;
        assert!(matches!(result, Err(AuthError::InvalidIssuer(_))));

        for issuer in ["acme/", "/ci", "/"] {
            let result = auth.resolve(&signed_token(issuer)).await;
            assert!(matches!(result, Err(AuthError::InvalidIssuer(_))), "{issuer}");
        }
    }

    #[tokio::test]
    async fn unknown_service_account_is_rejected() {
        let (auth, _dir) = authenticator(false).await;
        let result = auth.resolve(&signed_token("acme/ghost")).await;
        assert!(matches!(result, Err(AuthError::UnknownIssuer(_))));
    }

    #[tokio::test]
    async fn deleted_service_account_is_rejected() {
        let store = InMemoryEntityStore::new();
        let mut account = ServiceAccount::new("acme", "ci", public_key_b64());
        account.status = EntityStatus::Deleted;
        store.put_service_account(account).await.unwrap();
        let dir = TempDir::new().unwrap();
        let auth = BearerAuthenticator::new(
            Arc::new(store),
            BootstrapConfig::new(dir.path()),
            false,
            Duration::from_secs(5),
        );

        let result = auth.resolve(&signed_token("acme/ci")).await;
        assert!(matches!(result, Err(AuthError::UnknownIssuer(_))));
    }

    #[tokio::test]
    async fn forged_token_for_known_account_is_rejected() {
        let (auth, _dir) = authenticator(false).await;
        let token = rsa_token(Algorithm::RS256, OTHER_RSA_PRIVATE, "acme/ci", 3600);
        assert!(matches!(auth.resolve(&token).await, Err(AuthError::InvalidSignature)));
    }

    #[tokio::test]
    async fn bootstrap_issuer_uses_bootstrap_key() {
        let (auth, dir) = authenticator(false).await;
        enable_bootstrap(&dir, Some(&public_key_b64()));

        let principal = auth.resolve(&signed_token("bootstrap-admin")).await.unwrap();
        assert_eq!(principal.kind(), PrincipalKind::BootstrapUser);
        assert_eq!(principal.subject(), "bootstrap-admin");
        assert_eq!(principal.organization_id(), "");
    }

    #[tokio::test]
    async fn bootstrap_without_public_key_fails() {
        let (auth, dir) = authenticator(false).await;
        enable_bootstrap(&dir, None);

        let result = auth.resolve(&signed_token("bootstrap-admin")).await;
        assert!(matches!(result, Err(AuthError::MissingBootstrapKey)));
    }

    #[tokio::test]
    async fn skip_auth_short_circuits_to_anonymous() {
        let (auth, _dir) = authenticator(true).await;
        let outcome = auth.authenticate("garbage").await.unwrap();
        assert_eq!(outcome, Authenticated::Anonymous);
    }

    #[tokio::test]
    async fn non_bearer_header_is_rejected() {
        let (auth, _dir) = authenticator(false).await;
        let result = auth.authenticate("Basic dXNlcjpwYXNz").await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    fn failing_authenticator(store: FailingStore) -> (BearerAuthenticator, TempDir) {
        let dir = TempDir::new().unwrap();
        let auth = BearerAuthenticator::new(
            Arc::new(store),
            BootstrapConfig::new(dir.path()),
            false,
            Duration::from_millis(50),
        );
        (auth, dir)
    }

    #[tokio::test]
    async fn store_error_is_an_internal_failure() {
        let (auth, _dir) = failing_authenticator(FailingStore::Unreachable);

        let err = auth.resolve(&signed_token("acme/ci")).await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn store_timeout_is_an_internal_failure() {
        let (auth, _dir) = failing_authenticator(FailingStore::Hanging);

        let err = auth.resolve(&signed_token("acme/ci")).await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
