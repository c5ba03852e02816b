// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request authorization decision.
//!
//! ## Decision order
//!
//! 1. Skip-auth mode → accept with the declared organization
//! 2. Extract request attributes → forbid on failure
//! 3. Bootstrap user → accept for `iam` and non-resource requests, forbid
//!    anything else, never consult policies
//! 4. User without organization → adopt `X-Dispatch-Org` or forbid
//! 5. Organization = `X-Dispatch-Org` if present, else the principal's
//! 6. Organization must exist in the store
//! 7. Non-resource request → accept
//! 8. Policy enforcer decides
//!
//! The order matters: organization existence is checked before any policy
//! is evaluated, and the bootstrap and non-resource branches must work
//! before a single policy exists.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, Method};
use tracing::{debug, error, info, instrument, warn};

use super::attributes::{
    extract, DISPATCH_ORG_HEADER, IAM_RESOURCE, ORIGINAL_METHOD_HEADER, ORIGINAL_URI_HEADER,
};
use super::enforcer::PolicyEnforcer;
use crate::auth::{Authenticated, PrincipalKind};
use crate::store::{EntityStore, Filter};

/// Outcome of authorization. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Allowed, acting in `organization` (may be empty for bootstrap).
    Accept { organization: String },
    Forbid,
}

impl Decision {
    fn accept(organization: impl Into<String>) -> Self {
        Decision::Accept {
            organization: organization.into(),
        }
    }
}

/// The parts of an HTTP request authorization looks at.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: Method,
    pub original_method: Option<String>,
    pub original_uri: Option<String>,
    pub dispatch_org: Option<String>,
}

impl RequestContext {
    /// Read the forwarded headers. Empty or non-UTF-8 values count as absent.
    pub fn from_headers(method: &Method, headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            method: method.clone(),
            original_method: header(ORIGINAL_METHOD_HEADER),
            original_uri: header(ORIGINAL_URI_HEADER),
            dispatch_org: header(DISPATCH_ORG_HEADER),
        }
    }
}

#[derive(Clone)]
pub struct Authorizer {
    store: Arc<dyn EntityStore>,
    enforcer: PolicyEnforcer,
    skip_auth: bool,
    store_timeout: Duration,
}

impl Authorizer {
    pub fn new(
        store: Arc<dyn EntityStore>,
        enforcer: PolicyEnforcer,
        skip_auth: bool,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            enforcer,
            skip_auth,
            store_timeout,
        }
    }

    #[instrument(
        name = "authorize",
        skip_all,
        fields(uri = ctx.original_uri.as_deref(), org = ctx.dispatch_org.as_deref())
    )]
    pub async fn authorize(&self, identity: Authenticated, ctx: &RequestContext) -> Decision {
        let declared_org = ctx.dispatch_org.as_deref();

        if self.skip_auth {
            warn!("Skipping authorization. This is not recommended in production environments.");
            return Decision::accept(declared_org.unwrap_or_default());
        }

        let Authenticated::Principal(mut principal) = identity else {
            warn!("Anonymous identity outside skip-auth mode, forbidding");
            return Decision::Forbid;
        };

        let attrs = match extract(
            &ctx.method,
            ctx.original_method.as_deref(),
            ctx.original_uri.as_deref(),
            principal.subject(),
        ) {
            Ok(attrs) => attrs,
            Err(e) => {
                debug!(error = %e, error_code = e.error_code(), "Invalid request, unable to parse request attributes");
                return Decision::Forbid;
            }
        };

        match principal.kind() {
            PrincipalKind::BootstrapUser => {
                if attrs.is_resource_request && attrs.resource.as_deref() != Some(IAM_RESOURCE) {
                    warn!(
                        resource = attrs.resource.as_deref().unwrap_or_default(),
                        "Cannot operate on a non-iam resource during bootstrap, forbidding"
                    );
                    return Decision::Forbid;
                }
                info!("Bootstrap auth accepted");
                return Decision::accept(declared_org.unwrap_or_default());
            }
            PrincipalKind::User if principal.organization_id().is_empty() => {
                let Some(org) = declared_org else {
                    debug!(subject = principal.subject(), "Missing X-Dispatch-Org header");
                    return Decision::Forbid;
                };
                if principal.backfill_organization(org) {
                    debug!(subject = principal.subject(), organization = org, "Adopted X-Dispatch-Org for user");
                }
            }
            PrincipalKind::User | PrincipalKind::ServiceAccount => {}
        }

        let organization = declared_org.unwrap_or(principal.organization_id()).to_string();
        debug!(
            kind = %principal.kind(),
            subject = principal.subject(),
            organization = %organization,
            "Authorizing principal"
        );

        if !self.organization_exists(&organization).await {
            return Decision::Forbid;
        }

        if !attrs.is_resource_request {
            return Decision::accept(organization);
        }

        let resource = attrs.resource.as_deref().unwrap_or_default();
        if self
            .enforcer
            .enforce(&organization, &attrs.subject, resource, attrs.action_str())
        {
            Decision::accept(organization)
        } else {
            Decision::Forbid
        }
    }

    async fn organization_exists(&self, organization: &str) -> bool {
        let lookup = self.store.get_organization(organization, Filter::Exists);
        match tokio::time::timeout(self.store_timeout, lookup).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) if e.is_not_found() => {
                debug!(organization, "Requested organization does not exist");
                false
            }
            Ok(Err(e)) => {
                error!(organization, error = %e, "Store error when getting organization");
                false
            }
            Err(_) => {
                error!(organization, "Timed out getting organization");
                false
            }
        }
    }
}
