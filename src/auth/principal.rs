// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated identity attached to a request.

use serde::Serialize;

/// How the principal proved its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// Human user, authenticated through the session proxy
    User,
    /// Service account, authenticated with a token signed by its stored key
    ServiceAccount,
    /// The single pre-configured identity used before any tenant exists
    BootstrapUser,
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "user"),
            PrincipalKind::ServiceAccount => write!(f, "service_account"),
            PrincipalKind::BootstrapUser => write!(f, "bootstrap_user"),
        }
    }
}

/// Verified identity for the lifetime of one request. Never persisted.
///
/// Only a `User` without an organization can have one filled in later,
/// through [`Principal::backfill_organization`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    organization_id: String,
    subject: String,
    kind: PrincipalKind,
}

impl Principal {
    pub fn user(subject: impl Into<String>) -> Self {
        Self {
            organization_id: String::new(),
            subject: subject.into(),
            kind: PrincipalKind::User,
        }
    }

    pub fn service_account(organization_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            subject: subject.into(),
            kind: PrincipalKind::ServiceAccount,
        }
    }

    pub fn bootstrap(subject: impl Into<String>) -> Self {
        Self {
            organization_id: String::new(),
            subject: subject.into(),
            kind: PrincipalKind::BootstrapUser,
        }
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// Adopt `organization_id` if this is a user whose identity provider
    /// supplied none. Returns whether the principal changed.
    pub fn backfill_organization(&mut self, organization_id: &str) -> bool {
        if self.kind == PrincipalKind::User && self.organization_id.is_empty() {
            self.organization_id = organization_id.to_string();
            true
        } else {
            false
        }
    }
}

/// Result of the authentication step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authenticated {
    /// Authentication is disabled (`IDENTITY_SKIP_AUTH`). Never use in production.
    Anonymous,
    Principal(Principal),
}
