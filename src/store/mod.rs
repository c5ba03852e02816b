// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Entity Store
//!
//! Read side of the policy storage the gate depends on. Organizations,
//! service accounts and policies are owned by the IAM CRUD API; this module
//! only defines the records and the lookup seam the gate needs.
//!
//! ## Backends
//!
//! - `memory` - `InMemoryEntityStore`, for tests and throwaway deployments
//! - `redb` - `RedbEntityStore`, embedded ACID database on local disk
//!
//! ## Filters
//!
//! Entities are soft-deleted. `Filter::Exists` treats a `Deleted` entity as
//! missing, which is what every lookup on the request path uses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod database;
#[cfg(test)]
pub(crate) mod failing;
pub mod memory;
pub mod seed;

pub use database::RedbEntityStore;
pub use memory::InMemoryEntityStore;

/// Lifecycle status shared by all stored entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Creating,
    #[default]
    Ready,
    Error,
    Deleted,
}

/// Lookup filter applied by every `get`/`list` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Return entities in any status, including soft-deleted ones.
    Any,
    /// Hide soft-deleted entities.
    #[default]
    Exists,
}

impl Filter {
    pub fn admits(&self, status: EntityStatus) -> bool {
        match self {
            Filter::Any => true,
            Filter::Exists => status != EntityStatus::Deleted,
        }
    }
}

/// A tenant. Stored under its own name as both organization and key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    #[serde(default)]
    pub status: EntityStatus,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: EntityStatus::Ready,
        }
    }
}

/// A non-human identity that authenticates with self-signed bearer tokens.
///
/// `public_key` is the standard base64 encoding of a PEM RSA public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub name: String,
    pub organization_id: String,
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub status: EntityStatus,
}

impl ServiceAccount {
    pub fn new(
        organization_id: impl Into<String>,
        name: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            organization_id: organization_id.into(),
            public_key: public_key.into(),
            domain: None,
            status: EntityStatus::Ready,
        }
    }
}

/// One rule of a policy: every subject may perform every action on every resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// A named set of allow rules scoped to an organization, or to all of them when `global`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub organization_id: String,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub status: EntityStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage collaborator consulted by the gate.
///
/// Lookups are keyed by `(organization, name)` the same way across all
/// entity kinds; organizations are keyed by `(name, name)`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_organization(&self, name: &str, filter: Filter) -> StoreResult<Organization>;

    async fn get_service_account(
        &self,
        organization_id: &str,
        name: &str,
        filter: Filter,
    ) -> StoreResult<ServiceAccount>;

    async fn list_policies(&self, filter: Filter) -> StoreResult<Vec<Policy>>;

    async fn put_organization(&self, organization: Organization) -> StoreResult<()>;

    async fn put_service_account(&self, account: ServiceAccount) -> StoreResult<()>;

    async fn put_policy(&self, policy: Policy) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}
