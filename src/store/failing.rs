// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Store doubles for outage paths.

use async_trait::async_trait;

use super::{EntityStore, Filter, Organization, Policy, ServiceAccount, StoreError, StoreResult};

pub(crate) enum FailingStore {
    /// Every call returns a backend error.
    Unreachable,
    /// Every call waits forever.
    Hanging,
}

impl FailingStore {
    async fn fail<T>(&self) -> StoreResult<T> {
        match self {
            FailingStore::Unreachable => Err(StoreError::Backend("connection refused".to_string())),
            FailingStore::Hanging => std::future::pending().await,
        }
    }
}

#[async_trait]
impl EntityStore for FailingStore {
    async fn get_organization(&self, _name: &str, _filter: Filter) -> StoreResult<Organization> {
        self.fail().await
    }

    async fn get_service_account(
        &self,
        _organization_id: &str,
        _name: &str,
        _filter: Filter,
    ) -> StoreResult<ServiceAccount> {
        self.fail().await
    }

    async fn list_policies(&self, _filter: Filter) -> StoreResult<Vec<Policy>> {
        self.fail().await
    }

    async fn put_organization(&self, _organization: Organization) -> StoreResult<()> {
        self.fail().await
    }

    async fn put_service_account(&self, _account: ServiceAccount) -> StoreResult<()> {
        self.fail().await
    }

    async fn put_policy(&self, _policy: Policy) -> StoreResult<()> {
        self.fail().await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.fail().await
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}
