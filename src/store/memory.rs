// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory entity store.
//!
//! Not durable: everything is lost on restart. Used by tests and by the
//! `memory` database backend for local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    EntityStore, Filter, Organization, Policy, ServiceAccount, StoreError, StoreResult,
};

type Key = (String, String);

#[derive(Default)]
pub struct InMemoryEntityStore {
    organizations: RwLock<HashMap<String, Organization>>,
    service_accounts: RwLock<HashMap<Key, ServiceAccount>>,
    policies: RwLock<HashMap<Key, Policy>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn get_organization(&self, name: &str, filter: Filter) -> StoreResult<Organization> {
        self.organizations
            .read()
            .await
            .get(name)
            .filter(|org| filter.admits(org.status))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("organization {name}")))
    }

    async fn get_service_account(
        &self,
        organization_id: &str,
        name: &str,
        filter: Filter,
    ) -> StoreResult<ServiceAccount> {
        let key = (organization_id.to_string(), name.to_string());
        self.service_accounts
            .read()
            .await
            .get(&key)
            .filter(|account| filter.admits(account.status))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("service account {organization_id}/{name}")))
    }

    async fn list_policies(&self, filter: Filter) -> StoreResult<Vec<Policy>> {
        let mut policies: Vec<Policy> = self
            .policies
            .read()
            .await
            .values()
            .filter(|policy| filter.admits(policy.status))
            .cloned()
            .collect();
        policies.sort_by(|a, b| {
            (&a.organization_id, &a.name).cmp(&(&b.organization_id, &b.name))
        });
        Ok(policies)
    }

    async fn put_organization(&self, organization: Organization) -> StoreResult<()> {
        self.organizations
            .write()
            .await
            .insert(organization.name.clone(), organization);
        Ok(())
    }

    async fn put_service_account(&self, account: ServiceAccount) -> StoreResult<()> {
        let key = (account.organization_id.clone(), account.name.clone());
        self.service_accounts.write().await.insert(key, account);
        Ok(())
    }

    async fn put_policy(&self, policy: Policy) -> StoreResult<()> {
        let key = (policy.organization_id.clone(), policy.name.clone());
        self.policies.write().await.insert(key, policy);
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
