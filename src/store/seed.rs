// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Startup seeding of the entity store from a JSON document.
//!
//! The CRUD API that normally owns these records lives elsewhere; the seed
//! file lets an operator stand the gate up with a known tenant layout.
//!
//! ```json
//! {
//!   "organizations": [{ "name": "acme" }],
//!   "service_accounts": [{ "name": "ci", "organization_id": "acme", "public_key": "<base64 PEM>" }],
//!   "policies": [{ "name": "ci-read", "organization_id": "acme",
//!                  "rules": [{ "subjects": ["ci"], "resources": ["*"], "actions": ["get"] }] }]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::{EntityStore, Organization, Policy, ServiceAccount, StoreError, StoreResult};

#[derive(Debug, Default, Deserialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub service_accounts: Vec<ServiceAccount>,
    #[serde(default)]
    pub policies: Vec<Policy>,
}

/// Counts of records written by a seed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub organizations: usize,
    pub service_accounts: usize,
    pub policies: usize,
}

/// Read `path` and write its contents into `store`.
pub async fn load_seed_file(
    path: &Path,
    store: &dyn EntityStore,
    default_domain: &str,
) -> StoreResult<SeedSummary> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| StoreError::Backend(format!("reading seed file {}: {e}", path.display())))?;
    let document: SeedDocument = serde_json::from_slice(&raw)?;
    apply_seed(document, store, default_domain).await
}

/// Write every record of `document` into `store`.
///
/// Service accounts without an explicit domain get `default_domain`.
pub async fn apply_seed(
    document: SeedDocument,
    store: &dyn EntityStore,
    default_domain: &str,
) -> StoreResult<SeedSummary> {
    let mut summary = SeedSummary::default();

    for organization in document.organizations {
        store.put_organization(organization).await?;
        summary.organizations += 1;
    }

    for mut account in document.service_accounts {
        if account.domain.is_none() {
            account.domain = Some(default_domain.to_string());
        }
        store.put_service_account(account).await?;
        summary.service_accounts += 1;
    }

    for policy in document.policies {
        store.put_policy(policy).await?;
        summary.policies += 1;
    }

    info!(
        organizations = summary.organizations,
        service_accounts = summary.service_accounts,
        policies = summary.policies,
        backend = store.backend_name(),
        "Entity store seeded"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Filter, InMemoryEntityStore};

    const SEED: &str = r#"{
        "organizations": [{ "name": "acme" }],
        "service_accounts": [
            { "name": "ci", "organization_id": "acme", "public_key": "a2V5" },
            { "name": "ops", "organization_id": "acme", "public_key": "a2V5", "domain": "ops.example" }
        ],
        "policies": [{
            "name": "ci-read", "organization_id": "acme",
            "rules": [{ "subjects": ["ci"], "resources": ["*"], "actions": ["get"] }]
        }]
    }"#;

    #[tokio::test]
    async fn seed_applies_default_domain_only_when_missing() {
        let store = InMemoryEntityStore::new();
        let document: SeedDocument = serde_json::from_str(SEED).unwrap();

        let summary = apply_seed(document, &store, "svc.dispatch.local").await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                organizations: 1,
                service_accounts: 2,
                policies: 1
            }
        );

        let ci = store.get_service_account("acme", "ci", Filter::Exists).await.unwrap();
        assert_eq!(ci.domain.as_deref(), Some("svc.dispatch.local"));
        let ops = store.get_service_account("acme", "ops", Filter::Exists).await.unwrap();
        assert_eq!(ops.domain.as_deref(), Some("ops.example"));
    }

    #[tokio::test]
    async fn seed_file_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, SEED).unwrap();

        let store = InMemoryEntityStore::new();
        load_seed_file(&path, &store, "svc.dispatch.local").await.unwrap();
        assert!(store.get_organization("acme", Filter::Exists).await.is_ok());
    }

    #[tokio::test]
    async fn missing_seed_file_is_a_backend_error() {
        let store = InMemoryEntityStore::new();
        let err = load_seed_file(Path::new("/nonexistent/seed.json"), &store, "d")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
