// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded entity database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `organizations`: `(name, name)` → serialized Organization
//! - `service_accounts`: `(organization, name)` → serialized ServiceAccount
//! - `policies`: `(organization, name)` → serialized Policy
//!
//! redb is synchronous. Every operation runs on the blocking pool so callers
//! can time out a lookup without stalling a runtime worker.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

use super::{
    EntityStore, Filter, Organization, Policy, ServiceAccount, StoreError, StoreResult,
};

// =============================================================================
// Table Definitions
// =============================================================================

/// Every table maps an `(organization, name)` key to JSON bytes.
type EntityTable = TableDefinition<'static, (&'static str, &'static str), &'static [u8]>;

const ORGANIZATIONS: EntityTable = TableDefinition::new("organizations");

const SERVICE_ACCOUNTS: EntityTable = TableDefinition::new("service_accounts");

const POLICIES: EntityTable = TableDefinition::new("policies");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Serde(e) => StoreError::Serde(e),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

type DbResult<T> = Result<T, DbError>;

// =============================================================================
// RedbEntityStore
// =============================================================================

/// Durable entity store.
pub struct RedbEntityStore {
    db: Arc<Database>,
}

impl RedbEntityStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::open_inner(path)?)
    }

    fn open_inner(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORGANIZATIONS)?;
            let _ = write_txn.open_table(SERVICE_ACCOUNTS)?;
            let _ = write_txn.open_table(POLICIES)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Run `op` against the database on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> DbResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(DbError::from)?;
        Ok(result?)
    }

    async fn get<T>(&self, table: EntityTable, organization_id: &str, name: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (organization_id, name) = (organization_id.to_string(), name.to_string());
        self.blocking(move |db| read(db, table, (organization_id.as_str(), name.as_str()))).await
    }

    async fn put<T>(&self, table: EntityTable, organization_id: String, name: String, entity: T) -> StoreResult<()>
    where
        T: Serialize + Send + 'static,
    {
        self.blocking(move |db| write(db, table, (organization_id.as_str(), name.as_str()), &entity)).await
    }
}

fn read<T: DeserializeOwned>(db: &Database, table: EntityTable, key: (&str, &str)) -> DbResult<Option<T>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(table)?;
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn write<T: Serialize>(db: &Database, table: EntityTable, key: (&str, &str), entity: &T) -> DbResult<()> {
    let json = serde_json::to_vec(entity)?;
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(table)?;
        table.insert(key, json.as_slice())?;
    }
    write_txn.commit()?;
    Ok(())
}

fn scan<T: DeserializeOwned>(db: &Database, table: EntityTable) -> DbResult<Vec<T>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(table)?;
    let mut out = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        out.push(serde_json::from_slice(value.value())?);
    }
    Ok(out)
}

#[async_trait]
impl EntityStore for RedbEntityStore {
    async fn get_organization(&self, name: &str, filter: Filter) -> StoreResult<Organization> {
        self.get::<Organization>(ORGANIZATIONS, name, name)
            .await?
            .filter(|org| filter.admits(org.status))
            .ok_or_else(|| StoreError::NotFound(format!("organization {name}")))
    }

    async fn get_service_account(
        &self,
        organization_id: &str,
        name: &str,
        filter: Filter,
    ) -> StoreResult<ServiceAccount> {
        self.get::<ServiceAccount>(SERVICE_ACCOUNTS, organization_id, name)
            .await?
            .filter(|account| filter.admits(account.status))
            .ok_or_else(|| StoreError::NotFound(format!("service account {organization_id}/{name}")))
    }

    async fn list_policies(&self, filter: Filter) -> StoreResult<Vec<Policy>> {
        // Keys are `(org, name)`, so a forward scan is already ordered.
        let policies: Vec<Policy> = self.blocking(|db| scan(db, POLICIES)).await?;
        Ok(policies
            .into_iter()
            .filter(|policy| filter.admits(policy.status))
            .collect())
    }

    async fn put_organization(&self, organization: Organization) -> StoreResult<()> {
        let name = organization.name.clone();
        self.put(ORGANIZATIONS, name.clone(), name, organization).await
    }

    async fn put_service_account(&self, account: ServiceAccount) -> StoreResult<()> {
        let (organization_id, name) = (account.organization_id.clone(), account.name.clone());
        self.put(SERVICE_ACCOUNTS, organization_id, name, account).await
    }

    async fn put_policy(&self, policy: Policy) -> StoreResult<()> {
        let (organization_id, name) = (policy.organization_id.clone(), policy.name.clone());
        self.put(POLICIES, organization_id, name, policy).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.blocking(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(ORGANIZATIONS)?;
            Ok(())
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "redb"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EntityStatus, Rule};

    fn temp_db() -> (RedbEntityStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = RedbEntityStore::open(&dir.path().join("identity.redb")).unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn organization_exists_after_put() {
        let (db, _dir) = temp_db();
        db.put_organization(Organization::new("acme")).await.unwrap();

        assert_eq!(db.get_organization("acme", Filter::Exists).await.unwrap().name, "acme");
        assert!(db
            .get_organization("globex", Filter::Exists)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn service_account_lookup_by_org_and_name() {
        let (db, _dir) = temp_db();
        db.put_service_account(ServiceAccount::new("acme", "bot", "a2V5"))
            .await
            .unwrap();

        let account = db.get_service_account("acme", "bot", Filter::Exists).await.unwrap();
        assert_eq!(account.organization_id, "acme");
        assert_eq!(account.public_key, "a2V5");
    }

    #[tokio::test]
    async fn soft_deleted_entities_are_hidden() {
        let (db, _dir) = temp_db();
        let mut org = Organization::new("acme");
        org.status = EntityStatus::Deleted;
        db.put_organization(org).await.unwrap();

        assert!(db.get_organization("acme", Filter::Exists).await.is_err());
        assert!(db.get_organization("acme", Filter::Any).await.is_ok());
    }

    #[tokio::test]
    async fn list_policies_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.redb");
        {
            let db = RedbEntityStore::open(&path).unwrap();
            db.put_policy(Policy {
                name: "readers".to_string(),
                organization_id: "acme".to_string(),
                global: false,
                rules: vec![Rule {
                    subjects: vec!["alice".to_string()],
                    resources: vec!["function".to_string()],
                    actions: vec!["get".to_string()],
                }],
                status: EntityStatus::Ready,
            })
            .await
            .unwrap();
        }

        let db = RedbEntityStore::open(&path).unwrap();
        let policies = db.list_policies(Filter::Exists).await.unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].rules[0].resources, vec!["function"]);
        assert!(db.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn names_containing_slashes_do_not_collide() {
        let (db, _dir) = temp_db();
        db.put_service_account(ServiceAccount::new("a/b", "c", "Zmlyc3Q="))
            .await
            .unwrap();
        db.put_service_account(ServiceAccount::new("a", "b/c", "c2Vjb25k"))
            .await
            .unwrap();

        let first = db.get_service_account("a/b", "c", Filter::Exists).await.unwrap();
        let second = db.get_service_account("a", "b/c", Filter::Exists).await.unwrap();
        assert_eq!(first.public_key, "Zmlyc3Q=");
        assert_eq!(second.public_key, "c2Vjb25k");
    }

    #[test]
    fn open_reports_unusable_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let result = RedbEntityStore::open(&blocker.join("identity.redb"));
        assert!(matches!(result, Err(StoreError::Backend(msg)) if msg.starts_with("io error")));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn blocked_write_can_be_timed_out() {
        let (db, _dir) = temp_db();
        // redb admits one writer at a time; hold the slot.
        let held = db.db.begin_write().unwrap();

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            db.put_organization(Organization::new("acme")),
        )
        .await;
        assert!(blocked.is_err());

        drop(held);
        db.put_organization(Organization::new("globex")).await.unwrap();
        assert!(db.get_organization("globex", Filter::Exists).await.is_ok());
    }
}
