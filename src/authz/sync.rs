// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Policy Sync
//!
//! Background task that keeps the enforcer's policy set in step with the
//! entity store.
//!
//! ## Strategy
//!
//! Immediately on start, then every `interval` (default 30 s):
//! 1. List all existing policies from the store.
//! 2. Expand them into engine rules.
//! 3. Build a fresh engine and swap it in.
//!
//! A failed sweep is logged and the previous snapshot stays in effect. Policy
//! writes therefore become visible within one interval.
//!
//! ## Shutdown
//!
//! Stops when the shared `CancellationToken` fires.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::enforcer::{EnforcerError, PolicyEnforcer};
use super::policy::expand_policies;
use crate::store::{EntityStore, Filter};

pub struct PolicySync {
    store: Arc<dyn EntityStore>,
    enforcer: PolicyEnforcer,
    interval: Duration,
    store_timeout: Duration,
}

impl PolicySync {
    pub fn new(
        store: Arc<dyn EntityStore>,
        enforcer: PolicyEnforcer,
        interval: Duration,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            enforcer,
            interval,
            store_timeout,
        }
    }

    /// Run the sync loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sync.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Policy sync starting");

        loop {
            if shutdown.is_cancelled() {
                info!("Policy sync shutting down");
                return;
            }

            if let Err(e) = self.sync_once().await {
                warn!(error = %e, "Policy sync failed, keeping previous policy set");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Policy sync shutting down");
                    return;
                }
            }
        }
    }

    /// One sweep: load, expand, swap. Returns the number of rules loaded.
    pub async fn sync_once(&self) -> Result<usize, EnforcerError> {
        let policies = tokio::time::timeout(self.store_timeout, self.store.list_policies(Filter::Exists))
            .await
            .map_err(|_| EnforcerError::Timeout)??;

        let entries = expand_policies(&policies);
        let count = self.enforcer.replace(&entries).await?;

        debug!(policies = policies.len(), rules = count, "Policy set refreshed");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::failing::FailingStore;
    use crate::store::{InMemoryEntityStore, Policy, Rule};

    fn policy(name: &str, subject: &str) -> Policy {
        Policy {
            name: name.to_string(),
            organization_id: "acme".to_string(),
            global: false,
            rules: vec![Rule {
                subjects: vec![subject.to_string()],
                resources: vec!["function".to_string()],
                actions: vec!["get".to_string()],
            }],
            status: Default::default(),
        }
    }

    fn sync_for(store: Arc<dyn EntityStore>, enforcer: PolicyEnforcer) -> PolicySync {
        PolicySync::new(store, enforcer, Duration::from_millis(20), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn sync_once_loads_store_policies() {
        let store = Arc::new(InMemoryEntityStore::new());
        store.put_policy(policy("readers", "alice")).await.unwrap();
        let enforcer = PolicyEnforcer::new();

        let count = sync_for(store, enforcer.clone()).sync_once().await.unwrap();

        assert_eq!(count, 1);
        assert!(enforcer.enforce("acme", "alice", "function", "get"));
    }

    #[tokio::test]
    async fn run_picks_up_new_policies_and_stops_on_cancel() {
        let store = Arc::new(InMemoryEntityStore::new());
        let enforcer = PolicyEnforcer::new();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sync_for(store.clone(), enforcer.clone()).run(shutdown.clone()));

        store.put_policy(policy("readers", "bob")).await.unwrap();
        let mut visible = false;
        for _ in 0..50 {
            if enforcer.enforce("acme", "bob", "function", "get") {
                visible = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(visible);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn failed_sync_keeps_previous_snapshot() {
        let enforcer = PolicyEnforcer::new();
        enforcer
            .replace(&[crate::authz::PolicyEntry::new(false, "acme", "alice", "function", "get")])
            .await
            .unwrap();

        let result = sync_for(Arc::new(FailingStore::Unreachable), enforcer.clone()).sync_once().await;

        assert!(matches!(result, Err(EnforcerError::Store(_))));
        assert!(enforcer.enforce("acme", "alice", "function", "get"));
    }

    #[tokio::test]
    async fn hanging_store_times_out_and_keeps_previous_snapshot() {
        let enforcer = PolicyEnforcer::new();
        enforcer
            .replace(&[crate::authz::PolicyEntry::new(false, "acme", "alice", "function", "get")])
            .await
            .unwrap();
        let sync = PolicySync::new(
            Arc::new(FailingStore::Hanging),
            enforcer.clone(),
            Duration::from_secs(30),
            Duration::from_millis(50),
        );

        let result = sync.sync_once().await;

        assert!(matches!(result, Err(EnforcerError::Timeout)));
        assert!(enforcer.enforce("acme", "alice", "function", "get"));
    }
}
