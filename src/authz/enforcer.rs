// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Policy enforcer backed by an atomically swapped snapshot.
//!
//! Readers load the current snapshot without locking. A refresh builds a
//! complete new engine off to the side and swaps it in, so an evaluation
//! never sees a half-loaded policy set.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use casbin::{CoreApi, Enforcer};
use tracing::{debug, warn};

use super::model::build_enforcer;
use super::policy::PolicyEntry;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EnforcerError {
    #[error("policy engine error: {0}")]
    Engine(#[from] casbin::Error),
    #[error("failed to list policies: {0}")]
    Store(#[from] StoreError),
    #[error("timed out listing policies")]
    Timeout,
}

struct PolicySnapshot {
    enforcer: Enforcer,
    policy_count: usize,
}

/// Shared handle to the live policy set. Clones see the same snapshot.
#[derive(Clone, Default)]
pub struct PolicyEnforcer {
    current: Arc<ArcSwapOption<PolicySnapshot>>,
}

impl PolicyEnforcer {
    /// An enforcer with no snapshot loaded. It denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the policy set with `entries`. Returns the number of rules.
    pub async fn replace(&self, entries: &[PolicyEntry]) -> Result<usize, EnforcerError> {
        let enforcer = build_enforcer(entries).await?;
        let policy_count = entries.len();
        self.current.store(Some(Arc::new(PolicySnapshot {
            enforcer,
            policy_count,
        })));
        Ok(policy_count)
    }

    /// Is `(organization, subject, resource, action)` allowed?
    ///
    /// No snapshot and engine errors both deny.
    pub fn enforce(&self, organization: &str, subject: &str, resource: &str, action: &str) -> bool {
        let guard = self.current.load();
        let Some(snapshot) = &*guard else {
            warn!("Policy enforcement requested before any policy snapshot was loaded");
            return false;
        };

        match snapshot
            .enforcer
            .enforce((organization, subject, resource, action))
        {
            Ok(allowed) => {
                debug!(organization, subject, resource, action, allowed, "Policy enforced");
                allowed
            }
            Err(e) => {
                warn!(error = %e, organization, subject, resource, action, "Policy engine error, denying");
                false
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    pub fn policy_count(&self) -> usize {
        self.current.load_full().map_or(0, |s| s.policy_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn enforcer_with(entries: Vec<PolicyEntry>) -> PolicyEnforcer {
        let enforcer = PolicyEnforcer::new();
        enforcer.replace(&entries).await.unwrap();
        enforcer
    }

    #[tokio::test]
    async fn unloaded_enforcer_denies() {
        let enforcer = PolicyEnforcer::new();
        assert!(!enforcer.is_loaded());
        assert!(!enforcer.enforce("acme", "alice", "function", "get"));
    }

    #[tokio::test]
    async fn organization_scoped_policy() {
        let enforcer =
            enforcer_with(vec![PolicyEntry::new(false, "acme", "alice", "function", "get")]).await;

        assert!(enforcer.enforce("acme", "alice", "function", "get"));
        assert!(!enforcer.enforce("other", "alice", "function", "get"));
        assert!(!enforcer.enforce("acme", "bob", "function", "get"));
        assert!(!enforcer.enforce("acme", "alice", "function", "delete"));
    }

    #[tokio::test]
    async fn global_policy_ignores_requested_organization() {
        let enforcer =
            enforcer_with(vec![PolicyEntry::new(true, "acme", "alice", "function", "get")]).await;

        assert!(enforcer.enforce("acme", "alice", "function", "get"));
        assert!(enforcer.enforce("other", "alice", "function", "get"));
        assert!(enforcer.enforce("", "alice", "function", "get"));
    }

    #[tokio::test]
    async fn wildcards_match_any_resource_and_action() {
        let enforcer = enforcer_with(vec![
            PolicyEntry::new(false, "acme", "ops", "*", "get"),
            PolicyEntry::new(false, "acme", "admin", "*", "*"),
        ])
        .await;

        assert!(enforcer.enforce("acme", "ops", "secret", "get"));
        assert!(!enforcer.enforce("acme", "ops", "secret", "delete"));
        assert!(enforcer.enforce("acme", "admin", "secret", "delete"));
    }

    #[tokio::test]
    async fn empty_action_only_matches_action_wildcard() {
        let enforcer = enforcer_with(vec![
            PolicyEntry::new(false, "acme", "alice", "function", "get"),
            PolicyEntry::new(false, "acme", "admin", "function", "*"),
        ])
        .await;

        assert!(!enforcer.enforce("acme", "alice", "function", ""));
        assert!(enforcer.enforce("acme", "admin", "function", ""));
    }

    #[tokio::test]
    async fn replace_swaps_the_whole_set() {
        let enforcer =
            enforcer_with(vec![PolicyEntry::new(false, "acme", "alice", "function", "get")]).await;
        let reader = enforcer.clone();

        enforcer
            .replace(&[PolicyEntry::new(false, "acme", "bob", "function", "get")])
            .await
            .unwrap();

        assert_eq!(reader.policy_count(), 1);
        assert!(!reader.enforce("acme", "alice", "function", "get"));
        assert!(reader.enforce("acme", "bob", "function", "get"));
    }
}
