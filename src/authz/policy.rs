// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Flattening of stored policies into engine rules.

use std::collections::BTreeSet;

use crate::store::Policy;

/// One allow rule as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolicyEntry {
    pub global: bool,
    pub organization: String,
    pub subject: String,
    pub resource: String,
    pub action: String,
}

impl PolicyEntry {
    pub fn new(
        global: bool,
        organization: impl Into<String>,
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            global,
            organization: organization.into(),
            subject: subject.into(),
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Engine representation: `[global, org, sub, res, act]`.
    pub fn to_rule(&self) -> Vec<String> {
        vec![
            if self.global { "y" } else { "n" }.to_string(),
            self.organization.clone(),
            self.subject.clone(),
            self.resource.clone(),
            self.action.clone(),
        ]
    }
}

/// Expand every rule of every policy into subject × resource × action
/// entries. The result is sorted and free of duplicates.
pub fn expand_policies<'a>(policies: impl IntoIterator<Item = &'a Policy>) -> Vec<PolicyEntry> {
    let mut entries = BTreeSet::new();
    for policy in policies {
        for rule in &policy.rules {
            for subject in &rule.subjects {
                for resource in &rule.resources {
                    for action in &rule.actions {
                        entries.insert(PolicyEntry::new(
                            policy.global,
                            &policy.organization_id,
                            subject,
                            resource,
                            action,
                        ));
                    }
                }
            }
        }
    }
    entries.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Rule;

    fn policy(name: &str, global: bool, rules: Vec<Rule>) -> Policy {
        Policy {
            name: name.to_string(),
            organization_id: "acme".to_string(),
            global,
            rules,
            status: Default::default(),
        }
    }

    fn rule(subjects: &[&str], resources: &[&str], actions: &[&str]) -> Rule {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        Rule {
            subjects: owned(subjects),
            resources: owned(resources),
            actions: owned(actions),
        }
    }

    #[test]
    fn rules_expand_to_cartesian_product() {
        let p = policy(
            "devs",
            false,
            vec![rule(&["alice", "bob"], &["function", "image"], &["get", "create"])],
        );
        let entries = expand_policies([&p]);
        assert_eq!(entries.len(), 8);
        assert!(entries.contains(&PolicyEntry::new(false, "acme", "bob", "image", "create")));
    }

    #[test]
    fn duplicates_across_policies_collapse() {
        let a = policy("a", false, vec![rule(&["alice"], &["*"], &["*"])]);
        let b = policy("b", false, vec![rule(&["alice"], &["*"], &["*"]), rule(&["alice"], &["*"], &["*"])]);
        assert_eq!(expand_policies([&a, &b]).len(), 1);
    }

    #[test]
    fn global_flag_is_carried() {
        let p = policy("admins", true, vec![rule(&["root"], &["*"], &["*"])]);
        let entries = expand_policies([&p]);
        assert_eq!(entries[0].to_rule(), vec!["y", "acme", "root", "*", "*"]);
    }

    #[test]
    fn empty_rule_lists_yield_nothing() {
        let p = policy("empty", false, vec![rule(&["alice"], &[], &["get"])]);
        assert!(expand_policies([&p]).is_empty());
    }
}
