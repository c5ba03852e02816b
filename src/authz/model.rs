// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ACL model for the policy engine.
//!
//! Request: `<requested org> <subject> <resource> <action>`.
//! Policy: `<global?> <policy org> <subject> <resource> <action>`.
//!
//! A global policy (`y`) matches any requested organization. Otherwise the
//! requested organization must equal the policy's. `*` in the resource or
//! action column matches anything. There are no deny rules.

use casbin::{CoreApi, DefaultModel, Enforcer, MemoryAdapter, MgmtApi};

use super::policy::PolicyEntry;

pub const MODEL_CONF: &str = r#"
[request_definition]
r = org, sub, res, act

[policy_definition]
p = global, org, sub, res, act

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = (p.global == "y" || r.org == p.org) && r.sub == p.sub && (r.res == p.res || p.res == "*") && (r.act == p.act || p.act == "*")
"#;

/// Build an in-memory enforcer holding exactly `entries`.
///
/// Entries must be unique: the engine refuses a batch containing a rule it
/// already holds.
pub async fn build_enforcer(entries: &[PolicyEntry]) -> casbin::Result<Enforcer> {
    let model = DefaultModel::from_str(MODEL_CONF).await?;
    let mut enforcer = Enforcer::new(model, MemoryAdapter::default()).await?;

    if !entries.is_empty() {
        let rules = entries.iter().map(PolicyEntry::to_rule).collect();
        enforcer.add_policies(rules).await?;
    }

    Ok(enforcer)
}
