// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Module
//!
//! Decides whether an authenticated principal may perform a request.
//!
//! - `attributes` - forwarded request → `(subject, resource, action)`
//! - `policy` / `model` - stored policies → ACL engine rules
//! - `enforcer` - lock-free snapshot of the engine, swapped on refresh
//! - `sync` - background refresh from the entity store
//! - `orchestrator` - the per-request decision

pub mod attributes;
pub mod enforcer;
pub mod model;
pub mod orchestrator;
pub mod policy;
pub mod sync;

pub use attributes::{extract, Action, AttributeError, AttributesRecord};
pub use enforcer::{EnforcerError, PolicyEnforcer};
pub use orchestrator::{Authorizer, Decision, RequestContext};
pub use policy::{expand_policies, PolicyEntry};
pub use sync::PolicySync;
