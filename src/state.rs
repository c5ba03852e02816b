// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{BearerAuthenticator, BootstrapConfig, CookieAuthenticator, SessionProxy};
use crate::authz::{Authorizer, PolicyEnforcer};
use crate::config::Config;
use crate::store::EntityStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn EntityStore>,
    pub enforcer: PolicyEnforcer,
    pub bearer: Arc<BearerAuthenticator>,
    pub cookies: CookieAuthenticator,
    pub authorizer: Authorizer,
}

impl AppState {
    /// Wire the authenticators and authorizer around one store and one
    /// (initially empty) policy enforcer.
    pub fn new(config: Config, store: Arc<dyn EntityStore>, proxy: Arc<dyn SessionProxy>) -> Self {
        let enforcer = PolicyEnforcer::new();
        let bearer = BearerAuthenticator::new(
            store.clone(),
            BootstrapConfig::new(config.bootstrap_config_path.clone()),
            config.skip_auth,
            config.upstream_timeout,
        );
        let cookies = CookieAuthenticator::new(proxy, config.skip_auth);
        let authorizer = Authorizer::new(
            store.clone(),
            enforcer.clone(),
            config.skip_auth,
            config.upstream_timeout,
        );

        Self {
            config: Arc::new(config),
            store,
            enforcer,
            bearer: Arc::new(bearer),
            cookies,
            authorizer,
        }
    }
}
