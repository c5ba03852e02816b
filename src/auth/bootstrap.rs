// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bootstrap identity configuration.
//!
//! The bootstrap directory is typically a mounted secret holding two files:
//!
//! ```text
//! /bootstrap/
//!   bootstrap_user        # issuer name the bootstrap token carries
//!   bootstrap_public_key  # base64 PEM RSA public key
//! ```
//!
//! Files are read on every lookup so that removing the secret turns
//! bootstrap mode off without a restart.

use std::path::PathBuf;

use tracing::debug;

pub const BOOTSTRAP_USER_KEY: &str = "bootstrap_user";
pub const BOOTSTRAP_PUBLIC_KEY_KEY: &str = "bootstrap_public_key";

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    dir: PathBuf,
}

impl BootstrapConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read one named key. Missing, unreadable or blank files yield `None`.
    pub async fn read_key(&self, key: &str) -> Option<String> {
        let path = self.dir.join(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => {
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Unable to read bootstrap key");
                None
            }
        }
    }

    pub async fn bootstrap_user(&self) -> Option<String> {
        self.read_key(BOOTSTRAP_USER_KEY).await
    }

    pub async fn bootstrap_public_key(&self) -> Option<String> {
        self.read_key(BOOTSTRAP_PUBLIC_KEY_KEY).await
    }
}
