// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `IDENTITY_COOKIE_NAME` | Session cookie set by the session proxy | `_oauth2_proxy` |
//! | `IDENTITY_SKIP_AUTH` | Disable authentication and authorization (unsafe) | `false` |
//! | `IDENTITY_BOOTSTRAP_CONFIG_PATH` | Directory with `bootstrap_user` / `bootstrap_public_key` | `/bootstrap` |
//! | `IDENTITY_DB_BACKEND` | Entity store backend (`redb` or `memory`) | `redb` |
//! | `IDENTITY_DB_FILE` | redb database file | `./identity.redb` |
//! | `IDENTITY_RESYNC_PERIOD` | Policy refresh interval in seconds | `30` |
//! | `IDENTITY_OAUTH2_PROXY_AUTH_URL` | Session proxy auth endpoint | `http://localhost:4180/v1/iam/oauth2/auth` |
//! | `IDENTITY_SERVICE_ACCOUNT_DOMAIN` | Default service account domain | `svc.dispatch.local` |
//! | `IDENTITY_TRACER` | OTLP (gRPC) collector endpoint spans are exported to | unset |
//! | `IDENTITY_UPSTREAM_TIMEOUT` | Session proxy and store timeout in seconds | `10` |
//! | `IDENTITY_SEED_FILE` | JSON seed applied to the store at startup | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const COOKIE_NAME_ENV: &str = "IDENTITY_COOKIE_NAME";
pub const SKIP_AUTH_ENV: &str = "IDENTITY_SKIP_AUTH";
pub const BOOTSTRAP_CONFIG_PATH_ENV: &str = "IDENTITY_BOOTSTRAP_CONFIG_PATH";
pub const DB_BACKEND_ENV: &str = "IDENTITY_DB_BACKEND";
pub const DB_FILE_ENV: &str = "IDENTITY_DB_FILE";
pub const RESYNC_PERIOD_ENV: &str = "IDENTITY_RESYNC_PERIOD";
pub const OAUTH2_PROXY_AUTH_URL_ENV: &str = "IDENTITY_OAUTH2_PROXY_AUTH_URL";
pub const SERVICE_ACCOUNT_DOMAIN_ENV: &str = "IDENTITY_SERVICE_ACCOUNT_DOMAIN";
pub const TRACER_ENV: &str = "IDENTITY_TRACER";
pub const UPSTREAM_TIMEOUT_ENV: &str = "IDENTITY_UPSTREAM_TIMEOUT";
pub const SEED_FILE_ENV: &str = "IDENTITY_SEED_FILE";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected json or pretty, got {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbBackend {
    #[default]
    Redb,
    Memory,
}

impl FromStr for DbBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redb" => Ok(DbBackend::Redb),
            "memory" => Ok(DbBackend::Memory),
            other => Err(format!("expected redb or memory, got {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cookie_name: String,
    /// Development only. Every request is accepted.
    pub skip_auth: bool,
    pub bootstrap_config_path: PathBuf,
    pub db_backend: DbBackend,
    pub db_file: PathBuf,
    pub resync_period: Duration,
    pub oauth2_proxy_auth_url: String,
    pub service_account_domain: String,
    pub tracer: Option<String>,
    pub upstream_timeout: Duration,
    pub seed_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cookie_name: "_oauth2_proxy".to_string(),
            skip_auth: false,
            bootstrap_config_path: PathBuf::from("/bootstrap"),
            db_backend: DbBackend::Redb,
            db_file: PathBuf::from("./identity.redb"),
            resync_period: Duration::from_secs(30),
            oauth2_proxy_auth_url: "http://localhost:4180/v1/iam/oauth2/auth".to_string(),
            service_account_domain: "svc.dispatch.local".to_string(),
            tracer: None,
            upstream_timeout: Duration::from_secs(10),
            seed_file: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unset or blank variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Config::default();

        if let Some(host) = var(HOST_ENV) {
            config.host = host;
        }
        if let Some(port) = var(PORT_ENV) {
            config.port = parse(PORT_ENV, &port)?;
        }
        if let Some(name) = var(COOKIE_NAME_ENV) {
            config.cookie_name = name;
        }
        if let Some(skip) = var(SKIP_AUTH_ENV) {
            config.skip_auth = parse_bool(SKIP_AUTH_ENV, &skip)?;
        }
        if let Some(path) = var(BOOTSTRAP_CONFIG_PATH_ENV) {
            config.bootstrap_config_path = PathBuf::from(path);
        }
        if let Some(backend) = var(DB_BACKEND_ENV) {
            config.db_backend = parse(DB_BACKEND_ENV, &backend)?;
        }
        if let Some(file) = var(DB_FILE_ENV) {
            config.db_file = PathBuf::from(file);
        }
        if let Some(period) = var(RESYNC_PERIOD_ENV) {
            config.resync_period = parse_seconds(RESYNC_PERIOD_ENV, &period)?;
        }
        if let Some(url) = var(OAUTH2_PROXY_AUTH_URL_ENV) {
            url::Url::parse(&url).map_err(|e| invalid(OAUTH2_PROXY_AUTH_URL_ENV, &url, e))?;
            config.oauth2_proxy_auth_url = url;
        }
        if let Some(domain) = var(SERVICE_ACCOUNT_DOMAIN_ENV) {
            config.service_account_domain = domain;
        }
        config.tracer = var(TRACER_ENV);
        if let Some(timeout) = var(UPSTREAM_TIMEOUT_ENV) {
            config.upstream_timeout = parse_seconds(UPSTREAM_TIMEOUT_ENV, &timeout)?;
        }
        config.seed_file = var(SEED_FILE_ENV).map(PathBuf::from);
        if let Some(format) = var(LOG_FORMAT_ENV) {
            config.log_format = parse(LOG_FORMAT_ENV, &format)?;
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn invalid(name: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| invalid(name, value, e))
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value, "expected a boolean")),
    }
}

fn parse_seconds(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match parse::<u64>(name, value)? {
        0 => Err(invalid(name, value, "must be greater than zero")),
        secs => Ok(Duration::from_secs(secs)),
    }
}
