// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use identity_gate::{
    api::router,
    auth::HttpSessionProxy,
    authz::PolicySync,
    config::{Config, DbBackend},
    state::AppState,
    store::{seed::load_seed_file, EntityStore, InMemoryEntityStore, RedbEntityStore},
    telemetry::init_tracing,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let telemetry = init_tracing(config.log_format, config.tracer.as_deref());

    let code = match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Identity gate failed");
            ExitCode::FAILURE
        }
    };
    telemetry.shutdown();
    code
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.skip_auth {
        warn!("IDENTITY_SKIP_AUTH is set: every request will be accepted. Never use this in production.");
    }
    if let Some(tracer) = &config.tracer {
        info!(endpoint = %tracer, "Exporting spans to OTLP collector");
    }

    let store: Arc<dyn EntityStore> = match config.db_backend {
        DbBackend::Redb => Arc::new(RedbEntityStore::open(&config.db_file)?),
        DbBackend::Memory => Arc::new(InMemoryEntityStore::new()),
    };
    info!(backend = store.backend_name(), "Entity store opened");

    if let Some(seed_file) = &config.seed_file {
        load_seed_file(seed_file, &*store, &config.service_account_domain).await?;
    }

    let proxy = HttpSessionProxy::new(config.oauth2_proxy_auth_url.clone(), config.upstream_timeout)?;
    info!(url = proxy.auth_url(), "Session proxy configured");

    let addr = config.bind_address();
    let resync_period = config.resync_period;
    let upstream_timeout = config.upstream_timeout;
    let state = AppState::new(config, store.clone(), Arc::new(proxy));

    let shutdown = CancellationToken::new();
    let sync = PolicySync::new(store, state.enforcer.clone(), resync_period, upstream_timeout);
    let sync_handle = tokio::spawn(sync.run(shutdown.clone()));

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Identity gate listening (docs at /docs)");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => {
                    error!(error = %e, "Failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
            }
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = sync_handle.await {
        warn!(error = %e, "Policy sync task ended abnormally");
    }
    info!("Identity gate stopped");
    Ok(())
}
