// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{http::HeaderName, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{
        health::{HealthChecks, HealthResponse, ReadyResponse},
        info::{MessageResponse, VersionResponse},
    },
    error::ErrorBody,
    state::AppState,
};

pub mod health;
pub mod iam;
pub mod info;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let iam_routes = Router::new()
        .route("/home", get(iam::home))
        .route("/auth", get(iam::auth))
        .route("/redirect", get(iam::redirect));

    let v1_routes = Router::new()
        .route("/version", get(info::version))
        .nest("/iam", iam_routes);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/", get(info::root))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        info::root,
        info::version,
        health::liveness,
        health::readiness,
        iam::home,
        iam::auth,
        iam::redirect
    ),
    components(
        schemas(
            MessageResponse,
            VersionResponse,
            HealthResponse,
            ReadyResponse,
            HealthChecks,
            ErrorBody
        )
    ),
    tags(
        (name = "Info", description = "Service information"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "IAM", description = "Authentication and authorization decisions")
    )
)]
struct ApiDoc;
