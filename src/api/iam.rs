// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IAM endpoints called by the reverse proxy and by browsers.

use axum::{
    extract::{Query, State},
    http::{
        header::{HeaderName, LOCATION},
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{debug, warn};
use utoipa::IntoParams;

use super::info::MessageResponse;
use crate::auth::session::cookie_pair;
use crate::auth::Auth;
use crate::authz::{attributes::DISPATCH_ORG_HEADER, Decision, RequestContext};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RedirectParams {
    /// Where to send the browser once logged in.
    pub redirect: String,
}

#[utoipa::path(
    get,
    path = "/v1/iam/home",
    tag = "IAM",
    responses(
        (status = 200, description = "Logged in", body = MessageResponse),
        (status = 401, description = "Unauthorized - no valid session or token")
    )
)]
pub async fn home(Auth(_identity): Auth) -> Json<MessageResponse> {
    Json(MessageResponse::new("Home Page, You have already logged in"))
}

/// Authorization decision for the reverse proxy.
///
/// Reads `X-Original-Method`, `X-Auth-Request-Redirect` and `X-Dispatch-Org`.
/// On success the organization the request acts in is returned in
/// `X-Dispatch-Org`.
#[utoipa::path(
    get,
    path = "/v1/iam/auth",
    tag = "IAM",
    params(
        ("X-Original-Method" = String, Header, description = "Method of the request being authorized"),
        ("X-Auth-Request-Redirect" = String, Header, description = "URI of the request being authorized"),
        ("X-Dispatch-Org" = Option<String>, Header, description = "Organization to act in")
    ),
    responses(
        (status = 202, description = "Accepted, organization returned in X-Dispatch-Org"),
        (status = 401, description = "Unauthorized - no valid session or token"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn auth(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    Auth(identity): Auth,
) -> Response {
    let ctx = RequestContext::from_headers(&method, &headers);

    match state.authorizer.authorize(identity, &ctx).await {
        Decision::Accept { organization } => match HeaderValue::from_str(&organization) {
            Ok(value) => (
                StatusCode::ACCEPTED,
                [(HeaderName::from_static("x-dispatch-org"), value)],
            )
                .into_response(),
            Err(_) => {
                warn!(organization = %organization, "Organization is not a valid {DISPATCH_ORG_HEADER} value");
                StatusCode::FORBIDDEN.into_response()
            }
        },
        Decision::Forbid => {
            debug!(uri = ?ctx.original_uri, "Auth forbidden");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Send a logged-in browser on, carrying its session cookie.
#[utoipa::path(
    get,
    path = "/v1/iam/redirect",
    tag = "IAM",
    params(RedirectParams),
    responses(
        (status = 302, description = "Redirect to the target with the session cookie"),
        (status = 401, description = "Unauthorized - no valid session or token"),
        (status = 500, description = "No Such Cookie", body = crate::error::ErrorBody)
    )
)]
pub async fn redirect(
    State(state): State<AppState>,
    Query(params): Query<RedirectParams>,
    headers: HeaderMap,
    Auth(_identity): Auth,
) -> Result<Response, ApiError> {
    let cookie = cookie_pair(&headers, &state.config.cookie_name)
        .ok_or_else(|| ApiError::internal("No Such Cookie"))?;

    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("cookie", &cookie)
        .finish();
    let location = format!("{}?{query}", params.redirect);
    let location = HeaderValue::from_str(&location)
        .map_err(|_| ApiError::bad_request("invalid redirect target"))?;

    Ok((StatusCode::FOUND, [(LOCATION, location)]).into_response())
}
