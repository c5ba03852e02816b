// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Translation of an HTTP request into a policy request.
//!
//! The gate sits behind a reverse proxy that rewrites the visible request, so
//! the original method and URI arrive in headers:
//!
//! | Header | Meaning |
//! |--------|---------|
//! | `X-Original-Method` | method of the request being authorized |
//! | `X-Auth-Request-Redirect` | URI of the request being authorized |
//!
//! Resource paths are `/{version}/{resource}[/{id}...]`. Anything shorter
//! (`/`, `/{version}`, `/{special}`) is a non-resource request.

use axum::http::Method;
use serde::Serialize;
use tracing::debug;

pub const ORIGINAL_METHOD_HEADER: &str = "X-Original-Method";
pub const ORIGINAL_URI_HEADER: &str = "X-Auth-Request-Redirect";
pub const DISPATCH_ORG_HEADER: &str = "X-Dispatch-Org";

/// Resource the bootstrap identity is confined to.
pub const IAM_RESOURCE: &str = "iam";

/// Policy action derived from the original HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Get,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Map a method name. Methods outside the table have no action.
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "GET" => Some(Action::Get),
            "POST" => Some(Action::Create),
            "PUT" | "PATCH" => Some(Action::Update),
            "DELETE" => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Get => "get",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// The policy request for one HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributesRecord {
    pub subject: String,
    /// Set only for resource requests.
    pub resource: Option<String>,
    /// `None` for methods with no mapped action.
    pub action: Option<Action>,
    pub path: String,
    pub is_resource_request: bool,
}

impl AttributesRecord {
    /// Action as handed to the policy engine. Unmapped methods become `""`,
    /// which only an action wildcard matches.
    pub fn action_str(&self) -> &'static str {
        self.action.as_ref().map_or("", Action::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("subject cannot be empty")]
    EmptySubject,
    #[error("{0} header not found")]
    MissingHeader(&'static str),
}

impl AttributeError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AttributeError::EmptySubject => "empty_subject",
            AttributeError::MissingHeader(_) => "missing_header",
        }
    }
}

/// Build the policy request from the forwarded method and URI.
///
/// `method` is the method the gate itself was called with. It is only
/// logged: the action always comes from `original_method`.
pub fn extract(
    method: &Method,
    original_method: Option<&str>,
    original_uri: Option<&str>,
    subject: &str,
) -> Result<AttributesRecord, AttributeError> {
    if subject.trim().is_empty() {
        return Err(AttributeError::EmptySubject);
    }

    let original_method = original_method
        .filter(|m| !m.is_empty())
        .ok_or(AttributeError::MissingHeader(ORIGINAL_METHOD_HEADER))?;
    let action = Action::from_method(original_method);

    let path = original_uri
        .filter(|p| !p.is_empty())
        .ok_or(AttributeError::MissingHeader(ORIGINAL_URI_HEADER))?;

    debug!(%method, original_method, path, subject, "Extracting request attributes");

    let segments: Vec<&str> = strip_query(path).trim_matches('/').split('/').collect();
    if segments.len() < 2 {
        return Ok(AttributesRecord {
            subject: subject.to_string(),
            resource: None,
            action,
            path: path.to_string(),
            is_resource_request: false,
        });
    }

    // segments[0] is the API version
    Ok(AttributesRecord {
        subject: subject.to_string(),
        resource: Some(segments[1].to_string()),
        action,
        path: path.to_string(),
        is_resource_request: true,
    })
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}
