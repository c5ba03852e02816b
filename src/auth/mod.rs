// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Establishes who is calling. Two paths lead to a [`Principal`]:
//!
//! ## Session cookie (human users)
//!
//! 1. Browser presents the session cookie set by the session proxy
//! 2. The whole `Cookie` header is forwarded to the proxy auth endpoint
//! 3. `202 Accepted` plus `X-Auth-Request-Email` → `User` principal with no
//!    organization yet (resolved during authorization)
//!
//! ## Bearer token (service accounts, bootstrap)
//!
//! 1. Caller sends `Authorization: Bearer <RSA-signed JWT>`
//! 2. The unverified `iss` claim picks the key:
//!    - bootstrap user name → bootstrap public key on disk
//!    - `<organization>/<name>` → the service account's stored key
//! 3. Signature (RS256/RS384/RS512 only), `exp` and `nbf` are verified
//! 4. The principal comes from the trusted record, never from claims
//!
//! ## Security
//!
//! - Failure details are logged, responses carry a generic body
//! - Clock skew tolerance is 60 seconds
//! - `IDENTITY_SKIP_AUTH` disables all of this and must never reach production

pub mod bootstrap;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod principal;
pub mod session;
pub mod token;

pub use bootstrap::BootstrapConfig;
pub use error::AuthError;
pub use extractor::Auth;
pub use identity::BearerAuthenticator;
pub use principal::{Authenticated, Principal, PrincipalKind};
pub use session::{CookieAuthenticator, HttpSessionProxy, SessionProxy};
