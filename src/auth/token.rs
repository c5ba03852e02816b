// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token parsing and RSA signature verification.
//!
//! ## Two-phase protocol
//!
//! The key that verifies a token is chosen by the token's own issuer claim,
//! so the issuer has to be read before the signature can be checked:
//!
//! 1. [`read_unverified_issuer`] decodes the claims without verification and
//!    keeps nothing but `iss`, wrapped in [`UnverifiedIssuer`].
//! 2. [`verify_signature`] checks the signature against the resolved key and
//!    yields a [`VerifiedToken`] proof. No claim is read in this phase.
//!
//! Only RS256/RS384/RS512 are accepted. Any other `alg` is rejected before
//! the key is even consulted.

use base64ct::{Base64, Encoding};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::AuthError;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// The asymmetric RSA family every token must be signed with.
pub const ACCEPTED_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Issuer claim read from a token whose signature has not been checked.
///
/// Good for one thing: choosing which key to verify with.
#[derive(Debug)]
pub struct UnverifiedIssuer(String);

impl UnverifiedIssuer {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Proof that a token's signature and time claims checked out.
#[derive(Debug)]
pub struct VerifiedToken {
    _private: (),
}

#[derive(Deserialize)]
struct IssuerOnly {
    #[serde(default)]
    iss: Option<String>,
}

/// Split an `Authorization` header value into its bearer token.
///
/// The scheme is matched case-insensitively.
pub fn parse_bearer(header_value: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header_value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Phase one: read `iss` without verifying anything.
pub fn read_unverified_issuer(token: &str) -> Result<UnverifiedIssuer, AuthError> {
    let data = jsonwebtoken::dangerous::insecure_decode::<IssuerOnly>(token)
        .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

    match data.claims.iss {
        Some(iss) if !iss.is_empty() => {
            tracing::debug!(issuer = %iss, "Identified issuer from unverified token");
            Ok(UnverifiedIssuer(iss))
        }
        _ => Err(AuthError::MissingIssuer),
    }
}

/// Decode a base64-encoded PEM RSA public key.
///
/// Whitespace inside the base64 text (line wrapping) is ignored.
pub fn decode_public_key(encoded: &str) -> Result<DecodingKey, AuthError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let pem = Base64::decode_vec(&compact)
        .map_err(|e| AuthError::InvalidKeyMaterial(format!("base64: {e}")))?;
    DecodingKey::from_rsa_pem(&pem).map_err(|e| AuthError::InvalidKeyMaterial(e.to_string()))
}

/// Phase two: verify signature, expiry and not-before against `key`.
pub fn verify_signature(token: &str, key: &DecodingKey) -> Result<VerifiedToken, AuthError> {
    let header = decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;

    if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
        return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
    }

    let mut validation = Validation::new(header.alg);
    validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
    validation.leeway = CLOCK_SKEW_LEEWAY;
    // Tokens are self-issued by service accounts: `exp` and `nbf` are checked
    // when present, audience is not part of the contract.
    validation.required_spec_claims.clear();
    validation.validate_nbf = true;
    validation.validate_aud = false;

    decode::<serde::de::IgnoredAny>(token, key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)),
        _ => AuthError::MalformedToken(e.to_string()),
    })?;

    Ok(VerifiedToken { _private: () })
}

#[cfg(test)]
pub(crate) mod test_keys {
    use base64ct::{Base64, Encoding};
    use jsonwebtoken::{encode, get_current_timestamp, Algorithm, EncodingKey, Header};
    use serde_json::json;

    pub const RSA_PRIVATE: &str = include_str!("../../tests/fixtures/rsa_private.pem");
    pub const RSA_PUBLIC: &str = include_str!("../../tests/fixtures/rsa_public.pem");
    pub const OTHER_RSA_PRIVATE: &str = include_str!("../../tests/fixtures/rsa_other_private.pem");
    pub const EC_PRIVATE: &str = include_str!("../../tests/fixtures/ec_private.pem");

    /// Public key as stored on a service account record.
    pub fn public_key_b64() -> String {
        Base64::encode_string(RSA_PUBLIC.as_bytes())
    }

    pub fn rsa_token(alg: Algorithm, private_pem: &str, iss: &str, exp_offset: i64) -> String {
        let exp = get_current_timestamp() as i64 + exp_offset;
        let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
        encode(&Header::new(alg), &json!({ "iss": iss, "exp": exp }), &key).unwrap()
    }

    pub fn signed_token(iss: &str) -> String {
        rsa_token(Algorithm::RS256, RSA_PRIVATE, iss, 3600)
    }
}
