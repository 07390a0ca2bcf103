//! Signed session tokens.
//!
//! Tokens are HS256 JWTs carrying the principal's claims plus `exp`, `nbf`,
//! `iss` and `aud`. Validation is only used on the renewal path, so expiry is
//! not checked there.

use std::fs::OpenOptions;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::TokenError;
use super::claims::{AUDIENCE_CLAIM, ClaimSet, EXPIRY_CLAIM, ISSUER_CLAIM, NOT_BEFORE_CLAIM};
use crate::clock::Clock;
use crate::config::AuthConfig;

/// Generates and validates signed session tokens.
pub trait JwtHandler: Send + Sync {
    /// Sign `claims` after adding `exp`, `nbf`, `iss` and `aud`.
    fn generate(&self, claims: ClaimSet) -> Result<String, TokenError>;

    /// Verify signature, algorithm, issuer and audience of a possibly expired
    /// token and return its claims.
    fn validate_expired(&self, token: &str) -> Result<ClaimSet, TokenError>;
}

/// HS256 implementation of [`JwtHandler`] keyed by a shared secret.
pub struct HmacJwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    lifetime_secs: i64,
    clock: Arc<dyn Clock>,
}

impl HmacJwtHandler {
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        lifetime_secs: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime_secs,
            clock,
        }
    }

    pub fn from_config(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.signing_secret.as_bytes(),
            config.issuer.clone(),
            config.audience.clone(),
            config.signed_token_lifetime_secs,
            clock,
        )
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&[EXPIRY_CLAIM, ISSUER_CLAIM, AUDIENCE_CLAIM]);
        validation
    }
}

impl JwtHandler for HmacJwtHandler {
    fn generate(&self, mut claims: ClaimSet) -> Result<String, TokenError> {
        let now = self.clock.now();
        let expiry = now
            .checked_add(self.lifetime_secs)
            .ok_or_else(|| TokenError::Encode("token expiry out of range".to_string()))?;
        claims.insert(EXPIRY_CLAIM, expiry.to_string());
        claims.insert(NOT_BEFORE_CLAIM, now.to_string());
        claims.insert(ISSUER_CLAIM, self.issuer.as_str());
        claims.insert(AUDIENCE_CLAIM, self.audience.as_str());

        encode(
            &Header::new(Algorithm::HS256),
            &claims.to_payload(),
            &self.encoding_key,
        )
        .map_err(|e| TokenError::Encode(format!("jwt encode: {e}")))
    }

    fn validate_expired(&self, token: &str) -> Result<ClaimSet, TokenError> {
        if token.trim().is_empty() {
            debug!("rejected empty signed token");
            return Err(TokenError::Invalid);
        }
        decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation())
            .map(|data| ClaimSet::from_payload(data.claims))
            .map_err(|e| {
                debug!(reason = ?e.kind(), "rejected signed token");
                TokenError::Invalid
            })
    }
}

/// Generate a random 64-character alphanumeric signing secret.
pub fn generate_signing_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Resolve the signing secret through `lookup`: `ROTAUTH_SIGNING_SECRET` →
/// `JWT_SECRET` → persisted file.
pub fn resolve_signing_secret_with(lookup: impl Fn(&str) -> Option<String>) -> String {
    for var in ["ROTAUTH_SIGNING_SECRET", "JWT_SECRET"] {
        if let Some(secret) = lookup(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    load_or_create_secret(&signing_secret_path())
}

/// Read the secret stored at `path`, or generate one and persist it there.
pub fn load_or_create_secret(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret = generate_signing_secret();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match write_secret(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new signing secret"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not persist signing secret"),
    }
    secret
}

/// Write `secret` to `path`, readable by the owner only on unix.
fn write_secret(path: &Path, secret: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path)?.write_all(secret.as_bytes())
}

/// Path to the persisted signing secret file.
fn signing_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rotauth")
        .join("signing-secret")
}
