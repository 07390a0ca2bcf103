//! Opaque renewal tokens.
//!
//! A renewal token is 32 bytes from a CSPRNG, base64 encoded, with an
//! expiration kept alongside it in storage.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::{RngCore, rng};
use sha2::{Digest, Sha256};

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::models::account::RenewalToken;

/// Number of random bytes in a renewal token.
pub const RENEWAL_TOKEN_BYTES: usize = 32;

/// Produces renewal tokens and answers expiry questions about them.
pub trait RenewalTokenGenerator: Send + Sync {
    /// A fresh, not yet persisted token (empty id).
    fn generate(&self) -> RenewalToken;

    /// True iff now ≥ the token's expiration.
    fn is_expired(&self, token: &RenewalToken) -> bool;
}

/// CSPRNG-backed [`RenewalTokenGenerator`].
pub struct DefaultRenewalTokenGenerator {
    lifetime_secs: i64,
    clock: Arc<dyn Clock>,
}

impl DefaultRenewalTokenGenerator {
    pub fn new(lifetime_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            lifetime_secs,
            clock,
        }
    }

    pub fn from_config(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.renewal_token_lifetime_secs, clock)
    }
}

impl RenewalTokenGenerator for DefaultRenewalTokenGenerator {
    fn generate(&self) -> RenewalToken {
        let mut bytes = [0u8; RENEWAL_TOKEN_BYTES];
        rng().fill_bytes(&mut bytes);
        RenewalToken {
            id: String::new(),
            token: STANDARD.encode(bytes),
            expiration: self.clock.now().saturating_add(self.lifetime_secs),
        }
    }

    fn is_expired(&self, token: &RenewalToken) -> bool {
        token.is_expired_at(self.clock.now())
    }
}

/// SHA-256 hex digest of a renewal token. Stores only ever see this form.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Compare a stored token value with a presented one.
///
/// Both sides are digested first so the comparison time depends neither on
/// the content nor on the length of the presented value.
pub fn tokens_match(stored: &str, presented: &str) -> bool {
    let a = Sha256::digest(stored.as_bytes());
    let b = Sha256::digest(presented.as_bytes());
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
