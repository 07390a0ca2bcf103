//! Token issuance and rotation.
//!
//! Signed session tokens (HS256 JWTs), opaque renewal tokens, and the
//! coordinator that exchanges an expired pair for a fresh one.

pub mod claims;
pub mod coordinator;
pub mod jwt;
pub mod password;
pub mod renewal;
pub mod result;
pub mod service;

use thiserror::Error;

use crate::store::StoreError;

/// Signed-token errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Every validation failure collapses into this variant.
    #[error("Invalid token")]
    Invalid,

    #[error("Token encoding failed: {0}")]
    Encode(String),
}

/// Faults the coordinator cannot turn into an [`result::ActionResult`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// A token signed by this system lacks a claim it always carries.
    #[error("Validated token is missing the '{0}' claim")]
    MissingClaim(&'static str),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
