//! # rotauth_core
//!
//! Short-lived signed session tokens, long-lived renewal tokens, and the
//! rotation protocol that exchanges an expired pair for a fresh one.

pub mod auth;
pub mod clock;
pub mod config;
pub mod migrate;
pub mod models;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
