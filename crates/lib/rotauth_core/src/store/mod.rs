//! Account and identity storage.
//!
//! The coordinator only talks to these traits. Two implementations ship with
//! the crate: [`memory::MemoryStore`] and [`postgres::PgStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::account::{FieldError, Principal, RenewalToken};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Password error: {0}")]
    Password(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Outcome of [`AccountStore::replace_renewal_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// The old token was removed and the new one stored.
    Replaced,
    /// The old token was no longer present; nothing changed.
    Missing,
}

/// Lookup and renewal-token persistence for accounts.
#[async_trait]
pub trait AccountStore<A: Principal>: Send + Sync {
    /// Find an account by email without loading its renewal tokens.
    async fn find_by_email(&self, email: &str) -> Result<Option<A>, StoreError>;

    /// Find an account by user name without loading its renewal tokens.
    async fn find_by_user_name(&self, user_name: &str) -> Result<Option<A>, StoreError>;

    /// Find an account by email together with its renewal tokens.
    async fn find_by_email_with_renewal_tokens(
        &self,
        email: &str,
    ) -> Result<Option<A>, StoreError>;

    /// Append `token` to the account's collection, assigning it an id.
    async fn append_renewal_token(
        &self,
        email: &str,
        token: RenewalToken,
    ) -> Result<(), StoreError>;

    /// Atomically remove the token with id `old_token_id` and append
    /// `new_token`. Returns [`Replacement::Missing`] without changing anything
    /// if the old token is already gone.
    async fn replace_renewal_token(
        &self,
        email: &str,
        old_token_id: &str,
        new_token: RenewalToken,
    ) -> Result<Replacement, StoreError>;
}

/// Password verification and account creation.
#[async_trait]
pub trait IdentityStore<A: Principal>: Send + Sync {
    /// Check `password` against the account's stored credential. Unknown
    /// accounts verify as `false`.
    async fn verify_password(&self, account: &A, password: &str) -> Result<bool, StoreError>;

    /// Create the account with `password`. Rule violations come back as field
    /// errors (empty = created).
    async fn create_account(
        &self,
        account: &A,
        password: &str,
    ) -> Result<Vec<FieldError>, StoreError>;
}
