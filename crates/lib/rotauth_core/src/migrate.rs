//! Database migration support.
//!
//! Embeds and runs SQL migrations from `rotauth_core/migrations/`.

use sqlx::PgPool;

use crate::store::StoreError;

/// Run all embedded database migrations against the given pool.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
