//! PostgreSQL account and identity store.
//!
//! Renewal-token replacement runs in a transaction whose first statement
//! deletes the old row. Concurrent transactions deleting the same row
//! serialize on its row lock, and only the first sees a deleted row.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{AccountStore, IdentityStore, Replacement, StoreError};
use crate::auth::password::{self, BCRYPT_COST, PasswordPolicy};
use crate::models::account::{Account, FieldError, RenewalToken};
use crate::uuid::uuidv7;

type AccountRow = (String, String, String, String, String);

/// sqlx-backed store for [`Account`]s.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    policy: PasswordPolicy,
    bcrypt_cost: u32,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            policy: PasswordPolicy::default(),
            bcrypt_cost: BCRYPT_COST,
        }
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    async fn fetch_account(&self, column: &str, value: &str) -> Result<Option<Account>, StoreError> {
        // `column` is always one of two literals below.
        let sql = format!(
            "SELECT id::text, user_name, email, first_name, last_name \
             FROM accounts WHERE {column} = $1 \
             ORDER BY created_at LIMIT 1"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(account_from_row))
    }

    async fn password_hash(&self, email: &str) -> Result<Option<String>, StoreError> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hash)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

fn account_from_row((id, user_name, email, first_name, last_name): AccountRow) -> Account {
    Account {
        id,
        user_name,
        email,
        first_name,
        last_name,
        renewal_tokens: Vec::new(),
    }
}

#[async_trait]
impl AccountStore<Account> for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_account("email", email).await
    }

    async fn find_by_user_name(&self, user_name: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_account("user_name", user_name).await
    }

    async fn find_by_email_with_renewal_tokens(
        &self,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        let Some(mut account) = self.find_by_email(email).await? else {
            return Ok(None);
        };
        let rows = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT id::text, token_hash, expiration FROM renewal_tokens \
             WHERE account_id = $1::uuid ORDER BY id",
        )
        .bind(&account.id)
        .fetch_all(&self.pool)
        .await?;
        account.renewal_tokens = rows
            .into_iter()
            .map(|(id, token, expiration)| RenewalToken {
                id,
                token,
                expiration,
            })
            .collect();
        Ok(Some(account))
    }

    async fn append_renewal_token(
        &self,
        email: &str,
        token: RenewalToken,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO renewal_tokens (id, account_id, token_hash, expiration) \
             SELECT $1, a.id, $3, $4 FROM accounts a WHERE a.email = $2",
        )
        .bind(uuidv7())
        .bind(email)
        .bind(&token.token)
        .bind(token.expiration)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(email.to_string()));
        }
        Ok(())
    }

    async fn replace_renewal_token(
        &self,
        email: &str,
        old_token_id: &str,
        new_token: RenewalToken,
    ) -> Result<Replacement, StoreError> {
        let mut tx = self.pool.begin().await?;

        let account_id = sqlx::query_scalar::<_, String>(
            "DELETE FROM renewal_tokens rt USING accounts a \
             WHERE rt.account_id = a.id AND a.email = $1 AND rt.id = $2::uuid \
             RETURNING a.id::text",
        )
        .bind(email)
        .bind(old_token_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(account_id) = account_id else {
            tx.rollback().await?;
            debug!(email, "renewal token already consumed");
            return Ok(Replacement::Missing);
        };

        sqlx::query(
            "INSERT INTO renewal_tokens (id, account_id, token_hash, expiration) \
             VALUES ($1, $2::uuid, $3, $4)",
        )
        .bind(uuidv7())
        .bind(&account_id)
        .bind(&new_token.token)
        .bind(new_token.expiration)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Replacement::Replaced)
    }
}

#[async_trait]
impl IdentityStore<Account> for PgStore {
    async fn verify_password(&self, account: &Account, password: &str) -> Result<bool, StoreError> {
        match self.password_hash(&account.email).await? {
            Some(hash) => password::verify_password(password, &hash),
            None => Ok(false),
        }
    }

    async fn create_account(
        &self,
        account: &Account,
        password: &str,
    ) -> Result<Vec<FieldError>, StoreError> {
        let mut errors = Vec::new();
        if self.email_exists(&account.email).await? {
            errors.push(password::duplicate_email(&account.email));
        }
        errors.extend(self.policy.check(password));
        if !errors.is_empty() {
            return Ok(errors);
        }

        let password_hash = password::hash_password(password, self.bcrypt_cost)?;
        let inserted = sqlx::query(
            "INSERT INTO accounts (id, email, user_name, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (email) DO NOTHING",
        )
        .bind(uuidv7())
        .bind(&account.email)
        .bind(&account.user_name)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&password_hash)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(vec![password::duplicate_email(&account.email)]);
        }
        Ok(Vec::new())
    }
}
