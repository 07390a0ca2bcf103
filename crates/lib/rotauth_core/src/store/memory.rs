//! In-memory account and identity store.
//!
//! Accounts are keyed by email in a [`DashMap`]. Mutations of one account's
//! renewal tokens happen while holding that entry's shard lock, which makes
//! append and replace atomic with respect to each other.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use super::{AccountStore, IdentityStore, Replacement, StoreError};
use crate::auth::password::{self, BCRYPT_COST, PasswordPolicy};
use crate::models::account::{Account, FieldError, RenewalToken};
use crate::uuid::uuidv7;

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
    password_hash: String,
}

/// Process-local store for [`Account`]s.
#[derive(Debug)]
pub struct MemoryStore {
    accounts: DashMap<String, StoredAccount>,
    policy: PasswordPolicy,
    bcrypt_cost: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            policy: PasswordPolicy::default(),
            bcrypt_cost: BCRYPT_COST,
        }
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Lower the bcrypt cost (minimum 4). Meant for tests.
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Apply `update` to the stored account's profile. Returns false if no
    /// account has that email. The email and renewal tokens are not
    /// affected.
    pub fn update_profile(&self, email: &str, update: impl FnOnce(&mut Account)) -> bool {
        let Some(mut stored) = self.accounts.get_mut(email) else {
            return false;
        };
        let mut profile = stored.account.clone();
        update(&mut profile);
        stored.account.user_name = profile.user_name;
        stored.account.first_name = profile.first_name;
        stored.account.last_name = profile.last_name;
        true
    }

    fn without_tokens(account: &Account) -> Account {
        Account {
            renewal_tokens: Vec::new(),
            ..account.clone()
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn assign_id(mut token: RenewalToken) -> RenewalToken {
    if token.id.is_empty() {
        token.id = uuidv7().to_string();
    }
    token
}

#[async_trait]
impl AccountStore<Account> for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .get(email)
            .map(|stored| Self::without_tokens(&stored.account)))
    }

    async fn find_by_user_name(&self, user_name: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .iter()
            .find(|stored| stored.account.user_name == user_name)
            .map(|stored| Self::without_tokens(&stored.account)))
    }

    async fn find_by_email_with_renewal_tokens(
        &self,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(email).map(|stored| stored.account.clone()))
    }

    async fn append_renewal_token(
        &self,
        email: &str,
        token: RenewalToken,
    ) -> Result<(), StoreError> {
        let mut stored = self
            .accounts
            .get_mut(email)
            .ok_or_else(|| StoreError::NotFound(email.to_string()))?;
        stored.account.renewal_tokens.push(assign_id(token));
        Ok(())
    }

    async fn replace_renewal_token(
        &self,
        email: &str,
        old_token_id: &str,
        new_token: RenewalToken,
    ) -> Result<Replacement, StoreError> {
        let Some(mut stored) = self.accounts.get_mut(email) else {
            return Ok(Replacement::Missing);
        };
        let tokens = &mut stored.account.renewal_tokens;
        let Some(index) = tokens.iter().position(|t| t.id == old_token_id) else {
            debug!(email, "renewal token already consumed");
            return Ok(Replacement::Missing);
        };
        tokens.remove(index);
        tokens.push(assign_id(new_token));
        Ok(Replacement::Replaced)
    }
}

#[async_trait]
impl IdentityStore<Account> for MemoryStore {
    async fn verify_password(&self, account: &Account, password: &str) -> Result<bool, StoreError> {
        let hash = match self.accounts.get(&account.email) {
            Some(stored) => stored.password_hash.clone(),
            None => return Ok(false),
        };
        password::verify_password(password, &hash)
    }

    async fn create_account(
        &self,
        account: &Account,
        password: &str,
    ) -> Result<Vec<FieldError>, StoreError> {
        let mut errors = Vec::new();
        if self.accounts.contains_key(&account.email) {
            errors.push(password::duplicate_email(&account.email));
        }
        errors.extend(self.policy.check(password));
        if !errors.is_empty() {
            return Ok(errors);
        }

        let password_hash = password::hash_password(password, self.bcrypt_cost)?;
        match self.accounts.entry(account.email.clone()) {
            Entry::Occupied(_) => Ok(vec![password::duplicate_email(&account.email)]),
            Entry::Vacant(slot) => {
                let mut stored = Self::without_tokens(account);
                stored.id = uuidv7().to_string();
                slot.insert(StoredAccount {
                    account: stored,
                    password_hash,
                });
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new().with_bcrypt_cost(4)
    }

    fn jane() -> Account {
        Account::new("jdoe", "jane@example.com", "Jane", "Doe")
    }

    fn token(value: &str, expiration: i64) -> RenewalToken {
        RenewalToken {
            id: String::new(),
            token: value.to_string(),
            expiration,
        }
    }

    #[tokio::test]
    async fn create_then_verify() {
        let store = store();
        assert!(store.create_account(&jane(), "Aa1234").await.unwrap().is_empty());
        assert!(store.verify_password(&jane(), "Aa1234").await.unwrap());
        assert!(!store.verify_password(&jane(), "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_account_does_not_verify() {
        assert!(!store().verify_password(&jane(), "Aa1234").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_field_error() {
        let store = store();
        store.create_account(&jane(), "Aa1234").await.unwrap();
        let errors = store.create_account(&jane(), "Aa1234").await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "DuplicateEmail");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn weak_password_is_not_stored() {
        let store = store();
        let errors = store.create_account(&jane(), "abc").await.unwrap();
        assert!(!errors.is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn custom_policy_drives_field_errors() {
        let store = store().with_policy(PasswordPolicy {
            required_length: 12,
            require_digit: false,
            require_lowercase: false,
            require_uppercase: false,
            require_non_alphanumeric: true,
        });

        let errors = store.create_account(&jane(), "Aa1234").await.unwrap();
        let codes: Vec<&str> = errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(
            codes,
            vec!["PasswordTooShort", "PasswordRequiresNonAlphanumeric"]
        );
        assert!(store.is_empty());

        let errors = store
            .create_account(&jane(), "correct horse battery")
            .await
            .unwrap();
        assert!(errors.is_empty());
        assert!(store.verify_password(&jane(), "correct horse battery").await.unwrap());
    }

    #[tokio::test]
    async fn lookups_strip_or_include_tokens() {
        let store = store();
        store.create_account(&jane(), "Aa1234").await.unwrap();
        store
            .append_renewal_token("jane@example.com", token("t1", 10))
            .await
            .unwrap();

        let plain = store.find_by_email("jane@example.com").await.unwrap().unwrap();
        assert!(plain.renewal_tokens.is_empty());
        assert!(!plain.id.is_empty());

        let by_name = store.find_by_user_name("jdoe").await.unwrap().unwrap();
        assert_eq!(by_name.email, "jane@example.com");

        let full = store
            .find_by_email_with_renewal_tokens("jane@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(full.renewal_tokens.len(), 1);
        assert!(!full.renewal_tokens[0].id.is_empty());
    }

    #[tokio::test]
    async fn append_to_unknown_account_fails() {
        let err = store()
            .append_renewal_token("nobody@example.com", token("t", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn replace_is_single_use() {
        let store = store();
        store.create_account(&jane(), "Aa1234").await.unwrap();
        store
            .append_renewal_token("jane@example.com", token("old", 10))
            .await
            .unwrap();
        let old_id = store
            .find_by_email_with_renewal_tokens("jane@example.com")
            .await
            .unwrap()
            .unwrap()
            .renewal_tokens[0]
            .id
            .clone();

        let first = store
            .replace_renewal_token("jane@example.com", &old_id, token("new", 20))
            .await
            .unwrap();
        let second = store
            .replace_renewal_token("jane@example.com", &old_id, token("newer", 30))
            .await
            .unwrap();

        assert_eq!(first, Replacement::Replaced);
        assert_eq!(second, Replacement::Missing);
        let tokens = store
            .find_by_email_with_renewal_tokens("jane@example.com")
            .await
            .unwrap()
            .unwrap()
            .renewal_tokens;
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token, "new");
    }

    #[tokio::test]
    async fn update_profile_keeps_email() {
        let store = store();
        store.create_account(&jane(), "Aa1234").await.unwrap();
        assert!(store.update_profile("jane@example.com", |a| {
            a.first_name = "Janet".into();
            a.email = "ignored@example.com".into();
        }));
        let account = store.find_by_email("jane@example.com").await.unwrap().unwrap();
        assert_eq!(account.first_name, "Janet");
        assert!(!store.update_profile("nobody@example.com", |_| {}));
    }
}
