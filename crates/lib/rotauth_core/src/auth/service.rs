//! Request-level authentication service.
//!
//! Resolves accounts from login and registration requests and hands them to
//! the [`RotationCoordinator`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AuthError;
use super::coordinator::RotationCoordinator;
use super::jwt::{HmacJwtHandler, JwtHandler};
use super::renewal::{DefaultRenewalTokenGenerator, RenewalTokenGenerator};
use super::result::ActionResult;
use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::models::account::Account;
use crate::store::{AccountStore, IdentityStore};

/// Email + password login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// An expired signed token together with its renewal token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshAttempt {
    pub jwt: String,
    pub renewal_token: String,
}

/// Login, registration and refresh for [`Account`]s.
pub struct AuthenticationService {
    accounts: Arc<dyn AccountStore<Account>>,
    coordinator: RotationCoordinator<Account>,
}

impl AuthenticationService {
    pub fn new(
        accounts: Arc<dyn AccountStore<Account>>,
        identity: Arc<dyn IdentityStore<Account>>,
        jwt: Arc<dyn JwtHandler>,
        renewal: Arc<dyn RenewalTokenGenerator>,
    ) -> Self {
        let coordinator = RotationCoordinator::new(accounts.clone(), identity, jwt, renewal);
        Self {
            accounts,
            coordinator,
        }
    }

    /// Wire a store implementing both traits with the default codec and
    /// generator.
    pub fn with_store<S>(store: Arc<S>, config: &AuthConfig, clock: Arc<dyn Clock>) -> Self
    where
        S: AccountStore<Account> + IdentityStore<Account> + 'static,
    {
        Self::new(
            store.clone(),
            store,
            Arc::new(HmacJwtHandler::from_config(config, clock.clone())),
            Arc::new(DefaultRenewalTokenGenerator::from_config(config, clock)),
        )
    }

    /// Unknown emails fail exactly like wrong passwords.
    pub async fn login(&self, request: &LoginRequest) -> Result<ActionResult, AuthError> {
        match self.accounts.find_by_email(&request.email).await? {
            Some(account) => {
                self.coordinator
                    .authenticate(&account, &request.password)
                    .await
            }
            None => {
                debug!(email = %request.email, "login for unknown account");
                Ok(ActionResult::invalid_credentials())
            }
        }
    }

    pub async fn register(
        &self,
        request: &CreateAccountRequest,
    ) -> Result<ActionResult, AuthError> {
        let account = Account::new(
            request.user_name.as_str(),
            request.email.as_str(),
            request.first_name.as_str(),
            request.last_name.as_str(),
        );
        self.coordinator.create(&account, &request.password).await
    }

    pub async fn refresh(&self, attempt: &RefreshAttempt) -> Result<ActionResult, AuthError> {
        self.coordinator
            .refresh(&attempt.jwt, &attempt.renewal_token)
            .await
    }
}
