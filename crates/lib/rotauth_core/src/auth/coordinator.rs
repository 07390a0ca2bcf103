//! Create, authenticate and refresh flows.
//!
//! Every flow returns an [`ActionResult`] for conditions a caller can trigger
//! (bad password, unknown or expired renewal token, tampered signed token).
//! `Err` is reserved for store faults and for validated tokens that lack the
//! email claim, which only a token-issuance bug can produce.
//!
//! Stores only receive SHA-256 digests of renewal tokens; the plaintext is
//! handed to the caller once, inside the result.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::AuthError;
use super::claims::EMAIL_CLAIM;
use super::jwt::JwtHandler;
use super::renewal::{RenewalTokenGenerator, hash_token, tokens_match};
use super::result::ActionResult;
use crate::models::account::{Principal, RenewalToken};
use crate::store::{AccountStore, IdentityStore, Replacement};

/// Issues token pairs and rotates renewal tokens.
pub struct RotationCoordinator<A: Principal> {
    accounts: Arc<dyn AccountStore<A>>,
    identity: Arc<dyn IdentityStore<A>>,
    jwt: Arc<dyn JwtHandler>,
    renewal: Arc<dyn RenewalTokenGenerator>,
}

impl<A: Principal> RotationCoordinator<A> {
    pub fn new(
        accounts: Arc<dyn AccountStore<A>>,
        identity: Arc<dyn IdentityStore<A>>,
        jwt: Arc<dyn JwtHandler>,
        renewal: Arc<dyn RenewalTokenGenerator>,
    ) -> Self {
        Self {
            accounts,
            identity,
            jwt,
            renewal,
        }
    }

    /// Create `account` with `password` and issue its first token pair.
    ///
    /// Field errors from the identity store are returned verbatim and no
    /// token is minted.
    pub async fn create(&self, account: &A, password: &str) -> Result<ActionResult, AuthError> {
        let errors = self.identity.create_account(account, password).await?;
        if !errors.is_empty() {
            info!(
                email = account.email(),
                errors = errors.len(),
                "account creation rejected"
            );
            return Ok(ActionResult::from_field_errors(errors));
        }
        info!(email = account.email(), "account created");
        self.issue(account).await
    }

    /// Verify `password` and issue an additional token pair. Existing
    /// renewal tokens stay valid.
    pub async fn authenticate(
        &self,
        account: &A,
        password: &str,
    ) -> Result<ActionResult, AuthError> {
        if !self.identity.verify_password(account, password).await? {
            debug!(email = account.email(), "password verification failed");
            return Ok(ActionResult::invalid_credentials());
        }
        self.issue(account).await
    }

    /// Exchange an expired signed token and its renewal token for a new pair.
    ///
    /// The presented renewal token is consumed: a second refresh with the same
    /// value fails even when both race.
    pub async fn refresh(
        &self,
        presented_jwt: &str,
        presented_renewal: &str,
    ) -> Result<ActionResult, AuthError> {
        let Ok(claims) = self.jwt.validate_expired(presented_jwt) else {
            return Ok(ActionResult::invalid_token());
        };

        let Some(email) = claims.email() else {
            error!("validated signed token carries no email claim");
            return Err(AuthError::MissingClaim(EMAIL_CLAIM));
        };

        let Some(account) = self.accounts.find_by_email_with_renewal_tokens(email).await? else {
            debug!(email, "refresh for unknown account");
            return Ok(ActionResult::invalid_token());
        };

        let presented_digest = hash_token(presented_renewal);
        let Some(stored) = account
            .renewal_tokens()
            .iter()
            .find(|t| tokens_match(&t.token, &presented_digest))
        else {
            debug!(email, "refresh with unknown renewal token");
            return Ok(ActionResult::invalid_token());
        };

        if self.renewal.is_expired(stored) {
            debug!(email, "refresh with expired renewal token");
            return Ok(ActionResult::invalid_token());
        }

        // Claims come from the stored account, not the presented token.
        let signed = self.jwt.generate(account.default_claims())?;
        let replacement = self.renewal.generate();

        match self
            .accounts
            .replace_renewal_token(account.email(), &stored.id, digested(&replacement))
            .await?
        {
            Replacement::Replaced => {
                info!(email = account.email(), "renewal token rotated");
                Ok(ActionResult::success(signed, replacement.token))
            }
            Replacement::Missing => {
                debug!(email = account.email(), "renewal token consumed concurrently");
                Ok(ActionResult::invalid_token())
            }
        }
    }

    /// Mint a pair for `account` and persist the renewal token.
    async fn issue(&self, account: &A) -> Result<ActionResult, AuthError> {
        let signed = self.jwt.generate(account.default_claims())?;
        let renewal = self.renewal.generate();
        self.accounts
            .append_renewal_token(account.email(), digested(&renewal))
            .await?;
        info!(email = account.email(), "token pair issued");
        Ok(ActionResult::success(signed, renewal.token))
    }
}

/// The persisted form of a freshly generated token.
fn digested(token: &RenewalToken) -> RenewalToken {
    RenewalToken {
        token: hash_token(&token.token),
        ..token.clone()
    }
}
