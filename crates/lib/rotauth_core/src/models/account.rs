//! Account and renewal-token models.

use serde::{Deserialize, Serialize};

use crate::auth::claims::{ClaimSet, EMAIL_CLAIM, NAME_CLAIM};

/// An opaque renewal token owned by a single account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalToken {
    /// Storage-assigned id. Empty until the token has been persisted.
    pub id: String,
    /// Base64 of 32 random bytes when generated; its hex SHA-256 digest
    /// once persisted.
    pub token: String,
    /// Expiry (unix timestamp).
    pub expiration: i64,
}

impl RenewalToken {
    /// Whether the token is expired at `now`. A token expiring exactly at
    /// `now` is already expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expiration
    }
}

/// Capabilities the coordinator needs from an account, whatever its shape.
pub trait Principal: Clone + Send + Sync {
    /// Identifying key.
    fn email(&self) -> &str;

    /// Name shown to the user and embedded in signed tokens.
    fn display_name(&self) -> &str;

    /// Renewal tokens loaded with the account (may be empty if not loaded).
    fn renewal_tokens(&self) -> &[RenewalToken];

    /// Claims embedded in signed tokens issued for this account.
    fn default_claims(&self) -> ClaimSet {
        ClaimSet::new()
            .with(EMAIL_CLAIM, self.email())
            .with(NAME_CLAIM, self.display_name())
    }
}

/// The account shape used by the bundled stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Storage-assigned id. Empty until created.
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub renewal_tokens: Vec<RenewalToken>,
}

impl Account {
    pub fn new(
        user_name: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            user_name: user_name.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            renewal_tokens: Vec::new(),
        }
    }
}

impl Principal for Account {
    fn email(&self) -> &str {
        &self.email
    }

    fn display_name(&self) -> &str {
        &self.first_name
    }

    fn renewal_tokens(&self) -> &[RenewalToken] {
        &self.renewal_tokens
    }
}

/// A rule violation reported by the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Machine-readable code, e.g. `PasswordRequiresDigit`.
    pub code: String,
    /// Human-readable description, surfaced verbatim to callers.
    pub description: String,
}

impl FieldError {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_boundary_is_inclusive() {
        let token = RenewalToken {
            id: "1".into(),
            token: "t".into(),
            expiration: 1_000,
        };
        assert!(!token.is_expired_at(999));
        assert!(token.is_expired_at(1_000));
        assert!(token.is_expired_at(1_001));
    }

    #[test]
    fn default_claims_carry_email_and_first_name() {
        let account = Account::new("jdoe", "jane@example.com", "Jane", "Doe");
        let claims = account.default_claims();
        assert_eq!(claims.get(EMAIL_CLAIM), Some("jane@example.com"));
        assert_eq!(claims.get(NAME_CLAIM), Some("Jane"));
        assert_eq!(claims.len(), 2);
    }
}
