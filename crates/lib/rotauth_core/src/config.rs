//! Token configuration.

use thiserror::Error;
use tracing::warn;

use crate::auth::jwt::resolve_signing_secret_with;

/// Default signed-token lifetime: 30 minutes.
pub const DEFAULT_SIGNED_TOKEN_LIFETIME_SECS: i64 = 30 * 60;

/// Default renewal-token lifetime: 5 days.
pub const DEFAULT_RENEWAL_TOKEN_LIFETIME_SECS: i64 = 5 * 24 * 60 * 60;

/// Upper bound for either lifetime: 10 years.
pub const MAX_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Default issuer (and audience).
pub const DEFAULT_ISSUER: &str = "rotauth";

/// Secrets shorter than this (128 bits) are accepted with a warning.
const MIN_SECRET_BYTES: usize = 16;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Everything the codec and the renewal generator need.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC signing secret.
    pub signing_secret: String,
    pub issuer: String,
    pub audience: String,
    pub signed_token_lifetime_secs: i64,
    pub renewal_token_lifetime_secs: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("signed_token_lifetime_secs", &self.signed_token_lifetime_secs)
            .field("renewal_token_lifetime_secs", &self.renewal_token_lifetime_secs)
            .finish()
    }
}

impl AuthConfig {
    /// Config with default issuer, audience and lifetimes.
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_ISSUER.to_string(),
            signed_token_lifetime_secs: DEFAULT_SIGNED_TOKEN_LIFETIME_SECS,
            renewal_token_lifetime_secs: DEFAULT_RENEWAL_TOKEN_LIFETIME_SECS,
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                        | Default                          |
    /// |---------------------------------|----------------------------------|
    /// | `ROTAUTH_SIGNING_SECRET` / `JWT_SECRET` | generated & persisted to file |
    /// | `ROTAUTH_ISSUER`                | `rotauth`                        |
    /// | `ROTAUTH_AUDIENCE`              | same as issuer                   |
    /// | `ROTAUTH_TOKEN_LIFETIME_SECS`   | `1800`                           |
    /// | `ROTAUTH_RENEWAL_LIFETIME_SECS` | `432000`                         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let signing_secret = resolve_signing_secret_with(&lookup);
        let issuer = lookup("ROTAUTH_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        let audience = lookup("ROTAUTH_AUDIENCE").unwrap_or_else(|| issuer.clone());

        let config = Self {
            signing_secret,
            issuer,
            audience,
            signed_token_lifetime_secs: lifetime(
                &lookup,
                "ROTAUTH_TOKEN_LIFETIME_SECS",
                DEFAULT_SIGNED_TOKEN_LIFETIME_SECS,
            )?,
            renewal_token_lifetime_secs: lifetime(
                &lookup,
                "ROTAUTH_RENEWAL_LIFETIME_SECS",
                DEFAULT_RENEWAL_TOKEN_LIFETIME_SECS,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject empty strings; warn about short secrets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.is_empty() {
            return Err(ConfigError::Empty("signing secret"));
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Empty("issuer"));
        }
        if self.audience.trim().is_empty() {
            return Err(ConfigError::Empty("audience"));
        }
        if self.signing_secret.len() < MIN_SECRET_BYTES {
            warn!(
                len = self.signing_secret.len(),
                "signing secret is shorter than 16 bytes"
            );
        }
        Ok(())
    }
}

fn lifetime(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: i64,
) -> Result<i64, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(secs) if secs > 0 && secs <= MAX_LIFETIME_SECS => Ok(secs),
            _ => Err(ConfigError::InvalidValue { var, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config =
            AuthConfig::from_lookup(lookup(&[("ROTAUTH_SIGNING_SECRET", "0123456789abcdef")]))
                .unwrap();
        assert_eq!(config.signing_secret, "0123456789abcdef");
        assert_eq!(config.issuer, "rotauth");
        assert_eq!(config.audience, "rotauth");
        assert_eq!(config.signed_token_lifetime_secs, 1800);
        assert_eq!(config.renewal_token_lifetime_secs, 432_000);
    }

    #[test]
    fn audience_defaults_to_issuer() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "0123456789abcdef"),
            ("ROTAUTH_ISSUER", "my-issuer"),
        ]))
        .unwrap();
        assert_eq!(config.audience, "my-issuer");
    }

    #[test]
    fn primary_secret_wins_over_fallback() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("ROTAUTH_SIGNING_SECRET", "primary-secret-value"),
            ("JWT_SECRET", "fallback-secret-value"),
        ]))
        .unwrap();
        assert_eq!(config.signing_secret, "primary-secret-value");
    }

    #[test]
    fn lifetimes_are_parsed() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "0123456789abcdef"),
            ("ROTAUTH_TOKEN_LIFETIME_SECS", "60"),
            ("ROTAUTH_RENEWAL_LIFETIME_SECS", " 120 "),
        ]))
        .unwrap();
        assert_eq!(config.signed_token_lifetime_secs, 60);
        assert_eq!(config.renewal_token_lifetime_secs, 120);
    }

    #[test]
    fn bad_lifetime_is_rejected() {
        for bad in ["abc", "0", "-5"] {
            let err = AuthConfig::from_lookup(lookup(&[
                ("JWT_SECRET", "0123456789abcdef"),
                ("ROTAUTH_TOKEN_LIFETIME_SECS", bad),
            ]))
            .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue {
                    var: "ROTAUTH_TOKEN_LIFETIME_SECS",
                    ..
                }
            ));
        }
    }

    #[test]
    fn lifetime_above_ten_years_is_rejected() {
        let max = MAX_LIFETIME_SECS.to_string();
        let config = AuthConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "0123456789abcdef"),
            ("ROTAUTH_RENEWAL_LIFETIME_SECS", max.as_str()),
        ]))
        .unwrap();
        assert_eq!(config.renewal_token_lifetime_secs, MAX_LIFETIME_SECS);

        let over = (MAX_LIFETIME_SECS + 1).to_string();
        let huge = i64::MAX.to_string();
        for (var, bad) in [
            ("ROTAUTH_TOKEN_LIFETIME_SECS", over.as_str()),
            ("ROTAUTH_TOKEN_LIFETIME_SECS", huge.as_str()),
            ("ROTAUTH_RENEWAL_LIFETIME_SECS", huge.as_str()),
        ] {
            let err = AuthConfig::from_lookup(lookup(&[("JWT_SECRET", "0123456789abcdef"), (var, bad)]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { var: v, .. } if v == var));
        }
    }

    #[test]
    fn empty_issuer_is_rejected() {
        let err = AuthConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "0123456789abcdef"),
            ("ROTAUTH_ISSUER", " "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Empty("issuer")));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", AuthConfig::new("super-secret-value"));
        assert!(!rendered.contains("super-secret-value"));
    }
}
