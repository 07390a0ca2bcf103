//! Password hashing via bcrypt, and the identity store's password rules.

use crate::models::account::FieldError;
use crate::store::StoreError;

/// bcrypt cost factor.
pub const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, StoreError> {
    bcrypt::hash(password, cost).map_err(|e| StoreError::Password(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, StoreError> {
    bcrypt::verify(password, hash).map_err(|e| StoreError::Password(format!("bcrypt verify: {e}")))
}

/// Rules a new password must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 6,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: false,
        }
    }
}

impl PasswordPolicy {
    /// Check `password`, returning one error per violated rule (empty = valid).
    pub fn check(&self, password: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if password.chars().count() < self.required_length {
            errors.push(FieldError::new(
                "PasswordTooShort",
                format!(
                    "Passwords must be at least {} characters.",
                    self.required_length
                ),
            ));
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_alphanumeric()) {
            errors.push(FieldError::new(
                "PasswordRequiresNonAlphanumeric",
                "Passwords must have at least one non alphanumeric character.",
            ));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push(FieldError::new(
                "PasswordRequiresDigit",
                "Passwords must have at least one digit ('0'-'9').",
            ));
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            errors.push(FieldError::new(
                "PasswordRequiresLower",
                "Passwords must have at least one lowercase ('a'-'z').",
            ));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            errors.push(FieldError::new(
                "PasswordRequiresUpper",
                "Passwords must have at least one uppercase ('A'-'Z').",
            ));
        }

        errors
    }
}

/// Error reported when the email of a new account is already registered.
pub fn duplicate_email(email: &str) -> FieldError {
    FieldError::new("DuplicateEmail", format!("Email '{email}' is already taken."))
}
