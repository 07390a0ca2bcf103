//! Uniform result envelope for coordinator operations.

use serde::Serialize;

use crate::models::account::FieldError;

/// Message returned for every rejected refresh.
pub const INVALID_TOKEN: &str = "Invalid token";

/// Message returned for every rejected login.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials supplied";

/// Used when a failure would otherwise carry no message.
const OPERATION_FAILED: &str = "Operation failed";

/// A single user-facing error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<FieldError> for ActionError {
    fn from(error: FieldError) -> Self {
        Self::new(error.description)
    }
}

/// Outcome of create, authenticate and refresh.
///
/// A successful result always carries both tokens and no errors; a failed
/// one carries at least one error and no tokens. Values are built whole and
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    succeeded: bool,
    errors: Vec<ActionError>,
    signed_token: Option<String>,
    renewal_token: Option<String>,
}

impl ActionResult {
    pub fn success(signed_token: String, renewal_token: String) -> Self {
        Self {
            succeeded: true,
            errors: Vec::new(),
            signed_token: Some(signed_token),
            renewal_token: Some(renewal_token),
        }
    }

    pub fn failure<I, E>(errors: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<ActionError>,
    {
        let mut errors: Vec<ActionError> = errors.into_iter().map(Into::into).collect();
        if errors.is_empty() {
            errors.push(ActionError::new(OPERATION_FAILED));
        }
        Self {
            succeeded: false,
            errors,
            signed_token: None,
            renewal_token: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::failure([ActionError::new(message)])
    }

    pub fn invalid_token() -> Self {
        Self::error(INVALID_TOKEN)
    }

    pub fn invalid_credentials() -> Self {
        Self::error(INVALID_CREDENTIALS)
    }

    pub fn from_field_errors(errors: Vec<FieldError>) -> Self {
        Self::failure(errors)
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn errors(&self) -> &[ActionError] {
        &self.errors
    }

    pub fn signed_token(&self) -> Option<&str> {
        self.signed_token.as_deref()
    }

    pub fn renewal_token(&self) -> Option<&str> {
        self.renewal_token.as_deref()
    }

    /// Both tokens of a successful result.
    pub fn into_tokens(self) -> Option<(String, String)> {
        match (self.signed_token, self.renewal_token) {
            (Some(signed), Some(renewal)) => Some((signed, renewal)),
            _ => None,
        }
    }
}
