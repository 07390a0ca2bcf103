//! Claim sets embedded in signed tokens.

use serde_json::{Map, Value};

/// Identifying email of the principal.
pub const EMAIL_CLAIM: &str = "email";
/// Display name of the principal.
pub const NAME_CLAIM: &str = "name";
/// Expiry (unix timestamp).
pub const EXPIRY_CLAIM: &str = "exp";
/// Not-before (unix timestamp).
pub const NOT_BEFORE_CLAIM: &str = "nbf";
/// Issuer.
pub const ISSUER_CLAIM: &str = "iss";
/// Audience.
pub const AUDIENCE_CLAIM: &str = "aud";

/// A single (type, value) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub kind: String,
    pub value: String,
}

/// Ordered collection of claims, unique by type.
///
/// Sets built by hand keep insertion order. Sets decoded from a token are
/// ordered by claim type, since the payload map is sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    claims: Vec<Claim>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a claim. An existing claim of the same type keeps its position
    /// and takes the new value.
    pub fn insert(&mut self, kind: impl Into<String>, value: impl Into<String>) {
        let kind = kind.into();
        let value = value.into();
        match self.claims.iter_mut().find(|c| c.kind == kind) {
            Some(existing) => existing.value = value,
            None => self.claims.push(Claim { kind, value }),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(kind, value);
        self
    }

    /// Value of the first claim of the given type.
    pub fn get(&self, kind: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.value.as_str())
    }

    pub fn email(&self) -> Option<&str> {
        self.get(EMAIL_CLAIM)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME_CLAIM)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Render as a JWT payload. Timestamp claims become JSON numbers when
    /// they parse as integers.
    pub(crate) fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        for claim in &self.claims {
            let value = match claim.kind.as_str() {
                EXPIRY_CLAIM | NOT_BEFORE_CLAIM => claim
                    .value
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(claim.value.clone())),
                _ => Value::String(claim.value.clone()),
            };
            payload.insert(claim.kind.clone(), value);
        }
        payload
    }

    /// Build from a decoded JWT payload. Non-string values are rendered as
    /// JSON text (numbers in decimal). Claims come out sorted by type.
    pub(crate) fn from_payload(payload: Map<String, Value>) -> Self {
        let mut entries: Vec<(String, Value)> = payload.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut set = Self::new();
        for (kind, value) in entries {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            set.insert(kind, value);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ClaimSet {
    type Item = &'a Claim;
    type IntoIter = std::slice::Iter<'a, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut set = ClaimSet::new().with("a", "1").with("b", "2");
        set.insert("a", "3");
        let kinds: Vec<_> = set.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, vec!["a", "b"]);
        assert_eq!(set.get("a"), Some("3"));
    }

    #[test]
    fn payload_emits_numeric_timestamps() {
        let set = ClaimSet::new()
            .with(EMAIL_CLAIM, "a@b.c")
            .with(EXPIRY_CLAIM, "1700000000");
        let payload = set.to_payload();
        assert_eq!(payload[EXPIRY_CLAIM], Value::from(1_700_000_000_i64));
        assert_eq!(payload[EMAIL_CLAIM], Value::from("a@b.c"));
    }

    #[test]
    fn from_payload_stringifies_numbers() {
        let mut payload = Map::new();
        payload.insert("exp".into(), Value::from(42));
        payload.insert("name".into(), Value::from("Jane"));
        let set = ClaimSet::from_payload(payload);
        assert_eq!(set.get("exp"), Some("42"));
        assert_eq!(set.name(), Some("Jane"));
    }

    #[test]
    fn decoded_claims_are_sorted_by_type() {
        let issued = ClaimSet::new()
            .with(NAME_CLAIM, "Jane")
            .with(EMAIL_CLAIM, "jane@example.com")
            .with(ISSUER_CLAIM, "rotauth");
        let decoded = ClaimSet::from_payload(issued.to_payload());

        let kinds: Vec<&str> = decoded.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, vec!["email", "iss", "name"]);
    }
}
