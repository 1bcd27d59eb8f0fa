//! Anonymous session identifiers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ModelError;

/// Name of the cookie carrying the session identifier.
pub const SESSION_COOKIE_NAME: &str = "sessionId";

/// Opaque per-client identifier (UUID v4), created on first contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse a cookie value. Only well-formed UUIDs are accepted, in
    /// canonical hyphenated lowercase form.
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let value = value.trim();
        Uuid::parse_str(value)
            .map(|uuid| Self(uuid.hyphenated().to_string()))
            .map_err(|_| ModelError::InvalidSessionId(value.to_string()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_uuid() {
        let session = SessionId::new();
        assert!(Uuid::parse_str(session.as_str()).is_ok());
        assert_ne!(session, SessionId::new());
    }

    #[test]
    fn test_parse_normalizes_case() {
        let session = SessionId::parse(" 6F9619FF-8B86-4D11-B42D-00C04FC964FF ").unwrap();
        assert_eq!(session.as_str(), "6f9619ff-8b86-4d11-b42d-00c04fc964ff");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("not-a-session").is_err());
        assert!("abc".parse::<SessionId>().is_err());
    }
}
