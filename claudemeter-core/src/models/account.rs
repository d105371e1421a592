//! Account types: the session key credential and organizations.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::SessionKeyError;

/// Prefix every claude.ai session key starts with.
pub const SESSION_KEY_PREFIX: &str = "sk-ant-";

static SESSION_KEY_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^sk-ant-[A-Za-z0-9_-]+$").expect("session key pattern is valid")
});

// ============================================================================
// Session Key
// ============================================================================

/// A claude.ai session key that has passed the format check.
///
/// Holding a `SessionKey` means the value has the issuer's prefix and shape;
/// it says nothing about whether the server accepts it.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(String);

impl SessionKey {
    /// Parses and format-checks a raw key. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionKeyError`] if the key is empty, lacks the `sk-ant-`
    /// prefix, or contains characters outside `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, SessionKeyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SessionKeyError::Empty);
        }
        if !trimmed.starts_with(SESSION_KEY_PREFIX) {
            return Err(SessionKeyError::InvalidPrefix);
        }
        if !SESSION_KEY_SHAPE.is_match(trimmed) {
            return Err(SessionKeyError::InvalidCharacters);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Pure prefix/shape check. Never touches the network.
    pub fn check_format(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    /// Returns the raw key for use in request headers.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey({SESSION_KEY_PREFIX}…)")
    }
}

// ============================================================================
// Organization
// ============================================================================

/// An organization the session key has access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization UUID used to scope usage requests.
    pub uuid: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

// ============================================================================
// Tests
// ============================================================================
