//! Fetch error types.

use claudemeter_core::{MappingError, SessionKeyError};
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for usage fetches.
///
/// Every waiter on a shared in-flight fetch receives its own copy of the
/// error, so this type is `Clone` and carries messages rather than sources.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The server rejected the session key.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limited by the server.
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after: Option<u64>,
    },

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Unexpected status or undecodable body.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The payload could not be mapped to a snapshot.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// No session key is stored.
    #[error("No session key configured")]
    MissingCredential,

    /// The stored session key fails the format check.
    #[error("Stored session key is invalid: {0}")]
    InvalidCredential(#[from] SessionKeyError),

    /// The session key has no organizations.
    #[error("No organization available for this session key")]
    NoOrganization,

    /// The credential store could not be read.
    #[error("Credential store error: {0}")]
    CredentialStore(String),

    /// Settings could not be read or written.
    #[error("Settings error: {0}")]
    Settings(String),

    /// The fetch task ended without producing a result.
    #[error("Fetch task aborted: {0}")]
    Aborted(String),
}

impl FetchError {
    /// Returns true if the server rejected the credential.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    /// Returns true for failures a later attempt may not hit.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout | Self::Transport(_)
        )
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<HttpError> for FetchError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Request(e) if e.is_timeout() => FetchError::Timeout,
            HttpError::Request(e) => FetchError::Transport(e.to_string()),
            HttpError::DomainNotAllowed(host) => FetchError::DomainNotAllowed(host),
            HttpError::InvalidUrl(msg) => FetchError::Transport(msg),
        }
    }
}

// ============================================================================
// Validation Error
// ============================================================================

/// Outcome of a failed session key validation.
///
/// Each variant maps to a distinct message for the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The key failed the format check; no request was made.
    #[error(transparent)]
    InvalidFormat(#[from] SessionKeyError),

    /// The server rejected the key.
    #[error("Session key was rejected by claude.ai")]
    Rejected,

    /// The server could not be reached.
    #[error("Could not reach claude.ai: {0}")]
    Unreachable(String),
}

// ============================================================================
// Tests
// ============================================================================
