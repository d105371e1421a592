//! Store error types.

use claudemeter_core::ThresholdError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Settings were rejected on save.
    #[error("Invalid notification thresholds: {0}")]
    InvalidThresholds(#[from] ThresholdError),

    /// Credential store error.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

// ============================================================================
// Credential Error
// ============================================================================

/// Error type for credential store operations.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// Access denied.
    #[error("Access denied to keychain")]
    AccessDenied,

    /// Platform error.
    #[error("Platform error: {0}")]
    Platform(String),

    /// Generic error.
    #[error("Keychain error: {0}")]
    Other(String),
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::Ambiguous(_) => {
                CredentialError::Other("Ambiguous credential entry".to_string())
            }
            keyring::Error::PlatformFailure(e) => CredentialError::Platform(e.to_string()),
            keyring::Error::NoStorageAccess(_) => CredentialError::AccessDenied,
            _ => CredentialError::Other(err.to_string()),
        }
    }
}
