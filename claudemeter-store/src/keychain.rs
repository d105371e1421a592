//! Session key storage in the system keychain.
//!
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::error::CredentialError;

/// Keychain service name.
pub const KEYCHAIN_SERVICE: &str = "claudemeter";

/// Account the session key is stored under.
pub const DEFAULT_ACCOUNT: &str = "default";

// ============================================================================
// Credential Store Trait
// ============================================================================

/// Opaque secure storage for the session key.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the stored value, or `None` if nothing is stored.
    async fn retrieve(&self, account: &str) -> Result<Option<String>, CredentialError>;

    /// Stores `value`, replacing any previous one.
    async fn save(&self, account: &str, value: &str) -> Result<(), CredentialError>;
}

// ============================================================================
// System Keychain
// ============================================================================

/// [`CredentialStore`] backed by the platform keychain.
#[derive(Debug, Clone)]
pub struct SystemKeychain {
    service: String,
}

impl Default for SystemKeychain {
    fn default() -> Self {
        Self::new(KEYCHAIN_SERVICE)
    }
}

impl SystemKeychain {
    /// Creates a keychain handle for a service name.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str) -> Result<Entry, CredentialError> {
        Entry::new(&self.service, account).map_err(CredentialError::from)
    }
}

#[async_trait]
impl CredentialStore for SystemKeychain {
    async fn retrieve(&self, account: &str) -> Result<Option<String>, CredentialError> {
        debug!(service = %self.service, account = %account, "Getting credential from keychain");

        match self.entry(account)?.get_password() {
            Ok(secret) => {
                debug!(account = %account, "Credential found");
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account = %account, "Credential not found");
                Ok(None)
            }
            Err(e) => {
                warn!(account = %account, error = %e, "Failed to get credential");
                Err(e.into())
            }
        }
    }

    async fn save(&self, account: &str, value: &str) -> Result<(), CredentialError> {
        debug!(service = %self.service, account = %account, "Setting credential in keychain");

        self.entry(account)?.set_password(value).map_err(|e| {
            warn!(account = %account, error = %e, "Failed to set credential");
            CredentialError::from(e)
        })?;

        debug!(account = %account, "Credential stored");
        Ok(())
    }
}
