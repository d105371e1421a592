//! Session key validation.
//!
//! Validation runs in two stages. The format check is pure and always runs
//! first; only a well-formed key is sent upstream, in exactly one request.
//! Validation never touches cached usage.

use claudemeter_core::SessionKey;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::api::UsageApi;
use crate::error::ValidationError;

/// Checks session keys locally and against the server.
#[derive(Clone)]
pub struct SessionKeyValidator {
    api: Arc<dyn UsageApi>,
}

impl SessionKeyValidator {
    /// Creates a validator backed by the given fetch capability.
    pub fn new(api: Arc<dyn UsageApi>) -> Self {
        Self { api }
    }

    /// Pure prefix/shape check.
    pub fn check_format(raw: &str) -> bool {
        SessionKey::check_format(raw)
    }

    /// Asks the server whether `key` is accepted.
    ///
    /// Issues exactly one organization listing. `Ok(true)` means the key sees
    /// at least one organization, `Ok(false)` that it is accepted but sees none.
    ///
    /// # Errors
    ///
    /// [`ValidationError::Rejected`] on an authentication failure,
    /// [`ValidationError::Unreachable`] on anything else.
    #[instrument(skip_all)]
    pub async fn validate_remote(&self, key: &SessionKey) -> Result<bool, ValidationError> {
        match self.api.fetch_organizations(key).await {
            Ok(organizations) => {
                debug!(count = organizations.len(), "Session key accepted");
                Ok(!organizations.is_empty())
            }
            Err(e) if e.is_authentication() => {
                warn!(error = %e, "Session key rejected");
                Err(ValidationError::Rejected)
            }
            Err(e) => {
                warn!(error = %e, "Session key validation failed");
                Err(ValidationError::Unreachable(e.to_string()))
            }
        }
    }

    /// Format-checks `raw`, then validates it remotely.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidFormat`] without any request when the format
    /// check fails; [`ValidationError::Rejected`] when the server rejects the
    /// key or it sees no organization; [`ValidationError::Unreachable`]
    /// otherwise.
    pub async fn validate(&self, raw: &str) -> Result<SessionKey, ValidationError> {
        let key = SessionKey::parse(raw)?;
        if self.validate_remote(&key).await? {
            info!("Session key validated");
            Ok(key)
        } else {
            Err(ValidationError::Rejected)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
