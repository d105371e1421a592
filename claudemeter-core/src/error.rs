//! Core error types for `ClaudeMeter`.

use thiserror::Error;

/// Errors raised while converting an API payload into a snapshot.
///
/// These are fatal to the fetch that produced the payload; the previously
/// cached snapshot stays in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A timestamp was present but not strict ISO-8601 with fractional
    /// seconds and an offset.
    #[error("Server returned invalid date format")]
    InvalidDateFormat,

    /// A required field was absent or unusable.
    #[error("Server response missing critical field: {field}")]
    MissingCriticalField {
        /// Wire path of the offending field, e.g. `five_hour.resets_at`.
        field: String,
    },
}

impl MappingError {
    /// Creates a `MissingCriticalField` for the given wire path.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingCriticalField {
            field: field.into(),
        }
    }
}

/// Session key format violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionKeyError {
    /// Nothing was entered.
    #[error("Session key cannot be empty")]
    Empty,

    /// The key does not start with the issuer prefix.
    #[error("Invalid format (must start with sk-ant-)")]
    InvalidPrefix,

    /// The key has the prefix but contains characters outside the token alphabet.
    #[error("Session key contains invalid characters")]
    InvalidCharacters,
}

/// Notification threshold configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    /// Warning threshold outside `[50, 90]`.
    #[error("Warning threshold {0} out of range [50, 90]")]
    WarningOutOfRange(f64),

    /// Critical threshold outside `[75, 100]`.
    #[error("Critical threshold {0} out of range [75, 100]")]
    CriticalOutOfRange(f64),

    /// Critical must be strictly above warning.
    #[error("Critical threshold must be higher than warning threshold")]
    NotAscending,
}
