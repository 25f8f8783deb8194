//! Error types for Cadence operations

use thiserror::Error;

/// Failure reported by a caller-supplied fetch operation.
///
/// The runtime never inspects the underlying cause; callers fold their own
/// error (network, decode, anything) into a reason string. Cloneable so a
/// single failure can be observed by every coalesced waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct FetchError {
    pub reason: String,
}

impl FetchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Cache layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Fetch for key {key:?} failed: {reason}")]
    FetchFailed { key: String, reason: String },

    #[error("Cache state lock poisoned")]
    LockPoisoned,
}

impl CacheError {
    /// Fold a fetcher failure into a keyed cache error.
    pub fn fetch_failed(key: impl Into<String>, source: FetchError) -> Self {
        Self::FetchFailed {
            key: key.into(),
            reason: source.reason,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Umbrella error for all Cadence operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CadenceError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias used across the workspace.
pub type CadenceResult<T> = Result<T, CadenceError>;
