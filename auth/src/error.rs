//! Error types for the authentication coordinator.
//!
//! Provider failures are data: they travel inside actions as
//! [`ProviderError`] and surface to callers as typed outcomes. [`AuthError`]
//! is what the coordinator API returns.

use crate::config::ConfigError;
use crate::state::IntentKind;
use authflow_runtime::StoreError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for coordinator operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failure reported by an identity provider or profile sink.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderError {
    /// The provider refused the request (bad credentials, duplicate account, ...).
    #[error("Rejected by provider ({code}): {message}")]
    Rejected {
        /// Provider-specific error code
        code: String,
        /// Human-readable message
        message: String,
    },

    /// The provider could not be reached or failed internally.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The provider did not answer within the configured timeout.
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Shorthand for [`ProviderError::Rejected`].
    #[must_use]
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors returned by [`AuthCoordinator`](crate::AuthCoordinator).
#[derive(Debug, Error)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Intent Outcomes
    // ═══════════════════════════════════════════════════════════

    /// The provider failed the intent.
    #[error("{kind} failed: {source}")]
    Failed {
        /// Kind of the failed intent
        kind: IntentKind,
        /// Underlying provider failure
        source: ProviderError,
    },

    /// A newer intent of the same kind replaced this one.
    #[error("{kind} superseded by a newer request")]
    Superseded {
        /// Kind of the superseded intent
        kind: IntentKind,
    },

    /// The intent succeeded but the provider reported no session.
    #[error("{kind} completed without an authenticated session")]
    NoSession {
        /// Kind of the intent
        kind: IntentKind,
    },

    /// No outcome arrived within the response timeout.
    #[error("Timed out waiting for an outcome")]
    Timeout,

    // ═══════════════════════════════════════════════════════════
    // Infrastructure
    // ═══════════════════════════════════════════════════════════

    /// The underlying store rejected the action.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Timeout => Self::Timeout,
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let error = ProviderError::rejected("auth/wrong-password", "Wrong password");
        assert_eq!(
            error.to_string(),
            "Rejected by provider (auth/wrong-password): Wrong password"
        );
    }

    #[test]
    fn test_auth_error_names_intent_kind() {
        let error = AuthError::Failed {
            kind: IntentKind::Login,
            source: ProviderError::Unavailable("offline".to_string()),
        };
        assert_eq!(error.to_string(), "login failed: Provider unavailable: offline");
    }

    #[test]
    fn test_store_timeout_maps_to_auth_timeout() {
        assert!(matches!(AuthError::from(StoreError::Timeout), AuthError::Timeout));
        assert!(matches!(
            AuthError::from(StoreError::ShutdownInProgress),
            AuthError::Store(StoreError::ShutdownInProgress)
        ));
    }
}
