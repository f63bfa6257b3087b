//! Authentication providers.
//!
//! This module defines traits for the external dependencies of the
//! coordinator. The reducer depends on these traits; the application injects
//! concrete implementations through [`AuthEnvironment`](crate::AuthEnvironment).
//!
//! # Architecture
//!
//! Providers are **interfaces**, not implementations:
//!
//! ```text
//! ┌──────────────────┐   signup / signin / signout    ┌──────────────────┐
//! │ AuthReducer      │ ─────────────────────────────▶ │ IdentityProvider │
//! │ (effects)        │   federated_auth / session     │ (external)       │
//! └────────┬─────────┘                                └──────────────────┘
//!          │ Profile(Setup | Load)
//!          ▼
//! ┌──────────────────┐
//! │ ProfileSink      │  profile management lives elsewhere
//! └──────────────────┘
//! ```
//!
//! Every call is single-shot and fallible. The coordinator bounds each call
//! with [`AuthConfig::provider_timeout`](crate::AuthConfig::provider_timeout),
//! so implementations do not need their own deadline.

use crate::error::ProviderError;
use crate::state::{AuthenticatedUser, Credentials, ProfilePayload, UserId};
use std::future::Future;

/// Identity provider.
///
/// This trait abstracts over the hosted identity service (Firebase Auth,
/// Cognito, an in-house `OAuth` server, ...).
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The account already exists or the credentials are unacceptable
    /// - The provider cannot be reached
    fn signup(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthenticatedUser, ProviderError>> + Send;

    /// Sign in with credentials.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The credentials are rejected
    /// - The provider cannot be reached
    fn signin(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthenticatedUser, ProviderError>> + Send;

    /// Terminate the current session.
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be reached.
    fn signout(&self) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Run the provider's federated sign-in flow.
    ///
    /// # Errors
    ///
    /// Returns error if the flow is cancelled, rejected or unreachable.
    fn federated_auth(
        &self,
    ) -> impl Future<Output = Result<AuthenticatedUser, ProviderError>> + Send;

    /// Query the provider's current session.
    ///
    /// # Returns
    ///
    /// `None` when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be reached.
    fn check_current_session(
        &self,
    ) -> impl Future<Output = Result<Option<AuthenticatedUser>, ProviderError>> + Send;
}

/// Profile sink.
///
/// Receives the profile follow-ons the coordinator derives from successful
/// authentication. Delivery is fire-and-forget: failures are logged and
/// never change authentication state.
pub trait ProfileSink: Send + Sync {
    /// Create the profile of a freshly signed-up user.
    ///
    /// # Errors
    ///
    /// Returns error if the profile cannot be stored.
    fn setup_profile(
        &self,
        user_id: &UserId,
        profile: &ProfilePayload,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Load the profile of a user who just authenticated.
    ///
    /// # Errors
    ///
    /// Returns error if the profile cannot be loaded.
    fn load_profile(&self, user_id: &UserId)
    -> impl Future<Output = Result<(), ProviderError>> + Send;
}
