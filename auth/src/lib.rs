//! # Authflow Authentication Coordinator
//!
//! An event-driven authentication state machine built on the Authflow store.
//!
//! ## Features
//!
//! - **Intents**: signup, login, logout and federated login
//! - **Switch-to-latest**: a newer intent of a kind supersedes the in-flight one
//! - **Ordered startup**: intents issued during the session check start after it
//! - **One canonical signal**: a multicast stream of the authenticated user
//! - **Typed failures**: provider errors become `*Failed` outcomes, never panics
//! - **Testable**: the reducer runs at memory speed against mock providers
//!
//! ## Architecture
//!
//! Authentication is implemented as reducers and effects:
//!
//! ```text
//! Action → Reducer → (State, Effects) → Effect Execution → More Actions
//! ```
//!
//! ```text
//! login(creds) ──▶ Intent{Login} ──▶ IntentReducer ──▶ signin (cancellable "auth.login")
//!                                                          │
//!                  Outcome{Authenticated(user)} ◀──────────┘
//!                          │
//!                          ├──▶ state.user = user ──▶ authenticated_user() stream
//!                          └──▶ Profile(Load) ──▶ ProfileSink
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use authflow_auth::*;
//! use futures::StreamExt;
//!
//! let coordinator = AuthCoordinator::start(
//!     AuthEnvironment::new(provider, profiles),
//!     AuthConfig::default(),
//! )
//! .await?;
//!
//! let mut users = coordinator.authenticated_user();
//! coordinator.login(Credentials::new("ada@example.com", "secret")).await?;
//! let user = users.next().await;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod config;
pub mod coordinator;
pub mod effects;
pub mod environment;
pub mod error;
pub mod providers;
pub mod reducers;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::{AuthAction, Intent, OutcomeEvent, ProfileEvent};
pub use config::{AuthConfig, ConfigError};
pub use coordinator::{AuthCoordinator, AuthUserStream, OutcomeStream, ProfileEventStream};
pub use environment::AuthEnvironment;
pub use error::{AuthError, ProviderError, Result};
pub use providers::{IdentityProvider, ProfileSink};
pub use reducers::AuthReducer;
pub use state::{
    AuthState, AuthenticatedUser, Credentials, IntentKind, ProfilePayload, RequestId,
    SignupRequest, Ticket, UserId,
};
