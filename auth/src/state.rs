//! Authentication state types.
//!
//! This module defines the core state types for the authentication
//! coordinator. All types are `Clone` to support the functional
//! architecture pattern.

use crate::actions::{Intent, OutcomeEvent};
use crate::error::ProviderError;
use authflow_core::effect::EffectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Identifier the identity provider assigns to a user.
///
/// Opaque to the coordinator: it is never parsed, only compared and passed
/// along to profile sinks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap a provider-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for one caller-issued intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub uuid::Uuid);

impl RequestId {
    /// Generate a new random `RequestId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════

/// A user the identity provider vouches for.
///
/// `Option<AuthenticatedUser>` is the nullable form: `None` means there is
/// no authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Provider-issued identifier.
    pub id: UserId,

    /// Provider-issued claims (email, display name, ...).
    pub claims: BTreeMap<String, String>,
}

impl AuthenticatedUser {
    /// Create a user with no claims.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            claims: BTreeMap::new(),
        }
    }

    /// Add a claim.
    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    /// Look up a claim by name.
    #[must_use]
    pub fn claim(&self, key: &str) -> Option<&str> {
        self.claims.get(key).map(String::as_str)
    }
}

/// Identifier and secret handed to the identity provider.
///
/// The secret never shows up in `Debug` output, so credentials can travel
/// inside actions that get logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login identifier (usually an email address).
    pub identifier: String,

    /// Password or equivalent secret.
    pub secret: String,
}

impl Credentials {
    /// Create credentials.
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Profile fields to create once a signup succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePayload(BTreeMap<String, String>);

impl ProfilePayload {
    /// Create an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterate over all fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Signup intent payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    /// Credentials for the new account.
    pub credentials: Credentials,

    /// Profile to set up once the account exists.
    pub profile: ProfilePayload,
}

impl SignupRequest {
    /// Create a signup request.
    #[must_use]
    pub const fn new(credentials: Credentials, profile: ProfilePayload) -> Self {
        Self {
            credentials,
            profile,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Intent bookkeeping
// ═══════════════════════════════════════════════════════════════════════

/// Kind of caller-issued intent.
///
/// Switch-to-latest applies per kind: a new login supersedes an in-flight
/// login but races freely with an in-flight logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    /// Create an account.
    Signup,
    /// Sign in with credentials.
    Login,
    /// Sign out.
    Logout,
    /// Sign in through a federated identity provider.
    FederatedLogin,
}

impl IntentKind {
    /// Every intent kind.
    pub const ALL: [Self; 4] = [Self::Signup, Self::Login, Self::Logout, Self::FederatedLogin];

    /// Stable name used in logs and cancellation ids.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::FederatedLogin => "federated_login",
        }
    }

    /// Cancellation id grouping the provider work for this kind.
    #[must_use]
    pub fn effect_id(self) -> EffectId {
        EffectId::new(match self {
            Self::Signup => "auth.signup",
            Self::Login => "auth.login",
            Self::Logout => "auth.logout",
            Self::FederatedLogin => "auth.federated_login",
        })
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlates an outcome with the intent that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    /// Kind of the originating intent.
    pub kind: IntentKind,

    /// Request id of the originating intent.
    pub request_id: RequestId,
}

impl Ticket {
    /// Create a ticket.
    #[must_use]
    pub const fn new(kind: IntentKind, request_id: RequestId) -> Self {
        Self { kind, request_id }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Core State
// ═══════════════════════════════════════════════════════════════════════

/// Root authentication state.
///
/// The user is written only by applied `Authenticated` outcomes, and the
/// latest one replaces whatever was there before.
///
/// # Examples
///
/// ```
/// use authflow_auth::state::AuthState;
///
/// let state = AuthState::default();
/// assert!(!state.is_authenticated());
/// assert!(!state.session_checked);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    /// Currently authenticated user, if any.
    pub user: Option<AuthenticatedUser>,

    /// Whether the startup session check has completed.
    pub session_checked: bool,

    /// When the current user was applied.
    pub authenticated_at: Option<DateTime<Utc>>,

    /// Latest issued request per intent kind, until its outcome arrives.
    pub in_flight: HashMap<IntentKind, RequestId>,

    /// Most recent provider failure, cleared by the next `Authenticated`.
    pub last_failure: Option<ProviderError>,

    /// Intents accepted before the session check completed, in arrival
    /// order. They start once the check's outcome is applied.
    pub pending_intents: Vec<(Ticket, Intent)>,

    /// Profile to set up if the latest signup succeeds.
    pub signup_profile: Option<(RequestId, ProfilePayload)>,

    /// Last applied outcome per intent kind.
    pub settled: HashMap<IntentKind, (RequestId, OutcomeEvent)>,
}

impl AuthState {
    /// Whether a user is currently authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Id of the current user, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|user| &user.id)
    }

    /// Whether `ticket` is still the latest request of its kind.
    #[must_use]
    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        self.in_flight.get(&ticket.kind) == Some(&ticket.request_id)
    }

    /// What became of the intent behind `ticket`, once it is no longer
    /// pending.
    ///
    /// Returns the applied outcome if it was the last one settled for its
    /// kind, `Superseded` if a newer intent replaced it, and `None` while it
    /// is still in flight.
    #[must_use]
    pub fn settlement(&self, ticket: &Ticket) -> Option<OutcomeEvent> {
        if let Some((request_id, event)) = self.settled.get(&ticket.kind) {
            if *request_id == ticket.request_id {
                return Some(event.clone());
            }
        }
        if self.is_latest(ticket) {
            None
        } else {
            Some(OutcomeEvent::Superseded(ticket.kind))
        }
    }
}
