//! Authentication actions.
//!
//! This module defines all actions (commands and events) that flow through
//! the authentication coordinator's store.

use crate::error::{AuthError, ProviderError};
use crate::state::{
    AuthenticatedUser, Credentials, IntentKind, ProfilePayload, RequestId, SignupRequest, Ticket,
    UserId,
};

/// Caller-issued request to change authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Create an account, then set up its profile.
    Signup(SignupRequest),

    /// Sign in with credentials.
    Login(Credentials),

    /// Sign out and re-read the provider session.
    Logout,

    /// Sign in through the provider's federated flow.
    FederatedLogin,
}

impl Intent {
    /// Payload-free discriminant.
    #[must_use]
    pub const fn kind(&self) -> IntentKind {
        match self {
            Self::Signup(_) => IntentKind::Signup,
            Self::Login(_) => IntentKind::Login,
            Self::Logout => IntentKind::Logout,
            Self::FederatedLogin => IntentKind::FederatedLogin,
        }
    }
}

/// Result of processing an intent or the startup session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeEvent {
    /// The provider reports this session (`None`: nobody is signed in).
    Authenticated(Option<AuthenticatedUser>),

    /// Signup was rejected or failed.
    SignupFailed(ProviderError),

    /// Login was rejected or failed.
    LoginFailed(ProviderError),

    /// Sign-out or the follow-up session query failed.
    LogoutFailed(ProviderError),

    /// Federated login was rejected or failed.
    FederatedLoginFailed(ProviderError),

    /// The startup session query failed.
    SessionCheckFailed(ProviderError),

    /// A newer intent of this kind replaced the ticketed one.
    Superseded(IntentKind),
}

impl OutcomeEvent {
    /// The failure event for an intent kind.
    #[must_use]
    pub const fn failed(kind: IntentKind, error: ProviderError) -> Self {
        match kind {
            IntentKind::Signup => Self::SignupFailed(error),
            IntentKind::Login => Self::LoginFailed(error),
            IntentKind::Logout => Self::LogoutFailed(error),
            IntentKind::FederatedLogin => Self::FederatedLoginFailed(error),
        }
    }

    /// The provider error carried by a failure event.
    #[must_use]
    pub const fn error(&self) -> Option<&ProviderError> {
        match self {
            Self::SignupFailed(e)
            | Self::LoginFailed(e)
            | Self::LogoutFailed(e)
            | Self::FederatedLoginFailed(e)
            | Self::SessionCheckFailed(e) => Some(e),
            Self::Authenticated(_) | Self::Superseded(_) => None,
        }
    }

    /// Convert into a per-call result for an intent of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Failed`] for failure events and
    /// [`AuthError::Superseded`] when a newer intent replaced this one.
    pub fn into_result(self, kind: IntentKind) -> Result<Option<AuthenticatedUser>, AuthError> {
        match self {
            Self::Authenticated(user) => Ok(user),
            Self::Superseded(kind) => Err(AuthError::Superseded { kind }),
            Self::SignupFailed(source)
            | Self::LoginFailed(source)
            | Self::LogoutFailed(source)
            | Self::FederatedLoginFailed(source)
            | Self::SessionCheckFailed(source) => Err(AuthError::Failed { kind, source }),
        }
    }
}

/// Follow-on intents raised after authentication succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    /// Create the profile for a freshly signed-up user.
    Setup {
        /// New user
        user_id: UserId,
        /// Profile fields from the signup request
        profile: ProfilePayload,
    },

    /// Load the profile of a user who just authenticated.
    Load {
        /// Authenticated user
        user_id: UserId,
    },
}

impl ProfileEvent {
    /// User the event refers to.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        match self {
            Self::Setup { user_id, .. } | Self::Load { user_id } => user_id,
        }
    }
}

/// Authentication actions.
///
/// Actions represent both commands (what to do) and events (what happened).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    // ═══════════════════════════════════════════════════════════════════════
    // Commands
    // ═══════════════════════════════════════════════════════════════════════

    /// Query the provider's current session once at startup.
    CheckSession,

    /// Caller-issued intent.
    Intent {
        /// Correlates the eventual outcome with this intent
        ticket: Ticket,
        /// What the caller asked for
        intent: Intent,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════════════════

    /// Outcome of an intent (`ticket` set) or of the startup check (`ticket` unset).
    Outcome {
        /// Ticket of the originating intent
        ticket: Option<Ticket>,
        /// What happened
        event: OutcomeEvent,
    },

    /// Derived profile follow-on.
    Profile(ProfileEvent),
}

impl AuthAction {
    /// Wrap an intent with a fresh ticket.
    #[must_use]
    pub fn intent(intent: Intent) -> Self {
        Self::Intent {
            ticket: Ticket::new(intent.kind(), RequestId::new()),
            intent,
        }
    }

    /// Outcome of a ticketed intent.
    #[must_use]
    pub const fn outcome(ticket: Ticket, event: OutcomeEvent) -> Self {
        Self::Outcome {
            ticket: Some(ticket),
            event,
        }
    }

    /// Ticket carried by an intent or outcome.
    #[must_use]
    pub const fn ticket(&self) -> Option<&Ticket> {
        match self {
            Self::Intent { ticket, .. } => Some(ticket),
            Self::Outcome { ticket, .. } => ticket.as_ref(),
            Self::CheckSession | Self::Profile(_) => None,
        }
    }

    /// The event, if this is the outcome of the intent holding `ticket`.
    #[must_use]
    pub fn into_outcome_of(self, ticket: &Ticket) -> Option<OutcomeEvent> {
        match self {
            Self::Outcome {
                ticket: Some(t),
                event,
            } if t == *ticket => Some(event),
            _ => None,
        }
    }
}
