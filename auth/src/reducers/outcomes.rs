//! Outcome reducer.
//!
//! Applies provider outcomes to [`AuthState`] and routes profile follow-ons
//! to the profile sink.
//!
//! An outcome whose ticket is no longer the latest of its kind is dropped
//! without touching state. `Authenticated` replaces the current user
//! wholesale; failures leave it alone. Intents parked behind the startup
//! session check start once the check's outcome is applied.

use crate::actions::{AuthAction, OutcomeEvent, ProfileEvent};
use crate::effects;
use crate::environment::AuthEnvironment;
use crate::providers::{IdentityProvider, ProfileSink};
use crate::state::{AuthState, AuthenticatedUser, IntentKind, ProfilePayload, Ticket};
use authflow_core::effect::Effect;
use authflow_core::environment::Clock;
use authflow_core::reducer::Reducer;
use authflow_core::{smallvec, SmallVec};
use std::time::Duration;

/// Outcome reducer.
///
/// Handles `Outcome` and `Profile`; every other action is a no-op here.
#[derive(Debug, Clone)]
pub struct OutcomeReducer<P, K, C> {
    /// Upper bound for each deferred provider call.
    provider_timeout: Duration,
    /// Upper bound for each profile sink call.
    sink_timeout: Duration,
    /// Phantom data to hold type parameters.
    _phantom: std::marker::PhantomData<(P, K, C)>,
}

impl<P, K, C> OutcomeReducer<P, K, C> {
    /// Create an outcome reducer.
    #[must_use]
    pub const fn new(provider_timeout: Duration, sink_timeout: Duration) -> Self {
        Self {
            provider_timeout,
            sink_timeout,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<P, K, C> OutcomeReducer<P, K, C>
where
    P: IdentityProvider + Clone + 'static,
    K: ProfileSink + Clone + 'static,
    C: Clock + Clone + 'static,
{
    fn apply_user(
        state: &mut AuthState,
        user: Option<AuthenticatedUser>,
        setup: Option<ProfilePayload>,
        env: &AuthEnvironment<P, K, C>,
    ) -> Effect<AuthAction> {
        let follow_on = match &user {
            Some(user) => {
                tracing::info!(user_id = %user.id, "User authenticated");
                let user_id = user.id.clone();
                let mut events = Vec::with_capacity(2);
                if let Some(profile) = setup {
                    events.push(ProfileEvent::Setup {
                        user_id: user_id.clone(),
                        profile,
                    });
                }
                events.push(ProfileEvent::Load { user_id });
                effects::profile_follow_ons(events)
            },
            None => {
                tracing::info!("No authenticated session");
                Effect::None
            },
        };

        state.authenticated_at = user.as_ref().map(|_| env.clock.now());
        state.user = user;
        state.last_failure = None;

        follow_on
    }

    /// Start every intent parked behind the session check, oldest first.
    fn release_deferred(
        &self,
        state: &mut AuthState,
        env: &AuthEnvironment<P, K, C>,
    ) -> Vec<Effect<AuthAction>> {
        std::mem::take(&mut state.pending_intents)
            .into_iter()
            .map(|(ticket, intent)| {
                tracing::debug!(kind = %ticket.kind, "Starting deferred intent");
                effects::run_intent(env.provider.clone(), ticket, intent, self.provider_timeout)
            })
            .collect()
    }

    /// Take the signup profile if it belongs to `ticket`.
    fn take_signup_profile(state: &mut AuthState, ticket: &Ticket) -> Option<ProfilePayload> {
        if ticket.kind != IntentKind::Signup {
            return None;
        }
        match state.signup_profile.take() {
            Some((request_id, profile)) if request_id == ticket.request_id => Some(profile),
            other => {
                state.signup_profile = other;
                None
            },
        }
    }
}

impl<P, K, C> Reducer for OutcomeReducer<P, K, C>
where
    P: IdentityProvider + Clone + 'static,
    K: ProfileSink + Clone + 'static,
    C: Clock + Clone + 'static,
{
    type State = AuthState;
    type Action = AuthAction;
    type Environment = AuthEnvironment<P, K, C>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════════
            // Superseded: Notification for the caller only
            // ═══════════════════════════════════════════════════════════════
            AuthAction::Outcome {
                event: OutcomeEvent::Superseded(kind),
                ..
            } => {
                tracing::trace!(%kind, "Request superseded");
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // Startup session check
            // ═══════════════════════════════════════════════════════════════
            AuthAction::Outcome {
                ticket: None,
                event,
            } => {
                if state.session_checked {
                    tracing::debug!("Ignoring repeated session check result");
                    return smallvec![Effect::None];
                }

                let mut pending: SmallVec<[Effect<AuthAction>; 4]> = match event {
                    OutcomeEvent::Authenticated(user) => {
                        smallvec![Self::apply_user(state, user, None, env)]
                    },
                    other => {
                        if let Some(error) = other.error() {
                            tracing::warn!(%error, "Session check failed");
                            state.last_failure = Some(error.clone());
                        }
                        SmallVec::new()
                    },
                };
                state.session_checked = true;
                pending.extend(self.release_deferred(state, env));

                if pending.is_empty() {
                    pending.push(Effect::None);
                }
                pending
            },

            // ═══════════════════════════════════════════════════════════════
            // Intent outcome
            // ═══════════════════════════════════════════════════════════════
            AuthAction::Outcome {
                ticket: Some(ticket),
                event,
            } => {
                if !state.is_latest(&ticket) {
                    tracing::debug!(
                        kind = %ticket.kind,
                        request_id = %ticket.request_id,
                        "Dropping outcome of superseded request"
                    );
                    return smallvec![Effect::None];
                }
                state.in_flight.remove(&ticket.kind);
                state
                    .settled
                    .insert(ticket.kind, (ticket.request_id, event.clone()));
                let setup = Self::take_signup_profile(state, &ticket);

                match event {
                    OutcomeEvent::Authenticated(user) => {
                        smallvec![Self::apply_user(state, user, setup, env)]
                    },
                    other => {
                        if let Some(error) = other.error() {
                            tracing::warn!(kind = %ticket.kind, %error, "Provider call failed");
                            state.last_failure = Some(error.clone());
                        }
                        smallvec![Effect::None]
                    },
                }
            },

            // ═══════════════════════════════════════════════════════════════
            // Profile follow-ons: Fire-and-forget delivery
            // ═══════════════════════════════════════════════════════════════
            AuthAction::Profile(event) => {
                tracing::debug!(user_id = %event.user_id(), "Delivering profile event");
                smallvec![effects::deliver_profile(
                    env.profiles.clone(),
                    event,
                    self.sink_timeout
                )]
            },

            AuthAction::CheckSession | AuthAction::Intent { .. } => smallvec![Effect::None],
        }
    }
}
