//! Intent reducer.
//!
//! Turns caller-issued intents and the startup session check into provider
//! work.
//!
//! # Flow
//!
//! 1. Record the intent's request id as the latest of its kind
//! 2. If the startup session check is still running, park the intent until
//!    its outcome is applied; otherwise start the provider call under the
//!    kind's cancellation id, which aborts any older call of that kind
//! 3. If an older request of the same kind was still waiting, tell its
//!    holder it was superseded
//!
//! Different kinds never cancel each other.

use crate::actions::{AuthAction, Intent};
use crate::effects;
use crate::environment::AuthEnvironment;
use crate::providers::{IdentityProvider, ProfileSink};
use crate::state::{AuthState, Ticket};
use authflow_core::effect::Effect;
use authflow_core::environment::Clock;
use authflow_core::reducer::Reducer;
use authflow_core::{smallvec, SmallVec};
use std::time::Duration;

/// Intent reducer.
///
/// Handles `CheckSession` and `Intent`; every other action is a no-op here.
#[derive(Debug, Clone)]
pub struct IntentReducer<P, K, C> {
    /// Upper bound for each provider call.
    provider_timeout: Duration,
    /// Phantom data to hold type parameters.
    _phantom: std::marker::PhantomData<(P, K, C)>,
}

impl<P, K, C> IntentReducer<P, K, C> {
    /// Create an intent reducer bounding provider calls by `provider_timeout`.
    #[must_use]
    pub const fn new(provider_timeout: Duration) -> Self {
        Self {
            provider_timeout,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<P, K, C> Reducer for IntentReducer<P, K, C>
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
            // CheckSession: Ask the provider who is signed in
            // ═══════════════════════════════════════════════════════════════
            AuthAction::CheckSession => {
                tracing::debug!("Checking current provider session");
                smallvec![effects::check_session(
                    env.provider.clone(),
                    self.provider_timeout
                )]
            },

            // ═══════════════════════════════════════════════════════════════
            // Intent: Start provider work, superseding the previous request
            // ═══════════════════════════════════════════════════════════════
            AuthAction::Intent { ticket, intent } => {
                if ticket.kind != intent.kind() {
                    tracing::warn!(
                        ticket_kind = %ticket.kind,
                        intent_kind = %intent.kind(),
                        "Ignoring intent with mismatched ticket"
                    );
                    return smallvec![Effect::None];
                }

                tracing::debug!(
                    kind = %ticket.kind,
                    request_id = %ticket.request_id,
                    "Intent received"
                );

                let previous = state
                    .in_flight
                    .insert(ticket.kind, ticket.request_id)
                    .filter(|id| *id != ticket.request_id);

                if let Intent::Signup(request) = &intent {
                    state.signup_profile = Some((ticket.request_id, request.profile.clone()));
                }

                let mut pending = SmallVec::new();
                if state.session_checked {
                    pending.push(effects::run_intent(
                        env.provider.clone(),
                        ticket,
                        intent,
                        self.provider_timeout,
                    ));
                } else {
                    tracing::debug!(
                        kind = %ticket.kind,
                        "Deferring intent until the session check completes"
                    );
                    state.pending_intents.retain(|(parked, _)| parked.kind != ticket.kind);
                    state.pending_intents.push((ticket, intent));
                }

                if let Some(previous) = previous {
                    tracing::debug!(
                        kind = %ticket.kind,
                        superseded = %previous,
                        "Superseding in-flight request"
                    );
                    pending.push(effects::superseded(Ticket::new(ticket.kind, previous)));
                }

                if pending.is_empty() {
                    pending.push(Effect::None);
                }
                pending
            },

            AuthAction::Outcome { .. } | AuthAction::Profile(_) => smallvec![Effect::None],
        }
    }
}
