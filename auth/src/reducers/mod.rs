//! Authentication reducers.
//!
//! This module contains pure reducer functions for authentication.
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.

pub mod intents;
pub mod outcomes;

use crate::config::AuthConfig;
use crate::providers::{IdentityProvider, ProfileSink};
use crate::{AuthAction, AuthEnvironment, AuthState, OutcomeEvent};
use authflow_core::environment::{Clock, SystemClock};
use authflow_core::{effect::Effect, reducer::Reducer, SmallVec};

// Re-export
pub use intents::IntentReducer;
pub use outcomes::OutcomeReducer;

/// Unified authentication reducer.
///
/// Combines intent handling and outcome handling into a single reducer.
/// Routes actions to the appropriate sub-reducer based on action type.
#[derive(Clone, Debug)]
pub struct AuthReducer<P, K, C = SystemClock>
where
    P: IdentityProvider + Clone + 'static,
    K: ProfileSink + Clone + 'static,
    C: Clock + Clone + 'static,
{
    intents: IntentReducer<P, K, C>,
    outcomes: OutcomeReducer<P, K, C>,
}

impl<P, K, C> AuthReducer<P, K, C>
where
    P: IdentityProvider + Clone + 'static,
    K: ProfileSink + Clone + 'static,
    C: Clock + Clone + 'static,
{
    /// Create a unified auth reducer from coordinator configuration.
    #[must_use]
    pub const fn new(config: &AuthConfig) -> Self {
        let timeout = config.provider_timeout();
        Self {
            intents: IntentReducer::new(timeout),
            outcomes: OutcomeReducer::new(timeout, timeout),
        }
    }
}

impl<P, K, C> Default for AuthReducer<P, K, C>
where
    P: IdentityProvider + Clone + 'static,
    K: ProfileSink + Clone + 'static,
    C: Clock + Clone + 'static,
{
    fn default() -> Self {
        Self::new(&AuthConfig::default())
    }
}

impl<P, K, C> Reducer for AuthReducer<P, K, C>
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
        // Route to appropriate sub-reducer based on action type
        match action {
            // Commands
            AuthAction::CheckSession | AuthAction::Intent { .. } => {
                self.intents.reduce(state, action, env)
            },

            // Events
            AuthAction::Outcome { .. } | AuthAction::Profile(_) => {
                self.outcomes.reduce(state, action, env)
            },
        }
    }

    fn is_observable(&self, state: &Self::State, action: &Self::Action) -> bool {
        // Outcomes the reducer is about to drop stay private.
        match action {
            AuthAction::Outcome {
                event: OutcomeEvent::Superseded(_),
                ..
            } => true,
            AuthAction::Outcome {
                ticket: Some(ticket),
                ..
            } => state.is_latest(ticket),
            AuthAction::Outcome { ticket: None, .. } => !state.session_checked,
            AuthAction::CheckSession | AuthAction::Intent { .. } | AuthAction::Profile(_) => true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::actions::{Intent, OutcomeEvent, ProfileEvent};
    use crate::error::ProviderError;
    use crate::mocks::{MockIdentityProvider, MockProfileSink, ProviderCall};
    use crate::state::{
        AuthenticatedUser, Credentials, IntentKind, ProfilePayload, RequestId, SignupRequest,
        Ticket,
    };
    use authflow_testing::{assertions, test_clock, FixedClock, ReducerTest};

    type TestReducer = AuthReducer<MockIdentityProvider, MockProfileSink, FixedClock>;
    type TestEnv = AuthEnvironment<MockIdentityProvider, MockProfileSink, FixedClock>;

    fn env() -> TestEnv {
        AuthEnvironment::new(MockIdentityProvider::new(), MockProfileSink::new())
            .with_clock(test_clock())
    }

    /// State once the startup session check has reported nobody.
    fn checked() -> AuthState {
        AuthState {
            session_checked: true,
            ..AuthState::default()
        }
    }

    fn login_ticket() -> Ticket {
        Ticket::new(IntentKind::Login, RequestId::new())
    }

    fn login(ticket: Ticket) -> AuthAction {
        AuthAction::Intent {
            ticket,
            intent: Intent::Login(Credentials::new("ada@example.com", "pw")),
        }
    }

    fn session_check(event: OutcomeEvent) -> AuthAction {
        AuthAction::Outcome {
            ticket: None,
            event,
        }
    }

    fn ada() -> AuthenticatedUser {
        AuthenticatedUser::new("uid-ada").with_claim("email", "ada@example.com")
    }

    fn signup(ticket: Ticket, profile: ProfilePayload) -> AuthAction {
        AuthAction::Intent {
            ticket,
            intent: Intent::Signup(SignupRequest::new(
                Credentials::new("ada@example.com", "pw"),
                profile,
            )),
        }
    }

    #[test]
    fn test_check_session_queries_provider_once() {
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::CheckSession)
            .then_state(|state| assert!(!state.session_checked))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_no_cancellable_effects(effects);
            })
            .then_actions(|actions| {
                assert_eq!(actions, [session_check(OutcomeEvent::Authenticated(None))]);
            })
            .run();
    }

    #[test]
    fn test_each_intent_runs_under_its_kind() {
        let intents = [
            Intent::Signup(SignupRequest::new(
                Credentials::new("ada", "pw"),
                ProfilePayload::new(),
            )),
            Intent::Login(Credentials::new("ada", "pw")),
            Intent::Logout,
            Intent::FederatedLogin,
        ];

        for intent in intents {
            let kind = intent.kind();
            ReducerTest::new(TestReducer::default())
                .with_env(env())
                .given_state(checked())
                .when_action(AuthAction::intent(intent))
                .then_state(move |state| {
                    assert!(state.in_flight.contains_key(&kind));
                    assert!(state.pending_intents.is_empty());
                })
                .then_effects(move |effects| {
                    assertions::assert_effects_count(effects, 1);
                    assertions::assert_has_cancellable_effect(effects, kind.effect_id());
                })
                .run();
        }
    }

    #[test]
    fn test_intent_waits_for_session_check() {
        let ticket = login_ticket();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(AuthState::default())
            .given_action(AuthAction::CheckSession)
            .when_action(login(ticket))
            .then_state(move |state| {
                assert!(state.is_latest(&ticket));
                assert_eq!(state.pending_intents.len(), 1);
                assert_eq!(state.pending_intents[0].0, ticket);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_session_check_applies_before_deferred_intents_start() {
        let provider = MockIdentityProvider::new();
        let ticket = login_ticket();
        let logout = Ticket::new(IntentKind::Logout, RequestId::new());
        let calls = provider.clone();

        ReducerTest::new(TestReducer::default())
            .with_env(
                AuthEnvironment::new(provider, MockProfileSink::new()).with_clock(test_clock()),
            )
            .given_state(AuthState::default())
            .given_action(login(ticket))
            .given_action(AuthAction::Intent {
                ticket: logout,
                intent: Intent::Logout,
            })
            .when_action(session_check(OutcomeEvent::Authenticated(Some(ada()))))
            .then_state(|state| {
                assert!(state.session_checked);
                assert_eq!(state.user, Some(ada()));
                assert!(state.pending_intents.is_empty());
                assert_eq!(state.in_flight.len(), 2);
            })
            .then_effects(move |effects| {
                // Profile load, then the two deferred intents in arrival order
                assertions::assert_effects_count(effects, 3);
                assert!(matches!(effects[0], Effect::Stream(_)));
                assertions::assert_has_cancellable_effect(effects, IntentKind::Login.effect_id());
                assertions::assert_has_cancellable_effect(effects, IntentKind::Logout.effect_id());
            })
            .then_actions(move |actions| {
                assert_eq!(
                    actions[0],
                    AuthAction::Profile(ProfileEvent::Load { user_id: ada().id })
                );
                assert!(matches!(
                    &actions[1],
                    AuthAction::Outcome {
                        ticket: Some(t),
                        event: OutcomeEvent::Authenticated(Some(_)),
                    } if *t == ticket
                ));
                assert!(matches!(
                    &actions[2],
                    AuthAction::Outcome { ticket: Some(t), .. } if *t == logout
                ));
                assert_eq!(
                    calls.calls(),
                    vec![
                        ProviderCall::Signin,
                        ProviderCall::Signout,
                        ProviderCall::CheckCurrentSession
                    ]
                );
            })
            .run();
    }

    #[test]
    fn test_failed_session_check_still_releases_deferred_intents() {
        let ticket = login_ticket();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(AuthState::default())
            .given_action(login(ticket))
            .when_action(session_check(OutcomeEvent::SessionCheckFailed(
                ProviderError::Unavailable("offline".to_string()),
            )))
            .then_state(|state| {
                assert!(state.session_checked);
                assert_eq!(state.user, None);
                assert!(state.last_failure.is_some());
                assert!(state.pending_intents.is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_cancellable_effect(effects, IntentKind::Login.effect_id());
            })
            .run();
    }

    #[test]
    fn test_deferred_intent_is_superseded_by_newer_one() {
        let first = login_ticket();
        let second = login_ticket();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(AuthState::default())
            .given_action(login(first))
            .when_action(login(second))
            .then_state(move |state| {
                assert_eq!(state.pending_intents.len(), 1);
                assert_eq!(state.pending_intents[0].0, second);
                assert!(state.is_latest(&second));
            })
            .then_effects(assertions::assert_no_cancellable_effects)
            .then_actions(move |actions| {
                assert_eq!(
                    actions,
                    [AuthAction::outcome(first, OutcomeEvent::Superseded(IntentKind::Login))]
                );
            })
            .run();
    }

    #[test]
    fn test_second_intent_supersedes_first() {
        let first = login_ticket();
        let second = login_ticket();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(checked())
            .given_action(login(first))
            .when_action(login(second))
            .then_state(move |state| {
                assert_eq!(state.in_flight.get(&IntentKind::Login), Some(&second.request_id));
            })
            .then_effects(|effects| {
                // New provider call plus the superseded notice
                assertions::assert_effects_count(effects, 2);
                assertions::assert_has_cancellable_effect(effects, IntentKind::Login.effect_id());
            })
            .then_actions(move |actions| {
                assert!(actions.contains(&AuthAction::outcome(
                    first,
                    OutcomeEvent::Superseded(IntentKind::Login)
                )));
            })
            .run();
    }

    #[test]
    fn test_other_kinds_do_not_supersede() {
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(checked())
            .given_action(login(login_ticket()))
            .when_action(AuthAction::intent(Intent::Logout))
            .then_state(|state| assert_eq!(state.in_flight.len(), 2))
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_mismatched_ticket_is_ignored() {
        let ticket = Ticket::new(IntentKind::Signup, RequestId::new());

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(checked())
            .when_action(AuthAction::Intent {
                ticket,
                intent: Intent::Logout,
            })
            .then_state(|state| assert!(state.in_flight.is_empty()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_authenticated_replaces_user_and_loads_profile() {
        let ticket = login_ticket();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(AuthState {
                user: Some(AuthenticatedUser::new("someone-else")),
                last_failure: Some(ProviderError::Unavailable("earlier".to_string())),
                ..checked()
            })
            .given_action(login(ticket))
            .when_action(AuthAction::outcome(
                ticket,
                OutcomeEvent::Authenticated(Some(ada())),
            ))
            .then_state(move |state| {
                assert_eq!(state.user, Some(ada()));
                assert_eq!(state.authenticated_at, Some(test_clock().now()));
                assert!(state.in_flight.is_empty());
                assert_eq!(state.last_failure, None);
                assert_eq!(
                    state.settlement(&ticket),
                    Some(OutcomeEvent::Authenticated(Some(ada())))
                );
            })
            .then_effects(assertions::assert_no_cancellable_effects)
            .then_actions(|actions| {
                assert_eq!(
                    actions,
                    [AuthAction::Profile(ProfileEvent::Load { user_id: ada().id })]
                );
            })
            .run();
    }

    #[test]
    fn test_signup_success_sets_up_then_loads_profile() {
        let ticket = Ticket::new(IntentKind::Signup, RequestId::new());
        let profile = ProfilePayload::new().field("display_name", "Ada");
        let expected = profile.clone();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(checked())
            .given_action(signup(ticket, profile))
            .when_action(AuthAction::outcome(
                ticket,
                OutcomeEvent::Authenticated(Some(ada())),
            ))
            .then_state(|state| {
                assert_eq!(state.user, Some(ada()));
                assert_eq!(state.signup_profile, None);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_no_cancellable_effects(effects);
            })
            .then_actions(move |actions| {
                assert_eq!(
                    actions,
                    [
                        AuthAction::Profile(ProfileEvent::Setup {
                            user_id: ada().id,
                            profile: expected,
                        }),
                        AuthAction::Profile(ProfileEvent::Load { user_id: ada().id }),
                    ]
                );
            })
            .run();
    }

    #[test]
    fn test_signup_failure_drops_pending_profile() {
        let ticket = Ticket::new(IntentKind::Signup, RequestId::new());
        let error = ProviderError::rejected("auth/email-already-in-use", "Taken");

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(checked())
            .given_action(signup(ticket, ProfilePayload::new().field("display_name", "Ada")))
            .when_action(AuthAction::outcome(ticket, OutcomeEvent::SignupFailed(error)))
            .then_state(|state| {
                assert_eq!(state.user, None);
                assert_eq!(state.signup_profile, None);
                assert!(state.last_failure.is_some());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_superseded_signup_profile_is_never_set_up() {
        let first = Ticket::new(IntentKind::Signup, RequestId::new());
        let second = Ticket::new(IntentKind::Signup, RequestId::new());

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(checked())
            .given_action(signup(first, ProfilePayload::new().field("display_name", "First")))
            .given_action(signup(second, ProfilePayload::new().field("display_name", "Second")))
            .when_action(AuthAction::outcome(
                first,
                OutcomeEvent::Authenticated(Some(ada())),
            ))
            .then_state(move |state| {
                assert_eq!(state.user, None);
                assert_eq!(
                    state.signup_profile.as_ref().map(|(id, _)| *id),
                    Some(second.request_id)
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_authenticated_none_clears_user_without_follow_on() {
        let ticket = Ticket::new(IntentKind::Logout, RequestId::new());

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(AuthState {
                user: Some(ada()),
                ..checked()
            })
            .given_action(AuthAction::Intent {
                ticket,
                intent: Intent::Logout,
            })
            .when_action(AuthAction::outcome(ticket, OutcomeEvent::Authenticated(None)))
            .then_state(|state| {
                assert_eq!(state.user, None);
                assert_eq!(state.authenticated_at, None);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_failure_keeps_user() {
        let ticket = login_ticket();
        let error = ProviderError::rejected("auth/wrong-password", "Wrong password");
        let expected = error.clone();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(AuthState {
                user: Some(ada()),
                ..checked()
            })
            .given_action(login(ticket))
            .when_action(AuthAction::outcome(ticket, OutcomeEvent::LoginFailed(error)))
            .then_state(move |state| {
                assert_eq!(state.user, Some(ada()));
                assert_eq!(state.last_failure, Some(expected));
                assert!(state.in_flight.is_empty());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_stale_outcome_is_dropped() {
        let first = login_ticket();
        let second = login_ticket();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(checked())
            .given_action(login(first))
            .given_action(login(second))
            .when_action(AuthAction::outcome(
                first,
                OutcomeEvent::Authenticated(Some(ada())),
            ))
            .then_state(move |state| {
                assert_eq!(state.user, None);
                assert!(state.is_latest(&second));
                assert!(state.settled.is_empty());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_session_check_failure_marks_checked() {
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(session_check(OutcomeEvent::SessionCheckFailed(
                ProviderError::Unavailable("offline".to_string()),
            )))
            .then_state(|state| {
                assert!(state.session_checked);
                assert_eq!(state.user, None);
                assert!(state.last_failure.is_some());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_repeated_session_check_is_ignored() {
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(AuthState::default())
            .given_action(session_check(OutcomeEvent::Authenticated(Some(ada()))))
            .when_action(session_check(OutcomeEvent::Authenticated(None)))
            .then_state(|state| assert_eq!(state.user, Some(ada())))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_superseded_notice_leaves_state_alone() {
        let first = login_ticket();
        let second = login_ticket();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(checked())
            .given_action(login(first))
            .given_action(login(second))
            .when_action(AuthAction::outcome(
                first,
                OutcomeEvent::Superseded(IntentKind::Login),
            ))
            .then_state(move |state| assert!(state.is_latest(&second)))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_profile_events_go_to_sink() {
        for event in [
            ProfileEvent::Setup {
                user_id: ada().id,
                profile: ProfilePayload::new().field("display_name", "Ada"),
            },
            ProfileEvent::Load { user_id: ada().id },
        ] {
            let sink = MockProfileSink::new();
            let delivered = sink.clone();
            let expected = event.clone();

            ReducerTest::new(TestReducer::default())
                .with_env(
                    AuthEnvironment::new(MockIdentityProvider::new(), sink)
                        .with_clock(test_clock()),
                )
                .given_state(AuthState::default())
                .when_action(AuthAction::Profile(event))
                .then_state(|state| assert_eq!(*state, AuthState::default()))
                .then_effects(|effects| assertions::assert_effects_count(effects, 1))
                .then_actions(move |actions| {
                    assert!(actions.is_empty());
                    assert_eq!(delivered.events(), vec![expected]);
                })
                .run();
        }
    }

    #[test]
    fn test_only_outcomes_that_apply_are_observable() {
        let reducer = TestReducer::default();
        let first = login_ticket();
        let second = login_ticket();
        let mut state = checked();
        state.in_flight.insert(IntentKind::Login, second.request_id);

        let stale = AuthAction::outcome(first, OutcomeEvent::Authenticated(Some(ada())));
        let latest = AuthAction::outcome(second, OutcomeEvent::Authenticated(Some(ada())));
        let notice = AuthAction::outcome(first, OutcomeEvent::Superseded(IntentKind::Login));
        let late_check = session_check(OutcomeEvent::Authenticated(None));

        assert!(!reducer.is_observable(&state, &stale));
        assert!(reducer.is_observable(&state, &latest));
        assert!(reducer.is_observable(&state, &notice));
        assert!(!reducer.is_observable(&state, &late_check));
        assert!(reducer.is_observable(&AuthState::default(), &late_check));
        assert!(reducer.is_observable(
            &state,
            &AuthAction::Profile(ProfileEvent::Load { user_id: ada().id })
        ));
    }
}
