//! Property tests for switch-to-latest outcome handling.
//!
//! Logins are issued at a fixed cadence and resolve after random
//! latencies, so their outcomes reach the reducer in arbitrary order.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use authflow_auth::mocks::{MockIdentityProvider, MockProfileSink};
use authflow_auth::{
    AuthAction, AuthConfig, AuthEnvironment, AuthReducer, AuthState, AuthenticatedUser,
    Credentials, Intent, IntentKind, OutcomeEvent, RequestId, Ticket,
};
use authflow_core::reducer::Reducer;
use authflow_testing::{test_clock, FixedClock};
use proptest::prelude::*;

type TestReducer = AuthReducer<MockIdentityProvider, MockProfileSink, FixedClock>;

/// Spacing between two issued logins.
const CADENCE: u64 = 10;

#[derive(Debug, Clone, Copy)]
enum Step {
    Issue(usize),
    Resolve(usize),
}

fn user(index: usize) -> AuthenticatedUser {
    AuthenticatedUser::new(format!("uid-{index}"))
}

/// Order issue and resolve steps by the time they happen.
fn timeline(latencies: &[u64]) -> Vec<Step> {
    let mut steps: Vec<(u64, u8, Step)> = Vec::with_capacity(latencies.len() * 2);
    for (index, latency) in latencies.iter().enumerate() {
        let issued_at = index as u64 * CADENCE;
        steps.push((issued_at, 1, Step::Issue(index)));
        steps.push((issued_at + latency, 0, Step::Resolve(index)));
    }
    // On a tie the outcome arrives before the next intent.
    steps.sort_by_key(|(at, rank, _)| (*at, *rank));
    steps.into_iter().map(|(_, _, step)| step).collect()
}

/// Run the timeline and return the final state and the indices of the
/// outcomes that were applied, in the order they were applied.
fn run(latencies: &[u64]) -> (AuthState, Vec<usize>) {
    let reducer = TestReducer::new(&AuthConfig::default());
    let env = AuthEnvironment::new(MockIdentityProvider::new(), MockProfileSink::new())
        .with_clock(test_clock());
    let mut state = AuthState {
        session_checked: true,
        ..AuthState::default()
    };

    let tickets: Vec<Ticket> = latencies
        .iter()
        .map(|_| Ticket::new(IntentKind::Login, RequestId::new()))
        .collect();
    let mut applied = Vec::new();

    for step in timeline(latencies) {
        match step {
            Step::Issue(index) => {
                let action = AuthAction::Intent {
                    ticket: tickets[index],
                    intent: Intent::Login(Credentials::new(format!("user-{index}"), "pw")),
                };
                let _ = reducer.reduce(&mut state, action, &env);
            },
            Step::Resolve(index) => {
                let action = AuthAction::outcome(
                    tickets[index],
                    OutcomeEvent::Authenticated(Some(user(index))),
                );
                let _ = reducer.reduce(&mut state, action, &env);
                if state.user == Some(user(index)) {
                    applied.push(index);
                }
            },
        }
    }

    (state, applied)
}

proptest! {
    #[test]
    fn prop_last_issued_login_wins(latencies in prop::collection::vec(1u64..100, 1..12)) {
        let (state, _) = run(&latencies);

        prop_assert_eq!(state.user, Some(user(latencies.len() - 1)));
        prop_assert!(state.in_flight.is_empty());
    }

    #[test]
    fn prop_applied_outcomes_never_go_back_in_time(
        latencies in prop::collection::vec(1u64..100, 1..12)
    ) {
        let (_, applied) = run(&latencies);

        prop_assert!(applied.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert_eq!(applied.last().copied(), Some(latencies.len() - 1));
    }
}

#[test]
fn test_out_of_order_resolution_applies_only_latest() {
    // The first login is slow enough to resolve after the second.
    let (state, applied) = run(&[50, 5]);

    assert_eq!(applied, vec![1]);
    assert_eq!(state.user, Some(user(1)));
}

#[test]
fn test_in_order_resolution_applies_each_login() {
    let (state, applied) = run(&[5, 5, 5]);

    assert_eq!(applied, vec![0, 1, 2]);
    assert_eq!(state.user, Some(user(2)));
}
