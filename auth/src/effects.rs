//! Authentication effects.
//!
//! Builders for the effects the auth reducer returns. Each one clones the
//! providers it needs, bounds every provider call with the configured
//! timeout, and turns the result into an [`AuthAction`] for the store to
//! feed back. Effects are **values**: nothing runs until the store executes
//! them.

use crate::actions::{AuthAction, Intent, OutcomeEvent, ProfileEvent};
use crate::error::ProviderError;
use crate::providers::{IdentityProvider, ProfileSink};
use crate::state::{AuthenticatedUser, Credentials, IntentKind, Ticket};
use authflow_core::async_effect;
use authflow_core::effect::Effect;
use authflow_core::stream_effect;
use std::future::Future;
use std::time::Duration;

/// Await a provider call, failing with [`ProviderError::Timeout`] once
/// `timeout` elapses.
///
/// # Errors
///
/// Returns the provider's error, or [`ProviderError::Timeout`].
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(ProviderError::Timeout(timeout)))
}

fn authenticated(ticket: Ticket, result: Result<AuthenticatedUser, ProviderError>) -> AuthAction {
    let event = match result {
        Ok(user) => OutcomeEvent::Authenticated(Some(user)),
        Err(error) => OutcomeEvent::failed(ticket.kind, error),
    };
    AuthAction::outcome(ticket, event)
}

/// Query the provider's current session once.
///
/// Not cancellable: intents wait for its outcome.
pub fn check_session<P>(provider: P, timeout: Duration) -> Effect<AuthAction>
where
    P: IdentityProvider + Clone + 'static,
{
    async_effect! {
        let event = match bounded(timeout, provider.check_current_session()).await {
            Ok(user) => OutcomeEvent::Authenticated(user),
            Err(error) => OutcomeEvent::SessionCheckFailed(error),
        };
        Some(AuthAction::Outcome { ticket: None, event })
    }
}

/// Start the provider work for an accepted intent.
pub fn run_intent<P>(
    provider: P,
    ticket: Ticket,
    intent: Intent,
    timeout: Duration,
) -> Effect<AuthAction>
where
    P: IdentityProvider + Clone + 'static,
{
    match intent {
        Intent::Signup(request) => signup(provider, ticket, request.credentials, timeout),
        Intent::Login(credentials) => login(provider, ticket, credentials, timeout),
        Intent::Logout => logout(provider, ticket, timeout),
        Intent::FederatedLogin => federated_login(provider, ticket, timeout),
    }
}

/// Create an account.
///
/// The profile setup follows from the applied outcome, not from here.
pub fn signup<P>(
    provider: P,
    ticket: Ticket,
    credentials: Credentials,
    timeout: Duration,
) -> Effect<AuthAction>
where
    P: IdentityProvider + Clone + 'static,
{
    let effect = async_effect! {
        let result = bounded(timeout, provider.signup(&credentials)).await;
        Some(authenticated(ticket, result))
    };
    effect.cancellable(IntentKind::Signup.effect_id())
}

/// Sign in with credentials.
pub fn login<P>(
    provider: P,
    ticket: Ticket,
    credentials: Credentials,
    timeout: Duration,
) -> Effect<AuthAction>
where
    P: IdentityProvider + Clone + 'static,
{
    let effect = async_effect! {
        let result = bounded(timeout, provider.signin(&credentials)).await;
        Some(authenticated(ticket, result))
    };
    effect.cancellable(IntentKind::Login.effect_id())
}

/// Sign out, then re-read the provider session.
///
/// Both calls share one `timeout`. A failure of either becomes
/// `LogoutFailed`.
pub fn logout<P>(provider: P, ticket: Ticket, timeout: Duration) -> Effect<AuthAction>
where
    P: IdentityProvider + Clone + 'static,
{
    let effect = async_effect! {
        let result = bounded(timeout, async {
            provider.signout().await?;
            provider.check_current_session().await
        })
        .await;
        let event = match result {
            Ok(user) => OutcomeEvent::Authenticated(user),
            Err(error) => OutcomeEvent::LogoutFailed(error),
        };
        Some(AuthAction::outcome(ticket, event))
    };
    effect.cancellable(IntentKind::Logout.effect_id())
}

/// Run the federated sign-in flow.
pub fn federated_login<P>(provider: P, ticket: Ticket, timeout: Duration) -> Effect<AuthAction>
where
    P: IdentityProvider + Clone + 'static,
{
    let effect = async_effect! {
        let result = bounded(timeout, provider.federated_auth()).await;
        Some(authenticated(ticket, result))
    };
    effect.cancellable(IntentKind::FederatedLogin.effect_id())
}

/// Tell the holder of `ticket` that a newer intent replaced it.
///
/// Not cancellable: it must outlive the work it reports on.
pub fn superseded(ticket: Ticket) -> Effect<AuthAction> {
    async_effect! {
        Some(AuthAction::outcome(ticket, OutcomeEvent::Superseded(ticket.kind)))
    }
}

/// Raise profile follow-ons in order.
///
/// Not cancellable: the outcome they follow from is already applied.
pub fn profile_follow_ons(events: Vec<ProfileEvent>) -> Effect<AuthAction> {
    stream_effect!(futures::stream::iter(
        events.into_iter().map(AuthAction::Profile)
    ))
}

/// Deliver a profile follow-on to the sink. Failures are logged only.
pub fn deliver_profile<K>(sink: K, event: ProfileEvent, timeout: Duration) -> Effect<AuthAction>
where
    K: ProfileSink + Clone + 'static,
{
    async_effect! {
        let result = match &event {
            ProfileEvent::Setup { user_id, profile } => {
                bounded(timeout, sink.setup_profile(user_id, profile)).await
            },
            ProfileEvent::Load { user_id } => bounded(timeout, sink.load_profile(user_id)).await,
        };
        if let Err(error) = result {
            tracing::warn!(user_id = %event.user_id(), %error, "Profile sink failed");
        }
        None
    }
}
