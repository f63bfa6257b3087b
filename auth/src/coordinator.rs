//! The authentication coordinator.
//!
//! [`AuthCoordinator`] owns a [`Store`] running the [`AuthReducer`] and is
//! the only thing views talk to. It records intents, exposes the canonical
//! authenticated-user stream, and answers state snapshots.
//!
//! # Streams
//!
//! All streams are multicast views of the store's action broadcast. They
//! replay nothing: a stream only yields what happens after it was created.
//! A stream that falls more than `broadcast_capacity` actions behind skips
//! the oldest ones and logs a warning.

use crate::actions::{AuthAction, Intent, OutcomeEvent, ProfileEvent};
use crate::config::AuthConfig;
use crate::environment::AuthEnvironment;
use crate::error::{AuthError, Result};
use crate::providers::{IdentityProvider, ProfileSink};
use crate::reducers::AuthReducer;
use crate::state::{
    AuthState, AuthenticatedUser, Credentials, IntentKind, RequestId, SignupRequest, Ticket,
};
use authflow_core::environment::{Clock, SystemClock};
use authflow_runtime::{Store, StoreConfig, StoreError};
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// The store type behind a coordinator.
pub type AuthStore<P, K, C> =
    Store<AuthState, AuthAction, AuthEnvironment<P, K, C>, AuthReducer<P, K, C>>;

/// Stream of non-null authenticated users.
pub type AuthUserStream = Pin<Box<dyn Stream<Item = AuthenticatedUser> + Send>>;

/// Stream of every outcome, with the ticket of the intent it answers.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = (Option<Ticket>, OutcomeEvent)> + Send>>;

/// Stream of derived profile follow-ons.
pub type ProfileEventStream = Pin<Box<dyn Stream<Item = ProfileEvent> + Send>>;

/// Event-driven authentication state machine.
///
/// # Example
///
/// ```ignore
/// let coordinator = AuthCoordinator::start(
///     AuthEnvironment::new(provider, profiles),
///     AuthConfig::from_env()?,
/// )
/// .await?;
///
/// let mut users = coordinator.login(Credentials::new("ada@example.com", "pw")).await?;
/// while let Some(user) = users.next().await {
///     render_home(&user);
/// }
/// ```
pub struct AuthCoordinator<P, K, C = SystemClock>
where
    P: IdentityProvider + Clone + 'static,
    K: ProfileSink + Clone + 'static,
    C: Clock + Clone + 'static,
{
    store: AuthStore<P, K, C>,
    config: AuthConfig,
}

impl<P, K, C> AuthCoordinator<P, K, C>
where
    P: IdentityProvider + Clone + 'static,
    K: ProfileSink + Clone + 'static,
    C: Clock + Clone + 'static,
{
    /// Build the store and dispatch the startup session check.
    ///
    /// Returns once the check is dispatched, not once it has resolved; see
    /// [`AuthCoordinator::wait_for_session_check`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if `config` is invalid.
    #[tracing::instrument(skip_all, name = "auth_start")]
    pub async fn start(environment: AuthEnvironment<P, K, C>, config: AuthConfig) -> Result<Self> {
        config.validate()?;

        let store_config = StoreConfig::default()
            .with_broadcast_capacity(config.broadcast_capacity)
            .with_shutdown_timeout(config.shutdown_timeout());
        let store = Store::with_config(
            AuthState::default(),
            AuthReducer::new(&config),
            environment,
            store_config,
        );

        tracing::info!(
            provider_timeout_ms = config.provider_timeout_ms,
            "Starting auth coordinator"
        );
        store.send(AuthAction::CheckSession).await?;

        Ok(Self { store, config })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Intents
    // ═══════════════════════════════════════════════════════════════════════

    /// Sign up, then set up the new user's profile.
    ///
    /// Returns the canonical authenticated-user stream, not a stream specific
    /// to this call. Use [`AuthCoordinator::signup_and_wait`] for this call's
    /// own result.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the coordinator is shutting down.
    #[tracing::instrument(skip_all, fields(identifier = %request.credentials.identifier))]
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthUserStream> {
        let users = self.authenticated_user();
        self.dispatch(Intent::Signup(request)).await?;
        Ok(users)
    }

    /// Log in with credentials.
    ///
    /// Returns the canonical authenticated-user stream.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the coordinator is shutting down.
    #[tracing::instrument(skip_all, fields(identifier = %credentials.identifier))]
    pub async fn login(&self, credentials: Credentials) -> Result<AuthUserStream> {
        let users = self.authenticated_user();
        self.dispatch(Intent::Login(credentials)).await?;
        Ok(users)
    }

    /// Log in through the provider's federated flow.
    ///
    /// Returns the canonical authenticated-user stream.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the coordinator is shutting down.
    #[tracing::instrument(skip_all)]
    pub async fn federated_login(&self) -> Result<AuthUserStream> {
        let users = self.authenticated_user();
        self.dispatch(Intent::FederatedLogin).await?;
        Ok(users)
    }

    /// Log out.
    ///
    /// Observe the result through [`AuthCoordinator::outcomes`] or use
    /// [`AuthCoordinator::logout_and_wait`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the coordinator is shutting down.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self) -> Result<()> {
        self.dispatch(Intent::Logout).await.map(|_| ())
    }

    /// Sign up and wait for this call's own outcome.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Failed`]: the provider failed the signup
    /// - [`AuthError::Superseded`]: a newer signup replaced this one
    /// - [`AuthError::Timeout`]: no outcome within the response timeout
    #[tracing::instrument(skip_all, fields(identifier = %request.credentials.identifier))]
    pub async fn signup_and_wait(&self, request: SignupRequest) -> Result<AuthenticatedUser> {
        self.dispatch_and_wait(Intent::Signup(request))
            .await?
            .ok_or(AuthError::NoSession {
                kind: IntentKind::Signup,
            })
    }

    /// Log in and wait for this call's own outcome.
    ///
    /// # Errors
    ///
    /// Same as [`AuthCoordinator::signup_and_wait`].
    #[tracing::instrument(skip_all, fields(identifier = %credentials.identifier))]
    pub async fn login_and_wait(&self, credentials: Credentials) -> Result<AuthenticatedUser> {
        self.dispatch_and_wait(Intent::Login(credentials))
            .await?
            .ok_or(AuthError::NoSession {
                kind: IntentKind::Login,
            })
    }

    /// Run the federated flow and wait for this call's own outcome.
    ///
    /// # Errors
    ///
    /// Same as [`AuthCoordinator::signup_and_wait`].
    #[tracing::instrument(skip_all)]
    pub async fn federated_login_and_wait(&self) -> Result<AuthenticatedUser> {
        self.dispatch_and_wait(Intent::FederatedLogin)
            .await?
            .ok_or(AuthError::NoSession {
                kind: IntentKind::FederatedLogin,
            })
    }

    /// Log out and wait for this call's own outcome.
    ///
    /// # Errors
    ///
    /// Same as [`AuthCoordinator::signup_and_wait`].
    #[tracing::instrument(skip_all)]
    pub async fn logout_and_wait(&self) -> Result<()> {
        self.dispatch_and_wait(Intent::Logout).await.map(|_| ())
    }

    async fn dispatch(&self, intent: Intent) -> Result<Ticket> {
        let ticket = Ticket::new(intent.kind(), RequestId::new());
        tracing::debug!(kind = %ticket.kind, request_id = %ticket.request_id, "Dispatching intent");
        self.store.send(AuthAction::Intent { ticket, intent }).await?;
        Ok(ticket)
    }

    async fn dispatch_and_wait(&self, intent: Intent) -> Result<Option<AuthenticatedUser>> {
        let kind = intent.kind();
        let ticket = Ticket::new(kind, RequestId::new());

        // Subscribed before sending so an immediate outcome is not missed.
        let mut rx = self.store.subscribe_actions();
        self.store.send(AuthAction::Intent { ticket, intent }).await?;

        let event = tokio::time::timeout(self.config.response_timeout(), async {
            loop {
                match rx.recv().await {
                    Ok(action) => {
                        if let Some(event) = action.into_outcome_of(&ticket) {
                            return Ok(event);
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, kind = %kind, "Outcome waiter lagged");
                        // The outcome may be among the skipped actions.
                        if let Some(event) = self.store.state(|s| s.settlement(&ticket)).await {
                            return Ok(event);
                        }
                    },
                    Err(RecvError::Closed) => {
                        return Err(AuthError::Store(StoreError::ChannelClosed));
                    },
                }
            }
        })
        .await
        .map_err(|_| AuthError::Timeout)??;

        event.into_result(kind)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Observation
    // ═══════════════════════════════════════════════════════════════════════

    /// The canonical "who is logged in" stream.
    ///
    /// Yields every applied `Authenticated` carrying a user; sign-outs are
    /// filtered out.
    #[must_use]
    pub fn authenticated_user(&self) -> AuthUserStream {
        self.watch(|action| match action {
            AuthAction::Outcome {
                event: OutcomeEvent::Authenticated(Some(user)),
                ..
            } => Some(user),
            _ => None,
        })
    }

    /// Every outcome, including failures and superseded notices.
    #[must_use]
    pub fn outcomes(&self) -> OutcomeStream {
        self.watch(|action| match action {
            AuthAction::Outcome { ticket, event } => Some((ticket, event)),
            _ => None,
        })
    }

    /// Derived profile follow-ons (`Setup` after signup, `Load` after any
    /// authentication).
    #[must_use]
    pub fn profile_events(&self) -> ProfileEventStream {
        self.watch(|action| match action {
            AuthAction::Profile(event) => Some(event),
            _ => None,
        })
    }

    fn watch<T, F>(&self, select: F) -> Pin<Box<dyn Stream<Item = T> + Send>>
    where
        T: Send + 'static,
        F: Fn(AuthAction) -> Option<T> + Send + 'static,
    {
        // Subscribed here, not on first poll, so nothing between creation
        // and first poll is missed.
        let mut rx = self.store.subscribe_actions();

        Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(action) => {
                        if let Some(item) = select(action) {
                            yield item;
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth observer lagged, {} actions skipped", skipped);
                    },
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Snapshots
    // ═══════════════════════════════════════════════════════════════════════

    /// The currently authenticated user.
    pub async fn current_user(&self) -> Option<AuthenticatedUser> {
        self.store.state(|s| s.user.clone()).await
    }

    /// Whether the startup session check has completed.
    pub async fn is_session_checked(&self) -> bool {
        self.store.state(|s| s.session_checked).await
    }

    /// A copy of the full state.
    pub async fn state(&self) -> AuthState {
        self.store.state(AuthState::clone).await
    }

    /// Wait until the startup session check has completed.
    ///
    /// Returns the user known at that point.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Timeout`] if the check does not complete within
    /// the response timeout.
    pub async fn wait_for_session_check(&self) -> Result<Option<AuthenticatedUser>> {
        let mut rx = self.store.subscribe_actions();

        tokio::time::timeout(self.config.response_timeout(), async {
            loop {
                let checked = self
                    .store
                    .state(|s| s.session_checked.then(|| s.user.clone()))
                    .await;
                if let Some(user) = checked {
                    return Ok(user);
                }
                match rx.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => {},
                    Err(RecvError::Closed) => {
                        return Err(AuthError::Store(StoreError::ChannelClosed));
                    },
                }
            }
        })
        .await
        .map_err(|_| AuthError::Timeout)?
    }

    /// The configuration this coordinator runs with.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Stop accepting intents and wait for in-flight work to drain.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if work is still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        tracing::info!("Shutting down auth coordinator");
        self.store.shutdown(timeout).await?;
        Ok(())
    }

    /// Shut down using the configured shutdown timeout.
    ///
    /// # Errors
    ///
    /// Same as [`AuthCoordinator::shutdown`].
    pub async fn shutdown_default(&self) -> Result<()> {
        self.shutdown(self.config.shutdown_timeout()).await
    }
}

impl<P, K, C> fmt::Debug for AuthCoordinator<P, K, C>
where
    P: IdentityProvider + Clone + 'static,
    K: ProfileSink + Clone + 'static,
    C: Clock + Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCoordinator")
            .field("config", &self.config)
            .field("pending_effects", &self.store.pending_effects())
            .finish_non_exhaustive()
    }
}
