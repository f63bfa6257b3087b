//! Mock identity provider for testing.

use crate::error::ProviderError;
use crate::providers::IdentityProvider;
use crate::state::{AuthenticatedUser, Credentials};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Identity provider operation, as recorded by [`MockIdentityProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderCall {
    /// [`IdentityProvider::signup`]
    Signup,
    /// [`IdentityProvider::signin`]
    Signin,
    /// [`IdentityProvider::signout`]
    Signout,
    /// [`IdentityProvider::federated_auth`]
    FederatedAuth,
    /// [`IdentityProvider::check_current_session`]
    CheckCurrentSession,
}

/// Scripted answer for one provider call.
#[derive(Debug, Clone)]
pub struct MockResponse {
    delay: Duration,
    result: Result<Option<AuthenticatedUser>, ProviderError>,
}

impl MockResponse {
    /// Answer with `user`.
    #[must_use]
    pub const fn user(user: AuthenticatedUser) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(Some(user)),
        }
    }

    /// Succeed without a user (signed-out session, or a plain `signout`).
    #[must_use]
    pub const fn no_user() -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(None),
        }
    }

    /// Fail with `error`.
    #[must_use]
    pub const fn error(error: ProviderError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    /// Resolve only after `delay`.
    #[must_use]
    pub const fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// What an unscripted call answers.
enum Fallback {
    User(AuthenticatedUser),
    CurrentSession,
    Nothing,
}

#[derive(Debug, Default)]
struct Inner {
    session: Option<AuthenticatedUser>,
    scripts: HashMap<ProviderCall, VecDeque<MockResponse>>,
    calls: Vec<ProviderCall>,
    failure: Option<ProviderError>,
}

/// Mock identity provider.
///
/// Keeps a provider-side session in memory. Unscripted calls succeed:
/// `signup`/`signin` answer a user with id `uid-{identifier}`,
/// `federated_auth` answers `uid-federated`, `signout` clears the session
/// and `check_current_session` reports it. Scripted responses are consumed
/// in FIFO order per operation and may be delayed, which together with a
/// paused tokio clock makes races deterministic.
///
/// Clones share state, so a test can keep a handle after moving the mock
/// into an environment.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityProvider {
    inner: Arc<Mutex<Inner>>,
}

impl MockIdentityProvider {
    /// Create a new mock with no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose unscripted calls all fail.
    #[must_use]
    pub fn failing() -> Self {
        let mock = Self::new();
        mock.lock().failure = Some(ProviderError::Unavailable("mock provider offline".to_string()));
        mock
    }

    /// Start with `user` signed in.
    #[must_use]
    pub fn with_session(self, user: AuthenticatedUser) -> Self {
        self.lock().session = Some(user);
        self
    }

    /// Queue a response for the next unanswered `call`.
    pub fn respond(&self, call: ProviderCall, response: MockResponse) {
        self.lock()
            .scripts
            .entry(call)
            .or_default()
            .push_back(response);
    }

    /// Every call made so far, in invocation order.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    /// How many times `call` was invoked.
    #[must_use]
    pub fn call_count(&self, call: ProviderCall) -> usize {
        self.lock().calls.iter().filter(|c| **c == call).count()
    }

    /// The provider-side session.
    #[must_use]
    pub fn session(&self) -> Option<AuthenticatedUser> {
        self.lock().session.clone()
    }

    /// User answered by an unscripted `signup`/`signin`.
    #[must_use]
    pub fn default_user(identifier: &str) -> AuthenticatedUser {
        AuthenticatedUser::new(format!("uid-{identifier}")).with_claim("email", identifier)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock(&self.inner)
    }

    fn invoke(
        &self,
        call: ProviderCall,
        fallback: Fallback,
    ) -> impl Future<Output = Result<Option<AuthenticatedUser>, ProviderError>> + Send + 'static
    {
        let scripted = {
            let mut inner = self.lock();
            inner.calls.push(call);
            inner.scripts.get_mut(&call).and_then(VecDeque::pop_front)
        };
        let shared = Arc::clone(&self.inner);

        async move {
            let delay = scripted.as_ref().map_or(Duration::ZERO, |r| r.delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let mut inner = lock(&shared);
            let result = match (scripted, &inner.failure) {
                (Some(response), _) => response.result,
                (None, Some(error)) => Err(error.clone()),
                (None, None) => match fallback {
                    Fallback::User(user) => Ok(Some(user)),
                    Fallback::CurrentSession => Ok(inner.session.clone()),
                    Fallback::Nothing => Ok(None),
                },
            };

            match (call, &result) {
                (
                    ProviderCall::Signup | ProviderCall::Signin | ProviderCall::FederatedAuth,
                    Ok(Some(user)),
                ) => inner.session = Some(user.clone()),
                (ProviderCall::Signout, Ok(_)) => inner.session = None,
                _ => {},
            }

            result
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn require_user(
    result: Result<Option<AuthenticatedUser>, ProviderError>,
) -> Result<AuthenticatedUser, ProviderError> {
    result?.ok_or_else(|| ProviderError::rejected("mock/no-user", "No user in scripted response"))
}

impl IdentityProvider for MockIdentityProvider {
    fn signup(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthenticatedUser, ProviderError>> + Send {
        let call = self.invoke(
            ProviderCall::Signup,
            Fallback::User(Self::default_user(&credentials.identifier)),
        );
        async move { require_user(call.await) }
    }

    fn signin(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthenticatedUser, ProviderError>> + Send {
        let call = self.invoke(
            ProviderCall::Signin,
            Fallback::User(Self::default_user(&credentials.identifier)),
        );
        async move { require_user(call.await) }
    }

    fn signout(&self) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let call = self.invoke(ProviderCall::Signout, Fallback::Nothing);
        async move { call.await.map(|_| ()) }
    }

    fn federated_auth(
        &self,
    ) -> impl Future<Output = Result<AuthenticatedUser, ProviderError>> + Send {
        let call = self.invoke(
            ProviderCall::FederatedAuth,
            Fallback::User(AuthenticatedUser::new("uid-federated")),
        );
        async move { require_user(call.await) }
    }

    fn check_current_session(
        &self,
    ) -> impl Future<Output = Result<Option<AuthenticatedUser>, ProviderError>> + Send {
        self.invoke(ProviderCall::CheckCurrentSession, Fallback::CurrentSession)
    }
}
