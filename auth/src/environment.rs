//! Authentication environment.
//!
//! This module defines the environment type for dependency injection
//! in the auth reducer.

use crate::providers::{IdentityProvider, ProfileSink};
use authflow_core::environment::{Clock, SystemClock};

/// Authentication environment.
///
/// Contains all external dependencies needed by the auth reducer.
///
/// # Type Parameters
///
/// - `P`: Identity provider
/// - `K`: Profile sink
/// - `C`: Clock (stamps `authenticated_at`)
#[derive(Clone)]
pub struct AuthEnvironment<P, K, C = SystemClock>
where
    P: IdentityProvider + Clone,
    K: ProfileSink + Clone,
    C: Clock + Clone,
{
    /// Identity provider.
    pub provider: P,

    /// Profile sink.
    pub profiles: K,

    /// Clock.
    pub clock: C,
}

impl<P, K> AuthEnvironment<P, K, SystemClock>
where
    P: IdentityProvider + Clone,
    K: ProfileSink + Clone,
{
    /// Create a new authentication environment on the system clock.
    #[must_use]
    pub const fn new(provider: P, profiles: K) -> Self {
        Self {
            provider,
            profiles,
            clock: SystemClock,
        }
    }
}

impl<P, K, C> AuthEnvironment<P, K, C>
where
    P: IdentityProvider + Clone,
    K: ProfileSink + Clone,
    C: Clock + Clone,
{
    /// Replace the clock.
    #[must_use]
    pub fn with_clock<C2: Clock + Clone>(self, clock: C2) -> AuthEnvironment<P, K, C2> {
        AuthEnvironment {
            provider: self.provider,
            profiles: self.profiles,
            clock,
        }
    }
}
