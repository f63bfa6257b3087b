//! Mock provider implementations for testing.
//!
//! This module provides in-memory implementations of the provider traits
//! for use in unit and integration tests.

pub mod identity;
pub mod profile;

pub use identity::{MockIdentityProvider, MockResponse, ProviderCall};
pub use profile::MockProfileSink;
