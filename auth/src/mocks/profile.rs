//! Mock profile sink for testing.

use crate::actions::ProfileEvent;
use crate::error::ProviderError;
use crate::providers::ProfileSink;
use crate::state::{ProfilePayload, UserId};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mock profile sink.
///
/// Records every delivered event, including those it then fails.
#[derive(Debug, Clone, Default)]
pub struct MockProfileSink {
    events: Arc<Mutex<Vec<ProfileEvent>>>,
    failure: Option<ProviderError>,
}

impl MockProfileSink {
    /// Create a new mock profile sink that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that records deliveries and then fails them.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            events: Arc::default(),
            failure: Some(ProviderError::Unavailable("profile store offline".to_string())),
        }
    }

    /// Every delivered event, in order.
    #[must_use]
    pub fn events(&self) -> Vec<ProfileEvent> {
        self.lock().clone()
    }

    /// Users whose profile was set up.
    #[must_use]
    pub fn setups(&self) -> Vec<UserId> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ProfileEvent::Setup { user_id, .. } => Some(user_id.clone()),
                ProfileEvent::Load { .. } => None,
            })
            .collect()
    }

    /// Users whose profile was loaded.
    #[must_use]
    pub fn loads(&self) -> Vec<UserId> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ProfileEvent::Load { user_id } => Some(user_id.clone()),
                ProfileEvent::Setup { .. } => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ProfileEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: ProfileEvent) -> Result<(), ProviderError> {
        self.lock().push(event);
        self.failure.clone().map_or(Ok(()), Err)
    }
}

impl ProfileSink for MockProfileSink {
    fn setup_profile(
        &self,
        user_id: &UserId,
        profile: &ProfilePayload,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let result = self.record(ProfileEvent::Setup {
            user_id: user_id.clone(),
            profile: profile.clone(),
        });
        async move { result }
    }

    fn load_profile(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let result = self.record(ProfileEvent::Load {
            user_id: user_id.clone(),
        });
        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_deliveries_by_kind() {
        let sink = MockProfileSink::new();
        let user_id = UserId::new("u1");

        tokio_test::block_on(async {
            assert_eq!(sink.setup_profile(&user_id, &ProfilePayload::new()).await, Ok(()));
            assert_eq!(sink.load_profile(&user_id).await, Ok(()));
        });

        assert_eq!(sink.setups(), vec![user_id.clone()]);
        assert_eq!(sink.loads(), vec![user_id]);
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_failing_sink_still_records() {
        let sink = MockProfileSink::failing();
        let user_id = UserId::new("u1");

        let result = tokio_test::block_on(sink.load_profile(&user_id));

        assert!(result.is_err());
        assert_eq!(sink.loads(), vec![user_id]);
    }
}
