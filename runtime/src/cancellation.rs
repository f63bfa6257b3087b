//! Switch-to-latest bookkeeping for `Effect::Cancellable`.
//!
//! Each [`EffectId`] owns a generation counter. Starting a cancellable
//! effect bumps the generation and aborts every task registered under the
//! previous one. Tasks carry the [`CancelScope`] they were started with, and
//! the store drops any action whose scope is no longer current, so a stale
//! result cannot be applied even if it raced past the abort.

use authflow_core::effect::EffectId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::AbortHandle;

/// The generation of an [`EffectId`] an effect task was started under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelScope {
    id: EffectId,
    generation: u64,
}

impl CancelScope {
    /// The cancellation group.
    #[must_use]
    pub const fn id(&self) -> &EffectId {
        &self.id
    }

    /// Generation within the group; higher is newer.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Default)]
struct Group {
    generation: u64,
    handles: Vec<AbortHandle>,
}

/// Registry of in-flight cancellable effects, shared by all clones of a store.
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    groups: Arc<Mutex<HashMap<EffectId, Group>>>,
}

impl CancellationRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<EffectId, Group>> {
        // Nothing in the critical sections can panic halfway through an update.
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new generation for `id`, aborting everything still registered
    /// under the previous one.
    ///
    /// Returns the new scope and how many tasks were aborted.
    pub fn begin(&self, id: &EffectId) -> (CancelScope, usize) {
        let mut groups = self.lock();
        let group = groups.entry(id.clone()).or_default();

        group.generation += 1;
        let mut cancelled = 0;
        for handle in group.handles.drain(..) {
            if !handle.is_finished() {
                handle.abort();
                cancelled += 1;
            }
        }

        (
            CancelScope {
                id: id.clone(),
                generation: group.generation,
            },
            cancelled,
        )
    }

    /// Register a task started under `scope`.
    ///
    /// If a newer generation already began, the task is aborted at once.
    pub fn register(&self, scope: &CancelScope, handle: AbortHandle) {
        let mut groups = self.lock();
        let group = groups.entry(scope.id.clone()).or_default();

        if group.generation == scope.generation {
            group.handles.retain(|h| !h.is_finished());
            group.handles.push(handle);
        } else {
            handle.abort();
        }
    }

    /// Whether `scope` is still the latest generation of its group.
    #[must_use]
    pub fn is_current(&self, scope: &CancelScope) -> bool {
        self.lock()
            .get(&scope.id)
            .is_some_and(|group| group.generation == scope.generation)
    }
}

impl std::fmt::Debug for CancellationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let groups = self.lock();
        let mut map = f.debug_map();
        for (id, group) in groups.iter() {
            map.entry(&id.as_str(), &group.generation);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_bumps_generation() {
        let registry = CancellationRegistry::default();
        let id = EffectId::from("login");

        let (first, _) = registry.begin(&id);
        let (second, _) = registry.begin(&id);

        assert!(second.generation() > first.generation());
        assert!(!registry.is_current(&first));
        assert!(registry.is_current(&second));
    }

    #[test]
    fn test_groups_are_independent() {
        let registry = CancellationRegistry::default();
        let (login, _) = registry.begin(&EffectId::from("login"));
        let (_logout, _) = registry.begin(&EffectId::from("logout"));

        assert!(registry.is_current(&login));
    }

    #[tokio::test]
    async fn test_begin_aborts_registered_tasks() {
        let registry = CancellationRegistry::default();
        let id = EffectId::from("signup");

        let (scope, _) = registry.begin(&id);
        let task = tokio::spawn(futures::future::pending::<()>());
        registry.register(&scope, task.abort_handle());

        let (_, cancelled) = registry.begin(&id);
        assert_eq!(cancelled, 1);
        assert!(task.await.is_err_and(|e| e.is_cancelled()));
    }

    #[tokio::test]
    async fn test_register_under_stale_scope_aborts_immediately() {
        let registry = CancellationRegistry::default();
        let id = EffectId::from("federated");

        let (stale, _) = registry.begin(&id);
        let _ = registry.begin(&id);

        let task = tokio::spawn(futures::future::pending::<()>());
        registry.register(&stale, task.abort_handle());
        assert!(task.await.is_err_and(|e| e.is_cancelled()));
    }
}
