//! Worker lifecycle state and the client-control primitives.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Lifecycle states a worker moves through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, no event handled yet
    #[default]
    Parsed,
    Installing,
    /// Installed, waiting to activate
    Installed,
    Activating,
    /// Active and serving fetches
    Activated,
    /// Installation failed; this worker will never activate
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}

/// Point-in-time view of the lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleSnapshot {
    pub state: WorkerState,
    /// Takeover requested without waiting for open pages to close
    pub skip_waiting: bool,
    /// Open pages are controlled without a navigation
    pub clients_claimed: bool,
}

/// Shared lifecycle state of one worker.
#[derive(Debug, Default)]
pub struct Lifecycle {
    inner: RwLock<LifecycleSnapshot>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> LifecycleSnapshot {
        *self.inner.read().await
    }

    pub async fn state(&self) -> WorkerState {
        self.inner.read().await.state
    }

    /// Finish installing immediately instead of waiting for open pages to close.
    pub async fn skip_waiting(&self) {
        let mut inner = self.inner.write().await;
        if !inner.skip_waiting {
            tracing::debug!(state = %inner.state, "skip waiting requested");
        }
        inner.skip_waiting = true;
    }

    /// Take control of every open page without waiting for a navigation.
    pub async fn claim_clients(&self) {
        self.inner.write().await.clients_claimed = true;
    }

    /// Move from `from` to `next` only if the worker is currently in `from`.
    ///
    /// Returns the actual state when it differs.
    pub(crate) async fn transition_from(&self, from: WorkerState, next: WorkerState) -> Result<(), WorkerState> {
        let mut inner = self.inner.write().await;
        if inner.state != from {
            return Err(inner.state);
        }
        tracing::debug!(from = %inner.state, to = %next, "worker state change");
        inner.state = next;
        Ok(())
    }

    pub(crate) async fn transition(&self, next: WorkerState) {
        let mut inner = self.inner.write().await;
        if inner.state != next {
            tracing::debug!(from = %inner.state, to = %next, "worker state change");
            inner.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_snapshot() {
        let lifecycle = Lifecycle::new();
        let snapshot = lifecycle.snapshot().await;
        assert_eq!(snapshot.state, WorkerState::Parsed);
        assert!(!snapshot.skip_waiting);
        assert!(!snapshot.clients_claimed);
    }

    #[tokio::test]
    async fn test_control_primitives() {
        let lifecycle = Lifecycle::new();
        lifecycle.skip_waiting().await;
        lifecycle.skip_waiting().await;
        lifecycle.claim_clients().await;

        let snapshot = lifecycle.snapshot().await;
        assert!(snapshot.skip_waiting);
        assert!(snapshot.clients_claimed);
    }

    #[tokio::test]
    async fn test_transition_from_checks_current_state() {
        let lifecycle = Lifecycle::new();
        let result = lifecycle.transition_from(WorkerState::Installed, WorkerState::Activating).await;
        assert_eq!(result, Err(WorkerState::Parsed));
        assert_eq!(lifecycle.state().await, WorkerState::Parsed);

        lifecycle.transition(WorkerState::Installed).await;
        lifecycle
            .transition_from(WorkerState::Installed, WorkerState::Activating)
            .await
            .unwrap();
        assert_eq!(lifecycle.state().await, WorkerState::Activating);
    }

    #[tokio::test]
    async fn test_transition() {
        let lifecycle = Lifecycle::new();
        lifecycle.transition(WorkerState::Installing).await;
        lifecycle.transition(WorkerState::Installed).await;
        assert_eq!(lifecycle.state().await, WorkerState::Installed);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WorkerState::Activated.to_string(), "activated");
        assert_eq!(serde_json::to_string(&WorkerState::Redundant).unwrap(), "\"redundant\"");
    }
}
