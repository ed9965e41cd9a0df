//! Activate handler: drop stale generations and claim open pages.

use serde::{Deserialize, Serialize};
use swcache_core::Error;

use super::{CacheManager, WorkerState};
use crate::fetch::Fetcher;

/// Result of a completed activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationReport {
    /// Generation left in place
    pub cache_name: String,
    /// Generations deleted, oldest first
    pub deleted: Vec<String>,
    pub clients_claimed: bool,
}

impl<F: Fetcher + 'static> CacheManager<F> {
    /// Handle the activate event.
    ///
    /// Deletes every generation whose name differs from the current one, then
    /// takes control of all open pages.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` unless the worker is `installed`. Nothing
    /// is deleted in that case, so a failed or missing install never replaces
    /// the previous generation.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let current = &self.settings().cache_name;
        if let Err(state) = self
            .lifecycle()
            .transition_from(WorkerState::Installed, WorkerState::Activating)
            .await
        {
            tracing::warn!(cache = %current, %state, "refusing to activate");
            return Err(Error::InvalidState(format!("cannot activate {current} while {state}")));
        }
        tracing::info!(cache = %current, "activating new version");

        let mut deleted = Vec::new();
        for name in self.db().cache_names().await? {
            if &name == current {
                continue;
            }
            tracing::info!(cache = %name, "deleting old cache");
            if self.db().delete_cache(&name).await? {
                deleted.push(name);
            }
        }

        self.lifecycle().transition(WorkerState::Activated).await;
        self.lifecycle().claim_clients().await;

        Ok(ActivationReport { cache_name: current.clone(), deleted, clients_claimed: true })
    }
}
