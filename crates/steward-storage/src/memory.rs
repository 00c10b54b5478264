//! An in-process state manager.

use async_trait::async_trait;
use tokio::sync::RwLock;

use steward_types::{State, User};

use crate::error::StorageResult;
use crate::manager::StateManager;

/// Holds the state in memory. Reads before any write return an empty state.
///
/// Used by tests and as the mirror side of a
/// [`crate::DuplexStateManager`]; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStateManager {
    state: RwLock<Option<State>>,
}

impl MemoryStateManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager already holding `state`.
    pub fn with_state(state: State) -> Self {
        Self {
            state: RwLock::new(Some(state)),
        }
    }
}

#[async_trait]
impl StateManager for MemoryStateManager {
    async fn read_state(&self) -> StorageResult<State> {
        Ok(self.state.read().await.clone().unwrap_or_default())
    }

    async fn write_state(&self, state: &State, _user: &User) -> StorageResult<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_types::{ClusterDef, DeployConfig, DeploySpec, Manifest, SourceLocation};

    fn example_state() -> State {
        let mut state = State::default();
        state
            .defs
            .clusters
            .insert("main".to_string(), ClusterDef::default());
        let mut manifest = Manifest::new(SourceLocation::new("github.com/acme/app", ""));
        manifest.deployments.insert(
            "main".to_string(),
            DeploySpec {
                config: DeployConfig {
                    num_instances: 2,
                    ..Default::default()
                },
                version: semver::Version::new(1, 0, 0),
            },
        );
        state.add_manifest(manifest).unwrap();
        state
    }

    #[tokio::test]
    async fn reads_before_any_write_return_an_empty_state() {
        let manager = MemoryStateManager::new();
        let state = manager.read_state().await.unwrap();
        assert!(state.manifests.is_empty());
    }

    #[tokio::test]
    async fn a_written_state_reads_back_identically() {
        let manager = MemoryStateManager::new();
        let written = example_state();
        manager
            .write_state(&written, &User::new("h", "h@example.com"))
            .await
            .unwrap();

        let read = manager.read_state().await.unwrap();
        let before = written.deployments().unwrap();
        let after = read.deployments().unwrap();
        assert!(before.diff(&after).all(|entry| entry.is_same()));
    }
}
