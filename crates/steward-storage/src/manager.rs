//! The storage abstraction every backend implements.

use async_trait::async_trait;
use std::fmt;

use steward_types::{State, User};

use crate::error::StorageResult;

/// Whole-state persistence.
///
/// A manager reads the complete deployment state and writes it back as a
/// unit. Writes are attributed to a [`User`] for auditing. Backends that
/// support optimistic concurrency require every write to follow a read; a
/// write rejected because the state moved underneath the caller surfaces as
/// a retryable error, and the caller re-reads and retries.
#[async_trait]
pub trait StateManager: Send + Sync {
    /// Read the complete current state.
    async fn read_state(&self) -> StorageResult<State>;

    /// Persist `state` on behalf of `user`.
    async fn write_state(&self, state: &State, user: &User) -> StorageResult<()>;
}

impl fmt::Debug for dyn StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn StateManager")
    }
}
