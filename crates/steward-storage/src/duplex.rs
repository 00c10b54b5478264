//! A state manager that drives two backends at once.
//!
//! Used while migrating between storage backends: the primary stays
//! authoritative, and the secondary is kept warm by mirroring every
//! successful read into it. Writes go to both and fail if either side
//! fails.

use async_trait::async_trait;
use tracing::warn;

use steward_types::{State, User};

use crate::error::StorageResult;
use crate::manager::StateManager;

/// Pairs an authoritative primary with a shadowing secondary.
pub struct DuplexStateManager {
    primary: Box<dyn StateManager>,
    secondary: Box<dyn StateManager>,
    mirror_user: User,
    read_fallback: bool,
}

impl DuplexStateManager {
    /// Pair `primary` and `secondary`, attributing mirror writes to
    /// `mirror_user`.
    pub fn new(
        primary: Box<dyn StateManager>,
        secondary: Box<dyn StateManager>,
        mirror_user: User,
    ) -> Self {
        Self {
            primary,
            secondary,
            mirror_user,
            read_fallback: false,
        }
    }

    /// Allow reads to fall back to the secondary when the primary fails.
    pub fn with_read_fallback(mut self, enabled: bool) -> Self {
        self.read_fallback = enabled;
        self
    }
}

#[async_trait]
impl StateManager for DuplexStateManager {
    /// Read from the primary and mirror the result into the secondary.
    ///
    /// A mirror failure is logged, not surfaced: the read already succeeded
    /// and the secondary is best-effort by definition.
    async fn read_state(&self) -> StorageResult<State> {
        let state = match self.primary.read_state().await {
            Ok(state) => state,
            Err(err) if self.read_fallback => {
                warn!(%err, "primary read failed; falling back to secondary");
                return self.secondary.read_state().await;
            }
            Err(err) => return Err(err),
        };

        if let Err(err) = self.secondary.write_state(&state, &self.mirror_user).await {
            warn!(%err, "mirroring read state to secondary failed");
        }
        Ok(state)
    }

    /// Write to the primary, then the secondary. Both must succeed: a state
    /// the secondary could not record must not be treated as persisted, or
    /// the two backends drift apart unnoticed.
    async fn write_state(&self, state: &State, user: &User) -> StorageResult<()> {
        self.primary.write_state(state, user).await?;
        self.secondary.write_state(state, user).await?;
        Ok(())
    }
}
