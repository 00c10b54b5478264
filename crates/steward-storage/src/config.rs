//! Backend selection from configuration.

use serde::{Deserialize, Serialize};
use tracing::debug;

use steward_client::HttpClient;
use steward_types::User;

use crate::duplex::DuplexStateManager;
use crate::error::{StorageError, StorageResult};
use crate::http::HttpStateManager;
use crate::manager::StateManager;
use crate::memory::MemoryStateManager;
use crate::postgres::{PostgresConfig, PostgresStateManager};

/// Which backend holds the deployment state.
///
/// A configured server URL selects the HTTP manager. Without one,
/// PostgreSQL details select a duplex pairing of the database (authoritative)
/// with an in-memory cache kept warm by reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of a state server.
    pub server: Option<String>,

    /// PostgreSQL connection details.
    pub postgres: Option<PostgresConfig>,

    /// In duplex mode, let reads fall back to the cache when the database
    /// is unreachable.
    pub read_fallback: bool,
}

impl StorageConfig {
    /// Build the state manager this configuration describes, attributing
    /// reads and mirror writes to `user`.
    pub fn state_manager(&self, user: &User) -> StorageResult<Box<dyn StateManager>> {
        if let Some(url) = &self.server {
            if self.postgres.is_some() {
                debug!("a server URL is configured; ignoring PostgreSQL settings");
            }
            return Ok(Box::new(HttpStateManager::new(
                HttpClient::new(url)?,
                user.clone(),
            )));
        }

        match &self.postgres {
            Some(postgres) => {
                let database = PostgresStateManager::connect(postgres)?;
                Ok(Box::new(
                    DuplexStateManager::new(
                        Box::new(database),
                        Box::new(MemoryStateManager::new()),
                        user.clone(),
                    )
                    .with_read_fallback(self.read_fallback),
                ))
            }
            None => Err(StorageError::InvalidData(
                "no storage backend configured: set a server URL or PostgreSQL connection details"
                    .to_string(),
            )),
        }
    }
}
