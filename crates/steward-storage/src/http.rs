//! A state manager backed by a remote server.
//!
//! The whole state lives at a single resource path. Reads capture the
//! server's version token; writes are conditional on it, so two operators
//! racing each other cannot silently clobber one another's changes. A write
//! that would not change anything is skipped entirely.

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use steward_client::{HttpClient, ResourceState};
use steward_types::{Manifest, State, User};

use crate::error::{StorageError, StorageResult};
use crate::manager::StateManager;

/// The resource path of the global deployment manifest.
const GDM_PATH: &str = "/gdm";

/// Reads and writes the state as one resource on a remote server.
///
/// The manager retains the [`ResourceState`] from the most recent read and
/// spends it on the next write. A write with no retained read fails with
/// [`StorageError::NotYetRead`]; a successful write discards the token, so
/// the next write requires a fresh read.
pub struct HttpStateManager {
    client: HttpClient,
    reader: User,
    last_read: Mutex<Option<ResourceState>>,
}

impl HttpStateManager {
    /// Create a manager talking to `client`'s server, attributing reads to
    /// `reader`.
    pub fn new(client: HttpClient, reader: User) -> Self {
        Self {
            client,
            reader,
            last_read: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl StateManager for HttpStateManager {
    async fn read_state(&self) -> StorageResult<State> {
        let (mut state, resource): (State, ResourceState) = self
            .client
            .retrieve_with_state(GDM_PATH, &[], &self.reader)
            .await?;
        state.set_etag(resource.etag());

        let deployments = state.deployments().map(|d| d.len()).unwrap_or(0);
        debug!(deployments, etag = resource.etag(), "read state from server");

        *self.last_read.lock().await = Some(resource);
        Ok(state)
    }

    async fn write_state(&self, state: &State, user: &User) -> StorageResult<()> {
        let mut guard = self.last_read.lock().await;
        let from = guard.as_ref().ok_or(StorageError::NotYetRead)?.clone();

        if let Ok(prior) = from.decode::<State>() {
            if unchanged_since_read(&prior, state)? {
                debug!("state unchanged since last read; skipping write");
                return Ok(());
            }
        }

        self.client
            .update(GDM_PATH, &[], &from, state, user)
            .await?;

        // The token was spent; the next write needs a fresh read.
        *guard = None;
        Ok(())
    }
}

/// Whether `next` would persist identically to `prior`.
///
/// Deployments are compared through the diff engine; cluster definitions
/// and manifest metadata (kind, owners) by their serialized form. When
/// either side's deployments cannot be derived, the states are treated as
/// changed and the write proceeds.
fn unchanged_since_read(prior: &State, next: &State) -> StorageResult<bool> {
    let (stored, incoming) = match (prior.deployments(), next.deployments()) {
        (Ok(stored), Ok(incoming)) => (stored, incoming),
        _ => return Ok(false),
    };
    if !stored.diff(&incoming).all(|entry| entry.is_same()) {
        return Ok(false);
    }
    if serde_json::to_value(&prior.defs)? != serde_json::to_value(&next.defs)? {
        return Ok(false);
    }
    Ok(manifest_metadata(prior)? == manifest_metadata(next)?)
}

fn manifest_metadata(state: &State) -> StorageResult<Value> {
    let stripped: Vec<Manifest> = state
        .manifests
        .values()
        .map(|manifest| {
            let mut meta = manifest.clone();
            meta.deployments.clear();
            meta
        })
        .collect();
    Ok(serde_json::to_value(stripped)?)
}
