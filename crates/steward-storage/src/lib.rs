//! Persistence backends for the deployment state.
//!
//! Every backend implements the [`StateManager`] trait: read the whole
//! [`steward_types::State`], write the whole state. Four managers ship here:
//!
//! - [`HttpStateManager`] reads and conditionally writes the state as a
//!   single resource on a remote server, using the optimistic-concurrency
//!   protocol from `steward-client`.
//! - [`PostgresStateManager`] persists the state in PostgreSQL, recording
//!   deployment changes in an append-only journal.
//! - [`DuplexStateManager`] pairs two managers, mirroring reads into the
//!   secondary and writing through to both.
//! - [`MemoryStateManager`] holds the state in process memory, for tests and
//!   for mirroring.

pub mod config;
pub mod duplex;
pub mod error;
pub mod http;
pub mod manager;
pub mod memory;
pub mod postgres;

pub use config::StorageConfig;
pub use duplex::DuplexStateManager;
pub use error::{StorageError, StorageResult};
pub use http::HttpStateManager;
pub use manager::StateManager;
pub use memory::MemoryStateManager;
pub use postgres::{PostgresConfig, PostgresStateManager};
