//! Client-side optimistic-concurrency CRUD over HTTP.
//!
//! Distributed callers read shared resources, mutate them locally, and write
//! them back conditionally: every read captures an opaque [`ResourceState`]
//! (ETag plus body snapshots), and every mutation requires one, so the server
//! can reject writes against a resource that moved underneath the caller.
//! A rejected conditional write surfaces as a retryable error: the caller
//! re-reads and retries; nothing is retried inside this crate.

pub mod client;
pub mod error;

pub use client::{HttpClient, ResourceState};
pub use error::{ClientError, ClientResult};
