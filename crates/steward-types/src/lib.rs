//! Core state model for the steward deployment orchestrator.
//!
//! The root aggregate is the [`State`]: a collection of [`Manifest`]s (one
//! source project's deployment intent, broken out per cluster) plus the
//! global definitions they draw on. A `State` derives a flat [`Deployments`]
//! collection on demand, and the diff engine in this crate classifies the
//! differences between two such collections down to the field level. Those
//! classifications drive both conflict detection and reconciliation.

pub mod deploy_config;
pub mod deployment;
pub mod flaw;
pub mod manifest;
pub mod resolve;
pub mod source;
pub mod state;
pub mod user;

pub use deploy_config::{
    flatten_deploy_configs, DeployConfig, Env, Resources, Variances, Volume, VolumeMode, Volumes,
};
pub use deployment::{Deployment, DeploymentDiff, DeploymentId, Deployments};
pub use flaw::{Flaw, FlawError};
pub use manifest::{DeploySpec, Manifest, ManifestKind};
pub use resolve::{DeployFailure, ResolveErrors, ResolveStatus};
pub use source::{SourceId, SourceLocation};
pub use state::{ClusterDef, Defs, State, StateError};
pub use user::User;
