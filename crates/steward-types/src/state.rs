//! The root desired-state aggregate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::deploy_config::{flatten_deploy_configs, DeployConfig};
use crate::deployment::{Deployment, Deployments};
use crate::flaw::Flaw;
use crate::manifest::Manifest;
use crate::source::{SourceId, SourceLocation};

/// Errors arising from the in-memory state model.
#[derive(Debug, Error)]
pub enum StateError {
    /// A second manifest was added for a location already present.
    #[error("a manifest already exists for {0}")]
    DuplicateManifest(SourceLocation),

    /// A manifest targets a cluster with no definition in the state.
    #[error("manifest {location} targets unknown cluster {cluster:?}")]
    UnknownCluster {
        /// The manifest's source location.
        location: SourceLocation,
        /// The undeclared cluster name.
        cluster: String,
    },
}

/// Connection details and layered defaults for one cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterDef {
    /// Base URL of the cluster's scheduler.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,

    /// Defaults applied beneath every manifest's config for this cluster.
    #[serde(default)]
    pub defaults: DeployConfig,
}

/// Global definitions the manifests draw on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defs {
    /// Known clusters, keyed by name.
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterDef>,

    /// Declared environment variable names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<String>,

    /// Declared resource names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

/// The complete desired-state model across all clusters and source projects.
///
/// A state is constructed by a `StateManager` read, mutated in memory, and
/// persisted by a write. It carries the opaque version token of the backend
/// it was read from, which conditions the next write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    /// Global definitions.
    #[serde(default)]
    pub defs: Defs,

    /// Manifests, keyed by source location.
    #[serde(default)]
    pub manifests: BTreeMap<SourceLocation, Manifest>,

    /// Version token from the backend this state was read from, if any.
    #[serde(skip)]
    etag: Option<String>,
}

impl State {
    /// The version token captured when this state was read, if any.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Record the version token this state was read under.
    pub fn set_etag(&mut self, etag: impl Into<String>) {
        self.etag = Some(etag.into());
    }

    /// Add a manifest, rejecting a duplicate source location.
    pub fn add_manifest(&mut self, manifest: Manifest) -> Result<(), StateError> {
        let location = manifest.source.clone();
        if self.manifests.contains_key(&location) {
            return Err(StateError::DuplicateManifest(location));
        }
        self.manifests.insert(location, manifest);
        Ok(())
    }

    /// Look up a manifest by location.
    pub fn manifest(&self, location: &SourceLocation) -> Option<&Manifest> {
        self.manifests.get(location)
    }

    /// Remove a manifest, returning it if present.
    pub fn remove_manifest(&mut self, location: &SourceLocation) -> Option<Manifest> {
        self.manifests.remove(location)
    }

    /// Check every manifest for structural flaws.
    pub fn validate(&self) -> Vec<Flaw> {
        self.manifests
            .values()
            .flat_map(Manifest::validate)
            .collect()
    }

    /// Derive the flat deployments collection: one record per manifest per
    /// cluster, with cluster defaults layered beneath each config.
    pub fn deployments(&self) -> Result<Deployments, StateError> {
        let mut deployments = Deployments::new();
        for manifest in self.manifests.values() {
            for (cluster, spec) in &manifest.deployments {
                let def = self.defs.clusters.get(cluster).ok_or_else(|| {
                    StateError::UnknownCluster {
                        location: manifest.source.clone(),
                        cluster: cluster.clone(),
                    }
                })?;
                let config =
                    flatten_deploy_configs(&[spec.config.clone(), def.defaults.clone()]);
                deployments.insert(Deployment {
                    source: SourceId::new(manifest.source.clone(), spec.version.clone()),
                    cluster: cluster.clone(),
                    config,
                });
            }
        }
        Ok(deployments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::DeploySpec;

    fn state_with_cluster(name: &str) -> State {
        let mut state = State::default();
        state
            .defs
            .clusters
            .insert(name.to_string(), ClusterDef::default());
        state
    }

    fn manifest(repo: &str, cluster: &str) -> Manifest {
        let mut m = Manifest::new(SourceLocation::new(repo, ""));
        m.deployments.insert(
            cluster.to_string(),
            DeploySpec {
                config: DeployConfig {
                    num_instances: 2,
                    ..Default::default()
                },
                version: semver::Version::new(1, 0, 0),
            },
        );
        m
    }

    #[test]
    fn duplicate_manifest_is_rejected() {
        let mut state = state_with_cluster("main");
        state.add_manifest(manifest("repo", "main")).unwrap();
        let err = state.add_manifest(manifest("repo", "main")).unwrap_err();
        assert!(matches!(err, StateError::DuplicateManifest(_)));
        assert_eq!(state.manifests.len(), 1);
    }

    #[test]
    fn deployments_layer_cluster_defaults_beneath_manifest_config() {
        let mut state = State::default();
        state.defs.clusters.insert(
            "main".to_string(),
            ClusterDef {
                base_url: "http://scheduler.main".to_string(),
                defaults: DeployConfig {
                    env: [("REGION".to_string(), "us-east".to_string())].into(),
                    resources: [("cpus".to_string(), "0.25".to_string())].into(),
                    ..Default::default()
                },
            },
        );
        state.add_manifest(manifest("repo", "main")).unwrap();

        let deployments = state.deployments().unwrap();
        assert_eq!(deployments.len(), 1);
        let (_, deployed) = deployments.iter().next().unwrap();
        assert_eq!(deployed.config.num_instances, 2);
        assert_eq!(deployed.config.env["REGION"], "us-east");
        assert_eq!(deployed.config.resources["cpus"], "0.25");
    }

    #[test]
    fn unknown_cluster_is_an_error() {
        let mut state = State::default();
        state.add_manifest(manifest("repo", "nowhere")).unwrap();
        let err = state.deployments().unwrap_err();
        assert!(matches!(err, StateError::UnknownCluster { .. }));
    }

    #[test]
    fn etag_survives_mutation_but_not_serialization() {
        let mut state = state_with_cluster("main");
        state.set_etag("\"abc123\"");
        assert_eq!(state.etag(), Some("\"abc123\""));

        let json = serde_json::to_string(&state).unwrap();
        let reread: State = serde_json::from_str(&json).unwrap();
        assert_eq!(reread.etag(), None);
    }
}
