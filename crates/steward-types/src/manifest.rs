//! One source project's deployment intent, broken out per cluster.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::deploy_config::DeployConfig;
use crate::flaw::Flaw;
use crate::source::SourceLocation;

/// How the deployed artifact is run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManifestKind {
    /// A long-running service answering HTTP requests.
    #[default]
    HttpService,
    /// A task launched on a schedule.
    Scheduled,
    /// A long-running worker with no request surface.
    Worker,
}

/// The deployment intent for one cluster: a config plus the artifact version
/// to deploy there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySpec {
    /// Resources, environment, instance count, volumes, and arguments.
    #[serde(flatten)]
    pub config: DeployConfig,

    /// The artifact version to deploy in this cluster.
    pub version: semver::Version,
}

/// A manifest is one source project's deployment intent across clusters,
/// plus ownership and build metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// The project this manifest describes. Unique within a state.
    pub source: SourceLocation,

    /// How the built artifact runs.
    #[serde(default)]
    pub kind: ManifestKind,

    /// People or teams responsible for this project.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,

    /// Per-cluster deployment intent, keyed by cluster name.
    #[serde(default)]
    pub deployments: BTreeMap<String, DeploySpec>,
}

impl Manifest {
    /// Create an empty manifest for `source`.
    pub fn new(source: SourceLocation) -> Self {
        Self {
            source,
            kind: ManifestKind::default(),
            owners: Vec::new(),
            deployments: BTreeMap::new(),
        }
    }

    /// The key this manifest is stored under.
    pub fn id(&self) -> &SourceLocation {
        &self.source
    }

    /// Check every per-cluster config for structural flaws.
    pub fn validate(&self) -> Vec<Flaw> {
        self.deployments
            .values()
            .flat_map(|spec| spec.config.validate())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_surfaces_flaws_from_every_cluster() {
        let mut manifest = Manifest::new(SourceLocation::new("repo", ""));
        manifest.deployments.insert(
            "cluster-a".to_string(),
            DeploySpec {
                config: DeployConfig {
                    volumes: vec![None],
                    ..Default::default()
                },
                version: semver::Version::new(1, 0, 0),
            },
        );
        manifest.deployments.insert(
            "cluster-b".to_string(),
            DeploySpec {
                config: DeployConfig::default(),
                version: semver::Version::new(1, 0, 0),
            },
        );

        assert_eq!(manifest.validate(), vec![Flaw::NilVolume]);
    }
}
