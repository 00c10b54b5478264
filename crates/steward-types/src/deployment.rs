//! The flattened view of a state and the diff over it.
//!
//! A [`Deployment`] is derived data: the resolution of one manifest entry for
//! one cluster into a single fully-resolved record. It is recomputed from
//! manifests on demand and never persisted independently.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::deploy_config::{DeployConfig, Variances};
use crate::source::{SourceId, SourceLocation};

/// Identifies one deployment: a source location in one cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeploymentId {
    /// The deployed project.
    pub location: SourceLocation,
    /// The cluster it is deployed in.
    pub cluster: String,
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.cluster, self.location)
    }
}

/// One fully-resolved deployment record: a versioned source, a cluster, and
/// the config that should run there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// The versioned project being deployed.
    pub source: SourceId,

    /// The cluster this record targets.
    pub cluster: String,

    /// The resolved config, with cluster defaults already applied.
    pub config: DeployConfig,
}

impl Deployment {
    /// The key this deployment is stored under.
    pub fn id(&self) -> DeploymentId {
        DeploymentId {
            location: self.source.location.clone(),
            cluster: self.cluster.clone(),
        }
    }

    /// Field-level differences between this deployment and `other`,
    /// covering the artifact version as well as the config.
    pub fn diff(&self, other: &Deployment) -> Variances {
        let mut diffs = Variances::new();
        if self.source.version != other.source.version {
            diffs.push(format!(
                "version; this: {}; other: {}",
                self.source.version, other.source.version
            ));
        }
        diffs.extend(self.config.diff(&other.config));
        diffs
    }

    /// Whether two deployments are semantically identical.
    pub fn equal(&self, other: &Deployment) -> bool {
        self.diff(other).is_empty()
    }
}

/// The classification of one deployment key when comparing two collections.
#[derive(Debug, Clone)]
pub enum DeploymentDiff {
    /// Present on both sides with no variances.
    Same(DeploymentId),

    /// Present only on the right side.
    Added(Deployment),

    /// Present only on the left side.
    Removed(Deployment),

    /// Present on both sides with field-level variances.
    Modified {
        /// The deployment key.
        id: DeploymentId,
        /// Field-level differences, from [`Deployment::diff`].
        variances: Variances,
        /// The record on the left side.
        before: Box<Deployment>,
        /// The record on the right side.
        after: Box<Deployment>,
    },
}

impl DeploymentDiff {
    /// The key this classification is about.
    pub fn id(&self) -> DeploymentId {
        match self {
            DeploymentDiff::Same(id) => id.clone(),
            DeploymentDiff::Added(d) | DeploymentDiff::Removed(d) => d.id(),
            DeploymentDiff::Modified { id, .. } => id.clone(),
        }
    }

    /// Whether this entry requires no action.
    pub fn is_same(&self) -> bool {
        matches!(self, DeploymentDiff::Same(_))
    }
}

/// A set of deployments keyed by source location and cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deployments(BTreeMap<DeploymentId, Deployment>);

impl Deployments {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a deployment, returning the record it replaced, if any.
    pub fn insert(&mut self, deployment: Deployment) -> Option<Deployment> {
        self.0.insert(deployment.id(), deployment)
    }

    /// Look up a deployment by key.
    pub fn get(&self, id: &DeploymentId) -> Option<&Deployment> {
        self.0.get(id)
    }

    /// Number of deployments in the collection.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the deployments in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeploymentId, &Deployment)> {
        self.0.iter()
    }

    /// Classify every key present on either side.
    ///
    /// `self` is the prior set and `other` the incoming one: a key only in
    /// `self` is [`DeploymentDiff::Removed`], a key only in `other` is
    /// [`DeploymentDiff::Added`]. Every key in the union appears exactly
    /// once. Consumers must treat anything but `Same` as actionable.
    pub fn diff<'a>(
        &'a self,
        other: &'a Deployments,
    ) -> impl Iterator<Item = DeploymentDiff> + 'a {
        let keys: BTreeSet<&DeploymentId> = self.0.keys().chain(other.0.keys()).collect();
        keys.into_iter().map(move |id| {
            match (self.0.get(id), other.0.get(id)) {
                (Some(before), None) => DeploymentDiff::Removed(before.clone()),
                (None, Some(after)) => DeploymentDiff::Added(after.clone()),
                (Some(before), Some(after)) => {
                    let variances = before.diff(after);
                    if variances.is_empty() {
                        DeploymentDiff::Same(id.clone())
                    } else {
                        DeploymentDiff::Modified {
                            id: id.clone(),
                            variances,
                            before: Box::new(before.clone()),
                            after: Box::new(after.clone()),
                        }
                    }
                }
                (None, None) => unreachable!("key drawn from one of the two collections"),
            }
        })
    }
}

impl FromIterator<Deployment> for Deployments {
    fn from_iter<I: IntoIterator<Item = Deployment>>(iter: I) -> Self {
        let mut collection = Deployments::new();
        for deployment in iter {
            collection.insert(deployment);
        }
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(repo: &str, cluster: &str, instances: u32) -> Deployment {
        Deployment {
            source: SourceId::new(
                SourceLocation::new(repo, ""),
                semver::Version::new(1, 0, 0),
            ),
            cluster: cluster.to_string(),
            config: DeployConfig {
                num_instances: instances,
                ..Default::default()
            },
        }
    }

    #[test]
    fn diff_partitions_the_key_union_exactly_once() {
        let left: Deployments = [
            deployment("kept", "main", 1),
            deployment("changed", "main", 1),
            deployment("dropped", "main", 1),
        ]
        .into_iter()
        .collect();
        let right: Deployments = [
            deployment("kept", "main", 1),
            deployment("changed", "main", 2),
            deployment("new", "main", 1),
        ]
        .into_iter()
        .collect();

        let entries: Vec<DeploymentDiff> = left.diff(&right).collect();
        assert_eq!(entries.len(), 4);

        let mut seen = BTreeSet::new();
        for entry in &entries {
            assert!(seen.insert(entry.id()), "duplicate key {}", entry.id());
        }

        let by_repo = |repo: &str| {
            entries
                .iter()
                .find(|e| e.id().location.repo == repo)
                .unwrap()
        };
        assert!(matches!(by_repo("kept"), DeploymentDiff::Same(_)));
        assert!(matches!(by_repo("new"), DeploymentDiff::Added(_)));
        assert!(matches!(by_repo("dropped"), DeploymentDiff::Removed(_)));
        match by_repo("changed") {
            DeploymentDiff::Modified { variances, .. } => {
                assert_eq!(variances.len(), 1);
                assert!(variances[0].starts_with("number of instances"));
            }
            other => panic!("expected Modified, got {:?}", other),
        }
    }

    #[test]
    fn version_change_alone_registers_as_modified() {
        let before = deployment("app", "main", 1);
        let mut after = before.clone();
        after.source.version = semver::Version::new(2, 0, 0);

        let left: Deployments = [before].into_iter().collect();
        let right: Deployments = [after].into_iter().collect();

        let entries: Vec<DeploymentDiff> = left.diff(&right).collect();
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            DeploymentDiff::Modified { variances, .. } => {
                assert!(variances[0].starts_with("version"));
            }
            other => panic!("expected Modified, got {:?}", other),
        }
    }

    #[test]
    fn same_location_in_two_clusters_is_two_keys() {
        let deployments: Deployments = [
            deployment("app", "east", 1),
            deployment("app", "west", 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(deployments.len(), 2);
    }
}
