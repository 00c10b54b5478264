//! Identifiers for deployable source projects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The location of a deployable project: a repository plus an offset
/// directory within it.
///
/// A [`crate::State`] holds at most one manifest per location, so this type
/// serves as the manifest key and as half of a [`crate::DeploymentId`].
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Repository URL or canonical repository name.
    pub repo: String,

    /// Directory within the repository; empty for the repository root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,
}

impl SourceLocation {
    /// Create a location from a repository and an offset directory.
    pub fn new(repo: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            dir: dir.into(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dir.is_empty() {
            write!(f, "{}", self.repo)
        } else {
            write!(f, "{},{}", self.repo, self.dir)
        }
    }
}

/// One specific version of a deployable project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId {
    /// Where the source lives.
    pub location: SourceLocation,

    /// The semantic version being deployed.
    pub version: semver::Version,
}

impl SourceId {
    /// Create a source ID from a location and version.
    pub fn new(location: SourceLocation, version: semver::Version) -> Self {
        Self { location, version }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.location, self.version)
    }
}
