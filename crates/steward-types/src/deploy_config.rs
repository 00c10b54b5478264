//! Per-cluster deployment configuration and its field-level diff.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::flaw::Flaw;

/// Resource allocations, mapping resource name to quantity.
pub type Resources = BTreeMap<String, String>;

/// Environment variables, mapping name to value.
pub type Env = BTreeMap<String, String>;

/// Volume mounts as read off the wire.
///
/// Entries may be `None` when the serialized form contained explicit nulls;
/// validation flags those as [`Flaw::NilVolume`] and repair drops them.
pub type Volumes = Vec<Option<Volume>>;

/// A list of human-readable differences between two values; empty means
/// the values are identical.
pub type Variances = Vec<String>;

/// Access mode of a volume mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VolumeMode {
    /// Read-only.
    Ro,
    /// Read-write.
    Rw,
}

/// A single volume mapping for a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Path on the host.
    pub host: String,
    /// Path inside the container.
    pub container: String,
    /// Access mode.
    pub mode: VolumeMode,
}

/// The configuration of one deployment's tasks in a specific cluster:
/// resources, environment, instance count, volumes, and arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Resources each instance is given by the execution environment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: Resources,

    /// Environment variables set for each instance.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: Env,

    /// Desired instance count. Zero means the system decides; the actual
    /// count may differ due to scheduler decisions.
    #[serde(default)]
    pub num_instances: u32,

    /// Volume mappings for this deployment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Volumes,

    /// Free-form positional arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl DeployConfig {
    /// Whether two configs are semantically identical.
    ///
    /// Empty and absent collections compare equal, and null volume entries
    /// are ignored.
    pub fn equal(&self, other: &DeployConfig) -> bool {
        self.diff(other).is_empty()
    }

    /// Field-level differences between this config and `other`.
    ///
    /// Each mismatched field contributes one variance string naming the
    /// field and both values.
    pub fn diff(&self, other: &DeployConfig) -> Variances {
        let mut diffs = Variances::new();

        if self.num_instances != other.num_instances {
            diffs.push(format!(
                "number of instances; this: {}; other: {}",
                self.num_instances, other.num_instances
            ));
        }

        // Contents are only compared when either side is non-empty, so an
        // absent map equals a zero-length one.
        if !(self.env.is_empty() && other.env.is_empty()) && self.env != other.env {
            diffs.push(format!(
                "env; this: {:?}; other: {:?}",
                self.env, other.env
            ));
        }

        if !(self.resources.is_empty() && other.resources.is_empty())
            && self.resources != other.resources
        {
            diffs.push(format!(
                "resources; this: {:?}; other: {:?}",
                self.resources, other.resources
            ));
        }

        let mine: Vec<&Volume> = self.volumes.iter().flatten().collect();
        let theirs: Vec<&Volume> = other.volumes.iter().flatten().collect();
        if !(mine.is_empty() && theirs.is_empty()) && mine != theirs {
            diffs.push(format!(
                "volumes; this: {:?}; other: {:?}",
                mine, theirs
            ));
        }

        // TODO: compare args as well; the diff ignores them today, so a
        // change in positional arguments alone never registers as Modified.

        diffs
    }

    /// Check this config for structural flaws.
    pub fn validate(&self) -> Vec<Flaw> {
        let mut flaws = Vec::new();

        if self.volumes.iter().any(Option::is_none) {
            flaws.push(Flaw::NilVolume);
        }

        for (field, map) in [("env", &self.env), ("resources", &self.resources)] {
            for (key, value) in map {
                if key.is_empty() || value.is_empty() {
                    flaws.push(Flaw::EmptyMapEntry {
                        field,
                        key: key.clone(),
                    });
                }
            }
        }

        flaws
    }
}

impl fmt::Display for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {:?} : {:?} {:?}",
            self.num_instances, self.resources, self.env, self.volumes
        )
    }
}

/// Merge an ordered list of config fragments into one resolved config.
///
/// Earlier entries win: the first non-zero instance count, the first
/// non-empty volume list, and the first non-empty argument list take effect,
/// and env and resources are merged key-by-key with the first writer of each
/// key winning. Callers control layering (for example cluster-specific
/// settings over global defaults) purely through list order.
pub fn flatten_deploy_configs(configs: &[DeployConfig]) -> DeployConfig {
    let mut flat = DeployConfig::default();

    flat.num_instances = configs
        .iter()
        .map(|c| c.num_instances)
        .find(|n| *n != 0)
        .unwrap_or(0);

    if let Some(c) = configs.iter().find(|c| !c.volumes.is_empty()) {
        flat.volumes = c.volumes.clone();
    }

    if let Some(c) = configs.iter().find(|c| !c.args.is_empty()) {
        flat.args = c.args.clone();
    }

    for c in configs {
        for (name, value) in &c.resources {
            flat.resources
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        for (name, value) in &c.env {
            flat.env.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }

    flat
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(instances: u32, env: &[(&str, &str)]) -> DeployConfig {
        DeployConfig {
            num_instances: instances,
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn volume(host: &str) -> Volume {
        Volume {
            host: host.to_string(),
            container: "/data".to_string(),
            mode: VolumeMode::Rw,
        }
    }

    #[test]
    fn identical_configs_have_no_variances() {
        let a = config(3, &[("PORT", "8080")]);
        let b = config(3, &[("PORT", "8080")]);
        assert!(a.equal(&b));
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn each_changed_field_contributes_one_variance() {
        let a = DeployConfig {
            num_instances: 1,
            env: [("A".to_string(), "1".to_string())].into(),
            resources: [("cpus".to_string(), "0.5".to_string())].into(),
            volumes: vec![Some(volume("/a"))],
            ..Default::default()
        };
        let b = DeployConfig {
            num_instances: 2,
            env: [("A".to_string(), "2".to_string())].into(),
            resources: [("cpus".to_string(), "1".to_string())].into(),
            volumes: vec![Some(volume("/b"))],
            ..Default::default()
        };

        let diffs = a.diff(&b);
        assert_eq!(diffs.len(), 4);
        assert!(diffs[0].starts_with("number of instances"));
        assert!(diffs[1].starts_with("env"));
        assert!(diffs[2].starts_with("resources"));
        assert!(diffs[3].starts_with("volumes"));
    }

    #[test]
    fn diff_outcome_is_symmetric() {
        let a = config(1, &[("A", "1")]);
        let b = config(2, &[("A", "1"), ("B", "2")]);
        assert_eq!(a.equal(&b), b.equal(&a));
        assert_eq!(a.diff(&b).len(), b.diff(&a).len());
    }

    #[test]
    fn absent_collections_equal_empty_ones() {
        let a = DeployConfig::default();
        let b = DeployConfig {
            env: Env::new(),
            resources: Resources::new(),
            volumes: Vec::new(),
            ..Default::default()
        };
        assert!(a.equal(&b));
    }

    #[test]
    fn null_volume_entries_are_ignored_by_comparison() {
        let a = DeployConfig {
            volumes: vec![Some(volume("/a")), None],
            ..Default::default()
        };
        let b = DeployConfig {
            volumes: vec![None, Some(volume("/a"))],
            ..Default::default()
        };
        assert!(a.equal(&b));
    }

    #[test]
    fn args_are_not_yet_compared() {
        let a = DeployConfig {
            args: vec!["--verbose".to_string()],
            ..Default::default()
        };
        let b = DeployConfig::default();
        assert!(a.equal(&b));
    }

    #[test]
    fn flatten_respects_first_writer_precedence() {
        let override_config = DeployConfig {
            num_instances: 5,
            env: [("SHARED".to_string(), "override".to_string())].into(),
            args: vec!["run".to_string()],
            ..Default::default()
        };
        let defaults = DeployConfig {
            num_instances: 1,
            env: [
                ("SHARED".to_string(), "default".to_string()),
                ("ONLY_DEFAULT".to_string(), "kept".to_string()),
            ]
            .into(),
            resources: [("cpus".to_string(), "0.25".to_string())].into(),
            volumes: vec![Some(volume("/default"))],
            ..Default::default()
        };

        let flat = flatten_deploy_configs(&[override_config, defaults]);

        assert_eq!(flat.num_instances, 5);
        assert_eq!(flat.env["SHARED"], "override");
        assert_eq!(flat.env["ONLY_DEFAULT"], "kept");
        assert_eq!(flat.resources["cpus"], "0.25");
        assert_eq!(flat.volumes, vec![Some(volume("/default"))]);
        assert_eq!(flat.args, vec!["run".to_string()]);
    }

    #[test]
    fn flatten_falls_through_zero_instance_counts() {
        let first = config(0, &[]);
        let second = config(4, &[]);
        let flat = flatten_deploy_configs(&[first, second]);
        assert_eq!(flat.num_instances, 4);
    }

    #[test]
    fn validate_flags_nil_volumes_and_empty_keys() {
        let dc = DeployConfig {
            volumes: vec![Some(volume("/a")), None],
            env: [("".to_string(), "x".to_string())].into(),
            ..Default::default()
        };
        let flaws = dc.validate();
        assert!(flaws.contains(&Flaw::NilVolume));
        assert!(flaws.iter().any(
            |f| matches!(f, Flaw::EmptyMapEntry { field: "env", key } if key.is_empty())
        ));
    }
}
