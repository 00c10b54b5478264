//! Detected-but-possibly-repairable defects in deployment data.
//!
//! Validation returns flaw lists instead of failing outright, so callers can
//! choose to repair what can be repaired and reject the rest.

use thiserror::Error;

use crate::deploy_config::DeployConfig;

/// A structural defect found in a [`DeployConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flaw {
    /// The volumes list contains explicit null entries.
    NilVolume,

    /// An env or resources map contains an empty key or value.
    EmptyMapEntry {
        /// Which map the entry was found in.
        field: &'static str,
        /// The offending key.
        key: String,
    },
}

/// Error returned when a flaw cannot be repaired.
#[derive(Debug, Error)]
pub enum FlawError {
    /// The flaw has no mechanical fix; the caller must reject the data.
    #[error("flaw is not repairable: {0:?}")]
    Unrepairable(Flaw),
}

impl Flaw {
    /// Whether [`Flaw::repair`] can fix this flaw.
    pub fn repairable(&self) -> bool {
        matches!(self, Flaw::NilVolume)
    }

    /// Apply the mechanical fix for this flaw to `config`.
    ///
    /// Repairing [`Flaw::NilVolume`] removes exactly the null entries and
    /// leaves the remaining volumes in their original order.
    pub fn repair(&self, config: &mut DeployConfig) -> Result<(), FlawError> {
        match self {
            Flaw::NilVolume => {
                config.volumes.retain(|v| v.is_some());
                Ok(())
            }
            flaw => Err(FlawError::Unrepairable(flaw.clone())),
        }
    }
}
