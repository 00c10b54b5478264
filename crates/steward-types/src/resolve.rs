//! Aggregated outcome of a reconciliation pass.
//!
//! The reconciliation loop itself lives outside this crate; this type only
//! collects timing and per-deployment failures and reports them.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::deployment::DeploymentId;

/// One deployment that could not be reconciled.
#[derive(Debug, Clone)]
pub struct DeployFailure {
    /// The deployment that failed.
    pub deployment: DeploymentId,
    /// What went wrong.
    pub message: String,
}

/// The error aggregate of a reconciliation pass: one cause per failed
/// deployment.
#[derive(Debug, Clone, Default)]
pub struct ResolveErrors {
    /// Individual failures.
    pub causes: Vec<DeployFailure>,
}

/// Timing and failure record for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ResolveStatus {
    /// When the pass began.
    pub started: DateTime<Utc>,

    /// When the pass ended.
    pub finished: DateTime<Utc>,

    /// Per-deployment failures.
    pub errs: ResolveErrors,
}

impl ResolveStatus {
    /// Record a pass that ran between `started` and `finished`.
    pub fn new(started: DateTime<Utc>, finished: DateTime<Utc>) -> Self {
        Self {
            started,
            finished,
            errs: ResolveErrors::default(),
        }
    }

    /// Note a deployment that could not be reconciled.
    pub fn add_failure(&mut self, deployment: DeploymentId, message: impl Into<String>) {
        self.errs.causes.push(DeployFailure {
            deployment,
            message: message.into(),
        });
    }

    /// How long the pass took, or `None` when the clock went backwards.
    pub fn duration(&self) -> Option<chrono::Duration> {
        (self.started < self.finished).then(|| self.finished - self.started)
    }

    /// A pass is degraded when any deployment failed or when the finish
    /// time does not follow the start time.
    pub fn is_degraded(&self) -> bool {
        self.finished <= self.started || !self.errs.causes.is_empty()
    }

    /// Emit this pass's outcome to the log. Degraded passes log at warning
    /// severity, healthy ones at informational.
    pub fn report(&self) {
        let error_count = self.errs.causes.len();
        match self.duration() {
            Some(duration) if !self.is_degraded() => {
                info!(
                    error_count,
                    duration_ms = duration.num_milliseconds(),
                    "reconciliation pass complete"
                );
            }
            Some(duration) => {
                for cause in &self.errs.causes {
                    warn!(
                        deployment = %cause.deployment,
                        message = %cause.message,
                        "deployment failed to reconcile"
                    );
                }
                warn!(
                    error_count,
                    duration_ms = duration.num_milliseconds(),
                    "reconciliation pass degraded"
                );
            }
            None => {
                warn!(
                    error_count,
                    started = %self.started,
                    finished = %self.finished,
                    "reconciliation pass finished before it started"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLocation;
    use chrono::TimeDelta;

    fn id() -> DeploymentId {
        DeploymentId {
            location: SourceLocation::new("repo", ""),
            cluster: "main".to_string(),
        }
    }

    #[test]
    fn clean_pass_is_not_degraded() {
        let started = Utc::now();
        let status = ResolveStatus::new(started, started + TimeDelta::seconds(3));
        assert!(!status.is_degraded());
        assert_eq!(status.duration(), Some(TimeDelta::seconds(3)));
    }

    #[test]
    fn any_failure_degrades_the_pass() {
        let started = Utc::now();
        let mut status = ResolveStatus::new(started, started + TimeDelta::seconds(1));
        status.add_failure(id(), "scheduler rejected the request");
        assert!(status.is_degraded());
    }

    #[test]
    fn clock_anomaly_degrades_the_pass() {
        let started = Utc::now();
        let status = ResolveStatus::new(started, started);
        assert!(status.is_degraded());
        assert_eq!(status.duration(), None);
    }
}
