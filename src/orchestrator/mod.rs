//! Cluster orchestrator interface
//!
//! A thin CRUD wrapper over the platform's Job, Pod and PVC APIs with a
//! uniform idempotency policy: PVC conflicts are swallowed (shared, idempotent
//! infrastructure), Job conflicts are surfaced (a duplicate provision must
//! fail visibly), deletions and log reads are best-effort.
//!
//! Kubernetes Jobs are immutable once created and self-describe completion
//! through their counters, so polling those counters is the entire status
//! protocol - no separate state machine or persistence layer is needed.

mod kube;

#[cfg(test)]
pub(crate) mod fake;

pub use self::kube::KubeOrchestrator;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;

use crate::Result;

/// Observed state of a worker Job
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    /// The Job has active or not-yet-started pods
    Running,
    /// At least one pod succeeded
    Completed,
    /// At least one pod failed (backoff limit is 0, so one failure is final)
    Failed,
    /// The Job does not exist. A valid observation, not an error - callers
    /// use it to distinguish "never submitted" from "in flight".
    NotFound,
}

impl JobState {
    /// Lifecycle status string used in API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::NotFound => "not_found",
        }
    }

    /// Job phase string used in API responses
    pub fn phase(&self) -> &'static str {
        match self {
            JobState::Running => "Running",
            JobState::Completed => "Succeeded",
            JobState::Failed => "Failed",
            JobState::NotFound => "NotFound",
        }
    }
}

/// Point-in-time status derived from a Job's counters
#[derive(Clone, Debug)]
pub struct JobStatus {
    /// Derived lifecycle state
    pub state: JobState,
    /// Failure detail, set when the Job failed or was not found
    pub message: Option<String>,
    /// Pods that succeeded
    pub succeeded: i32,
    /// Pods that failed
    pub failed: i32,
    /// Pods currently running
    pub active: i32,
}

impl JobStatus {
    /// Derive status from raw Job counters.
    ///
    /// Success wins over failure, failure over running: once `succeeded > 0`
    /// the run is complete regardless of what other pods did.
    pub fn from_counters(succeeded: i32, failed: i32, active: i32) -> Self {
        let (state, message) = if succeeded > 0 {
            (JobState::Completed, None)
        } else if failed > 0 {
            (
                JobState::Failed,
                Some(format!("job failed with {} failures", failed)),
            )
        } else {
            (JobState::Running, None)
        };

        Self {
            state,
            message,
            succeeded,
            failed,
            active,
        }
    }

    /// Derive status from a Job object read back from the platform
    pub fn from_job(job: &Job) -> Self {
        let status = job.status.as_ref();
        Self::from_counters(
            status.and_then(|s| s.succeeded).unwrap_or(0),
            status.and_then(|s| s.failed).unwrap_or(0),
            status.and_then(|s| s.active).unwrap_or(0),
        )
    }

    /// The not-found sentinel
    pub fn not_found() -> Self {
        Self {
            state: JobState::NotFound,
            message: Some("job not found".to_string()),
            succeeded: 0,
            failed: 0,
            active: 0,
        }
    }

    /// Job phase string used in API responses.
    ///
    /// A running Job without active pods has not been scheduled yet; its
    /// phase is "Unknown" until the first pod starts, while `status` reports
    /// "running" throughout.
    pub fn phase(&self) -> &'static str {
        match self.state {
            JobState::Running if self.active == 0 => "Unknown",
            state => state.phase(),
        }
    }
}

/// Operations the lifecycle service needs from the orchestration platform.
///
/// The single production implementation is [`KubeOrchestrator`]; tests inject
/// an in-memory fake behind this seam.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Create a PVC; "already exists" is success (logged as a warning),
    /// anything else propagates.
    async fn ensure_pvc(&self, pvc: PersistentVolumeClaim) -> Result<()>;

    /// Create a Job; "already exists" surfaces as [`crate::Error::AlreadyExists`].
    async fn create_job(&self, job: Job) -> Result<()>;

    /// Read a Job's status by name; a missing Job yields the
    /// [`JobState::NotFound`] sentinel, not an error.
    async fn job_status(&self, name: &str) -> Result<JobStatus>;

    /// List Jobs matching a label selector
    async fn list_jobs(&self, label_selector: &str) -> Result<Vec<Job>>;

    /// List pod names matching a label selector
    async fn list_pods(&self, label_selector: &str) -> Result<Vec<String>>;

    /// Tail a pod's logs, best-effort: returns a human-readable placeholder
    /// instead of failing.
    async fn pod_logs(&self, pod_name: &str, tail_lines: i64) -> String;

    /// Delete a Job, best-effort; returns whether it was deleted. Not-found
    /// is swallowed, other failures are logged and swallowed.
    async fn delete_job(&self, name: &str) -> bool;

    /// Delete a PVC with the same best-effort policy as [`Self::delete_job`]
    async fn delete_pvc(&self, name: &str) -> bool;

    /// Whether the named PVC exists
    async fn pvc_exists(&self, name: &str) -> Result<bool>;
}
