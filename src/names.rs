//! Resource naming convention
//!
//! Every Kubernetes object the provisioner touches is derived from a cluster
//! name and an operation: `{operation}-{cluster}` for Jobs, `tfstate-{cluster}`
//! and `tflogs-{cluster}` for the two shared volumes. Nothing is stored; these
//! functions are the lookup key for all state reconstruction, so they must
//! stay deterministic.

use std::fmt;

/// Lifecycle operation a worker Job performs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Dry-run: terraform plan only, no AWS resources created
    Test,
    /// terraform apply
    Provision,
    /// terraform destroy
    Destroy,
}

impl Operation {
    /// Label/job-name prefix for this operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Test => "test",
            Operation::Provision => "provision",
            Operation::Destroy => "destroy",
        }
    }

    /// Worker script driven by this operation.
    ///
    /// Test and provision share a script - the worker branches on `DRY_RUN`.
    pub fn script(&self) -> &'static str {
        match self {
            Operation::Test | Operation::Provision => "./provision.sh",
            Operation::Destroy => "./destroy.sh",
        }
    }

    /// Whether the worker runs in dry-run mode
    pub fn dry_run(&self) -> bool {
        matches!(self, Operation::Test)
    }

    /// Recover the operation from a Job name produced by [`job_name`]
    pub fn from_job_name(job: &str) -> Option<Operation> {
        let prefix = job.split('-').next()?;
        match prefix {
            "test" => Some(Operation::Test),
            "provision" => Some(Operation::Provision),
            "destroy" => Some(Operation::Destroy),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of per-cluster volume
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PvcKind {
    /// Terraform state (read by destroy after provision wrote it)
    State,
    /// Terraform logs and the cluster-info artifact
    Logs,
}

impl PvcKind {
    /// Name prefix for this volume kind
    pub fn prefix(&self) -> &'static str {
        match self {
            PvcKind::State => "tfstate",
            PvcKind::Logs => "tflogs",
        }
    }

    /// Requested volume size
    pub fn storage(&self) -> &'static str {
        match self {
            PvcKind::State => "1Gi",
            PvcKind::Logs => "500Mi",
        }
    }
}

/// Job name for an operation on a cluster: `{operation}-{cluster}`
pub fn job_name(operation: Operation, cluster: &str) -> String {
    format!("{}-{}", operation.as_str(), cluster)
}

/// PVC name for a cluster volume: `tfstate-{cluster}` / `tflogs-{cluster}`
pub fn pvc_name(kind: PvcKind, cluster: &str) -> String {
    format!("{}-{}", kind.prefix(), cluster)
}
