//! EKS Provisioner - HTTP control surface for Terraform-driven EKS clusters
//!
//! The provisioner translates cluster-lifecycle requests (test, provision,
//! destroy, status, logs, list, cleanup) into Kubernetes Jobs and
//! PersistentVolumeClaims. A Terraform worker container does the actual
//! infrastructure work; Kubernetes itself is the system of record - there is
//! no separate datastore. Cluster state is re-derived on every query by
//! reading back the Jobs labeled for that cluster.
//!
//! # Modules
//!
//! - [`names`] - deterministic resource naming convention
//! - [`manifests`] - pure Job/PVC manifest builders
//! - [`orchestrator`] - CRUD wrapper over the Kubernetes Job/Pod/PVC APIs
//! - [`service`] - lifecycle facade used by the HTTP layer
//! - [`api`] - axum routes and HTTP error mapping
//! - [`model`] - request validation and response shapes
//! - [`config`] - environment-driven configuration
//! - [`error`] - error types

#![deny(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod manifests;
pub mod model;
pub mod names;
pub mod orchestrator;
pub mod service;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================
// Centralizing these ensures the manifest builders, label selectors and test
// fixtures never drift apart.

/// Value of the `app` label stamped on every Job and PVC we create.
///
/// Also used as the label selector when listing clusters, so it must never
/// change once resources exist.
pub const APP_LABEL: &str = "eks-provisioner";

/// Label key carrying the cluster name on Jobs, pods and PVCs
pub const CLUSTER_LABEL: &str = "cluster";

/// Label key carrying the operation (test/provision/destroy) on Jobs
pub const OPERATION_LABEL: &str = "operation";

/// Namespace the provisioner operates in unless overridden
pub const DEFAULT_NAMESPACE: &str = "eks-provisioner";

/// Default Terraform worker image
pub const DEFAULT_WORKER_IMAGE: &str = "eks-provisioner-worker:latest";

/// Default storage class for the state/logs volumes (must support RWX)
pub const DEFAULT_STORAGE_CLASS: &str = "nfs-client";

/// Secret holding AWS credentials, injected into worker Jobs by key reference
pub const AWS_CREDS_SECRET: &str = "aws-creds";

/// ServiceAccount the worker pods run as
pub const WORKER_SERVICE_ACCOUNT: &str = "eks-provisioner";

/// Mount path for the Terraform state volume inside the worker
pub const STATE_MOUNT_PATH: &str = "/terraform-state";

/// Mount path for the Terraform logs volume inside the worker
pub const LOGS_MOUNT_PATH: &str = "/terraform-logs";

/// TTL for completed dry-run Jobs (24h). Provision/destroy Jobs carry no TTL
/// and must be removed through the cleanup endpoint.
pub const TEST_JOB_TTL_SECONDS: i32 = 86_400;

/// Number of log lines tailed from a worker pod
pub const LOG_TAIL_LINES: i64 = 500;

/// Default HTTP listen port
pub const DEFAULT_HTTP_PORT: u16 = 8000;
