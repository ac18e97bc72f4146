//! Environment-driven configuration
//!
//! Resolved once at startup and shared read-only across requests. There is no
//! other in-process state: everything else lives in the Kubernetes API.

use crate::{DEFAULT_NAMESPACE, DEFAULT_STORAGE_CLASS, DEFAULT_WORKER_IMAGE};

/// Kubernetes versions accepted by default when the env override is unset
pub const DEFAULT_SUPPORTED_VERSIONS: &[&str] = &["1.31", "1.32", "1.33"];

/// Immutable service configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Namespace all Jobs and PVCs are created in
    pub namespace: String,
    /// Terraform worker container image
    pub worker_image: String,
    /// Storage class used for the state/logs PVCs (must support ReadWriteMany)
    pub storage_class: String,
    /// Allow-list of Kubernetes versions accepted by request validation.
    /// EKS retires versions on its own schedule, so this is configurable
    /// without a rebuild.
    pub supported_versions: Vec<String>,
}

impl Config {
    /// Build configuration from environment variables, falling back to
    /// defaults suitable for an in-cluster deployment.
    ///
    /// - `PROVISIONER_NAMESPACE` - namespace for Jobs/PVCs
    /// - `WORKER_IMAGE` - Terraform worker image
    /// - `STORAGE_CLASS` - RWX-capable storage class
    /// - `SUPPORTED_KUBERNETES_VERSIONS` - comma-separated allow-list
    pub fn from_env() -> Self {
        let supported_versions = std::env::var("SUPPORTED_KUBERNETES_VERSIONS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                DEFAULT_SUPPORTED_VERSIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        Self {
            namespace: env_or("PROVISIONER_NAMESPACE", DEFAULT_NAMESPACE),
            worker_image: env_or("WORKER_IMAGE", DEFAULT_WORKER_IMAGE),
            storage_class: env_or("STORAGE_CLASS", DEFAULT_STORAGE_CLASS),
            supported_versions,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            worker_image: DEFAULT_WORKER_IMAGE.to_string(),
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
            supported_versions: DEFAULT_SUPPORTED_VERSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
