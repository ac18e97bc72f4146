//! Request and response shapes for the HTTP surface
//!
//! [`ClusterRequest`] is validated exactly once, at the boundary, before any
//! Kubernetes call is made. Downstream code trusts a validated request and
//! never re-checks it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// DNS label: lowercase alphanumeric with internal hyphens, 1-100 chars
static CLUSTER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,98}[a-z0-9])?$").expect("valid regex"));

/// Kubernetes minor version, e.g. "1.33"
static KUBERNETES_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^1\.\d{1,2}$").expect("valid regex"));

/// EC2 family.size grammar, e.g. "m5.xlarge", "t3.medium", "c6i.12xlarge"
static INSTANCE_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][0-9][a-z]?\.(nano|micro|small|medium|large|xlarge|[0-9]+xlarge)$")
        .expect("valid regex")
});

/// IP family for the provisioned cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    /// IPv4 addressing
    Ipv4,
    /// IPv6 addressing
    Ipv6,
}

impl IpFamily {
    /// Wire value passed to the worker as `IP_FAMILY`
    pub fn as_str(&self) -> &'static str {
        match self {
            IpFamily::Ipv4 => "ipv4",
            IpFamily::Ipv6 => "ipv6",
        }
    }
}

/// Cluster creation/test request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterRequest {
    /// DNS-compliant cluster name (lowercase alphanumeric and hyphens)
    pub cluster_name: String,
    /// Kubernetes version, e.g. "1.33"
    pub kubernetes_version: String,
    /// EC2 instance type for worker nodes, e.g. "m5.xlarge"
    pub instance_type: String,
    /// IP family for the cluster
    pub ip_family: IpFamily,
}

impl ClusterRequest {
    /// Validate the request against the naming/version/instance grammars.
    ///
    /// `supported_versions` is the deployment's Kubernetes allow-list; a
    /// version can match the grammar and still be rejected here.
    pub fn validate(&self, supported_versions: &[String]) -> Result<()> {
        if !CLUSTER_NAME_RE.is_match(&self.cluster_name) {
            return Err(Error::validation(
                "cluster name must be DNS-compliant: start and end with a lowercase \
                 alphanumeric character, may contain hyphens, max 100 characters",
            ));
        }

        if !KUBERNETES_VERSION_RE.is_match(&self.kubernetes_version) {
            return Err(Error::validation(
                "kubernetes version must be in format 1.XX (e.g. 1.33)",
            ));
        }
        if !supported_versions.contains(&self.kubernetes_version) {
            return Err(Error::validation(format!(
                "kubernetes version {} is not in supported versions: {}",
                self.kubernetes_version,
                supported_versions.join(", ")
            )));
        }

        if !INSTANCE_TYPE_RE.is_match(&self.instance_type) {
            return Err(Error::validation(
                "instance type must be valid EC2 format (e.g. m5.xlarge, t3.medium)",
            ));
        }

        Ok(())
    }
}

/// Response for job-creating operations (test, provision, destroy).
///
/// Absent optional fields serialize as `null`, never get dropped - existing
/// consumers key on their presence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterResponse {
    /// Cluster name the job operates on
    pub cluster_name: String,
    /// Cluster identifier; the destroy path echoes the name here
    #[serde(default)]
    pub cluster_id: Option<String>,
    /// Cluster GUID, when known
    #[serde(default)]
    pub cluster_guid: Option<String>,
    /// Name of the created Job
    pub job_name: String,
    /// Lifecycle status, always "pending" right after creation
    pub status: String,
    /// Human-readable guidance
    #[serde(default)]
    pub message: Option<String>,
    /// `aws eks update-kubeconfig ...` command, when known
    #[serde(default)]
    pub kubeconfig_command: Option<String>,
    /// Creation time (UTC, RFC 3339)
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Response for the status endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterStatus {
    /// Cluster name
    pub cluster_name: String,
    /// Job the status was derived from
    pub job_name: String,
    /// Lifecycle status: pending/running/completed/failed
    pub status: String,
    /// Job phase: Running/Succeeded/Failed/NotFound
    pub phase: String,
    /// Failure detail, when the job failed; serialized as `null` otherwise
    #[serde(default)]
    pub message: Option<String>,
    /// EKS cluster id parsed from worker output, when available
    #[serde(default)]
    pub cluster_id: Option<String>,
    /// EKS cluster GUID parsed from worker output, when available
    #[serde(default)]
    pub cluster_guid: Option<String>,
    /// EKS cluster ARN parsed from worker output, when available
    #[serde(default)]
    pub cluster_arn: Option<String>,
    /// `aws eks update-kubeconfig ...` command, when available
    #[serde(default)]
    pub kubeconfig_command: Option<String>,
}

/// Response for the logs endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterLogs {
    /// Cluster name
    pub cluster_name: String,
    /// Tailed log text, or a placeholder when no pod/log is available
    pub logs: String,
    /// Log source, always "terraform"
    pub log_type: String,
}

/// One cluster summary in the list response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterInfo {
    /// Cluster name (from the `cluster` label)
    pub cluster_name: String,
    /// Cluster identifier, when recoverable
    #[serde(default)]
    pub cluster_id: Option<String>,
    /// Cluster GUID, when recoverable
    #[serde(default)]
    pub cluster_guid: Option<String>,
    /// Infrastructure provider
    pub provider: String,
    /// Kubernetes version recovered from the Job environment
    #[serde(default)]
    pub kubernetes_version: Option<String>,
    /// Instance type recovered from the Job environment
    #[serde(default)]
    pub instance_type: Option<String>,
    /// AWS region, when recoverable
    #[serde(default)]
    pub region: Option<String>,
    /// Lifecycle status of the latest Job
    pub status: String,
    /// Phase of the latest Job
    pub phase: String,
    /// Creation time of the latest Job
    #[serde(default)]
    pub created_at: Option<String>,
    /// Operation of the latest Job (test/provision/destroy)
    pub last_operation: String,
}

/// Response for the list endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterListResponse {
    /// Number of clusters
    pub total: usize,
    /// Per-cluster summaries, order unspecified
    pub clusters: Vec<ClusterInfo>,
}

/// Tally of deleted resources from a cleanup call
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeletedResources {
    /// Deleted Job names
    pub jobs: Vec<String>,
    /// Deleted PVC names
    pub pvcs: Vec<String>,
}

/// Response for the cleanup endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    /// Cluster name
    pub cluster_name: String,
    /// Always "cleaned_up" - cleanup never fails outright
    pub status: String,
    /// What was actually deleted
    pub deleted: DeletedResources,
    /// Human-readable tally
    pub message: String,
}

/// Structured cluster metadata the worker writes after a successful provision.
///
/// Parsed best-effort out of pod logs; every field is optional and a parse
/// failure never affects the primary status response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClusterInfoArtifact {
    /// EKS cluster id
    pub cluster_id: Option<String>,
    /// EKS cluster ARN
    pub cluster_arn: Option<String>,
    /// EKS cluster GUID
    pub cluster_guid: Option<String>,
    /// AWS region
    pub region: Option<String>,
    /// kubeconfig retrieval command
    pub kubeconfig_command: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> Vec<String> {
        vec!["1.31".into(), "1.32".into(), "1.33".into()]
    }

    fn request(name: &str, version: &str, instance: &str) -> ClusterRequest {
        ClusterRequest {
            cluster_name: name.to_string(),
            kubernetes_version: version.to_string(),
            instance_type: instance.to_string(),
            ip_family: IpFamily::Ipv4,
        }
    }

    #[test]
    fn accepts_well_formed_request() {
        let req = request("demo-1", "1.32", "m5.xlarge");
        assert!(req.validate(&supported()).is_ok());
    }

    #[test]
    fn rejects_non_dns_cluster_names() {
        for bad in ["Demo_1", "UPPER", "-leading", "trailing-", "has spaces", ""] {
            let req = request(bad, "1.32", "m5.xlarge");
            assert!(
                matches!(req.validate(&supported()), Err(Error::Validation(_))),
                "expected rejection of {:?}",
                bad
            );
        }
        // 100 chars is the limit; 101 is out
        let max = format!("a{}", "b".repeat(99));
        assert!(request(&max, "1.32", "m5.xlarge").validate(&supported()).is_ok());
        let over = format!("a{}", "b".repeat(100));
        assert!(request(&over, "1.32", "m5.xlarge").validate(&supported()).is_err());
    }

    #[test]
    fn rejects_unsupported_kubernetes_versions() {
        // Well-formed but not in the allow-list
        let req = request("demo", "1.99", "m5.xlarge");
        let err = req.validate(&supported()).unwrap_err();
        assert!(err.to_string().contains("not in supported versions"));

        // Malformed outright
        for bad in ["2.0", "1.333", "v1.32", "1"] {
            let req = request("demo", bad, "m5.xlarge");
            assert!(req.validate(&supported()).is_err(), "expected rejection of {:?}", bad);
        }
    }

    #[test]
    fn rejects_malformed_instance_types() {
        for bad in ["bogus", "m5", "m5.", ".xlarge", "M5.xlarge", "m5.superlarge"] {
            let req = request("demo", "1.32", bad);
            assert!(req.validate(&supported()).is_err(), "expected rejection of {:?}", bad);
        }
        for good in ["t3.nano", "m5.xlarge", "c6i.12xlarge", "r7a.medium"] {
            let req = request("demo", "1.32", good);
            assert!(req.validate(&supported()).is_ok(), "expected acceptance of {:?}", good);
        }
    }

    #[test]
    fn ip_family_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&IpFamily::Ipv4).unwrap(), "\"ipv4\"");
        let parsed: IpFamily = serde_json::from_str("\"ipv6\"").unwrap();
        assert_eq!(parsed, IpFamily::Ipv6);
        // Anything else fails deserialization at the boundary
        assert!(serde_json::from_str::<IpFamily>("\"dual\"").is_err());
    }

    #[test]
    fn cluster_info_artifact_tolerates_partial_json() {
        let artifact: ClusterInfoArtifact =
            serde_json::from_str(r#"{"cluster_id": "demo-1", "unknown_field": 42}"#).unwrap();
        assert_eq!(artifact.cluster_id.as_deref(), Some("demo-1"));
        assert!(artifact.cluster_arn.is_none());
    }
}
