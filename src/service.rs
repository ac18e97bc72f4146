//! Cluster lifecycle facade
//!
//! The service owns no state: every query re-derives cluster state from the
//! Jobs currently labeled for that cluster. When several Jobs exist for one
//! cluster (a completed provision plus a newer destroy, say), the one with
//! the latest creation timestamp wins - both here and in the list endpoint,
//! so status and list never disagree.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::Job;
use kube::ResourceExt;
use tracing::{info, warn};

use crate::config::Config;
use crate::manifests::{build_destroy_job, build_provision_job, build_pvc};
use crate::model::{
    CleanupResponse, ClusterInfo, ClusterInfoArtifact, ClusterListResponse, ClusterLogs,
    ClusterRequest, ClusterStatus, DeletedResources,
};
use crate::names::{pvc_name, Operation, PvcKind};
use crate::orchestrator::{JobState, JobStatus, Orchestrator};
use crate::{Error, Result, APP_LABEL, CLUSTER_LABEL, LOG_TAIL_LINES};

/// Lifecycle service used by the HTTP layer.
///
/// Constructed once at startup with the shared configuration and an
/// orchestrator, then passed to every request handler.
pub struct ClusterService {
    config: Arc<Config>,
    orchestrator: Arc<dyn Orchestrator>,
}

impl ClusterService {
    /// Create the service
    pub fn new(config: Arc<Config>, orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    /// Versions accepted by request validation
    pub fn supported_versions(&self) -> &[String] {
        &self.config.supported_versions
    }

    /// Create a dry-run Job (`test-<name>`); terraform plan only.
    pub async fn create_test_job(&self, request: &ClusterRequest) -> Result<String> {
        self.create_worker_job(request, true).await
    }

    /// Create a provision Job (`provision-<name>`); terraform apply.
    pub async fn create_provision_job(&self, request: &ClusterRequest) -> Result<String> {
        self.create_worker_job(request, false).await
    }

    async fn create_worker_job(&self, request: &ClusterRequest, dry_run: bool) -> Result<String> {
        self.ensure_cluster_volumes(&request.cluster_name).await?;

        let job = build_provision_job(&self.config, request, dry_run);
        let name = job.name_any();
        self.orchestrator.create_job(job).await?;

        info!(cluster = %request.cluster_name, job = %name, dry_run, "created worker job");
        Ok(name)
    }

    /// Create a destroy Job (`destroy-<name>`); terraform destroy.
    ///
    /// Requires the state PVC written by a prior provision run - without it
    /// the worker would have nothing to destroy, so the request fails with
    /// not-found. Volumes are never re-created here.
    pub async fn create_destroy_job(&self, cluster_name: &str) -> Result<String> {
        let state_pvc = pvc_name(PvcKind::State, cluster_name);
        if !self.orchestrator.pvc_exists(&state_pvc).await? {
            return Err(Error::not_found(format!(
                "state PVC not found for cluster: {}",
                cluster_name
            )));
        }

        let job = build_destroy_job(&self.config, cluster_name);
        let name = job.name_any();
        self.orchestrator.create_job(job).await?;

        info!(cluster = %cluster_name, job = %name, "created destroy job");
        Ok(name)
    }

    /// Status of the most recently created Job for this cluster.
    ///
    /// Completed provision runs are enriched best-effort with the structured
    /// cluster metadata the worker leaves in its logs; a missing or malformed
    /// artifact never fails the request.
    pub async fn get_status(&self, cluster_name: &str) -> Result<ClusterStatus> {
        let job = self.latest_job(cluster_name).await?.ok_or_else(|| {
            Error::not_found(format!("no job found for cluster: {}", cluster_name))
        })?;

        let job_name = job.name_any();
        let status = JobStatus::from_job(&job);

        let mut response = ClusterStatus {
            cluster_name: cluster_name.to_string(),
            job_name: job_name.clone(),
            status: status.state.as_str().to_string(),
            phase: status.phase().to_string(),
            message: status.message,
            cluster_id: None,
            cluster_guid: None,
            cluster_arn: None,
            kubeconfig_command: None,
        };

        if status.state == JobState::Completed
            && Operation::from_job_name(&job_name) == Some(Operation::Provision)
        {
            if let Some(info) = self.read_cluster_info(cluster_name).await {
                response.cluster_id = info.cluster_id;
                response.cluster_guid = info.cluster_guid;
                response.cluster_arn = info.cluster_arn;
                response.kubeconfig_command = info.kubeconfig_command;
            }
        }

        Ok(response)
    }

    /// Tail the logs of a worker pod for this cluster.
    ///
    /// Best-effort throughout: no pod, or an unreadable pod, yields a
    /// placeholder string rather than an error.
    pub async fn get_logs(&self, cluster_name: &str) -> Result<ClusterLogs> {
        let logs = self.read_worker_logs(cluster_name).await?;
        Ok(ClusterLogs {
            cluster_name: cluster_name.to_string(),
            logs,
            log_type: "terraform".to_string(),
        })
    }

    /// Reconstruct the set of known clusters from the current Jobs.
    ///
    /// Groups Jobs by the `cluster` label, keeps the latest per cluster and
    /// recovers the requested version/instance type from the Job's stored
    /// environment. Result order is unspecified.
    pub async fn list_clusters(&self) -> Result<ClusterListResponse> {
        let jobs = self
            .orchestrator
            .list_jobs(&format!("app={}", APP_LABEL))
            .await?;

        let mut latest: HashMap<String, Job> = HashMap::new();
        for job in jobs {
            let Some(cluster) = job.labels().get(CLUSTER_LABEL).cloned() else {
                continue;
            };
            match latest.get(&cluster) {
                Some(current) if creation_time(current) >= creation_time(&job) => {}
                _ => {
                    latest.insert(cluster, job);
                }
            }
        }

        let mut clusters = Vec::with_capacity(latest.len());
        for (cluster_name, job) in latest {
            let job_name = job.name_any();
            let status = self.orchestrator.job_status(&job_name).await?;
            let last_operation = Operation::from_job_name(&job_name)
                .map(|op| op.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let (kubernetes_version, instance_type) = worker_env(&job);

            clusters.push(ClusterInfo {
                cluster_name,
                cluster_id: None,
                cluster_guid: None,
                provider: "AWS EKS".to_string(),
                kubernetes_version,
                instance_type,
                region: None,
                status: status.state.as_str().to_string(),
                phase: status.phase().to_string(),
                created_at: creation_time(&job).map(|t| t.to_rfc3339()),
                last_operation,
            });
        }

        Ok(ClusterListResponse {
            total: clusters.len(),
            clusters,
        })
    }

    /// Delete every Job and both PVCs for a cluster.
    ///
    /// Never fails outright: individual deletion failures are logged and
    /// skipped, and the response is always a tally of what actually went.
    pub async fn cleanup(&self, cluster_name: &str) -> CleanupResponse {
        let mut deleted = DeletedResources::default();

        match self
            .orchestrator
            .list_jobs(&self.cluster_selector(cluster_name))
            .await
        {
            Ok(jobs) => {
                for job in jobs {
                    let name = job.name_any();
                    if self.orchestrator.delete_job(&name).await {
                        deleted.jobs.push(name);
                    }
                }
            }
            Err(e) => {
                warn!(cluster = %cluster_name, error = %e, "failed to list jobs during cleanup");
            }
        }

        for kind in [PvcKind::State, PvcKind::Logs] {
            let name = pvc_name(kind, cluster_name);
            if self.orchestrator.delete_pvc(&name).await {
                deleted.pvcs.push(name);
            }
        }

        let message = format!(
            "Deleted {} jobs and {} PVCs",
            deleted.jobs.len(),
            deleted.pvcs.len()
        );
        info!(cluster = %cluster_name, jobs = deleted.jobs.len(), pvcs = deleted.pvcs.len(), "cleanup finished");

        CleanupResponse {
            cluster_name: cluster_name.to_string(),
            status: "cleaned_up".to_string(),
            deleted,
            message,
        }
    }

    /// Lazily create the two shared volumes for a cluster; safe to repeat
    async fn ensure_cluster_volumes(&self, cluster_name: &str) -> Result<()> {
        self.orchestrator
            .ensure_pvc(build_pvc(&self.config, cluster_name, PvcKind::State))
            .await?;
        self.orchestrator
            .ensure_pvc(build_pvc(&self.config, cluster_name, PvcKind::Logs))
            .await?;
        Ok(())
    }

    fn cluster_selector(&self, cluster_name: &str) -> String {
        format!("app={},{}={}", APP_LABEL, CLUSTER_LABEL, cluster_name)
    }

    /// Most recently created Job labeled for this cluster, if any
    async fn latest_job(&self, cluster_name: &str) -> Result<Option<Job>> {
        let jobs = self
            .orchestrator
            .list_jobs(&self.cluster_selector(cluster_name))
            .await?;
        Ok(jobs.into_iter().max_by_key(creation_time))
    }

    async fn read_worker_logs(&self, cluster_name: &str) -> Result<String> {
        let pods = self
            .orchestrator
            .list_pods(&format!("{}={}", CLUSTER_LABEL, cluster_name))
            .await?;

        match pods.first() {
            Some(pod) => Ok(self.orchestrator.pod_logs(pod, LOG_TAIL_LINES).await),
            None => Ok("No pods found for this cluster".to_string()),
        }
    }

    async fn read_cluster_info(&self, cluster_name: &str) -> Option<ClusterInfoArtifact> {
        let logs = self.read_worker_logs(cluster_name).await.ok()?;
        parse_cluster_info(&logs)
    }
}

/// Extract the structured cluster-info JSON the worker appends to its output.
///
/// The logs are free-form Terraform text with, on success, a JSON object
/// somewhere inside. Take the outermost brace span and try to parse it;
/// anything that doesn't parse is simply absent metadata.
fn parse_cluster_info(logs: &str) -> Option<ClusterInfoArtifact> {
    let start = logs.find('{')?;
    let end = logs.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&logs[start..=end]).ok()
}

fn creation_time(job: &Job) -> Option<DateTime<Utc>> {
    job.metadata.creation_timestamp.as_ref().map(|t| t.0)
}

/// Recover (KUBERNETES_VERSION, INSTANCE_TYPE) from a Job's stored env
fn worker_env(job: &Job) -> (Option<String>, Option<String>) {
    let env = job
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .and_then(|s| s.containers.first())
        .and_then(|c| c.env.as_ref());

    let find = |name: &str| {
        env.and_then(|vars| {
            vars.iter()
                .find(|v| v.name == name)
                .and_then(|v| v.value.clone())
        })
    };

    (find("KUBERNETES_VERSION"), find("INSTANCE_TYPE"))
}
