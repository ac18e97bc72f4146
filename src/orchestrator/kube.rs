//! Kubernetes implementation of the orchestrator interface

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::{error, info, warn};

use super::{JobStatus, Orchestrator};
use crate::{Error, Result};

/// Orchestrator backed by the Kubernetes API, scoped to a single namespace.
///
/// Constructed once at process start and shared across requests; it holds no
/// mutable state beyond the connection-reusing client.
#[derive(Clone)]
pub struct KubeOrchestrator {
    client: Client,
    namespace: String,
}

impl KubeOrchestrator {
    /// Create an orchestrator operating in the given namespace
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn jobs(&self) -> Api<Job> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pvcs(&self) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

/// Whether a kube error is an HTTP conflict (object already exists)
fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}

/// Whether a kube error is an HTTP not-found
fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn ensure_pvc(&self, pvc: PersistentVolumeClaim) -> Result<()> {
        let name = pvc.name_any();
        match self.pvcs().create(&PostParams::default(), &pvc).await {
            Ok(_) => {
                info!(pvc = %name, "created PVC");
                Ok(())
            }
            // Shared per-cluster infrastructure: re-creation is expected
            Err(e) if is_conflict(&e) => {
                warn!(pvc = %name, "PVC already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_job(&self, job: Job) -> Result<()> {
        let name = job.name_any();
        match self.jobs().create(&PostParams::default(), &job).await {
            Ok(_) => {
                info!(job = %name, "created job");
                Ok(())
            }
            Err(e) if is_conflict(&e) => {
                error!(job = %name, "job already exists");
                Err(Error::already_exists(format!("job {} already exists", name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn job_status(&self, name: &str) -> Result<JobStatus> {
        match self.jobs().get(name).await {
            Ok(job) => Ok(JobStatus::from_job(&job)),
            Err(e) if is_not_found(&e) => Ok(JobStatus::not_found()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_jobs(&self, label_selector: &str) -> Result<Vec<Job>> {
        let params = ListParams::default().labels(label_selector);
        let jobs = self.jobs().list(&params).await?;
        Ok(jobs.items)
    }

    async fn list_pods(&self, label_selector: &str) -> Result<Vec<String>> {
        let params = ListParams::default().labels(label_selector);
        let pods = self.pods().list(&params).await?;
        Ok(pods.items.iter().map(|p| p.name_any()).collect())
    }

    async fn pod_logs(&self, pod_name: &str, tail_lines: i64) -> String {
        let params = LogParams {
            tail_lines: Some(tail_lines),
            ..Default::default()
        };
        match self.pods().logs(pod_name, &params).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(pod = %pod_name, error = %e, "failed to read pod logs");
                format!("Could not retrieve logs from pod {}", pod_name)
            }
        }
    }

    async fn delete_job(&self, name: &str) -> bool {
        // Foreground propagation so the job's pods go with it
        match self.jobs().delete(name, &DeleteParams::foreground()).await {
            Ok(_) => {
                info!(job = %name, "deleted job");
                true
            }
            Err(e) if is_not_found(&e) => false,
            Err(e) => {
                error!(job = %name, error = %e, "failed to delete job");
                false
            }
        }
    }

    async fn delete_pvc(&self, name: &str) -> bool {
        match self.pvcs().delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                info!(pvc = %name, "deleted PVC");
                true
            }
            Err(e) if is_not_found(&e) => false,
            Err(e) => {
                error!(pvc = %name, error = %e, "failed to delete PVC");
                false
            }
        }
    }

    async fn pvc_exists(&self, name: &str) -> Result<bool> {
        match self.pvcs().get(name).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
