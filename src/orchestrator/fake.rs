//! In-memory orchestrator used by service and HTTP tests
//!
//! Mimics the platform's semantics where they matter: atomic create-if-absent
//! for Jobs, idempotent PVC creation, label-selector listing and counter-based
//! status. Creation timestamps are a monotonic counter so recency ordering is
//! deterministic in tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;

use super::{JobStatus, Orchestrator};
use crate::{Error, Result};

#[derive(Default)]
struct State {
    jobs: Vec<Job>,
    pvcs: HashSet<String>,
    pods: Vec<(String, BTreeMap<String, String>)>,
    logs: HashMap<String, String>,
    clock: i64,
}

/// Orchestrator fake backed by plain collections
#[derive(Default)]
pub struct FakeOrchestrator {
    state: Mutex<State>,
}

impl FakeOrchestrator {
    /// Empty fake
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a job's status counters, as the platform would while the
    /// job runs
    pub fn set_job_counters(&self, name: &str, succeeded: i32, failed: i32, active: i32) {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.iter_mut().find(|j| j.name_any() == name) {
            job.status = Some(k8s_openapi::api::batch::v1::JobStatus {
                succeeded: Some(succeeded),
                failed: Some(failed),
                active: Some(active),
                ..Default::default()
            });
        }
    }

    /// Register a pod with labels, optionally with canned log output
    pub fn add_pod(&self, name: &str, labels: &[(&str, &str)], logs: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        state.pods.push((name.to_string(), labels));
        if let Some(logs) = logs {
            state.logs.insert(name.to_string(), logs.to_string());
        }
    }

    /// Names of PVCs currently present
    pub fn pvc_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().unwrap().pvcs.iter().cloned().collect();
        names.sort();
        names
    }

    /// Names of Jobs currently present
    pub fn job_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .jobs
            .iter()
            .map(|j| j.name_any())
            .collect()
    }
}

/// Match a `k=v,k=v` equality selector against a label map
fn selector_matches(selector: &str, labels: Option<&BTreeMap<String, String>>) -> bool {
    let Some(labels) = labels else {
        return selector.is_empty();
    };
    selector.split(',').all(|pair| match pair.split_once('=') {
        Some((k, v)) => labels.get(k.trim()).map(String::as_str) == Some(v.trim()),
        None => false,
    })
}

#[async_trait]
impl Orchestrator for FakeOrchestrator {
    async fn ensure_pvc(&self, pvc: PersistentVolumeClaim) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.pvcs.insert(pvc.name_any());
        Ok(())
    }

    async fn create_job(&self, mut job: Job) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let name = job.name_any();
        if state.jobs.iter().any(|j| j.name_any() == name) {
            return Err(Error::already_exists(format!("job {} already exists", name)));
        }
        state.clock += 1;
        let stamp = Utc.timestamp_opt(1_700_000_000 + state.clock, 0).unwrap();
        job.metadata.creation_timestamp = Some(Time(stamp));
        state.jobs.push(job);
        Ok(())
    }

    async fn job_status(&self, name: &str) -> Result<JobStatus> {
        let state = self.state.lock().unwrap();
        match state.jobs.iter().find(|j| j.name_any() == name) {
            Some(job) => Ok(JobStatus::from_job(job)),
            None => Ok(JobStatus::not_found()),
        }
    }

    async fn list_jobs(&self, label_selector: &str) -> Result<Vec<Job>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .jobs
            .iter()
            .filter(|j| selector_matches(label_selector, j.metadata.labels.as_ref()))
            .cloned()
            .collect())
    }

    async fn list_pods(&self, label_selector: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pods
            .iter()
            .filter(|(_, labels)| selector_matches(label_selector, Some(labels)))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn pod_logs(&self, pod_name: &str, _tail_lines: i64) -> String {
        let state = self.state.lock().unwrap();
        match state.logs.get(pod_name) {
            Some(logs) => logs.clone(),
            None => format!("Could not retrieve logs from pod {}", pod_name),
        }
    }

    async fn delete_job(&self, name: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let before = state.jobs.len();
        state.jobs.retain(|j| j.name_any() != name);
        state.jobs.len() != before
    }

    async fn delete_pvc(&self, name: &str) -> bool {
        self.state.lock().unwrap().pvcs.remove(name)
    }

    async fn pvc_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().pvcs.contains(name))
    }
}
