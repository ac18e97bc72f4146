//! Pure Job and PVC manifest builders
//!
//! Construction only - nothing here talks to the API server. Every manifest
//! is derived from the naming convention in [`crate::names`] plus the shared
//! configuration, so the same inputs always produce the same objects.
//!
//! AWS credentials are never inlined: the worker containers reference the
//! `aws-creds` Secret by key, and the values stay inside the cluster.

use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, SecretKeySelector, Volume,
    VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::config::Config;
use crate::model::ClusterRequest;
use crate::names::{job_name, pvc_name, Operation, PvcKind};
use crate::{
    APP_LABEL, AWS_CREDS_SECRET, CLUSTER_LABEL, LOGS_MOUNT_PATH, OPERATION_LABEL,
    STATE_MOUNT_PATH, TEST_JOB_TTL_SECONDS, WORKER_SERVICE_ACCOUNT,
};

/// Build the Job for a test or provision run.
///
/// Test and provision differ only in the Job name, the `DRY_RUN` variable and
/// the TTL: dry-run Jobs clean themselves up after 24 hours, real provision
/// Jobs stay until explicitly cleaned up.
pub fn build_provision_job(config: &Config, request: &ClusterRequest, dry_run: bool) -> Job {
    let operation = if dry_run {
        Operation::Test
    } else {
        Operation::Provision
    };

    let mut env = vec![
        plain_env("CLUSTER_NAME", &request.cluster_name),
        plain_env("KUBERNETES_VERSION", &request.kubernetes_version),
        plain_env("INSTANCE_TYPE", &request.instance_type),
        plain_env("IP_FAMILY", request.ip_family.as_str()),
        plain_env("DRY_RUN", if dry_run { "true" } else { "false" }),
    ];
    env.extend(aws_credential_env());

    worker_job(config, &request.cluster_name, operation, env)
}

/// Build the Job for a destroy run.
///
/// The worker only needs the cluster name and credentials; everything else is
/// read back from the Terraform state volume written by the provision run.
pub fn build_destroy_job(config: &Config, cluster_name: &str) -> Job {
    let mut env = vec![plain_env("CLUSTER_NAME", cluster_name)];
    env.extend(aws_credential_env());

    worker_job(config, cluster_name, Operation::Destroy, env)
}

/// Build one of the two per-cluster volumes.
///
/// Both are ReadWriteMany so a destroy Job can read state written by an
/// earlier provision Job while old pods may still be around.
pub fn build_pvc(config: &Config, cluster_name: &str, kind: PvcKind) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(pvc_name(kind, cluster_name)),
            labels: Some(labels(cluster_name, None)),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteMany".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(kind.storage().to_string()),
                )])),
                ..Default::default()
            }),
            storage_class_name: Some(config.storage_class.clone()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn worker_job(config: &Config, cluster_name: &str, operation: Operation, env: Vec<EnvVar>) -> Job {
    let job_labels = labels(cluster_name, Some(operation));

    // Dry-run Jobs expire on their own; provision/destroy Jobs are kept so
    // their outcome stays queryable until cleanup.
    let ttl = operation.dry_run().then_some(TEST_JOB_TTL_SECONDS);

    Job {
        metadata: ObjectMeta {
            name: Some(job_name(operation, cluster_name)),
            labels: Some(job_labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            // Fire once: retries, if any, belong to the worker script
            backoff_limit: Some(0),
            ttl_seconds_after_finished: ttl,
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(job_labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    service_account_name: Some(WORKER_SERVICE_ACCOUNT.to_string()),
                    containers: vec![Container {
                        name: "terraform".to_string(),
                        image: Some(config.worker_image.clone()),
                        image_pull_policy: Some("Always".to_string()),
                        command: Some(vec!["/bin/bash".to_string(), "-c".to_string()]),
                        args: Some(vec![operation.script().to_string()]),
                        env: Some(env),
                        volume_mounts: Some(vec![
                            mount("tfstate", STATE_MOUNT_PATH),
                            mount("tflogs", LOGS_MOUNT_PATH),
                        ]),
                        ..Default::default()
                    }],
                    volumes: Some(vec![
                        pvc_volume("tfstate", &pvc_name(PvcKind::State, cluster_name)),
                        pvc_volume("tflogs", &pvc_name(PvcKind::Logs, cluster_name)),
                    ]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn labels(cluster_name: &str, operation: Option<Operation>) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), APP_LABEL.to_string());
    labels.insert(CLUSTER_LABEL.to_string(), cluster_name.to_string());
    if let Some(op) = operation {
        labels.insert(OPERATION_LABEL.to_string(), op.as_str().to_string());
    }
    labels
}

fn plain_env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

/// Reference a key of the `aws-creds` Secret; the value never appears in the
/// Job manifest.
fn secret_env(name: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: AWS_CREDS_SECRET.to_string(),
                key: name.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn aws_credential_env() -> Vec<EnvVar> {
    vec![
        secret_env("AWS_ACCESS_KEY_ID"),
        secret_env("AWS_SECRET_ACCESS_KEY"),
        secret_env("AWS_DEFAULT_REGION"),
    ]
}

fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}

fn pvc_volume(name: &str, claim_name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim_name.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}
