//! Request handlers
//!
//! Handlers validate at the boundary, delegate to
//! [`ClusterService`](crate::service::ClusterService) and map its responses
//! straight to JSON. Job-creating endpoints answer 202: the request is
//! accepted, the work happens in the cluster.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::model::{
    CleanupResponse, ClusterListResponse, ClusterLogs, ClusterRequest, ClusterResponse,
    ClusterStatus,
};

/// GET / - service descriptor with the endpoint map
pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "EKS Cluster Provisioner API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "test": "POST /clusters/test",
            "provision": "POST /clusters/provision",
            "status": "GET /clusters/{cluster_name}/status",
            "logs": "GET /clusters/{cluster_name}/logs",
            "destroy": "DELETE /clusters/{cluster_name}",
            "list": "GET /clusters",
            "cleanup": "DELETE /clusters/{cluster_name}/cleanup",
        },
    }))
}

/// GET /health - liveness probe target
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn pending_response(
    cluster_name: String,
    cluster_id: Option<String>,
    job_name: String,
    message: &str,
) -> ClusterResponse {
    ClusterResponse {
        cluster_name,
        cluster_id,
        cluster_guid: None,
        job_name,
        status: "pending".to_string(),
        message: Some(message.to_string()),
        kubeconfig_command: None,
        created_at: Some(Utc::now().to_rfc3339()),
    }
}

/// POST /clusters/test - dry-run (terraform plan) job
pub async fn test_cluster(
    State(state): State<AppState>,
    Json(request): Json<ClusterRequest>,
) -> Result<(StatusCode, Json<ClusterResponse>), ApiError> {
    request.validate(state.service.supported_versions())?;
    let job_name = state.service.create_test_job(&request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(pending_response(
            request.cluster_name,
            None,
            job_name,
            "Dry-run job created. Check status endpoint for progress.",
        )),
    ))
}

/// POST /clusters/provision - terraform apply job
pub async fn provision_cluster(
    State(state): State<AppState>,
    Json(request): Json<ClusterRequest>,
) -> Result<(StatusCode, Json<ClusterResponse>), ApiError> {
    request.validate(state.service.supported_versions())?;
    let job_name = state.service.create_provision_job(&request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(pending_response(
            request.cluster_name,
            None,
            job_name,
            "Provisioning job created. This will take 15-20 minutes. \
             Check status endpoint for progress.",
        )),
    ))
}

/// DELETE /clusters/{name} - terraform destroy job
pub async fn destroy_cluster(
    State(state): State<AppState>,
    Path(cluster_name): Path<String>,
) -> Result<(StatusCode, Json<ClusterResponse>), ApiError> {
    let job_name = state.service.create_destroy_job(&cluster_name).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(pending_response(
            cluster_name.clone(),
            // The destroy path identifies the cluster by id, which is its name
            Some(cluster_name),
            job_name,
            "Destroy job created. This will take several minutes. \
             Check status endpoint for progress.",
        )),
    ))
}

/// GET /clusters/{name}/status
pub async fn cluster_status(
    State(state): State<AppState>,
    Path(cluster_name): Path<String>,
) -> Result<Json<ClusterStatus>, ApiError> {
    Ok(Json(state.service.get_status(&cluster_name).await?))
}

/// GET /clusters/{name}/logs
pub async fn cluster_logs(
    State(state): State<AppState>,
    Path(cluster_name): Path<String>,
) -> Result<Json<ClusterLogs>, ApiError> {
    Ok(Json(state.service.get_logs(&cluster_name).await?))
}

/// GET /clusters
pub async fn list_clusters(
    State(state): State<AppState>,
) -> Result<Json<ClusterListResponse>, ApiError> {
    Ok(Json(state.service.list_clusters().await?))
}

/// DELETE /clusters/{name}/cleanup - remove every Job and PVC for a cluster.
/// Always 200: cleanup is best-effort and reports what it actually deleted.
pub async fn cleanup_cluster(
    State(state): State<AppState>,
    Path(cluster_name): Path<String>,
) -> Json<CleanupResponse> {
    Json(state.service.cleanup(&cluster_name).await)
}
