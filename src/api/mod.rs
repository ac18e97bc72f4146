//! HTTP surface
//!
//! The router is the single entry point into the service; everything it does
//! goes through [`ClusterService`]. Domain errors carry their own HTTP
//! rendering: validation failures are 400, duplicate jobs 409, unknown
//! clusters 404, platform trouble 500. Error bodies are always
//! `{"detail": "..."}`.

mod handlers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::error;

use crate::service::ClusterService;
use crate::Error;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle service backing every endpoint
    pub service: Arc<ClusterService>,
}

/// Build the application router
pub fn router(service: Arc<ClusterService>) -> Router {
    let state = AppState { service };
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/clusters", get(handlers::list_clusters))
        .route("/clusters/test", post(handlers::test_cluster))
        .route("/clusters/provision", post(handlers::provision_cluster))
        .route("/clusters/{cluster_name}", delete(handlers::destroy_cluster))
        .route(
            "/clusters/{cluster_name}/status",
            get(handlers::cluster_status),
        )
        .route("/clusters/{cluster_name}/logs", get(handlers::cluster_logs))
        .route(
            "/clusters/{cluster_name}/cleanup",
            delete(handlers::cleanup_cluster),
        )
        .with_state(state)
}

/// Wrapper rendering domain errors as HTTP responses
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::AlreadyExists(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Kube(_) | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}
