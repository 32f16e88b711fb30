use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::adapters::AdapterError;
use crate::application::StatusService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StatusService>,
}

/// Uniform response envelope for every API route
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
        }
    }
}

fn ok_json<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
}

/// Validation failures are the caller's fault (400); a closed admin gate is
/// 403; an absent tool is 503; everything else is a 500.
fn failure(error: AdapterError) -> Response {
    let status = if error.is_validation() {
        StatusCode::BAD_REQUEST
    } else if matches!(error, AdapterError::ExecDisabled) {
        StatusCode::FORBIDDEN
    } else if matches!(&error, AdapterError::Command(e) if e.is_not_found()) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let body = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(error.to_string()),
        details: None,
    };
    (status, Json(body)).into_response()
}

fn result_json<T: Serialize>(result: Result<T, AdapterError>) -> Response {
    match result {
        Ok(data) => ok_json(data),
        Err(e) => failure(e),
    }
}

/// Mutating calls report their boolean outcome in `success` itself
fn outcome_json(result: Result<bool, AdapterError>) -> Response {
    match result {
        Ok(true) => ok_json(true),
        Ok(false) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<bool> {
                success: false,
                data: Some(false),
                error: Some("operation failed".to_string()),
                details: None,
            }),
        )
            .into_response(),
        Err(e) => failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct LinesQuery {
    #[serde(default = "default_lines")]
    pub lines: u32,
}

fn default_lines() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
pub struct AllQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct NamespaceQuery {
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "all".to_string()
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DescribeQuery {
    pub namespace: String,
}

#[derive(Debug, Deserialize)]
pub struct PodLogsQuery {
    pub namespace: String,
    #[serde(default = "default_lines")]
    pub lines: u32,
}

#[derive(Debug, Deserialize)]
pub struct ExecRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct ScaleRequest {
    pub namespace: String,
    pub replicas: i32,
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub manifest: String,
}

#[derive(Debug, Deserialize)]
pub struct PodExecRequest {
    pub namespace: String,
    pub command: Vec<String>,
}

/// Handler for GET /api/health
pub async fn health_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": "shimmyd"
        })),
    )
}

// ---- inference ----

/// Handler for GET /api/inference/status
#[debug_handler]
pub async fn inference_status_handler(State(state): State<AppState>) -> Response {
    ok_json(state.service.inference_status().await)
}

pub async fn inference_logs_handler(
    State(state): State<AppState>,
    Query(params): Query<LinesQuery>,
) -> Response {
    result_json(state.service.inference().logs(params.lines).await)
}

pub async fn inference_metrics_handler(State(state): State<AppState>) -> Response {
    result_json(state.service.inference().performance_metrics().await)
}

pub async fn inference_start_handler(State(state): State<AppState>) -> Response {
    outcome_json(state.service.inference().start().await)
}

pub async fn inference_stop_handler(State(state): State<AppState>) -> Response {
    outcome_json(state.service.inference().stop().await)
}

pub async fn inference_restart_handler(State(state): State<AppState>) -> Response {
    outcome_json(state.service.inference().restart().await)
}

pub async fn inference_exec_handler(
    State(state): State<AppState>,
    Json(request): Json<ExecRequest>,
) -> Response {
    result_json(
        state
            .service
            .inference()
            .execute(&request.command, &request.args)
            .await,
    )
}

pub async fn model_load_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    outcome_json(state.service.inference().load_model(&name).await)
}

pub async fn model_unload_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    outcome_json(state.service.inference().unload_model(&name).await)
}

pub async fn inference_recheck_handler(State(state): State<AppState>) -> Response {
    state.service.inference().invalidate_availability();
    ok_json(state.service.inference().check_availability().await)
}

// ---- container engine ----

/// Handler for GET /api/docker/status
#[debug_handler]
pub async fn docker_status_handler(State(state): State<AppState>) -> Response {
    ok_json(state.service.engine_status().await)
}

pub async fn docker_containers_handler(
    State(state): State<AppState>,
    Query(params): Query<AllQuery>,
) -> Response {
    result_json(state.service.docker().list_containers(params.all).await)
}

pub async fn docker_images_handler(State(state): State<AppState>) -> Response {
    result_json(state.service.docker().list_images().await)
}

pub async fn docker_stats_handler(State(state): State<AppState>) -> Response {
    result_json(state.service.docker().container_stats().await)
}

pub async fn container_start_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    outcome_json(state.service.docker().start_container(&id).await)
}

pub async fn container_stop_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    outcome_json(state.service.docker().stop_container(&id).await)
}

pub async fn container_restart_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    outcome_json(state.service.docker().restart_container(&id).await)
}

pub async fn container_remove_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    outcome_json(state.service.docker().remove_container(&id).await)
}

pub async fn container_exec_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ExecRequest>,
) -> Response {
    let mut command = vec![request.command];
    command.extend(request.args);
    result_json(state.service.docker().exec_in_container(&id, &command).await)
}

pub async fn image_pull_handler(
    State(state): State<AppState>,
    Json(request): Json<PullRequest>,
) -> Response {
    outcome_json(state.service.docker().pull_image(&request.image).await)
}

pub async fn image_remove_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    outcome_json(state.service.docker().remove_image(&id).await)
}

pub async fn docker_prune_handler(State(state): State<AppState>) -> Response {
    outcome_json(state.service.docker().prune_system().await)
}

pub async fn docker_recheck_handler(State(state): State<AppState>) -> Response {
    state.service.docker().invalidate_availability();
    ok_json(state.service.docker().check_availability().await)
}

// ---- cluster ----

/// Handler for GET /api/cluster/status
#[debug_handler]
pub async fn cluster_status_handler(State(state): State<AppState>) -> Response {
    ok_json(state.service.cluster_status().await)
}

pub async fn cluster_nodes_handler(State(state): State<AppState>) -> Response {
    result_json(state.service.kube().get_nodes().await)
}

pub async fn cluster_namespaces_handler(State(state): State<AppState>) -> Response {
    result_json(state.service.kube().get_namespaces().await)
}

pub async fn cluster_pods_handler(
    State(state): State<AppState>,
    Query(params): Query<NamespaceQuery>,
) -> Response {
    result_json(state.service.kube().get_pods(&params.namespace).await)
}

pub async fn cluster_services_handler(
    State(state): State<AppState>,
    Query(params): Query<NamespaceQuery>,
) -> Response {
    result_json(state.service.kube().get_services(&params.namespace).await)
}

pub async fn cluster_deployments_handler(
    State(state): State<AppState>,
    Query(params): Query<NamespaceQuery>,
) -> Response {
    result_json(state.service.kube().get_deployments(&params.namespace).await)
}

pub async fn cluster_events_handler(
    State(state): State<AppState>,
    Query(params): Query<EventsQuery>,
) -> Response {
    result_json(
        state
            .service
            .kube()
            .get_events(params.namespace.as_deref())
            .await,
    )
}

pub async fn cluster_usage_handler(State(state): State<AppState>) -> Response {
    ok_json(state.service.kube().resource_usage().await)
}

pub async fn pod_logs_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<PodLogsQuery>,
) -> Response {
    result_json(
        state
            .service
            .kube()
            .pod_logs(&name, &params.namespace, params.lines)
            .await,
    )
}

pub async fn pod_exec_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<PodExecRequest>,
) -> Response {
    result_json(
        state
            .service
            .kube()
            .exec_in_pod(&name, &request.namespace, &request.command)
            .await,
    )
}

pub async fn describe_handler(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
    Query(params): Query<DescribeQuery>,
) -> Response {
    result_json(
        state
            .service
            .kube()
            .describe_resource(&kind, &name, &params.namespace)
            .await,
    )
}

pub async fn scale_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<ScaleRequest>,
) -> Response {
    outcome_json(
        state
            .service
            .kube()
            .scale_deployment(&name, &request.namespace, request.replicas)
            .await,
    )
}

pub async fn apply_handler(
    State(state): State<AppState>,
    Json(request): Json<ApplyRequest>,
) -> Response {
    result_json(state.service.kube().apply_manifest(&request.manifest).await)
}

pub async fn cluster_recheck_handler(State(state): State<AppState>) -> Response {
    state.service.kube().invalidate_availability();
    ok_json(state.service.kube().check_availability().await)
}
