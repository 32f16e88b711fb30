use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::application::StatusService;

use super::handlers::{
    apply_handler, cluster_deployments_handler, cluster_events_handler,
    cluster_namespaces_handler, cluster_nodes_handler, cluster_pods_handler,
    cluster_recheck_handler, cluster_services_handler, cluster_status_handler,
    cluster_usage_handler, container_exec_handler, container_remove_handler,
    container_restart_handler, container_start_handler, container_stop_handler,
    describe_handler, docker_containers_handler, docker_images_handler, docker_prune_handler,
    docker_recheck_handler, docker_stats_handler, docker_status_handler, health_handler,
    image_pull_handler, image_remove_handler, inference_exec_handler, inference_logs_handler,
    inference_metrics_handler, inference_recheck_handler, inference_restart_handler,
    inference_start_handler, inference_status_handler, inference_stop_handler,
    model_load_handler, model_unload_handler, pod_exec_handler, pod_logs_handler, scale_handler,
    AppState,
};

pub fn create_router(service: Arc<StatusService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/api/health", get(health_handler))
        // Inference subsystem
        .route("/api/inference/status", get(inference_status_handler))
        .route("/api/inference/logs", get(inference_logs_handler))
        .route("/api/inference/metrics", get(inference_metrics_handler))
        .route("/api/inference/start", post(inference_start_handler))
        .route("/api/inference/stop", post(inference_stop_handler))
        .route("/api/inference/restart", post(inference_restart_handler))
        .route("/api/inference/exec", post(inference_exec_handler))
        .route("/api/inference/models/{name}/load", post(model_load_handler))
        .route("/api/inference/models/{name}/unload", post(model_unload_handler))
        .route("/api/inference/recheck", post(inference_recheck_handler))
        // Container engine
        .route("/api/docker/status", get(docker_status_handler))
        .route("/api/docker/containers", get(docker_containers_handler))
        .route("/api/docker/images", get(docker_images_handler))
        .route("/api/docker/stats", get(docker_stats_handler))
        .route("/api/docker/containers/{id}/start", post(container_start_handler))
        .route("/api/docker/containers/{id}/stop", post(container_stop_handler))
        .route("/api/docker/containers/{id}/restart", post(container_restart_handler))
        .route("/api/docker/containers/{id}", delete(container_remove_handler))
        .route("/api/docker/containers/{id}/exec", post(container_exec_handler))
        .route("/api/docker/images/pull", post(image_pull_handler))
        .route("/api/docker/images/{id}", delete(image_remove_handler))
        .route("/api/docker/prune", post(docker_prune_handler))
        .route("/api/docker/recheck", post(docker_recheck_handler))
        // Cluster control plane
        .route("/api/cluster/status", get(cluster_status_handler))
        .route("/api/cluster/nodes", get(cluster_nodes_handler))
        .route("/api/cluster/namespaces", get(cluster_namespaces_handler))
        .route("/api/cluster/pods", get(cluster_pods_handler))
        .route("/api/cluster/services", get(cluster_services_handler))
        .route("/api/cluster/deployments", get(cluster_deployments_handler))
        .route("/api/cluster/events", get(cluster_events_handler))
        .route("/api/cluster/usage", get(cluster_usage_handler))
        .route("/api/cluster/pods/{name}/logs", get(pod_logs_handler))
        .route("/api/cluster/pods/{name}/exec", post(pod_exec_handler))
        .route("/api/cluster/describe/{kind}/{name}", get(describe_handler))
        .route("/api/cluster/deployments/{name}/scale", post(scale_handler))
        .route("/api/cluster/apply", post(apply_handler))
        .route("/api/cluster/recheck", post(cluster_recheck_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
