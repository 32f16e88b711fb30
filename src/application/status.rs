use chrono::Utc;
use tracing::warn;

use crate::adapters::kube::ALL_NAMESPACES;
use crate::adapters::{AdapterError, DockerAdapter, InferenceAdapter, KubeAdapter};
use crate::domain::{
    ClusterStatus, EngineStatus, InferenceConfig, InferenceStatus, ProcessInfo,
};

/// Best-effort status aggregation over the three tool adapters.
///
/// Availability is binary and gates everything; once a tool is available,
/// each constituent fetch is independently optional. Constituents run
/// concurrently with no defined completion order, and any individual
/// failure degrades that field to a default plus an `errors` entry — an
/// aggregate call never fails as a whole.
pub struct StatusService {
    inference: InferenceAdapter,
    docker: DockerAdapter,
    kube: KubeAdapter,
}

impl StatusService {
    pub fn new(inference: InferenceAdapter, docker: DockerAdapter, kube: KubeAdapter) -> Self {
        Self {
            inference,
            docker,
            kube,
        }
    }

    pub fn inference(&self) -> &InferenceAdapter {
        &self.inference
    }

    pub fn docker(&self) -> &DockerAdapter {
        &self.docker
    }

    pub fn kube(&self) -> &KubeAdapter {
        &self.kube
    }

    pub async fn inference_status(&self) -> InferenceStatus {
        if !self.inference.check_availability().await {
            return InferenceStatus::unavailable("shimmy binary not available");
        }

        let (version, process, config) = tokio::join!(
            self.inference.version(),
            self.inference.process_info(),
            self.inference.config(),
        );

        let mut errors = Vec::new();
        let version = version.unwrap_or_else(|e| {
            errors.push(format!("version: {}", e));
            "unknown".to_string()
        });
        let process = process.unwrap_or_else(|e| {
            errors.push(format!("process: {}", e));
            ProcessInfo::not_running()
        });
        let config = config.unwrap_or_else(|e| {
            errors.push(format!("config: {}", e));
            InferenceConfig::default()
        });

        // Metrics only make sense against a live process; their failure is
        // reported but never flips `running`.
        let metrics = if process.running {
            match self.inference.performance_metrics().await {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    errors.push(format!("metrics: {}", e));
                    None
                }
            }
        } else {
            None
        };

        InferenceStatus {
            available: true,
            running: process.running,
            version,
            process,
            config,
            metrics,
            errors,
            timestamp: Utc::now(),
        }
    }

    pub async fn engine_status(&self) -> EngineStatus {
        if !self.docker.check_availability().await {
            return EngineStatus::unavailable("docker is not available");
        }

        let (containers, images, info) = tokio::join!(
            self.docker.list_containers(true),
            self.docker.list_images(),
            self.docker.engine_info(),
        );

        let mut errors = Vec::new();
        let containers = collect(containers, "containers", &mut errors);
        let images = collect(images, "images", &mut errors);
        let info = match info {
            Ok(info) => Some(info),
            Err(e) => {
                errors.push(format!("info: {}", e));
                None
            }
        };

        EngineStatus {
            available: true,
            containers,
            images,
            info,
            errors,
            timestamp: Utc::now(),
        }
    }

    pub async fn cluster_status(&self) -> ClusterStatus {
        if !self.kube.check_availability().await {
            return ClusterStatus::unavailable("kubectl is not available");
        }
        if !self.kube.cluster_reachable().await {
            return ClusterStatus::unreachable("cluster is not reachable");
        }

        let (nodes, namespaces, pods, services, deployments) = tokio::join!(
            self.kube.get_nodes(),
            self.kube.get_namespaces(),
            self.kube.get_pods(ALL_NAMESPACES),
            self.kube.get_services(ALL_NAMESPACES),
            self.kube.get_deployments(ALL_NAMESPACES),
        );

        let mut errors = Vec::new();
        ClusterStatus {
            available: true,
            cluster_accessible: true,
            nodes: collect(nodes, "nodes", &mut errors),
            namespaces: collect(namespaces, "namespaces", &mut errors),
            pods: collect(pods, "pods", &mut errors),
            services: collect(services, "services", &mut errors),
            deployments: collect(deployments, "deployments", &mut errors),
            errors,
            timestamp: Utc::now(),
        }
    }
}

/// Degrade one failed constituent to empty + an error entry
fn collect<T>(
    result: Result<Vec<T>, AdapterError>,
    what: &str,
    errors: &mut Vec<String>,
) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!(constituent = %what, "constituent fetch failed: {}", e);
            errors.push(format!("{}: {}", what, e));
            Vec::new()
        }
    }
}
