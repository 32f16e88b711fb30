use chrono::{DateTime, Utc};
use serde::Serialize;

use super::cluster::{DeploymentRecord, NamespaceRecord, NodeRecord, PodRecord, ServiceRecord};
use super::container::{ContainerRecord, EngineInfo, ImageRecord};
use super::inference::{InferenceConfig, PerformanceMetrics, ProcessInfo};

/// Aggregate status of the inference subsystem.
///
/// Built best-effort: every constituent fetch that fails leaves its field
/// at a default and appends to `errors`; the aggregate itself never fails.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceStatus {
    pub available: bool,
    pub running: bool,
    pub version: String,
    pub process: ProcessInfo,
    pub config: InferenceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PerformanceMetrics>,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl InferenceStatus {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            running: false,
            version: "unknown".to_string(),
            process: ProcessInfo::not_running(),
            config: InferenceConfig::default(),
            metrics: None,
            errors: vec![error.into()],
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate status of the container engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub available: bool,
    pub containers: Vec<ContainerRecord>,
    pub images: Vec<ImageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<EngineInfo>,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl EngineStatus {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            containers: Vec::new(),
            images: Vec::new(),
            info: None,
            errors: vec![error.into()],
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate status of the cluster control plane.
///
/// `available` and `cluster_accessible` are independent: the client tool
/// being installed while no cluster answers is its own reported state.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterStatus {
    pub available: bool,
    pub cluster_accessible: bool,
    pub nodes: Vec<NodeRecord>,
    pub namespaces: Vec<NamespaceRecord>,
    pub pods: Vec<PodRecord>,
    pub services: Vec<ServiceRecord>,
    pub deployments: Vec<DeploymentRecord>,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ClusterStatus {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            cluster_accessible: false,
            nodes: Vec::new(),
            namespaces: Vec::new(),
            pods: Vec::new(),
            services: Vec::new(),
            deployments: Vec::new(),
            errors: vec![error.into()],
            timestamp: Utc::now(),
        }
    }

    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            available: true,
            ..Self::unavailable(error)
        }
    }
}
