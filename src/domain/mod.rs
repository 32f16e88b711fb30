pub mod bytes;
pub mod cluster;
pub mod container;
pub mod inference;
pub mod status;

pub use bytes::format_bytes;
pub use cluster::{
    DeploymentRecord, EventRecord, NamespaceRecord, NodeRecord, NodeUsage, PodRecord, PodUsage,
    ResourceUsage, ServiceRecord,
};
pub use container::{ContainerRecord, ContainerState, ContainerStatsRecord, EngineInfo, ImageRecord};
pub use inference::{InferenceConfig, PerformanceMetrics, ProcessInfo};
pub use status::{ClusterStatus, EngineStatus, InferenceStatus};
