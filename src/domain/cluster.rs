use serde::Serialize;

/// One row of `get nodes --no-headers`
#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    pub name: String,
    pub status: String,
    pub roles: String,
    pub age: String,
    pub version: String,
}

/// One row of `get pods --no-headers`
///
/// `namespace` is populated only when the listing spanned all namespaces
/// (the extra leading column). Restart cells like `"2 (3m ago)"` are
/// reduced to their leading count.
#[derive(Debug, Clone, Serialize)]
pub struct PodRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    pub ready: String,
    pub status: String,
    pub restarts: u32,
    pub age: String,
}

/// One row of `get services --no-headers`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    pub service_type: String,
    pub cluster_ip: String,
    pub external_ip: String,
    pub ports: String,
    pub age: String,
}

/// One row of `get deployments --no-headers`
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    pub ready: String,
    pub up_to_date: u32,
    pub available: u32,
    pub age: String,
}

/// One row of `get namespaces --no-headers`
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceRecord {
    pub name: String,
    pub status: String,
    pub age: String,
}

/// One row of `get events --no-headers`, message tail rejoined
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub last_seen: String,
    pub event_type: String,
    pub reason: String,
    pub object: String,
    pub message: String,
}

/// One row of `top nodes --no-headers`
#[derive(Debug, Clone, Serialize)]
pub struct NodeUsage {
    pub name: String,
    pub cpu: String,
    pub cpu_percent: String,
    pub memory: String,
    pub memory_percent: String,
}

/// One row of `top pods --all-namespaces --no-headers`
#[derive(Debug, Clone, Serialize)]
pub struct PodUsage {
    pub namespace: String,
    pub name: String,
    pub cpu: String,
    pub memory: String,
}

/// Metrics-addon snapshot; each half degrades independently when the
/// metrics server is absent.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceUsage {
    pub nodes: Vec<NodeUsage>,
    pub pods: Vec<PodUsage>,
    pub errors: Vec<String>,
}
