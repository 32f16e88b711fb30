use serde::{Deserialize, Serialize};

/// Result of scanning the OS process table for the inference binary.
///
/// `running` is false whenever the scan finds no match, regardless of why.
/// `uptime` is best-effort text straight from `ps`; `connections` counts
/// open sockets owned by the pid and degrades to 0 when unobservable.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    pub connections: u32,
}

impl ProcessInfo {
    pub fn not_running() -> Self {
        Self {
            running: false,
            pid: None,
            uptime: None,
            connections: 0,
        }
    }

    pub fn running(pid: u32) -> Self {
        Self {
            running: true,
            pid: Some(pid),
            uptime: None,
            connections: 0,
        }
    }

    pub fn with_uptime(mut self, uptime: impl Into<String>) -> Self {
        self.uptime = Some(uptime.into());
        self
    }

    pub fn with_connections(mut self, connections: u32) -> Self {
        self.connections = connections;
        self
    }
}

/// Serving configuration reported by (or defaulted for) the inference binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub host: String,
    pub port: u16,
    pub models_dir: String,
    pub context_length: u32,
    pub threads: u32,
    pub gpu_layers: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11435,
            models_dir: "./models".to_string(),
            context_length: 4096,
            threads: 4,
            gpu_layers: 0,
        }
    }
}

/// One resource-usage sample for the serving process.
///
/// Throughput, latency and queue depth are `None` when the tool exposes no
/// stats subcommand and the sample was estimated from the process table —
/// unknown is not zero load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub tokens_per_second: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    pub queue_depth: Option<u32>,
    #[serde(default)]
    pub estimated: bool,
}

impl PerformanceMetrics {
    /// Fallback sample built from `ps` output for a known pid.
    pub fn estimated(cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            cpu_percent,
            memory_percent,
            tokens_per_second: None,
            avg_latency_ms: None,
            queue_depth: None,
            estimated: true,
        }
    }
}
