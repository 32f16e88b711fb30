use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    DeploymentRecord, EventRecord, NamespaceRecord, NodeRecord, NodeUsage, PodRecord, PodUsage,
    ResourceUsage, ServiceRecord,
};
use crate::ports::CommandRunner;

use super::tabular::{parse_rows, tail, Delimiter};
use super::{validate_identifier, AdapterError, AvailabilityCache};

/// Reachability is probed fast and often; it can legitimately flap.
const CLUSTER_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Namespace sentinel that maps to the all-namespaces flag
pub const ALL_NAMESPACES: &str = "all";

/// Adapter for the cluster control plane, driven through its client CLI.
///
/// Availability is two-stage: "client installed" (memoized) and "cluster
/// reachable" (re-probed per call with a short timeout). Listings use the
/// no-headers whitespace-column form; the all-namespaces flag prepends a
/// namespace column, so parsing branches on that offset.
pub struct KubeAdapter {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    availability: AvailabilityCache,
    admin_exec: bool,
}

impl KubeAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>, admin_exec: bool) -> Self {
        Self {
            runner,
            binary: binary.into(),
            availability: AvailabilityCache::new(),
            admin_exec,
        }
    }

    /// Stage one: is the client binary installed? Memoized.
    pub async fn check_availability(&self) -> bool {
        self.availability
            .get_or_probe(|| async {
                self.runner
                    .run(&self.binary, &["version", "--client"])
                    .await
                    .is_ok()
            })
            .await
    }

    pub fn invalidate_availability(&self) {
        self.availability.invalidate();
    }

    /// Stage two: does a cluster actually answer? Never cached.
    pub async fn cluster_reachable(&self) -> bool {
        self.runner
            .run_with_timeout(&self.binary, &["cluster-info"], CLUSTER_PROBE_TIMEOUT)
            .await
            .is_ok()
    }

    pub async fn get_nodes(&self) -> Result<Vec<NodeRecord>, AdapterError> {
        let output = self
            .runner
            .run(&self.binary, &["get", "nodes", "--no-headers"])
            .await?;

        let records = parse_rows(&output.stdout, Delimiter::Whitespace, false, 5)
            .into_iter()
            .map(|row| NodeRecord {
                name: row[0].clone(),
                status: row[1].clone(),
                roles: row[2].clone(),
                age: row[3].clone(),
                version: row[4].clone(),
            })
            .collect();
        Ok(records)
    }

    pub async fn get_namespaces(&self) -> Result<Vec<NamespaceRecord>, AdapterError> {
        let output = self
            .runner
            .run(&self.binary, &["get", "namespaces", "--no-headers"])
            .await?;

        let records = parse_rows(&output.stdout, Delimiter::Whitespace, false, 3)
            .into_iter()
            .map(|row| NamespaceRecord {
                name: row[0].clone(),
                status: row[1].clone(),
                age: row[2].clone(),
            })
            .collect();
        Ok(records)
    }

    /// Pod listing. Restart cells such as `"2 (3m ago)"` add tokens, so
    /// the age is read from the row's final token, not a fixed index.
    pub async fn get_pods(&self, namespace: &str) -> Result<Vec<PodRecord>, AdapterError> {
        let (ns_args, all) = self.namespace_args(namespace)?;
        let mut args = vec!["get", "pods", "--no-headers"];
        args.extend(ns_args.iter().map(String::as_str));

        let offset = if all { 1 } else { 0 };
        let output = self.runner.run(&self.binary, &args).await?;

        let records = parse_rows(&output.stdout, Delimiter::Whitespace, false, offset + 5)
            .into_iter()
            .map(|row| PodRecord {
                namespace: all.then(|| row[0].clone()),
                name: row[offset].clone(),
                ready: row[offset + 1].clone(),
                status: row[offset + 2].clone(),
                restarts: leading_count(&row[offset + 3]),
                age: row.last().cloned().unwrap_or_default(),
            })
            .collect();
        Ok(records)
    }

    pub async fn get_services(&self, namespace: &str) -> Result<Vec<ServiceRecord>, AdapterError> {
        let (ns_args, all) = self.namespace_args(namespace)?;
        let mut args = vec!["get", "services", "--no-headers"];
        args.extend(ns_args.iter().map(String::as_str));

        let offset = if all { 1 } else { 0 };
        let output = self.runner.run(&self.binary, &args).await?;

        let records = parse_rows(&output.stdout, Delimiter::Whitespace, false, offset + 6)
            .into_iter()
            .map(|row| ServiceRecord {
                namespace: all.then(|| row[0].clone()),
                name: row[offset].clone(),
                service_type: row[offset + 1].clone(),
                cluster_ip: row[offset + 2].clone(),
                external_ip: row[offset + 3].clone(),
                ports: row[offset + 4].clone(),
                age: row[offset + 5].clone(),
            })
            .collect();
        Ok(records)
    }

    pub async fn get_deployments(
        &self,
        namespace: &str,
    ) -> Result<Vec<DeploymentRecord>, AdapterError> {
        let (ns_args, all) = self.namespace_args(namespace)?;
        let mut args = vec!["get", "deployments", "--no-headers"];
        args.extend(ns_args.iter().map(String::as_str));

        let offset = if all { 1 } else { 0 };
        let output = self.runner.run(&self.binary, &args).await?;

        let records = parse_rows(&output.stdout, Delimiter::Whitespace, false, offset + 5)
            .into_iter()
            .map(|row| DeploymentRecord {
                namespace: all.then(|| row[0].clone()),
                name: row[offset].clone(),
                ready: row[offset + 1].clone(),
                up_to_date: leading_count(&row[offset + 2]),
                available: leading_count(&row[offset + 3]),
                age: row[offset + 4].clone(),
            })
            .collect();
        Ok(records)
    }

    /// Events sorted by last-seen time; the sort is delegated to the tool.
    pub async fn get_events(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<EventRecord>, AdapterError> {
        let mut args = vec![
            "get",
            "events",
            "--sort-by=.lastTimestamp",
            "--no-headers",
        ];
        let all = match namespace {
            Some(ns) => {
                validate_identifier("namespace", ns)?;
                args.push("-n");
                args.push(ns);
                false
            }
            None => {
                args.push("--all-namespaces");
                true
            }
        };

        let offset = if all { 1 } else { 0 };
        let output = self.runner.run(&self.binary, &args).await?;

        let records = parse_rows(&output.stdout, Delimiter::Whitespace, false, offset + 5)
            .into_iter()
            .map(|row| EventRecord {
                namespace: all.then(|| row[0].clone()),
                last_seen: row[offset].clone(),
                event_type: row[offset + 1].clone(),
                reason: row[offset + 2].clone(),
                object: row[offset + 3].clone(),
                message: tail(&row, offset + 4),
            })
            .collect();
        Ok(records)
    }

    /// Metrics-addon snapshot. Each half degrades independently; a missing
    /// metrics server gets its own marker, distinct from a generic error.
    pub async fn resource_usage(&self) -> ResourceUsage {
        let mut usage = ResourceUsage {
            nodes: Vec::new(),
            pods: Vec::new(),
            errors: Vec::new(),
        };

        match self
            .runner
            .run(&self.binary, &["top", "nodes", "--no-headers"])
            .await
        {
            Ok(output) => {
                usage.nodes = parse_rows(&output.stdout, Delimiter::Whitespace, false, 5)
                    .into_iter()
                    .map(|row| NodeUsage {
                        name: row[0].clone(),
                        cpu: row[1].clone(),
                        cpu_percent: row[2].clone(),
                        memory: row[3].clone(),
                        memory_percent: row[4].clone(),
                    })
                    .collect();
            }
            Err(e) => usage.errors.push(usage_error("nodes", &e)),
        }

        match self
            .runner
            .run(
                &self.binary,
                &["top", "pods", "--all-namespaces", "--no-headers"],
            )
            .await
        {
            Ok(output) => {
                usage.pods = parse_rows(&output.stdout, Delimiter::Whitespace, false, 4)
                    .into_iter()
                    .map(|row| PodUsage {
                        namespace: row[0].clone(),
                        name: row[1].clone(),
                        cpu: row[2].clone(),
                        memory: row[3].clone(),
                    })
                    .collect();
            }
            Err(e) => usage.errors.push(usage_error("pods", &e)),
        }

        usage
    }

    pub async fn describe_resource(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<String, AdapterError> {
        validate_identifier("kind", kind)?;
        validate_identifier("name", name)?;
        validate_identifier("namespace", namespace)?;

        let output = self
            .runner
            .run(&self.binary, &["describe", kind, name, "-n", namespace])
            .await?;
        Ok(output.stdout)
    }

    pub async fn pod_logs(
        &self,
        pod: &str,
        namespace: &str,
        lines: u32,
    ) -> Result<Vec<String>, AdapterError> {
        validate_identifier("pod", pod)?;
        validate_identifier("namespace", namespace)?;

        let tail_arg = format!("--tail={}", lines);
        let output = self
            .runner
            .run(&self.binary, &["logs", pod, "-n", namespace, &tail_arg])
            .await?;
        Ok(output.stdout.lines().map(str::to_string).collect())
    }

    /// Operator passthrough into a pod, behind the admin gate
    pub async fn exec_in_pod(
        &self,
        pod: &str,
        namespace: &str,
        command: &[String],
    ) -> Result<String, AdapterError> {
        if !self.admin_exec {
            return Err(AdapterError::ExecDisabled);
        }
        validate_identifier("pod", pod)?;
        validate_identifier("namespace", namespace)?;
        if command.is_empty() {
            return Err(AdapterError::invalid("command", "must not be empty"));
        }

        let mut args = vec!["exec", pod, "-n", namespace, "--"];
        args.extend(command.iter().map(String::as_str));
        match self.runner.run(&self.binary, &args).await {
            Ok(output) => Ok(output.stdout),
            Err(e) => Ok(format!("command failed: {}", e)),
        }
    }

    /// Apply a manifest. The tool wants a file path for this call path, so
    /// the content goes through a uniquely-named temp file that is removed
    /// again whether or not apply succeeds.
    pub async fn apply_manifest(&self, content: &str) -> Result<String, AdapterError> {
        let path = manifest_temp_path();
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| AdapterError::Io(format!("writing manifest: {}", e)))?;

        let path_arg = path.to_string_lossy().to_string();
        let result = self.runner.run(&self.binary, &["apply", "-f", &path_arg]).await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), "failed to remove manifest temp file: {}", e);
        }

        Ok(result?.stdout)
    }

    /// The one mutating call with client-side validation before any
    /// external invocation: replica counts must be non-negative.
    pub async fn scale_deployment(
        &self,
        name: &str,
        namespace: &str,
        replicas: i32,
    ) -> Result<bool, AdapterError> {
        if replicas < 0 {
            return Err(AdapterError::invalid(
                "replicas",
                "must be a non-negative number",
            ));
        }
        validate_identifier("deployment", name)?;
        validate_identifier("namespace", namespace)?;

        let replicas_arg = format!("--replicas={}", replicas);
        match self
            .runner
            .run(
                &self.binary,
                &["scale", "deployment", name, "-n", namespace, &replicas_arg],
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(deployment = %name, "scale failed: {}", e);
                Ok(false)
            }
        }
    }

    /// `"all"` → the all-namespaces flag (and the extra leading column);
    /// anything else is a validated literal namespace.
    fn namespace_args(&self, namespace: &str) -> Result<(Vec<String>, bool), AdapterError> {
        if namespace == ALL_NAMESPACES {
            Ok((vec!["--all-namespaces".to_string()], true))
        } else {
            validate_identifier("namespace", namespace)?;
            Ok((vec!["-n".to_string(), namespace.to_string()], false))
        }
    }
}

fn manifest_temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("shimmyd-manifest-{}.yaml", Uuid::new_v4()))
}

fn leading_count(cell: &str) -> u32 {
    let digits: String = cell.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

fn usage_error(what: &str, error: &crate::ports::CommandError) -> String {
    let text = error.to_string();
    if text.to_ascii_lowercase().contains("metrics") {
        format!("{}: metrics server not available", what)
    } else {
        format!("{}: {}", what, text)
    }
}
