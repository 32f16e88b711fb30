use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::{
    format_bytes, ContainerRecord, ContainerState, ContainerStatsRecord, EngineInfo, ImageRecord,
};
use crate::ports::CommandRunner;

use super::tabular::{parse_rows, Delimiter};
use super::{validate_identifier, AdapterError, AvailabilityCache};

// Explicit tab-joined templates: names, commands and sizes may contain
// spaces, so the tab is the only safe delimiter. Column count and order
// here are a contract with the parsing below — change both together.
const PS_FORMAT: &str =
    "table {{.ID}}\t{{.Names}}\t{{.Image}}\t{{.State}}\t{{.Status}}\t{{.Ports}}\t{{.CreatedAt}}";
const IMAGES_FORMAT: &str =
    "table {{.ID}}\t{{.Repository}}\t{{.Tag}}\t{{.Size}}\t{{.CreatedAt}}";
const STATS_FORMAT: &str =
    "table {{.ID}}\t{{.Name}}\t{{.CPUPerc}}\t{{.MemUsage}}\t{{.MemPerc}}\t{{.NetIO}}\t{{.BlockIO}}";

/// Image pulls legitimately run long
const PULL_TIMEOUT: Duration = Duration::from_secs(120);

/// Adapter for the container engine, driven entirely through its CLI.
pub struct DockerAdapter {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    availability: AvailabilityCache,
    admin_exec: bool,
}

impl DockerAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>, admin_exec: bool) -> Self {
        Self {
            runner,
            binary: binary.into(),
            availability: AvailabilityCache::new(),
            admin_exec,
        }
    }

    pub async fn check_availability(&self) -> bool {
        self.availability
            .get_or_probe(|| async {
                self.runner.run(&self.binary, &["--version"]).await.is_ok()
            })
            .await
    }

    pub fn invalidate_availability(&self) {
        self.availability.invalidate();
    }

    /// Container listing. Zero data rows past the header is success+empty;
    /// a failed command is `Err`, so the two remain distinguishable.
    pub async fn list_containers(&self, all: bool) -> Result<Vec<ContainerRecord>, AdapterError> {
        let mut args = vec!["ps", "--no-trunc", "--format", PS_FORMAT];
        if all {
            args.insert(1, "-a");
        }

        let output = self.runner.run(&self.binary, &args).await?;
        let records = parse_rows(&output.stdout, Delimiter::Tab, true, 7)
            .into_iter()
            .map(|row| ContainerRecord {
                id: row[0].clone(),
                name: row[1].clone(),
                image: row[2].clone(),
                state: ContainerState::from_cli(&row[3]),
                status: row[4].clone(),
                ports: row[5].clone(),
                created: row[6].clone(),
            })
            .collect();
        Ok(records)
    }

    pub async fn list_images(&self) -> Result<Vec<ImageRecord>, AdapterError> {
        let output = self
            .runner
            .run(&self.binary, &["images", "--format", IMAGES_FORMAT])
            .await?;

        let records = parse_rows(&output.stdout, Delimiter::Tab, true, 5)
            .into_iter()
            .map(|row| ImageRecord {
                id: row[0].clone(),
                repository: row[1].clone(),
                tag: row[2].clone(),
                size: row[3].clone(),
                created: row[4].clone(),
            })
            .collect();
        Ok(records)
    }

    /// Single-shot (non-streaming) usage snapshot across running containers
    pub async fn container_stats(&self) -> Result<Vec<ContainerStatsRecord>, AdapterError> {
        let output = self
            .runner
            .run(&self.binary, &["stats", "--no-stream", "--format", STATS_FORMAT])
            .await?;

        let records = parse_rows(&output.stdout, Delimiter::Tab, true, 7)
            .into_iter()
            .map(|row| ContainerStatsRecord {
                id: row[0].clone(),
                name: row[1].clone(),
                cpu_percent: parse_percent(&row[2]),
                memory_usage: row[3].clone(),
                memory_percent: parse_percent(&row[4]),
                network_io: row[5].clone(),
                block_io: row[6].clone(),
            })
            .collect();
        Ok(records)
    }

    /// Engine-wide info. The info dump is JSON on the last non-empty line
    /// of stdout (warning chatter may precede it), decoded with defaults
    /// for anything missing.
    pub async fn engine_info(&self) -> Result<EngineInfo, AdapterError> {
        let output = self
            .runner
            .run(&self.binary, &["info", "--format", "{{json .}}"])
            .await?;

        let last_line = output
            .stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| AdapterError::Parse("empty info output".to_string()))?;

        let value: serde_json::Value = serde_json::from_str(last_line.trim())
            .map_err(|e| AdapterError::Parse(format!("info is not JSON: {}", e)))?;

        let memory_total_bytes = value["MemTotal"].as_u64().unwrap_or(0);
        Ok(EngineInfo {
            name: string_field(&value, "Name"),
            server_version: string_field(&value, "ServerVersion"),
            operating_system: string_field(&value, "OperatingSystem"),
            architecture: string_field(&value, "Architecture"),
            cpus: value["NCPU"].as_u64().unwrap_or(0) as u32,
            memory_total_bytes,
            memory_total: format_bytes(memory_total_bytes),
            containers: value["Containers"].as_u64().unwrap_or(0) as u32,
            containers_running: value["ContainersRunning"].as_u64().unwrap_or(0) as u32,
            containers_paused: value["ContainersPaused"].as_u64().unwrap_or(0) as u32,
            containers_stopped: value["ContainersStopped"].as_u64().unwrap_or(0) as u32,
            images: value["Images"].as_u64().unwrap_or(0) as u32,
        })
    }

    pub async fn start_container(&self, id: &str) -> Result<bool, AdapterError> {
        self.container_op("start", id).await
    }

    pub async fn stop_container(&self, id: &str) -> Result<bool, AdapterError> {
        self.container_op("stop", id).await
    }

    pub async fn restart_container(&self, id: &str) -> Result<bool, AdapterError> {
        self.container_op("restart", id).await
    }

    pub async fn remove_container(&self, id: &str) -> Result<bool, AdapterError> {
        self.container_op("rm", id).await
    }

    async fn container_op(&self, op: &str, id: &str) -> Result<bool, AdapterError> {
        validate_identifier("container", id)?;
        match self.runner.run(&self.binary, &[op, id]).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(op = %op, container = %id, "container operation failed: {}", e);
                Ok(false)
            }
        }
    }

    pub async fn pull_image(&self, image: &str) -> Result<bool, AdapterError> {
        validate_identifier("image", image)?;
        match self
            .runner
            .run_with_timeout(&self.binary, &["pull", image], PULL_TIMEOUT)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(image = %image, "pull failed: {}", e);
                Ok(false)
            }
        }
    }

    pub async fn remove_image(&self, image: &str) -> Result<bool, AdapterError> {
        validate_identifier("image", image)?;
        match self.runner.run(&self.binary, &["rmi", image]).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(image = %image, "rmi failed: {}", e);
                Ok(false)
            }
        }
    }

    pub async fn prune_system(&self) -> Result<bool, AdapterError> {
        Ok(self
            .runner
            .run(&self.binary, &["system", "prune", "-f"])
            .await
            .is_ok())
    }

    /// Operator passthrough into a running container, behind the admin gate
    pub async fn exec_in_container(
        &self,
        id: &str,
        command: &[String],
    ) -> Result<String, AdapterError> {
        if !self.admin_exec {
            return Err(AdapterError::ExecDisabled);
        }
        validate_identifier("container", id)?;
        if command.is_empty() {
            return Err(AdapterError::invalid("command", "must not be empty"));
        }

        let mut args = vec!["exec", id];
        args.extend(command.iter().map(String::as_str));
        match self.runner.run(&self.binary, &args).await {
            Ok(output) => Ok(output.stdout),
            Err(e) => Ok(format!("command failed: {}", e)),
        }
    }
}

fn parse_percent(cell: &str) -> f64 {
    cell.trim().trim_end_matches('%').parse().unwrap_or(0.0)
}

fn string_field(value: &serde_json::Value, key: &str) -> String {
    value[key].as_str().unwrap_or("unknown").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::ScriptedRunner;
    use crate::ports::CommandError;

    const PS_FIXTURE: &str = "CONTAINER ID\tNAMES\tIMAGE\tSTATE\tSTATUS\tPORTS\tCREATED AT\n\
        aaa111\tweb\tnginx:1.27\trunning\tUp 2 hours\t0.0.0.0:80->80/tcp\t2024-06-01 10:00:00 +0000 UTC\n\
        bbb222\tdb primary\tpostgres:16\texited\tExited (0) 3 days ago\t\t2024-05-29 08:30:00 +0000 UTC\n\
        ccc333\tcache\tredis:7\trunning\tUp 5 minutes\t6379/tcp\t2024-06-01 11:55:00 +0000 UTC\n";

    fn adapter(runner: Arc<ScriptedRunner>) -> DockerAdapter {
        DockerAdapter::new(runner, "docker", false)
    }

    #[tokio::test]
    async fn test_list_containers_round_trips_fixture_rows() {
        let runner = Arc::new(ScriptedRunner::new().ok("docker ps", PS_FIXTURE));
        let containers = adapter(runner).list_containers(false).await.unwrap();

        assert_eq!(containers.len(), 3);
        assert_eq!(containers[0].id, "aaa111");
        assert_eq!(containers[0].name, "web");
        assert_eq!(containers[0].state, ContainerState::Running);
        assert_eq!(containers[1].name, "db primary");
        assert_eq!(containers[1].state, ContainerState::Stopped);
        assert_eq!(containers[1].status, "Exited (0) 3 days ago");
        assert_eq!(containers[2].ports, "6379/tcp");
    }

    #[tokio::test]
    async fn test_list_containers_all_flag_changes_invocation() {
        let runner = Arc::new(ScriptedRunner::new().ok("docker ps", "HEADER\n"));
        let adapter = adapter(runner.clone());

        adapter.list_containers(true).await.unwrap();
        assert_eq!(runner.calls_matching("ps -a"), 1);
    }

    #[tokio::test]
    async fn test_header_only_output_is_empty_list() {
        let runner = Arc::new(
            ScriptedRunner::new().ok("docker ps", "CONTAINER ID\tNAMES\tIMAGE\tSTATE\tSTATUS\tPORTS\tCREATED AT\n"),
        );
        let containers = adapter(runner).list_containers(false).await.unwrap();
        assert!(containers.is_empty());
    }

    #[tokio::test]
    async fn test_failed_listing_is_err_not_empty() {
        let runner = Arc::new(ScriptedRunner::new().failed("docker ps", "daemon not running"));
        let result = adapter(runner).list_containers(false).await;
        assert!(matches!(
            result,
            Err(AdapterError::Command(CommandError::Failed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_stats_percent_cells_parse() {
        let fixture = "ID\tNAME\tCPU %\tMEM USAGE\tMEM %\tNET I/O\tBLOCK I/O\n\
            aaa111\tweb\t12.5%\t256MiB / 2GiB\t12.5%\t1.2kB / 800B\t0B / 4MB\n";
        let runner = Arc::new(ScriptedRunner::new().ok("stats --no-stream", fixture));
        let stats = adapter(runner).container_stats().await.unwrap();

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].cpu_percent, 12.5);
        assert_eq!(stats[0].memory_usage, "256MiB / 2GiB");
    }

    #[tokio::test]
    async fn test_engine_info_takes_last_json_line() {
        let fixture = "WARNING: No swap limit support\n\
            {\"Name\":\"nas\",\"ServerVersion\":\"26.1.0\",\"OperatingSystem\":\"Debian 12\",\"Architecture\":\"x86_64\",\"NCPU\":8,\"MemTotal\":16777216000,\"Containers\":5,\"ContainersRunning\":3,\"ContainersPaused\":0,\"ContainersStopped\":2,\"Images\":12}\n";
        let runner = Arc::new(ScriptedRunner::new().ok("docker info", fixture));
        let info = adapter(runner).engine_info().await.unwrap();

        assert_eq!(info.name, "nas");
        assert_eq!(info.server_version, "26.1.0");
        assert_eq!(info.cpus, 8);
        assert_eq!(info.containers_running, 3);
        assert_eq!(info.memory_total, "15.6 GB");
    }

    #[tokio::test]
    async fn test_engine_info_defaults_missing_fields() {
        let runner = Arc::new(ScriptedRunner::new().ok("docker info", "{\"Name\":\"nas\"}\n"));
        let info = adapter(runner).engine_info().await.unwrap();

        assert_eq!(info.server_version, "unknown");
        assert_eq!(info.cpus, 0);
        assert_eq!(info.memory_total, "0 B");
    }

    #[tokio::test]
    async fn test_mutations_validate_identifier_before_any_call() {
        let runner = Arc::new(ScriptedRunner::new());
        let adapter = adapter(runner.clone());

        let err = adapter.stop_container("abc && reboot").await.unwrap_err();
        assert!(err.is_validation());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_is_false_not_err() {
        let runner = Arc::new(ScriptedRunner::new().failed("docker start", "no such container"));
        assert!(!adapter(runner).start_container("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn test_exec_requires_admin_gate() {
        let runner = Arc::new(ScriptedRunner::new());
        let adapter = DockerAdapter::new(runner, "docker", false);

        let err = adapter
            .exec_in_container("abc123", &["ls".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::ExecDisabled));
    }
}
