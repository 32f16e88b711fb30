use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::domain::{InferenceConfig, PerformanceMetrics, ProcessInfo};
use crate::ports::{CommandError, CommandRunner};

use super::tabular::{parse_rows, Delimiter};
use super::{validate_identifier, AdapterError, AvailabilityCache};

/// Start/stop settle window: poll instead of a fixed sleep
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(250);
const SETTLE_MAX_WAIT: Duration = Duration::from_secs(5);

/// Adapter for the local inference-serving binary.
///
/// Every public method is total from the caller's perspective except where
/// a `Result` lets the aggregator distinguish empty from failed. All
/// invocations go through the `CommandRunner` port as argument vectors.
pub struct InferenceAdapter {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    availability: AvailabilityCache,
    admin_exec: bool,
}

impl InferenceAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>, admin_exec: bool) -> Self {
        Self {
            runner,
            binary: binary.into(),
            availability: AvailabilityCache::new(),
            admin_exec,
        }
    }

    fn binary_name(&self) -> &str {
        self.binary.rsplit('/').next().unwrap_or(&self.binary)
    }

    /// Memoized probe: is the binary invocable at all?
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

    /// Version string, reduced to `MAJOR.MINOR.PATCH` when one is present.
    pub async fn version(&self) -> Result<String, AdapterError> {
        let output = self.runner.run(&self.binary, &["--version"]).await?;
        let raw = output.stdout.trim();
        Ok(extract_semver(raw).unwrap_or_else(|| raw.to_string()))
    }

    /// Scan the OS process table for the serving binary.
    ///
    /// The daemon's own pid and the `ps` invocation never match. A scan
    /// that finds nothing is `running: false`, not an error.
    pub async fn process_info(&self) -> Result<ProcessInfo, AdapterError> {
        let output = self.runner.run("ps", &["-eo", "pid=,args="]).await?;
        let own_pid = std::process::id();
        let name = self.binary_name();

        for row in parse_rows(&output.stdout, Delimiter::Whitespace, false, 2) {
            let Ok(pid) = row[0].parse::<u32>() else {
                continue;
            };
            if pid == own_pid {
                continue;
            }
            let executable = row[1].rsplit('/').next().unwrap_or(&row[1]);
            if executable != name {
                continue;
            }

            let uptime = self.process_uptime(pid).await;
            let connections = self.connection_count(pid).await;
            return Ok(ProcessInfo::running(pid)
                .with_uptime(uptime)
                .with_connections(connections));
        }

        Ok(ProcessInfo::not_running())
    }

    /// Elapsed-time query first, start-timestamp second, `"unknown"` last.
    async fn process_uptime(&self, pid: u32) -> String {
        let pid_arg = pid.to_string();

        if let Ok(output) = self.runner.run("ps", &["-o", "etime=", "-p", &pid_arg]).await {
            let etime = output.stdout.trim().to_string();
            if !etime.is_empty() {
                return etime;
            }
        }

        if let Ok(output) = self.runner.run("ps", &["-o", "lstart=", "-p", &pid_arg]).await {
            let lstart = output.stdout.trim().to_string();
            if !lstart.is_empty() {
                return lstart;
            }
        }

        "unknown".to_string()
    }

    /// Open-socket count for the pid; unobservable degrades to 0.
    async fn connection_count(&self, pid: u32) -> u32 {
        match self.runner.run("ss", &["-tnp"]).await {
            Ok(output) => {
                let needle = format!("pid={},", pid);
                let needle_last = format!("pid={})", pid);
                output
                    .stdout
                    .lines()
                    .filter(|line| line.contains(&needle) || line.contains(&needle_last))
                    .count() as u32
            }
            Err(_) => 0,
        }
    }

    /// `config show`, decoded JSON-first then line-oriented; a binary that
    /// does not support the subcommand reports the built-in defaults.
    pub async fn config(&self) -> Result<InferenceConfig, AdapterError> {
        match self.runner.run(&self.binary, &["config", "show"]).await {
            Ok(output) => Ok(parse_config(&output.stdout)),
            Err(CommandError::Failed { stderr, .. }) => {
                debug!(stderr = %stderr, "config subcommand unsupported, using defaults");
                Ok(InferenceConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `stats --json` with the same tiered decode as `config`; when the
    /// binary has no stats subcommand, estimate cpu/mem from the process
    /// table and leave the serving-side fields unknown.
    pub async fn performance_metrics(&self) -> Result<PerformanceMetrics, AdapterError> {
        match self.runner.run(&self.binary, &["stats", "--json"]).await {
            Ok(output) => parse_metrics(&output.stdout)
                .ok_or_else(|| AdapterError::Parse("unrecognized stats output".to_string())),
            Err(CommandError::Failed { .. }) => {
                let info = self.process_info().await?;
                match info.pid {
                    Some(pid) => self.estimate_metrics(pid).await,
                    None => Err(AdapterError::Unavailable(
                        "inference process".to_string(),
                    )),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn estimate_metrics(&self, pid: u32) -> Result<PerformanceMetrics, AdapterError> {
        let pid_arg = pid.to_string();
        let output = self
            .runner
            .run("ps", &["-o", "%cpu=,%mem=", "-p", &pid_arg])
            .await?;

        let mut fields = output.stdout.split_whitespace();
        let cpu = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0.0);
        let memory = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0.0);
        Ok(PerformanceMetrics::estimated(cpu, memory))
    }

    /// Tail of the tool's own log; log access is optional, so an
    /// unsupported subcommand is an empty list rather than an error.
    pub async fn logs(&self, lines: u32) -> Result<Vec<String>, AdapterError> {
        let count = lines.to_string();
        match self
            .runner
            .run(&self.binary, &["logs", "--tail", &count])
            .await
        {
            Ok(output) => Ok(output.stdout.lines().map(str::to_string).collect()),
            Err(CommandError::Failed { .. }) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent: a running instance is success with zero launches.
    /// Tries the current flag form first, then the legacy one, polling the
    /// process table after each instead of a fixed sleep.
    pub async fn start(&self) -> Result<bool, AdapterError> {
        if self.process_info().await?.running {
            return Ok(true);
        }

        self.runner
            .spawn_detached(&self.binary, &["serve", "--daemon"])
            .await?;
        if self.wait_for(true).await {
            return Ok(true);
        }

        warn!("serve --daemon did not come up, retrying legacy flag form");
        self.runner
            .spawn_detached(&self.binary, &["serve", "-d"])
            .await?;
        Ok(self.wait_for(true).await)
    }

    /// Idempotent: an already-stopped instance is success with zero kill
    /// signals. Graceful stop command first, SIGTERM next, SIGKILL last.
    pub async fn stop(&self) -> Result<bool, AdapterError> {
        let info = self.process_info().await?;
        if !info.running {
            return Ok(true);
        }
        let Some(pid) = info.pid else {
            return Ok(true);
        };

        if self.runner.run(&self.binary, &["stop"]).await.is_ok() && self.wait_for(false).await {
            return Ok(true);
        }

        warn!(pid = %pid, "graceful stop failed, sending SIGTERM");
        send_signal(pid, Signal::SIGTERM);
        if self.wait_for(false).await {
            return Ok(true);
        }

        warn!(pid = %pid, "process survived SIGTERM, sending SIGKILL");
        send_signal(pid, Signal::SIGKILL);
        Ok(self.wait_for(false).await)
    }

    pub async fn restart(&self) -> Result<bool, AdapterError> {
        self.stop().await?;
        self.start().await
    }

    /// Poll the process table until `running` matches or the window closes.
    async fn wait_for(&self, running: bool) -> bool {
        let deadline = Instant::now() + SETTLE_MAX_WAIT;
        loop {
            if let Ok(info) = self.process_info().await {
                if info.running == running {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(SETTLE_POLL_INTERVAL).await;
        }
    }

    /// Operator passthrough. Disabled unless the admin gate is open; when
    /// open it reports stdout or a formatted error string, never an `Err`.
    pub async fn execute(&self, command: &str, args: &[String]) -> Result<String, AdapterError> {
        if !self.admin_exec {
            return Err(AdapterError::ExecDisabled);
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        match self.runner.run(command, &arg_refs).await {
            Ok(output) => Ok(output.stdout),
            Err(e) => Ok(format!("command failed: {}", e)),
        }
    }

    pub async fn load_model(&self, name: &str) -> Result<bool, AdapterError> {
        validate_identifier("model", name)?;
        Ok(self.runner.run(&self.binary, &["load", name]).await.is_ok())
    }

    pub async fn unload_model(&self, name: &str) -> Result<bool, AdapterError> {
        validate_identifier("model", name)?;
        Ok(self
            .runner
            .run(&self.binary, &["unload", name])
            .await
            .is_ok())
    }
}

fn send_signal(pid: u32, signal: Signal) {
    if let Err(e) = kill(Pid::from_raw(pid as i32), signal) {
        warn!(pid = %pid, signal = %signal, "kill failed: {}", e);
    }
}

/// First `MAJOR.MINOR.PATCH` run of digits in the text, if any.
fn extract_semver(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        let mut dots = 0;
        let mut j = i;
        while j < bytes.len() {
            if bytes[j].is_ascii_digit() {
                j += 1;
            } else if bytes[j] == b'.'
                && dots < 2
                && j + 1 < bytes.len()
                && bytes[j + 1].is_ascii_digit()
            {
                dots += 1;
                j += 1;
            } else {
                break;
            }
        }

        if dots == 2 {
            return Some(text[start..j].to_string());
        }
        i = j + 1;
    }

    None
}

fn parse_config(text: &str) -> InferenceConfig {
    let trimmed = text.trim();
    if let Ok(config) = serde_json::from_str::<InferenceConfig>(trimmed) {
        return config;
    }

    // Line-oriented `key: value` fallback with a fixed key allowlist;
    // unrecognized keys are dropped.
    let mut config = InferenceConfig::default();
    for line in trimmed.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let value = value.trim();

        match key.as_str() {
            "host" | "bind" => config.host = value.to_string(),
            "port" => {
                if let Ok(port) = value.parse() {
                    config.port = port;
                }
            }
            "models_dir" | "model_dir" => config.models_dir = value.to_string(),
            "context_length" | "ctx_size" => {
                if let Ok(length) = value.parse() {
                    config.context_length = length;
                }
            }
            "threads" => {
                if let Ok(threads) = value.parse() {
                    config.threads = threads;
                }
            }
            "gpu_layers" => {
                if let Ok(layers) = value.parse() {
                    config.gpu_layers = layers;
                }
            }
            _ => {}
        }
    }
    config
}

fn parse_metrics(text: &str) -> Option<PerformanceMetrics> {
    let trimmed = text.trim();
    if let Ok(metrics) = serde_json::from_str::<PerformanceMetrics>(trimmed) {
        return Some(metrics);
    }

    let mut cpu = None;
    let mut memory = None;
    let mut tokens = None;
    let mut latency = None;
    let mut queue = None;

    for line in trimmed.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let value = value.trim().trim_end_matches('%');

        match key.as_str() {
            "cpu_percent" | "cpu" => cpu = value.parse().ok(),
            "memory_percent" | "memory" | "mem" => memory = value.parse().ok(),
            "tokens_per_second" | "throughput" => tokens = value.parse().ok(),
            "avg_latency_ms" | "latency_ms" | "latency" => latency = value.parse().ok(),
            "queue_depth" | "queue" => queue = value.parse().ok(),
            _ => {}
        }
    }

    if cpu.is_none() && memory.is_none() && tokens.is_none() {
        return None;
    }

    Some(PerformanceMetrics {
        cpu_percent: cpu.unwrap_or(0.0),
        memory_percent: memory.unwrap_or(0.0),
        tokens_per_second: tokens,
        avg_latency_ms: latency,
        queue_depth: queue,
        estimated: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::ScriptedRunner;

    #[test]
    fn test_extract_semver() {
        assert_eq!(extract_semver("shimmy 1.2.3"), Some("1.2.3".to_string()));
        assert_eq!(extract_semver("v0.10.4-rc1"), Some("0.10.4".to_string()));
        assert_eq!(extract_semver("version 10"), None);
        assert_eq!(extract_semver("built 2024.06"), None);
    }

    #[tokio::test]
    async fn test_version_falls_back_to_raw_output() {
        let runner = ScriptedRunner::new().ok("shimmy --version", "shimmy nightly build\n");
        let adapter = InferenceAdapter::new(Arc::new(runner), "shimmy", false);
        assert_eq!(adapter.version().await.unwrap(), "shimmy nightly build");
    }

    #[tokio::test]
    async fn test_availability_cache_hit_issues_no_second_probe() {
        let runner = Arc::new(ScriptedRunner::new().ok("shimmy --version", "shimmy 1.0.0"));
        let adapter = InferenceAdapter::new(runner.clone(), "shimmy", false);

        assert!(adapter.check_availability().await);
        assert!(adapter.check_availability().await);
        assert_eq!(runner.calls_matching("--version"), 1);
    }

    #[tokio::test]
    async fn test_process_info_finds_first_match_and_enriches() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok(
                    "ps -eo pid=,args=",
                    "    1 /sbin/init\n 4321 /usr/local/bin/shimmy serve --daemon\n 4400 /usr/local/bin/shimmy serve --daemon\n",
                )
                .ok("etime=", "   01:02:03\n")
                .ok("ss -tnp", "ESTAB 0 0 127.0.0.1:11435 127.0.0.1:50000 users:((\"shimmy\",pid=4321,fd=7))\nESTAB 0 0 127.0.0.1:11435 127.0.0.1:50001 users:((\"shimmy\",pid=4321,fd=8))\n"),
        );
        let adapter = InferenceAdapter::new(runner, "shimmy", false);

        let info = adapter.process_info().await.unwrap();
        assert!(info.running);
        assert_eq!(info.pid, Some(4321));
        assert_eq!(info.uptime.as_deref(), Some("01:02:03"));
        assert_eq!(info.connections, 2);
    }

    #[tokio::test]
    async fn test_process_info_uptime_final_fallback_is_unknown() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok("ps -eo pid=,args=", " 4321 /usr/local/bin/shimmy serve\n")
                .failed("etime=", "bad option")
                .failed("lstart=", "bad option")
                .failed("ss -tnp", "no ss here"),
        );
        let adapter = InferenceAdapter::new(runner, "shimmy", false);

        let info = adapter.process_info().await.unwrap();
        assert_eq!(info.uptime.as_deref(), Some("unknown"));
        assert_eq!(info.connections, 0);
    }

    #[tokio::test]
    async fn test_process_info_no_match_is_not_running() {
        let runner = Arc::new(
            ScriptedRunner::new().ok("ps -eo pid=,args=", "    1 /sbin/init\n  200 ps -eo pid=,args=\n"),
        );
        let adapter = InferenceAdapter::new(runner, "shimmy", false);

        let info = adapter.process_info().await.unwrap();
        assert!(!info.running);
        assert_eq!(info.pid, None);
    }

    #[tokio::test]
    async fn test_config_parses_json_first() {
        let runner = Arc::new(ScriptedRunner::new().ok(
            "config show",
            r#"{"host":"0.0.0.0","port":9000,"models_dir":"/srv/models","context_length":8192,"threads":8,"gpu_layers":35}"#,
        ));
        let adapter = InferenceAdapter::new(runner, "shimmy", false);

        let config = adapter.config().await.unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.gpu_layers, 35);
    }

    #[tokio::test]
    async fn test_config_line_fallback_keeps_allowlisted_keys_only() {
        let runner = Arc::new(ScriptedRunner::new().ok(
            "config show",
            "host: 10.0.0.5\nport: 8080\nsecret-sauce: ignored\nthreads: 16\n",
        ));
        let adapter = InferenceAdapter::new(runner, "shimmy", false);

        let config = adapter.config().await.unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 8080);
        assert_eq!(config.threads, 16);
        // Unrecognized key dropped, untouched fields keep defaults
        assert_eq!(config.models_dir, "./models");
    }

    #[tokio::test]
    async fn test_config_unsupported_subcommand_yields_defaults() {
        let runner = Arc::new(ScriptedRunner::new().failed("config show", "unknown subcommand"));
        let adapter = InferenceAdapter::new(runner, "shimmy", false);

        assert_eq!(adapter.config().await.unwrap(), InferenceConfig::default());
    }

    #[tokio::test]
    async fn test_metrics_estimate_marks_unknown_fields_none() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .failed("stats --json", "unknown subcommand")
                .ok("ps -eo pid=,args=", " 4321 /usr/local/bin/shimmy serve\n")
                .failed("etime=", "x")
                .failed("lstart=", "x")
                .failed("ss -tnp", "x")
                .ok("%cpu=,%mem=", " 42.5  3.1\n"),
        );
        let adapter = InferenceAdapter::new(runner, "shimmy", false);

        let metrics = adapter.performance_metrics().await.unwrap();
        assert!(metrics.estimated);
        assert_eq!(metrics.cpu_percent, 42.5);
        assert_eq!(metrics.memory_percent, 3.1);
        assert_eq!(metrics.tokens_per_second, None);
        assert_eq!(metrics.avg_latency_ms, None);
        assert_eq!(metrics.queue_depth, None);
    }

    #[tokio::test]
    async fn test_logs_unsupported_is_empty_not_error() {
        let runner = Arc::new(ScriptedRunner::new().failed("logs --tail", "unknown subcommand"));
        let adapter = InferenceAdapter::new(runner, "shimmy", false);

        assert!(adapter.logs(50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_on_running_instance_launches_nothing() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok("ps -eo pid=,args=", " 4321 /usr/local/bin/shimmy serve\n")
                .ok("etime=", "05:00")
                .ok("ss -tnp", ""),
        );
        let adapter = InferenceAdapter::new(runner.clone(), "shimmy", false);

        assert!(adapter.start().await.unwrap());
        assert_eq!(runner.spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_start_spawns_and_polls_until_up() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok_once("ps -eo pid=,args=", "    1 /sbin/init\n")
                .ok("ps -eo pid=,args=", " 9000 /usr/local/bin/shimmy serve --daemon\n")
                .ok("etime=", "00:01")
                .ok("ss -tnp", ""),
        );
        let adapter = InferenceAdapter::new(runner.clone(), "shimmy", false);

        assert!(adapter.start().await.unwrap());
        assert_eq!(runner.spawn_count(), 1, "legacy flag form not needed");
    }

    #[tokio::test]
    async fn test_stop_on_stopped_instance_sends_nothing() {
        let runner = Arc::new(ScriptedRunner::new().ok("ps -eo pid=,args=", "    1 /sbin/init\n"));
        let adapter = InferenceAdapter::new(runner.clone(), "shimmy", false);

        assert!(adapter.stop().await.unwrap());
        assert_eq!(runner.calls_matching("shimmy stop"), 0);
    }

    #[tokio::test]
    async fn test_stop_uses_graceful_command_first() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok_once("ps -eo pid=,args=", " 4321 /usr/local/bin/shimmy serve\n")
                .ok("ps -eo pid=,args=", "    1 /sbin/init\n")
                .ok("etime=", "05:00")
                .ok("ss -tnp", "")
                .ok("shimmy stop", "stopping\n"),
        );
        let adapter = InferenceAdapter::new(runner.clone(), "shimmy", false);

        assert!(adapter.stop().await.unwrap());
        assert_eq!(runner.calls_matching("shimmy stop"), 1);
    }

    #[tokio::test]
    async fn test_execute_is_gated_by_default() {
        let runner = Arc::new(ScriptedRunner::new());
        let adapter = InferenceAdapter::new(runner, "shimmy", false);

        let err = adapter.execute("ls", &[]).await.unwrap_err();
        assert!(matches!(err, AdapterError::ExecDisabled));
    }

    #[tokio::test]
    async fn test_execute_never_errors_once_enabled() {
        let runner = Arc::new(ScriptedRunner::new().failed("ls", "boom"));
        let adapter = InferenceAdapter::new(runner, "shimmy", true);

        let report = adapter.execute("ls", &[]).await.unwrap();
        assert!(report.starts_with("command failed:"));
    }

    #[tokio::test]
    async fn test_load_model_validates_name_first() {
        let runner = Arc::new(ScriptedRunner::new());
        let adapter = InferenceAdapter::new(runner.clone(), "shimmy", false);

        let err = adapter.load_model("model; rm -rf /").await.unwrap_err();
        assert!(err.is_validation());
        assert!(runner.calls().is_empty());
    }
}
