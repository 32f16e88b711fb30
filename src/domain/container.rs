use serde::{Deserialize, Serialize};

/// Container state as reported by the engine's `State` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Stopped,
    Paused,
    Restarting,
    Dead,
    Created,
}

impl ContainerState {
    pub fn from_cli(state: &str) -> Self {
        match state {
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "dead" => Self::Dead,
            "created" => Self::Created,
            _ => Self::Stopped, // "exited", "removing", anything unrecognized
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// One row of the engine's container listing
#[derive(Debug, Clone, Serialize)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub status: String,
    pub ports: String,
    pub created: String,
}

/// One row of the engine's image listing
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub size: String,
    pub created: String,
}

/// Single-shot resource snapshot for one running container
#[derive(Debug, Clone, Serialize)]
pub struct ContainerStatsRecord {
    pub id: String,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_usage: String,
    pub memory_percent: f64,
    pub network_io: String,
    pub block_io: String,
}

/// Engine-wide info decoded from the JSON info dump
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: String,
    pub server_version: String,
    pub operating_system: String,
    pub architecture: String,
    pub cpus: u32,
    pub memory_total_bytes: u64,
    pub memory_total: String,
    pub containers: u32,
    pub containers_running: u32,
    pub containers_paused: u32,
    pub containers_stopped: u32,
    pub images: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mapping() {
        assert_eq!(ContainerState::from_cli("running"), ContainerState::Running);
        assert_eq!(ContainerState::from_cli("exited"), ContainerState::Stopped);
        assert_eq!(ContainerState::from_cli("removing"), ContainerState::Stopped);
        assert_eq!(ContainerState::from_cli("paused"), ContainerState::Paused);
        assert_eq!(ContainerState::from_cli("bogus"), ContainerState::Stopped);
        assert!(ContainerState::Running.is_running());
    }
}
