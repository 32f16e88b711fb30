use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub shimmy_binary: String,
    pub docker_binary: String,
    pub kubectl_binary: String,
    pub admin_exec: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("SHIMMYD_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8420),
            shimmy_binary: env::var("SHIMMYD_SHIMMY_BIN").unwrap_or_else(|_| "shimmy".to_string()),
            docker_binary: env::var("SHIMMYD_DOCKER_BIN").unwrap_or_else(|_| "docker".to_string()),
            kubectl_binary: env::var("SHIMMYD_KUBECTL_BIN")
                .unwrap_or_else(|_| "kubectl".to_string()),
            admin_exec: env::var("SHIMMYD_ADMIN_EXEC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
            log_level: env::var("SHIMMYD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
