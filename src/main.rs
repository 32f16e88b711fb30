mod adapters;
mod application;
mod config;
mod domain;
mod interface;
mod ports;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adapters::{DockerAdapter, InferenceAdapter, KubeAdapter, TokioCommandRunner};
use application::StatusService;
use config::Config;
use interface::http::create_router;
use ports::CommandRunner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("shimmyd={},tower_http=info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting shimmyd v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {:?}", config);
    if config.admin_exec {
        warn!("⚠ Administrative command execution is ENABLED");
    }

    // One shared process runner behind the three adapters
    let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new());

    let service = Arc::new(StatusService::new(
        InferenceAdapter::new(runner.clone(), config.shimmy_binary.clone(), config.admin_exec),
        DockerAdapter::new(runner.clone(), config.docker_binary.clone(), config.admin_exec),
        KubeAdapter::new(runner.clone(), config.kubectl_binary.clone(), config.admin_exec),
    ));

    info!("✓ Status service initialized");

    // Create HTTP server
    let app = create_router(service);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("✓ shimmyd listening on {}", addr);
    info!("  → API: http://localhost:{}/api/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
