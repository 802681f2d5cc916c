//! Upload queue worker binary.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelpost_http::HttpClient;
use reelpost_platforms::PlatformsConfig;
use reelpost_storage::{R2Client, ScratchDir};
use reelpost_worker::{
    LogSink, MediaStager, MultiPlatformPublisher, QueueDrainer, UploadQueue, WorkerConfig,
};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider was already installed");
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting reelpost-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let store = match R2Client::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = store.check_connectivity().await {
        warn!("Storage connectivity check failed: {}", e);
    }

    let http = match HttpClient::from_env() {
        Ok(http) => http,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let scratch = ScratchDir::new(&config.scratch_dir);
    if let Err(e) = scratch.ensure().await {
        error!("Failed to create scratch directory {}: {}", config.scratch_dir.display(), e);
        std::process::exit(1);
    }

    let staging = Arc::new(MediaStager::new(
        scratch.clone(),
        store.clone(),
        config.staging_prefix.clone(),
    ));
    let publisher =
        MultiPlatformPublisher::from_config(&config, &PlatformsConfig::from_env(), &http, staging);
    let queue = UploadQueue::new(store, config.queue_prefix.clone(), config.failed_prefix.clone());

    let drainer = Arc::new(QueueDrainer::new(
        queue,
        publisher,
        scratch,
        Arc::new(LogSink),
        config.drain_interval,
    ));

    // Setup signal handlers
    let signal_drainer = Arc::clone(&drainer);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_drainer.shutdown();
    });

    if let Err(e) = drainer.run().await {
        error!("Drainer error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

/// Initialize tracing with colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in ["reelpost=info", "aws_config=warn", "aws_smithy_runtime=warn"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
