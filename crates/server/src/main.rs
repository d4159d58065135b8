use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sweeparr_core::{
    create_activity_system, load_config, validate_config, ActivityEvent, ActivityLog,
    ActivityStore, ArrDetector, ArrSearchTrigger, AutomationOrchestrator, ClientFactory,
    CycleScheduler, HttpClientFactory, SharedSettings, SqliteActivityStore,
};
use sweeparr_server::api::create_router;
use sweeparr_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for activity event channel
const ACTIVITY_BUFFER_SIZE: usize = 1000;

/// How long a running cycle may take to finish at shutdown before it is cancelled
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("SWEEPARR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Library servers: {}", config.servers.len());
    info!("Database path: {:?}", config.database.path);

    // Compute config hash for the activity log
    let config_json = serde_json::to_string(&config).context("Failed to serialize config")?;
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    // Create SQLite activity store
    let activity_store: Arc<dyn ActivityStore> = Arc::new(
        SqliteActivityStore::new(&config.database.path)
            .context("Failed to create activity store")?,
    );
    info!("Activity store initialized");

    // Create activity system and spawn its writer task
    let (activity_handle, activity_writer) =
        create_activity_system(Arc::clone(&activity_store), ACTIVITY_BUFFER_SIZE);
    let writer_handle = tokio::spawn(activity_writer.run());

    activity_handle
        .emit(ActivityEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted activity event");

    // Automation engine
    let settings = Arc::new(SharedSettings::from_config(&config));
    let client_factory: Arc<dyn ClientFactory> = Arc::new(HttpClientFactory::new());
    let activity: Arc<dyn ActivityLog> = Arc::new(activity_handle.clone());

    let detector = Arc::new(ArrDetector::new(settings.clone(), Arc::clone(&client_factory)));
    let trigger = Arc::new(
        ArrSearchTrigger::new(Arc::clone(&client_factory), Arc::clone(&activity))
            .with_batch_size(config.automation.trigger_batch_size)
            .with_call_delay(Duration::from_millis(config.automation.trigger_delay_ms)),
    );
    let orchestrator = Arc::new(AutomationOrchestrator::new(
        settings.clone(),
        detector,
        trigger,
        activity,
    ));
    let scheduler = Arc::new(CycleScheduler::new(orchestrator, settings.clone()));

    if config.automation.enabled {
        scheduler.start().context("Failed to start scheduler")?;
        info!(
            interval_secs = config.automation.interval_secs,
            dry_run = config.automation.dry_run,
            "Automation enabled"
        );
    } else {
        info!("Automation disabled in config, cycles run only on request");
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        settings,
        Arc::clone(&scheduler),
        activity_store,
        client_factory,
    ));

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.http.host, config.http.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stopping scheduler...");
    scheduler.shutdown(SHUTDOWN_GRACE).await;
    info!("Scheduler stopped");

    // Emit ServiceStopped event
    info!("Server shutting down...");
    activity_handle
        .emit(ActivityEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // Every holder of an ActivityHandle must be gone for the writer's channel
    // to close. The scheduler owns the orchestrator and trigger; the router
    // and its state were dropped when the server returned.
    drop(scheduler);
    drop(activity_handle);

    // Wait for writer to finish processing remaining events
    let _ = writer_handle.await;
    info!("Activity writer stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
