//! SmsRust - SMS campaign dispatch server entry point

use anyhow::Result;
use smsrust_api::AppState;
use smsrust_common::config::Config;
use smsrust_core::content::{ContentProvider, ContentSelector, HttpContentProvider};
use smsrust_core::{
    CampaignOrchestrator, DailyResetTask, DispatchRegistry, HttpDeviceTransport,
    MessageStatusTracker, RateCapPolicy, Stores, TimeRestrictionMonitor, WorkerContext,
};
use smsrust_storage::DatabasePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config);

    info!("Starting SmsRust dispatch server...");

    // Initialize storage
    let (stores, db_pool) = match config.database.backend.as_str() {
        "memory" => {
            info!("Using in-memory storage backend");
            (Stores::memory(), None)
        }
        _ => {
            let pool = DatabasePool::new(&config.database).await?;
            pool.migrate().await?;
            info!("Database migrations completed");
            (Stores::postgres(pool.clone()), Some(pool))
        }
    };

    // Content provider is optional; without one the selector starts at the
    // variant pool
    let provider: Option<Arc<dyn ContentProvider>> =
        match HttpContentProvider::from_config(&config.content)? {
            Some(provider) => {
                info!("Content provider configured");
                Some(Arc::new(provider))
            }
            None => None,
        };

    // Assemble the dispatch engine
    let registry = Arc::new(DispatchRegistry::new());
    let tracker = Arc::new(MessageStatusTracker::new(stores.clone()));
    let transport = Arc::new(HttpDeviceTransport::new(Duration::from_secs(
        config.dispatch.transport_timeout_secs,
    ))?);

    let ctx = WorkerContext {
        stores: stores.clone(),
        policy: Arc::new(RateCapPolicy::new(stores.clone())),
        selector: Arc::new(ContentSelector::new(provider)),
        transport,
        tracker: tracker.clone(),
        dispatch: config.dispatch.clone(),
    };
    let orchestrator = Arc::new(CampaignOrchestrator::new(
        stores.clone(),
        registry.clone(),
        ctx,
    ));

    // Scheduled background tasks
    let reset_handle = DailyResetTask::new(
        stores.clone(),
        registry.clone(),
        config.daily_reset.clone(),
    )
    .spawn();
    let monitor_handle = TimeRestrictionMonitor::new(
        stores.clone(),
        registry.clone(),
        config.time_restriction.clone(),
    )
    .spawn();
    info!("Scheduled tasks started");

    // Start API server
    let bind = format!("{}:{}", config.server.bind_address, config.api.port);
    let state = Arc::new(AppState {
        stores,
        orchestrator,
        tracker,
        config,
        db_pool,
    });
    let app = smsrust_api::create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("API server listening on {}", bind);

    let api_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    info!("SmsRust server started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    api_handle.abort();
    reset_handle.shutdown().await;
    monitor_handle.shutdown().await;
    registry.shutdown().await;

    info!("SmsRust server shutdown complete");

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},smsrust=debug", config.logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
