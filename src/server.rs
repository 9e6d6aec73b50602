/// Server setup and initialization
///
/// Wires together all components: transport, call executor, execution engine,
/// service catalog, plan generator, and HTTP routes.
/// Provides the main application factory function for creating the Axum app.

use crate::{
    api::{create_execution_routes, create_service_routes, AppState},
    catalog::{CatalogRegistry, ServiceCatalog},
    config::Config,
    planner::{HttpPlanGenerator, PlanGenerator, UnconfiguredPlanner},
    runtime::{CallExecutor, ExecutionEngine, HttpTransport},
};
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;

/// Upper bound for a single planner round trip
const PLANNER_TIMEOUT: Duration = Duration::from_secs(30);

/// Create the main Axum application with all routes
///
/// Initializes all components from the configuration and wires them together.
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!(
        "⚙️ Initializing call executor (timeout {}ms, concurrency {})",
        config.executor.call_timeout_ms,
        config.executor.max_concurrency
    );
    let executor = Arc::new(CallExecutor::new(
        Arc::new(HttpTransport::new()),
        config.executor.call_timeout(),
    ));

    tracing::info!("🚀 Initializing execution engine ({:?} failure policy)", config.executor.failure_policy);
    let engine = Arc::new(ExecutionEngine::new(executor, &config.executor));

    let catalog = match &config.catalog.path {
        Some(path) => {
            tracing::info!("📥 Loading service catalog from {}", path);
            Arc::new(
                CatalogRegistry::from_file(path)
                    .await
                    .with_context(|| format!("Failed to load service catalog from {}", path))?,
            )
        }
        None => {
            tracing::info!("📋 No catalog path configured, starting with an empty catalog");
            Arc::new(CatalogRegistry::empty())
        }
    };

    let planner: Arc<dyn PlanGenerator> = match &config.planner.url {
        Some(url) => {
            tracing::info!("🧭 Plan generator at {}", url);
            let listing: Arc<dyn ServiceCatalog> = catalog.clone();
            Arc::new(HttpPlanGenerator::new(url.clone(), listing, PLANNER_TIMEOUT))
        }
        None => {
            tracing::info!("🧭 No plan generator configured");
            Arc::new(UnconfiguredPlanner)
        }
    };

    let app = build_router(AppState { engine, catalog, planner });

    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Assemble the HTTP router around already-built components
pub fn build_router(state: AppState) -> Router {
    tracing::info!("📡 Creating HTTP router with all endpoints");
    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Graph execution and planning
        .merge(create_execution_routes())
        // Service catalog
        .merge(create_service_routes())
        .with_state(state)
}

/// Start the HTTP server with the given configuration
///
/// Creates the application and starts the Axum server on the configured address and port.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting Relayway server...");

    // Create the application
    let app = create_app(config.clone()).await?;

    // Bind to the configured address
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    // Start the server
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
