/// Relayway: fallback-aware DAG orchestration of remote service calls
///
/// Main entry point for the Relayway server. Loads configuration from the
/// environment and starts the HTTP server.

use relayway::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Graph execution at POST /execute
/// - Planning at POST /plan and POST /plan_and_execute
/// - Service catalog at GET /services and POST /services/reload
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (RELAYWAY_* environment variables, defaults to 0.0.0.0:3004)
    let config = Config::default();

    // Start the server
    start_server(config).await?;

    Ok(())
}
