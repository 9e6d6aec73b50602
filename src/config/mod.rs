/// Configuration management for the relayway control plane
///
/// Handles server binding, executor limits, and the locations of the service
/// catalog and plan generator.

use crate::runtime::scheduler::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Graph execution limits
    pub executor: ExecutorConfig,
    /// Service catalog source
    pub catalog: CatalogConfig,
    /// Plan generator endpoint
    pub planner: PlannerConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Limits applied to every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Per-call timeout unless a node overrides it
    pub call_timeout_ms: u64,
    /// Upper bound on concurrently in-flight calls within a run
    pub max_concurrency: usize,
    /// Whole-run deadline; None means no deadline
    pub run_timeout_ms: Option<u64>,
    /// Reaction to a node failure that has no fallback
    pub failure_policy: FailurePolicy,
}

/// Service catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON file holding an array of service entries; None starts empty
    pub path: Option<String>,
}

/// Plan generator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// URL the intent is posted to; None disables planning
    pub url: Option<String>,
}

impl ExecutorConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 5_000,
            max_concurrency: 8,
            run_timeout_ms: None,
            failure_policy: FailurePolicy::Contain,
        }
    }
}

impl Config {
    /// Build configuration from an arbitrary key lookup
    ///
    /// Unset or unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ExecutorConfig::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            server: ServerConfig {
                host: non_empty("RELAYWAY_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: non_empty("RELAYWAY_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(3004),
            },
            executor: ExecutorConfig {
                call_timeout_ms: non_empty("RELAYWAY_CALL_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.call_timeout_ms),
                max_concurrency: non_empty("RELAYWAY_MAX_CONCURRENCY")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.max_concurrency)
                    .max(1),
                run_timeout_ms: non_empty("RELAYWAY_RUN_TIMEOUT_MS").and_then(|v| v.parse().ok()),
                failure_policy: non_empty("RELAYWAY_FAILURE_POLICY")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.failure_policy),
            },
            catalog: CatalogConfig {
                path: non_empty("RELAYWAY_CATALOG_PATH"),
            },
            planner: PlannerConfig {
                url: non_empty("RELAYWAY_PLANNER_URL"),
            },
        }
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
