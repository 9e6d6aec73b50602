/// HTTP API Layer
///
/// This module provides the REST endpoints of the control plane. It handles:
/// - Graph execution with a results/errors report
/// - Intent planning and plan-then-execute
/// - Service catalog listing and hot reload

// Execution and planning endpoints
pub mod execute;

// Service catalog endpoints
pub mod services;

use crate::catalog::CatalogRegistry;
use crate::planner::PlanGenerator;
use crate::runtime::ExecutionEngine;
use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Debug, Clone)]
pub struct AppState {
    /// Graph execution engine
    pub engine: Arc<ExecutionEngine>,
    /// Hot-reload service catalog
    pub catalog: Arc<CatalogRegistry>,
    /// Intent -> graph plan generator
    pub planner: Arc<dyn PlanGenerator>,
}

/// Error response: status plus `{ "error": kind, "detail": message, ... }`
pub type ApiError = (StatusCode, Json<Value>);

pub(crate) fn api_error(status: StatusCode, kind: &str, detail: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": kind, "detail": detail.to_string() })))
}

// Re-export router builders
pub use execute::create_execution_routes;
pub use services::create_service_routes;
