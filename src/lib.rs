/// Relayway: fallback-aware DAG orchestration of remote service calls
///
/// This library validates a graph of service calls, runs it in topological
/// batches with bounded concurrency, retries failed calls once against a
/// fallback endpoint, and reports per-node results and errors.

// Core configuration and setup
pub mod config;

// Error types shared across layers
pub mod error;

// Graph description, validation and ordering
pub mod graph;

// Service catalog with hot reload
pub mod catalog;

// Intent -> graph plan generation
pub mod planner;

// Runtime execution engine - scheduling, calls, fallback and aggregation
pub mod runtime;

// HTTP API layer - execution, planning and catalog endpoints
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{CallError, EngineError, GraphValidationError, PlanError};
pub use graph::{EdgeSpec, Graph, GraphSpec, NodeSpec};
pub use runtime::{ExecutionEngine, ExecutionReport, RunStatus};
pub use server::start_server;
