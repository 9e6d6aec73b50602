/// Runtime Execution Engine
///
/// This module executes validated graphs of remote service calls.
/// It handles:
/// - Per-run state and node lifecycle
/// - Input resolution from upstream results and the initial payload
/// - Batch-wise concurrent dispatch with a concurrency bound and cancellation
/// - Primary/fallback calls under timeouts
/// - Aggregation into a results/errors report

// Per-run execution context and node states
pub mod context;

// Input payload construction for a node
pub mod resolver;

// Primary/fallback calls over a pluggable transport
pub mod executor;

// Topological batch scheduler
pub mod scheduler;

// Final report and run-level status
pub mod aggregator;

// Run entry point: validate, schedule, finalize
pub mod engine;

// Re-export main types
pub use aggregator::{ExecutionReport, RunStatus};
pub use context::{ExecutionContext, NodeState};
pub use engine::ExecutionEngine;
pub use executor::{CallExecutor, HttpTransport, NodeOutcome, ServiceTransport};
pub use scheduler::{FailurePolicy, Scheduler};
