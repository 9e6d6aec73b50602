/// Error taxonomy for graph validation, remote calls and run-level failures
///
/// Call failures are recorded per node and only become run-level errors when
/// they cannot be contained to a dependent subtree.

use crate::runtime::aggregator::ExecutionReport;
use thiserror::Error;

/// Structural problems found while building a [`crate::graph::Graph`].
/// Always raised before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphValidationError {
    #[error("graph contains a node with an empty name")]
    EmptyName,

    #[error("node '{node}' has an empty endpoint")]
    EmptyEndpoint { node: String },

    #[error("node '{node}' has a zero call timeout")]
    ZeroTimeout { node: String },

    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("edge {from} -> {to} references unknown node '{missing}'")]
    UnknownEdgeNode {
        from: String,
        to: String,
        missing: String,
    },

    #[error("graph contains a cycle through node '{node}'")]
    Cycle { node: String },
}

/// Failure of a single remote call (primary or fallback)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("call to {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("call to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("call to {endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("call to {endpoint} returned an undecodable body: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("call to {endpoint} was cancelled")]
    Cancelled { endpoint: String },
}

impl CallError {
    pub fn endpoint(&self) -> &str {
        match self {
            CallError::Timeout { endpoint, .. }
            | CallError::Transport { endpoint, .. }
            | CallError::Status { endpoint, .. }
            | CallError::Decode { endpoint, .. }
            | CallError::Cancelled { endpoint } => endpoint,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CallError::Cancelled { .. })
    }
}

/// Run-level failures returned by [`crate::runtime::ExecutionEngine::execute`]
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid graph: {0}")]
    Validation(#[from] GraphValidationError),

    /// A failure that could not be confined to a skipped subtree. The partial
    /// report still carries everything recorded before the run stopped.
    #[error("node '{node}' failed unrecoverably: {reason}")]
    Unrecoverable {
        node: String,
        reason: String,
        report: Box<ExecutionReport>,
    },
}

/// Failures of the plan generator collaborator
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no plan generator is configured")]
    NotConfigured,

    #[error("plan request failed: {0}")]
    Request(String),

    #[error("plan generator returned an invalid graph: {0}")]
    InvalidResponse(String),
}
