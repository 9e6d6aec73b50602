/// Per-run execution state
///
/// Created fresh for every run and consumed by the aggregator. Only the
/// scheduler loop writes to it: node tasks hand back a [`NodeOutcome`] and the
/// loop records it here, so `results`/`errors` never see concurrent writers.

use crate::graph::Graph;
use crate::runtime::executor::NodeOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle of a node within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Pending,
    Running,
    Succeeded,
    Failed,
    FallbackRunning,
    FallbackFailed,
    Skipped,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeState::Succeeded | NodeState::Failed | NodeState::FallbackFailed | NodeState::Skipped
        )
    }

    /// Terminal without an output dependents could consume
    pub fn is_failure(self) -> bool {
        matches!(self, NodeState::Failed | NodeState::FallbackFailed | NodeState::Skipped)
    }

    pub fn can_transition_to(self, next: NodeState) -> bool {
        use NodeState::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Skipped)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Failed, FallbackRunning)
                | (FallbackRunning, Succeeded)
                | (FallbackRunning, FallbackFailed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("node '{node}' cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub node: String,
    pub from: NodeState,
    pub to: NodeState,
}

/// Mutable state of a single run
#[derive(Debug)]
pub struct ExecutionContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    payload: Map<String, Value>,
    results: HashMap<String, Value>,
    errors: HashMap<String, String>,
    states: HashMap<String, NodeState>,
    cancelled: bool,
    aborted_by: Option<String>,
}

impl ExecutionContext {
    /// Fresh context with every graph node `Pending`
    pub fn new(graph: &Graph, payload: Map<String, Value>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            payload,
            results: HashMap::new(),
            errors: HashMap::new(),
            states: graph
                .nodes()
                .map(|node| (node.name.clone(), NodeState::Pending))
                .collect(),
            cancelled: false,
            aborted_by: None,
        }
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn state(&self, node: &str) -> NodeState {
        self.states.get(node).copied().unwrap_or(NodeState::Pending)
    }

    pub fn result(&self, node: &str) -> Option<&Value> {
        self.results.get(node)
    }

    pub fn error(&self, node: &str) -> Option<&str> {
        self.errors.get(node).map(String::as_str)
    }

    pub fn results(&self) -> &HashMap<String, Value> {
        &self.results
    }

    pub fn errors(&self) -> &HashMap<String, String> {
        &self.errors
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Node whose failure aborted the run under the fail-fast policy
    pub fn aborted_by(&self) -> Option<&str> {
        self.aborted_by.as_deref()
    }

    pub fn transition(&mut self, node: &str, next: NodeState) -> Result<(), InvalidTransition> {
        let current = self.state(node);
        if !current.can_transition_to(next) {
            return Err(InvalidTransition {
                node: node.to_string(),
                from: current,
                to: next,
            });
        }
        self.states.insert(node.to_string(), next);
        Ok(())
    }

    /// Mark a pending node as skipped and record why
    pub fn skip(&mut self, node: &str, reason: impl Into<String>) -> Result<(), InvalidTransition> {
        self.transition(node, NodeState::Skipped)?;
        self.errors.insert(node.to_string(), reason.into());
        Ok(())
    }

    /// Apply the outcome of a dispatched node, walking the fallback states
    pub fn record_outcome(&mut self, node: &str, outcome: NodeOutcome) -> Result<(), InvalidTransition> {
        let message = outcome.error_message();
        match outcome {
            NodeOutcome::Succeeded { output } => {
                self.transition(node, NodeState::Succeeded)?;
                self.results.insert(node.to_string(), output);
            }
            NodeOutcome::Recovered { output, .. } => {
                self.transition(node, NodeState::Failed)?;
                self.transition(node, NodeState::FallbackRunning)?;
                self.transition(node, NodeState::Succeeded)?;
                self.results.insert(node.to_string(), output);
            }
            NodeOutcome::Failed { fallback: None, .. } => {
                self.transition(node, NodeState::Failed)?;
            }
            NodeOutcome::Failed { fallback: Some(_), .. } => {
                self.transition(node, NodeState::Failed)?;
                self.transition(node, NodeState::FallbackRunning)?;
                self.transition(node, NodeState::FallbackFailed)?;
            }
        }
        if let Some(message) = message {
            self.errors.insert(node.to_string(), message);
        }
        Ok(())
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub(crate) fn abort(&mut self, node: &str) {
        if self.aborted_by.is_none() {
            self.aborted_by = Some(node.to_string());
        }
    }

    pub(crate) fn into_outputs(self) -> (HashMap<String, Value>, HashMap<String, String>) {
        (self.results, self.errors)
    }
}
