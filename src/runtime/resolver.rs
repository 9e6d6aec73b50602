/// Input Resolver
///
/// Builds the JSON body for a node call from upstream results and the initial
/// payload.

use crate::graph::{InputSource, Node};
use crate::runtime::context::{ExecutionContext, NodeState};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// An upstream the node reads from ended without output
    #[error("dependency {dependency} failed")]
    DependencyFailed { dependency: String },

    /// An upstream has not reached a terminal state yet
    #[error("dependency {dependency} has not finished")]
    DependencyPending { dependency: String },
}

/// Compute a node's call payload
///
/// Inputs are visited in key order, so the first failed dependency reported is
/// deterministic. Payload keys that are absent resolve to `null`.
pub fn resolve(node: &Node, context: &ExecutionContext) -> Result<Map<String, Value>, ResolveError> {
    let mut payload = Map::with_capacity(node.inputs.len());

    for (key, source) in &node.inputs {
        let value = match source {
            InputSource::Upstream { node: upstream, field } => {
                match context.state(upstream) {
                    NodeState::Succeeded => {}
                    state if state.is_failure() => {
                        return Err(ResolveError::DependencyFailed {
                            dependency: upstream.clone(),
                        })
                    }
                    _ => {
                        return Err(ResolveError::DependencyPending {
                            dependency: upstream.clone(),
                        })
                    }
                }
                let output = context.result(upstream);
                match field {
                    None => output.cloned(),
                    Some(field) => output.and_then(|output| output.get(field)).cloned(),
                }
            }
            InputSource::Payload(payload_key) => context.payload().get(payload_key).cloned(),
        };

        if value.is_none() {
            tracing::debug!("🔌 Input '{}' of '{}' is unresolved, sending null", key, node.name);
        }
        payload.insert(key.clone(), value.unwrap_or(Value::Null));
    }

    Ok(payload)
}
