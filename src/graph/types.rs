/// Graph description types
///
/// The wire shape of a plan as produced by the plan generator or posted in a
/// request body. These are untrusted until turned into a [`super::Graph`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete graph description: nodes plus their connections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    /// Units of work, one remote call each
    pub nodes: Vec<NodeSpec>,
    /// Dependencies between nodes
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

/// A single node in the graph description
///
/// `inputs` maps the key sent to the endpoint to a source: a node name
/// (whole output), `node.field` (one field of that output), or a key of the
/// initial payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique node name within the graph (e.g., "fetch-profile")
    pub name: String,
    /// Primary call target
    pub endpoint: String,
    /// Local input key -> source key
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    /// Endpoint to try once if the primary call fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Per-node call timeout, overriding the executor default.
    /// Must be positive; `0` is rejected when the graph is built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Whether the run is unusable without this node's output
    #[serde(default)]
    pub required: bool,
}

/// Connection between two nodes
///
/// `fallback` overrides the fallback endpoint of the `to` node when reached
/// through this edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Source node name
    pub from: String,
    /// Target node name
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl NodeSpec {
    /// Node with no inputs and no fallback
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            inputs: BTreeMap::new(),
            fallback: None,
            timeout_ms: None,
            required: false,
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, source: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), source.into());
        self
    }

    pub fn with_fallback(mut self, endpoint: impl Into<String>) -> Self {
        self.fallback = Some(endpoint.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl EdgeSpec {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, endpoint: impl Into<String>) -> Self {
        self.fallback = Some(endpoint.into());
        self
    }
}
