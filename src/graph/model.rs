/// Validated, immutable graph model backed by petgraph
///
/// Built once per plan. Construction rejects malformed descriptions before any
/// side effect happens, resolves every input source to either an upstream node
/// or a payload key, and precomputes adjacency so the scheduler never has to
/// walk edge lists during a run.

use super::types::{EdgeSpec, GraphSpec, NodeSpec};
use crate::error::GraphValidationError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

/// Where a node input takes its value from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Output of another node, or one top-level field of it
    Upstream { node: String, field: Option<String> },
    /// Entry of the initial payload
    Payload(String),
}

/// A validated node
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub endpoint: String,
    pub fallback: Option<String>,
    pub inputs: BTreeMap<String, InputSource>,
    pub timeout: Option<Duration>,
    pub required: bool,
}

impl Node {
    /// Upstream nodes this node reads from, in input key order
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.inputs.values().filter_map(|source| match source {
            InputSource::Upstream { node, .. } => Some(node.as_str()),
            InputSource::Payload(_) => None,
        })
    }

    pub fn depends_on(&self, upstream: &str) -> bool {
        self.dependencies().any(|dep| dep == upstream)
    }
}

/// Edge weight: declared edges keep their position for fallback tie-breaks,
/// implicit data edges only order execution.
#[derive(Debug, Clone)]
struct Link {
    fallback: Option<String>,
    order: usize,
}

/// Validated DAG of remote calls
#[derive(Debug)]
pub struct Graph {
    graph: DiGraph<Node, Link>,
    index: HashMap<String, NodeIndex>,
    /// Unique predecessors per node, indexed by `NodeIndex::index()`
    preds: Vec<Vec<NodeIndex>>,
    /// Unique successors per node, indexed by `NodeIndex::index()`
    succs: Vec<Vec<NodeIndex>>,
}

impl Graph {
    /// Build and validate a graph from a plan description
    pub fn from_spec(spec: &GraphSpec) -> Result<Self, GraphValidationError> {
        Self::build(&spec.nodes, &spec.edges)
    }

    /// Build and validate a graph from node and edge descriptions
    ///
    /// Rejects empty names or endpoints, zero timeouts, duplicate names, edges
    /// to unknown nodes and cycles. Inputs naming another node add an ordering edge from
    /// that node when none is declared.
    pub fn build(nodes: &[NodeSpec], edges: &[EdgeSpec]) -> Result<Self, GraphValidationError> {
        tracing::debug!("🏗️ Building graph with {} nodes and {} edges", nodes.len(), edges.len());

        let mut names: HashSet<&str> = HashSet::with_capacity(nodes.len());
        for spec in nodes {
            if spec.name.trim().is_empty() {
                return Err(GraphValidationError::EmptyName);
            }
            if spec.endpoint.trim().is_empty() {
                return Err(GraphValidationError::EmptyEndpoint { node: spec.name.clone() });
            }
            if spec.timeout_ms == Some(0) {
                return Err(GraphValidationError::ZeroTimeout { node: spec.name.clone() });
            }
            if !names.insert(spec.name.as_str()) {
                tracing::warn!("❌ Duplicate node name in graph: {}", spec.name);
                return Err(GraphValidationError::DuplicateNode(spec.name.clone()));
            }
        }

        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut index = HashMap::with_capacity(nodes.len());
        for spec in nodes {
            let node = Node {
                name: spec.name.clone(),
                endpoint: spec.endpoint.clone(),
                fallback: spec.fallback.clone().filter(|fb| !fb.trim().is_empty()),
                inputs: spec
                    .inputs
                    .iter()
                    .map(|(key, source)| (key.clone(), parse_source(source, &names)))
                    .collect(),
                timeout: spec.timeout_ms.map(Duration::from_millis),
                required: spec.required,
            };
            let node_index = graph.add_node(node);
            index.insert(spec.name.clone(), node_index);
            tracing::debug!("  ➕ Added node: '{}' -> {}", spec.name, spec.endpoint);
        }

        for (order, edge) in edges.iter().enumerate() {
            let lookup = |name: &str| {
                index.get(name).copied().ok_or_else(|| GraphValidationError::UnknownEdgeNode {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    missing: name.to_string(),
                })
            };
            let from = lookup(&edge.from)?;
            let to = lookup(&edge.to)?;
            let fallback = edge.fallback.clone().filter(|fb| !fb.trim().is_empty());
            graph.add_edge(from, to, Link { fallback, order });
            tracing::debug!("  🔗 Added edge: '{}' → '{}'", edge.from, edge.to);
        }

        let mut implicit = Vec::new();
        for to in graph.node_indices() {
            for dep in graph[to].dependencies() {
                let from = index[dep];
                if graph.find_edge(from, to).is_none() && !implicit.contains(&(from, to)) {
                    implicit.push((from, to));
                }
            }
        }
        for (from, to) in implicit {
            tracing::debug!("  🔗 Added data edge: '{}' → '{}'", graph[from].name, graph[to].name);
            graph.add_edge(from, to, Link { fallback: None, order: usize::MAX });
        }

        tracing::debug!("🔍 Validating DAG structure (checking for cycles)");
        if let Err(cycle) = toposort(&graph, None) {
            let node = graph[cycle.node_id()].name.clone();
            tracing::warn!("❌ Graph contains a cycle through '{}'", node);
            return Err(GraphValidationError::Cycle { node });
        }

        let adjacency = |direction: Direction| -> Vec<Vec<NodeIndex>> {
            graph
                .node_indices()
                .map(|idx| {
                    let mut linked: Vec<NodeIndex> = graph.neighbors_directed(idx, direction).collect();
                    linked.sort();
                    linked.dedup();
                    linked
                })
                .collect()
        };
        let preds = adjacency(Direction::Incoming);
        let succs = adjacency(Direction::Outgoing);

        tracing::debug!("✅ DAG validation successful - no cycles detected");

        Ok(Self { graph, index, preds, succs })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&idx| &self.graph[idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Unique direct predecessors, declared or implied by inputs
    pub fn predecessors(&self, name: &str) -> Vec<&str> {
        self.linked(name, &self.preds)
    }

    /// Unique direct successors, declared or implied by inputs
    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.linked(name, &self.succs)
    }

    fn linked<'a>(&'a self, name: &str, table: &'a [Vec<NodeIndex>]) -> Vec<&'a str> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = table[idx.index()]
            .iter()
            .map(|&other| self.graph[other].name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Batches of node names in maximum-parallelism execution order
    ///
    /// Each batch holds exactly the nodes whose predecessors all appear in
    /// earlier batches. Names are sorted within a batch. Every call starts
    /// over from the static structure.
    pub fn topological_batches(&self) -> TopologicalBatches<'_> {
        let remaining: Vec<usize> = self.preds.iter().map(Vec::len).collect();
        let frontier = self
            .graph
            .node_indices()
            .filter(|idx| remaining[idx.index()] == 0)
            .collect();
        TopologicalBatches {
            graph: self,
            remaining,
            frontier,
        }
    }

    /// Fallback endpoint for a node whose primary call failed
    ///
    /// The node's own fallback wins. Otherwise the fallback of an inbound edge
    /// from a predecessor that supplies one of the node's inputs (inputs in key
    /// order), then the fallback of any other inbound edge in declaration order.
    pub fn fallback_endpoint(&self, name: &str) -> Option<&str> {
        let &idx = self.index.get(name)?;
        let node = &self.graph[idx];
        if let Some(fallback) = node.fallback.as_deref() {
            return Some(fallback);
        }

        let inbound: Vec<(&str, usize, &str)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter_map(|edge| {
                let link = edge.weight();
                link.fallback
                    .as_deref()
                    .map(|fallback| (self.graph[edge.source()].name.as_str(), link.order, fallback))
            })
            .collect();

        for dep in node.dependencies() {
            let from_input = inbound
                .iter()
                .filter(|(from, _, _)| *from == dep)
                .min_by_key(|(_, order, _)| *order);
            if let Some((_, _, fallback)) = from_input {
                return Some(*fallback);
            }
        }

        inbound
            .iter()
            .min_by_key(|(_, order, _)| *order)
            .map(|(_, _, fallback)| *fallback)
    }
}

/// Lazy layer-by-layer topological walk over a [`Graph`]
pub struct TopologicalBatches<'g> {
    graph: &'g Graph,
    remaining: Vec<usize>,
    frontier: Vec<NodeIndex>,
}

impl Iterator for TopologicalBatches<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frontier.is_empty() {
            return None;
        }

        let current = std::mem::take(&mut self.frontier);
        for &idx in &current {
            for &succ in &self.graph.succs[idx.index()] {
                let pending = &mut self.remaining[succ.index()];
                *pending -= 1;
                if *pending == 0 {
                    self.frontier.push(succ);
                }
            }
        }

        let mut batch: Vec<String> = current
            .into_iter()
            .map(|idx| self.graph.graph[idx].name.clone())
            .collect();
        batch.sort();
        Some(batch)
    }
}

/// Resolve a source key against the node names of the graph
///
/// An exact node name wins; otherwise the longest `node.field` split whose
/// prefix names a node; anything else is a payload key.
fn parse_source(source: &str, names: &HashSet<&str>) -> InputSource {
    if names.contains(source) {
        return InputSource::Upstream {
            node: source.to_string(),
            field: None,
        };
    }
    for (dot, _) in source.rmatch_indices('.') {
        let (node, field) = (&source[..dot], &source[dot + 1..]);
        if !field.is_empty() && names.contains(node) {
            return InputSource::Upstream {
                node: node.to_string(),
                field: Some(field.to_string()),
            };
        }
    }
    InputSource::Payload(source.to_string())
}
