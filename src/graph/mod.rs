/// Graph Model
///
/// Typed description of a plan (nodes, edges, fallbacks) and the validated
/// petgraph DAG built from it:
/// - Wire types deserialized from plans and request bodies
/// - Validation: duplicate names, dangling edges, cycles
/// - Topological batches for maximum-parallelism execution

// Plan description types (serde)
pub mod types;

// Validated DAG with derived adjacency
pub mod model;

pub use model::{Graph, InputSource, Node, TopologicalBatches};
pub use types::{EdgeSpec, GraphSpec, NodeSpec};
