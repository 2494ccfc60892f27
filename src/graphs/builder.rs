//! GraphBuilder implementation for constructing workflow graphs.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::iteration::{EdgesIter, NodesIter, topological_sort};
use crate::node::Node;
use crate::runtimes::RuntimeConfig;
use crate::types::NodeKind;

/// Builder for constructing workflow graphs with a fluent API.
///
/// Every graph must have at least one executable node, an edge out of
/// `NodeKind::Start` (the entry), and an edge into `NodeKind::End` (the
/// terminal). `Start` and `End` are virtual and never registered with
/// [`add_node`](Self::add_node).
///
/// # Examples
///
/// ## Fan-out / fan-in
/// ```
/// use cropflow::graphs::GraphBuilder;
/// use cropflow::types::NodeKind;
///
/// # struct MyNode;
/// # #[async_trait::async_trait]
/// # impl cropflow::node::Node for MyNode {
/// #     async fn run(&self, _: cropflow::state::StateSnapshot, _: cropflow::node::NodeContext) -> Result<cropflow::node::NodePartial, cropflow::node::NodeError> {
/// #         Ok(cropflow::node::NodePartial::default())
/// #     }
/// # }
///
/// let app = GraphBuilder::new()
///     .add_node(NodeKind::Custom("sensors".into()), MyNode)
///     .add_node(NodeKind::Custom("weather".into()), MyNode)
///     .add_node(NodeKind::Custom("synthesis".into()), MyNode)
///     // Fan-out from the virtual Start
///     .add_edge(NodeKind::Start, NodeKind::Custom("sensors".into()))
///     .add_edge(NodeKind::Start, NodeKind::Custom("weather".into()))
///     // Fan-in: synthesis waits for both branches
///     .add_edge(NodeKind::Custom("sensors".into()), NodeKind::Custom("synthesis".into()))
///     .add_edge(NodeKind::Custom("weather".into()), NodeKind::Custom("synthesis".into()))
///     .add_edge(NodeKind::Custom("synthesis".into()), NodeKind::End)
///     .compile()
///     .expect("valid graph");
/// ```
pub struct GraphBuilder {
    /// Registry of all nodes in the graph, keyed by their identifier.
    pub(crate) nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    /// Edges defining the static graph topology.
    pub(crate) edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    /// Runtime configuration for the compiled application.
    pub(crate) runtime_config: RuntimeConfig,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new, empty graph builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Adds a node to the graph.
    ///
    /// `NodeKind::Start` and `NodeKind::End` are virtual structural
    /// endpoints; attempts to register them are ignored with a warning.
    #[must_use]
    pub fn add_node(mut self, id: NodeKind, node: impl Node + 'static) -> Self {
        match id {
            NodeKind::Start | NodeKind::End => {
                tracing::warn!(
                    ?id,
                    "ignoring registration of virtual node kind (Start/End are virtual)"
                );
            }
            _ => {
                self.nodes.insert(id, Arc::new(node));
            }
        }
        self
    }

    /// Adds a directed edge between two nodes.
    ///
    /// Multiple edges from the same node create fan-out; multiple edges into
    /// the same node create fan-in. A fan-in node becomes eligible only when
    /// every upstream has completed.
    #[must_use]
    pub fn add_edge(mut self, from: NodeKind, to: NodeKind) -> Self {
        self.edges.entry(from).or_default().push(to);
        self
    }

    /// Configures runtime settings for the compiled application.
    #[must_use]
    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = runtime_config;
        self
    }

    /// Iterate over the registered node kinds.
    pub fn nodes(&self) -> NodesIter<'_> {
        NodesIter::new(self.nodes.keys())
    }

    /// Iterate over all edges as (from, to) pairs.
    pub fn edges(&self) -> EdgesIter<'_> {
        EdgesIter::new(&self.edges)
    }

    /// Deterministic topological ordering of the declared graph.
    ///
    /// Assumes the declaration is acyclic; on a cyclic declaration the
    /// ordering excludes cycle members. Use [`compile`](Self::compile) for
    /// validated acyclicity.
    pub fn topological_sort(&self) -> Vec<NodeKind> {
        topological_sort(&self.edges)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        FxHashMap<NodeKind, Arc<dyn Node>>,
        FxHashMap<NodeKind, Vec<NodeKind>>,
        RuntimeConfig,
    ) {
        (self.nodes, self.edges, self.runtime_config)
    }
}
