//! Graph compilation and structural validation.
//!
//! Compiling a [`GraphBuilder`](super::GraphBuilder) into an executable
//! [`App`](crate::app::App) validates the declaration so graph-construction
//! mistakes surface at startup, never mid-run.

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use thiserror::Error;

use super::iteration::find_cycle;
use crate::app::App;
use crate::types::NodeKind;

/// Structural errors rejected at compile time.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphCompileError {
    /// No executable nodes were registered.
    #[error("graph has no executable nodes")]
    #[diagnostic(
        code(cropflow::graph::empty),
        help("Register at least one node with add_node before compiling.")
    )]
    EmptyGraph,

    /// No edge leaves the virtual Start node.
    #[error("graph has no entry: no edge leaves Start")]
    #[diagnostic(
        code(cropflow::graph::missing_entry),
        help("Add an edge from NodeKind::Start to the first node.")
    )]
    MissingEntry,

    /// No edge arrives at the virtual End node.
    #[error("graph has no terminal: no edge reaches End")]
    #[diagnostic(
        code(cropflow::graph::missing_terminal),
        help("Add an edge from the final node to NodeKind::End.")
    )]
    MissingTerminal,

    /// An edge references a node that was never registered.
    #[error("edge {from} -> {to} references unregistered node {to}")]
    #[diagnostic(
        code(cropflow::graph::unknown_node),
        help("Every custom node named in an edge must be registered with add_node.")
    )]
    UnknownNode { from: String, to: String },

    /// A registered node cannot be reached from Start.
    #[error("node {node} is unreachable from Start")]
    #[diagnostic(
        code(cropflow::graph::unreachable),
        help("Connect the node to the graph or remove it; unreachable nodes would never become eligible.")
    )]
    Unreachable { node: String },

    /// The declared edges contain a directed cycle.
    #[error("graph contains a cycle: {}", members.join(" -> "))]
    #[diagnostic(
        code(cropflow::graph::cycle),
        help("Workflow graphs must be acyclic; break the cycle among the listed nodes.")
    )]
    Cycle { members: Vec<String> },
}

impl super::builder::GraphBuilder {
    /// Compiles the graph into an executable application.
    ///
    /// Validation checks, in order:
    /// 1. at least one executable node is registered
    /// 2. an edge leaves `Start` and an edge reaches `End`
    /// 3. every custom node named in an edge is registered
    /// 4. the edges are acyclic (the error names the members of one cycle)
    /// 5. every registered node is reachable from `Start`
    ///
    /// # Errors
    ///
    /// Returns [`GraphCompileError`] describing the first violation found.
    pub fn compile(self) -> Result<App, GraphCompileError> {
        if self.nodes.is_empty() {
            return Err(GraphCompileError::EmptyGraph);
        }

        let entry_missing = self
            .edges
            .get(&NodeKind::Start)
            .map(|targets| targets.is_empty())
            .unwrap_or(true);
        if entry_missing {
            return Err(GraphCompileError::MissingEntry);
        }

        let has_terminal = self
            .edges
            .values()
            .any(|targets| targets.iter().any(NodeKind::is_end));
        if !has_terminal {
            return Err(GraphCompileError::MissingTerminal);
        }

        for (from, targets) in &self.edges {
            if from.is_custom() && !self.nodes.contains_key(from) {
                // An edge out of an unregistered node dangles just the same.
                return Err(GraphCompileError::UnknownNode {
                    from: from.to_string(),
                    to: targets
                        .first()
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "End".to_string()),
                });
            }
            for to in targets {
                if to.is_custom() && !self.nodes.contains_key(to) {
                    return Err(GraphCompileError::UnknownNode {
                        from: from.to_string(),
                        to: to.to_string(),
                    });
                }
            }
        }

        if let Some(members) = find_cycle(&self.edges) {
            return Err(GraphCompileError::Cycle {
                members: members.iter().map(NodeKind::to_string).collect(),
            });
        }

        let reachable = reachable_from_start(&self.edges);
        for node in self.nodes.keys() {
            if !reachable.contains(node) {
                return Err(GraphCompileError::Unreachable {
                    node: node.to_string(),
                });
            }
        }

        let (nodes, edges, runtime_config) = self.into_parts();
        Ok(App::from_parts(nodes, edges, runtime_config))
    }
}

/// Breadth-first reachability over the declared edges, starting at Start.
fn reachable_from_start(
    edges: &rustc_hash::FxHashMap<NodeKind, Vec<NodeKind>>,
) -> FxHashSet<NodeKind> {
    let mut seen: FxHashSet<NodeKind> = FxHashSet::default();
    let mut queue: VecDeque<NodeKind> = VecDeque::new();
    queue.push_back(NodeKind::Start);
    seen.insert(NodeKind::Start);

    while let Some(node) = queue.pop_front() {
        if let Some(targets) = edges.get(&node) {
            for target in targets {
                if seen.insert(target.clone()) {
                    queue.push_back(target.clone());
                }
            }
        }
    }

    seen
}
