//! Graph definition and compilation for workflow execution.
//!
//! The main entry point is [`GraphBuilder`], a fluent builder collecting
//! nodes and edges that compiles into an executable [`App`](crate::app::App).
//! `NodeKind::Start` and `NodeKind::End` are virtual structural endpoints:
//! edges out of `Start` define where a run begins, edges into `End` mark the
//! terminals.
//!
//! Compilation validates the declaration before anything runs: an empty
//! graph, a missing entry or terminal, an edge referencing an unregistered
//! node, a node unreachable from `Start`, or a directed cycle all fail with
//! a [`GraphCompileError`] — graph-construction errors are a compile-time
//! class, never a run-time one.
//!
//! # Quick Start
//!
//! ```
//! use cropflow::graphs::GraphBuilder;
//! use cropflow::types::NodeKind;
//! use cropflow::node::{Node, NodeContext, NodePartial, NodeError};
//! use cropflow::state::StateSnapshot;
//! use async_trait::async_trait;
//!
//! struct MyNode;
//!
//! #[async_trait]
//! impl Node for MyNode {
//!     async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
//!         Ok(NodePartial::default())
//!     }
//! }
//!
//! // Start (virtual) -> process -> End (virtual)
//! let app = GraphBuilder::new()
//!     .add_node(NodeKind::Custom("process".into()), MyNode)
//!     .add_edge(NodeKind::Start, NodeKind::Custom("process".into()))
//!     .add_edge(NodeKind::Custom("process".into()), NodeKind::End)
//!     .compile()
//!     .expect("valid graph");
//! ```

mod builder;
mod compilation;
mod iteration;


pub use builder::GraphBuilder;
pub use compilation::GraphCompileError;
pub use iteration::{EdgesIter, NodesIter};
