#[macro_use]
extern crate proptest;

mod common;

use std::sync::{Arc, Mutex};

use proptest::prelude::{Strategy, any, prop};
use rustc_hash::FxHashMap;

use cropflow::graphs::GraphBuilder;
use cropflow::types::NodeKind;

use common::*;

/// Generate valid custom node names: a letter followed by 0..12 word
/// characters, excluding the reserved endpoint names.
fn node_name_strategy() -> impl Strategy<Value = String> {
    let base = prop::string::string_regex("[A-Za-z][A-Za-z0-9_]{0,12}").unwrap();
    base.prop_filter("exclude reserved endpoint names", |s| {
        s != "Start" && s != "End"
    })
}

fn block_on<F: std::future::Future<Output = ()>>(fut: F) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(fut);
}

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

proptest! {
    #[test]
    fn prop_node_name_non_empty(name in node_name_strategy()) {
        prop_assert!(!name.is_empty());
        prop_assert!(name.chars().next().unwrap().is_ascii_alphabetic());
    }
}

proptest! {
    /// Random layered DAGs: the observed invocation order respects every
    /// declared edge, and each node runs exactly once.
    #[test]
    fn prop_execution_respects_edges(
        mut names in prop::collection::vec(node_name_strategy(), 2..10),
        parent_picks in prop::collection::vec(any::<usize>(), 10),
    ) {
        names.sort();
        names.dedup();
        prop_assume!(names.len() >= 2);

        // Each node gets one upstream chosen among Start and the nodes that
        // precede it; later nodes may also pick up extra fan-in edges.
        let mut edges: Vec<(NodeKind, NodeKind)> = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let pick = parent_picks.get(i).copied().unwrap_or(0) % (i + 1);
            let parent = if pick == 0 {
                NodeKind::Start
            } else {
                custom(&names[pick - 1])
            };
            edges.push((parent, custom(name)));
        }
        // Extra fan-in: every third node also depends on its predecessor.
        for i in (2..names.len()).step_by(3) {
            edges.push((custom(&names[i - 1]), custom(&names[i])));
        }

        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        block_on({
            let names = names.clone();
            let edges = edges.clone();
            let log = log.clone();
            async move {
                let mut builder = GraphBuilder::new();
                for name in &names {
                    builder = builder.add_node(
                        custom(name),
                        RecorderNode::new(name.clone(), log.clone()),
                    );
                }
                let mut has_outgoing: FxHashMap<NodeKind, bool> = FxHashMap::default();
                for (from, to) in &edges {
                    builder = builder.add_edge(from.clone(), to.clone());
                    has_outgoing.insert(from.clone(), true);
                }
                // Sinks terminate at End.
                for name in &names {
                    if !has_outgoing.contains_key(&custom(name)) {
                        builder = builder.add_edge(custom(name), NodeKind::End);
                    }
                }

                let app = builder.compile().expect("generated graph is valid");
                app.invoke(state_with_user("seed")).await.expect("run succeeds");
            }
        });

        let order = log.lock().unwrap().clone();

        // Every node ran exactly once.
        prop_assert_eq!(order.len(), names.len());
        let mut position: FxHashMap<String, usize> = FxHashMap::default();
        for (i, name) in order.iter().enumerate() {
            prop_assert!(position.insert(name.clone(), i).is_none(), "node ran twice");
        }

        // Invocation order respects every declared edge.
        for (from, to) in &edges {
            if let (NodeKind::Custom(from_name), NodeKind::Custom(to_name)) = (from, to) {
                let from_pos = position[from_name];
                let to_pos = position[to_name];
                prop_assert!(
                    from_pos < to_pos,
                    "edge {} -> {} violated ({} >= {})",
                    from_name,
                    to_name,
                    from_pos,
                    to_pos
                );
            }
        }
    }
}

proptest! {
    /// Any declared cycle fails compilation; nothing ever executes a subset.
    #[test]
    fn prop_cycles_never_compile(
        mut names in prop::collection::vec(node_name_strategy(), 2..8),
    ) {
        names.sort();
        names.dedup();
        prop_assume!(names.len() >= 2);

        let mut builder = GraphBuilder::new();
        for name in &names {
            builder = builder.add_node(custom(name), TraceNode::new("cyclic"));
        }
        builder = builder.add_edge(NodeKind::Start, custom(&names[0]));
        // Ring through every node, then back to the first.
        for window in names.windows(2) {
            builder = builder.add_edge(custom(&window[0]), custom(&window[1]));
        }
        builder = builder.add_edge(custom(&names[names.len() - 1]), custom(&names[0]));
        builder = builder.add_edge(custom(&names[names.len() - 1]), NodeKind::End);

        let err = builder.compile().err().expect("cycle must not compile");
        prop_assert!(matches!(err, cropflow::graphs::GraphCompileError::Cycle { .. }));
    }
}
