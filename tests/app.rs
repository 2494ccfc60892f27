mod common;

use cropflow::channels::Channel;
use cropflow::channels::errors::{ErrorDetails, ErrorEvent};
use cropflow::graphs::GraphBuilder;
use cropflow::message::Message;
use cropflow::node::NodePartial;
use cropflow::types::NodeKind;
use cropflow::utils::collections::new_context_map;
use serde_json::json;

use common::*;

fn two_node_app() -> cropflow::app::App {
    GraphBuilder::new()
        .add_node(NodeKind::Custom("a".into()), TraceNode::new("a"))
        .add_node(NodeKind::Custom("b".into()), TraceNode::new("b"))
        .add_edge(NodeKind::Start, NodeKind::Custom("a".into()))
        .add_edge(NodeKind::Start, NodeKind::Custom("b".into()))
        .add_edge(NodeKind::Custom("a".into()), NodeKind::End)
        .add_edge(NodeKind::Custom("b".into()), NodeKind::End)
        .compile()
        .expect("valid graph")
}

#[tokio::test]
async fn barrier_merges_all_channels() {
    let app = two_node_app();
    let mut state = state_with_user("hello");

    let mut context_a = new_context_map();
    context_a.insert("sensors".to_string(), json!({"temperature": 24.0}));
    let partial_a = NodePartial::new()
        .with_context(context_a)
        .with_trace(vec!["a".to_string()]);

    let mut context_b = new_context_map();
    context_b.insert("weather".to_string(), json!({"temp_c": 29.0}));
    let partial_b = NodePartial::new()
        .with_messages(vec![Message::assistant("done")])
        .with_context(context_b)
        .with_trace(vec!["b".to_string()])
        .with_errors(vec![ErrorEvent::node(
            "b",
            1,
            ErrorDetails::msg("degraded"),
        )]);

    let outcome = app
        .apply_barrier(
            &mut state,
            &[NodeKind::Custom("a".into()), NodeKind::Custom("b".into())],
            vec![partial_a, partial_b],
        )
        .await
        .expect("barrier");

    let snapshot = state.snapshot();
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.context.len(), 2);
    assert_eq!(snapshot.trace, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(outcome.errors.len(), 1);

    let updated: std::collections::HashSet<_> =
        outcome.updated_channels.iter().copied().collect();
    assert_eq!(
        updated,
        ["messages", "context", "trace", "errors"].into_iter().collect()
    );
}

#[tokio::test]
async fn barrier_bumps_versions_only_on_change() {
    let app = two_node_app();
    let mut state = state_with_user("hello");
    assert_eq!(state.trace.version(), 1);

    let outcome = app
        .apply_barrier(&mut state, &[], vec![NodePartial::default()])
        .await
        .expect("barrier");
    assert!(outcome.updated_channels.is_empty());
    assert_eq!(state.messages.version(), 1);
    assert_eq!(state.context.version(), 1);
    assert_eq!(state.trace.version(), 1);
    assert_eq!(state.errors.version(), 1);

    let partial = NodePartial::new().with_trace(vec!["a".to_string()]);
    let outcome = app
        .apply_barrier(&mut state, &[NodeKind::Custom("a".into())], vec![partial])
        .await
        .expect("barrier");
    assert_eq!(outcome.updated_channels, vec!["trace"]);
    assert_eq!(state.trace.version(), 2);
    assert_eq!(state.messages.version(), 1);
}

#[tokio::test]
async fn barrier_merge_is_order_insensitive_for_disjoint_fields() {
    let app = two_node_app();

    let make_partials = || {
        let mut context_a = new_context_map();
        context_a.insert("alpha".to_string(), json!(1));
        let mut context_b = new_context_map();
        context_b.insert("beta".to_string(), json!(2));
        (
            NodePartial::new()
                .with_context(context_a)
                .with_trace(vec!["a".to_string()]),
            NodePartial::new()
                .with_context(context_b)
                .with_trace(vec!["b".to_string()]),
        )
    };

    let mut forward = state_with_user("x");
    let (pa, pb) = make_partials();
    app.apply_barrier(
        &mut forward,
        &[NodeKind::Custom("a".into()), NodeKind::Custom("b".into())],
        vec![pa, pb],
    )
    .await
    .expect("barrier");

    let mut reversed = state_with_user("x");
    let (pa, pb) = make_partials();
    app.apply_barrier(
        &mut reversed,
        &[NodeKind::Custom("b".into()), NodeKind::Custom("a".into())],
        vec![pb, pa],
    )
    .await
    .expect("barrier");

    // Field values are arrival-order independent; only trace order differs.
    assert_eq!(forward.context.snapshot(), reversed.context.snapshot());
    let forward_trace: std::collections::HashSet<_> =
        forward.trace.snapshot().into_iter().collect();
    let reversed_trace: std::collections::HashSet<_> =
        reversed.trace.snapshot().into_iter().collect();
    assert_eq!(forward_trace, reversed_trace);
}
