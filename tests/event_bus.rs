//! Event bus capture during runs.

mod common;

use cropflow::event_bus::{ChannelSink, Event, EventBus};
use cropflow::graphs::GraphBuilder;
use cropflow::types::NodeKind;

use common::*;

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

fn two_node_graph() -> cropflow::app::App {
    GraphBuilder::new()
        .add_node(custom("a"), TraceNode::new("a"))
        .add_node(custom("b"), TraceNode::new("b"))
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), custom("b"))
        .add_edge(custom("b"), NodeKind::End)
        .compile()
        .expect("valid graph")
}

#[tokio::test]
async fn memory_sink_captures_run_completion() {
    let app = two_node_graph();
    let (result, sink) = app.invoke_with_memory_sink(state_with_user("go")).await;
    result.expect("run succeeds");

    let events = sink.snapshot();
    let completion = events
        .iter()
        .find(|event| event.scope_label() == "run")
        .expect("completion diagnostic captured");
    assert!(completion.message().contains("completed after"));
}

#[tokio::test]
async fn channel_sink_forwards_events() {
    let (tx, rx) = flume::unbounded();
    let bus = EventBus::with_sink(ChannelSink::new(tx));
    let sender = bus.get_sender();
    bus.listen_for_events();

    sender
        .send(Event::node_message_with_meta("sensors", 1, "fetch", "loaded"))
        .expect("send");
    bus.stop_listener().await;

    let event = rx.recv().expect("event forwarded");
    assert_eq!(event.scope_label(), "fetch");
    assert_eq!(event.message(), "loaded");
}
