use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cropflow::message::Message;
use cropflow::node::{Node, NodeContext, NodeError, NodePartial};
use cropflow::state::StateSnapshot;
use cropflow::utils::collections::new_context_map;
use serde_json::json;

/// Appends its name to the trace and writes one context field.
#[derive(Debug, Clone)]
pub struct TraceNode {
    pub name: &'static str,
}

impl TraceNode {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Node for TraceNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
        let mut context = new_context_map();
        context.insert(self.name.to_string(), json!(true));
        Ok(NodePartial::new()
            .with_context(context)
            .with_trace(vec![self.name.to_string()]))
    }
}

/// Sleeps, then appends its name to the trace.
pub struct DelayNode {
    pub name: &'static str,
    pub delay: Duration,
}

impl DelayNode {
    pub fn new(name: &'static str, delay: Duration) -> Self {
        Self { name, delay }
    }
}

#[async_trait]
impl Node for DelayNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
        tokio::time::sleep(self.delay).await;
        Ok(NodePartial::new().with_trace(vec![self.name.to_string()]))
    }
}

/// Always fails with a missing-input error.
#[derive(Debug, Clone, Default)]
pub struct FailingNode;

#[async_trait]
impl Node for FailingNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
        Err(NodeError::MissingInput { what: "test_key" })
    }
}

/// Records its invocation into a shared log, then traces itself.
pub struct RecorderNode {
    pub name: String,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl RecorderNode {
    pub fn new(name: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

#[async_trait]
impl Node for RecorderNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
        self.log.lock().unwrap().push(self.name.clone());
        Ok(NodePartial::new().with_trace(vec![self.name.clone()]))
    }
}

/// Counts executions and replies with a message.
pub struct CountingNode {
    counter: Arc<AtomicUsize>,
}

impl CountingNode {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        Self { counter }
    }
}

#[async_trait]
impl Node for CountingNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(NodePartial::new().with_messages(vec![Message::assistant("counted")]))
    }
}
