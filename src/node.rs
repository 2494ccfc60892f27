//! Node execution primitives.
//!
//! This module provides the abstractions for executable workflow nodes: the
//! [`Node`] trait, the execution context handed to each invocation, the
//! partial state update a node returns, and the fatal error type.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::channels::errors::ErrorEvent;
use crate::event_bus::Event;
use crate::message::Message;
use crate::state::StateSnapshot;

// ============================================================================
// Core Trait
// ============================================================================

/// A single named asynchronous step in the workflow graph.
///
/// Nodes receive the current state snapshot and an execution context,
/// perform their work (usually one bounded external call), and return a
/// partial state update for the barrier to merge.
///
/// # Error Handling
///
/// Two channels exist for failure:
/// 1. **Fatal errors**: return `Err(NodeError)` — the whole run fails and the
///    caller receives a single reported error. Reserved for failures with no
///    degraded substitute (the synthesis generation call, missing identity
///    fields).
/// 2. **Recoverable errors**: substitute a degraded field value, record an
///    [`ErrorEvent`] in `NodePartial::errors`, and return `Ok` so sibling
///    branches keep running.
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this node with the given state snapshot and context.
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError>;
}

// ============================================================================
// Execution Context
// ============================================================================

/// Execution context passed to nodes during workflow execution.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Identifier of the node being executed.
    pub node_id: String,
    /// Superstep number of this invocation.
    pub step: u64,
    /// Channel for emitting events to the run's event bus.
    pub event_bus_sender: flume::Sender<Event>,
}

impl NodeContext {
    /// Emit a node-scoped event enriched with this context's metadata.
    pub fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), NodeContextError> {
        self.event_bus_sender
            .send(Event::node_message_with_meta(
                self.node_id.clone(),
                self.step,
                scope,
                message,
            ))
            .map_err(|_| NodeContextError::EventBusUnavailable)
    }
}

// ============================================================================
// State Updates
// ============================================================================

/// Partial state update returned by node execution.
///
/// All fields are optional; a node only fills the channels it touches. The
/// barrier merges partials from one superstep deterministically: messages,
/// trace and errors are appended, context is a shallow map union (field
/// ownership is one writer per field, so unions never conflict).
///
/// # Examples
///
/// ```rust
/// use cropflow::node::NodePartial;
/// use cropflow::utils::collections::new_context_map;
/// use serde_json::json;
///
/// let mut context = new_context_map();
/// context.insert("sensors".to_string(), json!({"temperature": 24.1}));
/// let partial = NodePartial::new()
///     .with_context(context)
///     .with_trace(vec!["sensors".to_string()]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct NodePartial {
    /// Messages to append to the conversation.
    pub messages: Option<Vec<Message>>,
    /// Context fields to merge into the run state.
    pub context: Option<FxHashMap<String, serde_json::Value>>,
    /// Trace entries to append (normally exactly one: this node's name).
    pub trace: Option<Vec<String>>,
    /// Recoverable errors to record.
    pub errors: Option<Vec<ErrorEvent>>,
}

impl NodePartial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach one or more messages.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Attach context fields.
    #[must_use]
    pub fn with_context(mut self, context: FxHashMap<String, serde_json::Value>) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach trace entries.
    #[must_use]
    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Attach recoverable errors.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ErrorEvent>) -> Self {
        self.errors = Some(errors);
        self
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when using `NodeContext` methods.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeContextError {
    /// Event could not be sent because the bus is gone.
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(cropflow::node::event_bus_unavailable),
        help("The event bus may be disconnected. Check the run's lifecycle.")
    )]
    EventBusUnavailable,
}

/// Fatal errors that halt workflow execution.
///
/// For recoverable errors that should be tracked without halting the run,
/// use `NodePartial::errors` instead.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(cropflow::node::missing_input),
        help("Check that an upstream node produced the required field.")
    )]
    MissingInput { what: &'static str },

    /// External provider error with no degraded substitute.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(cropflow::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// The text-generation call failed where its output is required.
    #[error("text generation failed: {message}")]
    #[diagnostic(
        code(cropflow::node::generation),
        help("The synthesis step cannot degrade; the run reports one error to the caller.")
    )]
    Generation { message: String },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(cropflow::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Event bus communication error.
    #[error("event bus error: {0}")]
    #[diagnostic(code(cropflow::node::event_bus))]
    EventBus(#[from] NodeContextError),
}
