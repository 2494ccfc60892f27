//! Run state for the Cropflow workflow engine.
//!
//! One [`RunState`] exists per workflow invocation. It is owned by the
//! engine for the duration of the run and discarded after the final field is
//! read. State is organized into versioned channels (see [`crate::channels`])
//! and nodes only ever observe immutable [`StateSnapshot`]s.
//!
//! # Examples
//!
//! ```rust
//! use cropflow::state::RunState;
//! use cropflow::channels::Channel;
//! use serde_json::json;
//!
//! let mut state = RunState::new_with_user_message("How is my wheat doing?");
//! state.add_context("user_id", json!("farmer123"));
//!
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.messages.len(), 1);
//! assert_eq!(snapshot.context_str("user_id"), Some("farmer123"));
//! ```

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::{
    channels::{
        Channel, ContextChannel, ErrorsChannel, MessagesChannel, TraceChannel, errors::ErrorEvent,
    },
    message::Message,
};

/// The per-run state container.
///
/// Four independent versioned channels:
/// - **messages**: conversation data ([`MessagesChannel`])
/// - **context**: named analysis fields, one writer per field
///   ([`ContextChannel`])
/// - **trace**: append-only log of executed node names ([`TraceChannel`])
/// - **errors**: recoverable error events ([`ErrorsChannel`])
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunState {
    /// Conversation messages.
    pub messages: MessagesChannel,
    /// Named analysis fields shared between nodes.
    pub context: ContextChannel,
    /// Append-only execution trace.
    pub trace: TraceChannel,
    /// Recoverable error events.
    pub errors: ErrorsChannel,
}

/// Immutable snapshot of run state at a specific point in time.
///
/// Snapshots are created by [`RunState::snapshot`] at the start of each
/// superstep and handed to nodes by value; nodes can never mutate the live
/// state directly.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Messages at the time of snapshot.
    pub messages: Vec<Message>,
    /// Version of the messages channel when the snapshot was taken.
    pub messages_version: u32,
    /// Context fields at the time of snapshot.
    pub context: FxHashMap<String, Value>,
    /// Version of the context channel when the snapshot was taken.
    pub context_version: u32,
    /// Trace entries at the time of snapshot.
    pub trace: Vec<String>,
    /// Version of the trace channel when the snapshot was taken.
    pub trace_version: u32,
    /// Error events at the time of snapshot.
    pub errors: Vec<ErrorEvent>,
    /// Version of the errors channel when the snapshot was taken.
    pub errors_version: u32,
}

impl StateSnapshot {
    /// A context field as a string slice, if present and a string.
    #[must_use]
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }

    /// A context field as a raw JSON value, if present.
    #[must_use]
    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }
}

impl RunState {
    /// Creates run state seeded with the farmer's message.
    ///
    /// The primary constructor for starting a workflow run: one user message
    /// on the messages channel, all other channels empty, every channel at
    /// version 1.
    pub fn new_with_user_message(user_text: &str) -> Self {
        let messages = vec![Message::user(user_text)];
        Self {
            messages: MessagesChannel::new(messages, 1),
            context: ContextChannel::default(),
            trace: TraceChannel::default(),
            errors: ErrorsChannel::default(),
        }
    }

    /// Creates run state seeded with existing messages.
    ///
    /// Useful when a run should start from restored conversation history.
    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: MessagesChannel::new(messages, 1),
            context: ContextChannel::default(),
            trace: TraceChannel::default(),
            errors: ErrorsChannel::default(),
        }
    }

    /// Creates a builder for constructing run state with a fluent API.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cropflow::state::RunState;
    /// use serde_json::json;
    ///
    /// let state = RunState::builder()
    ///     .with_user_message("Will it rain this week?")
    ///     .with_context("user_id", json!("farmer123"))
    ///     .with_context("session_id", json!("sess_1"))
    ///     .build();
    ///
    /// let snapshot = state.snapshot();
    /// assert_eq!(snapshot.messages.len(), 1);
    /// assert_eq!(snapshot.context.len(), 2);
    /// ```
    pub fn builder() -> RunStateBuilder {
        RunStateBuilder::new()
    }

    /// Append a message. Versions are left alone; the barrier owns version
    /// accounting.
    #[must_use = "consider using the returned self for method chaining"]
    pub fn add_message(&mut self, role: &str, content: &str) -> &mut Self {
        self.messages.get_mut().push(Message::new(role, content));
        self
    }

    /// Insert a context field. Versions are left alone; the barrier owns
    /// version accounting.
    #[must_use = "consider using the returned self for method chaining"]
    pub fn add_context(&mut self, key: &str, value: Value) -> &mut Self {
        self.context.get_mut().insert(key.to_string(), value);
        self
    }

    /// Creates an immutable snapshot of the current state.
    ///
    /// Clones all channel payloads; safe to hand to concurrently executing
    /// nodes while the live state is later mutated by the barrier.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            messages: self.messages.snapshot(),
            messages_version: self.messages.version(),
            context: self.context.snapshot(),
            context_version: self.context.version(),
            trace: self.trace.snapshot(),
            trace_version: self.trace.version(),
            errors: self.errors.snapshot(),
            errors_version: self.errors.version(),
        }
    }
}

/// Fluent builder for [`RunState`].
#[derive(Debug, Default)]
pub struct RunStateBuilder {
    messages: Vec<Message>,
    context: FxHashMap<String, Value>,
}

impl RunStateBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Adds a user message.
    pub fn with_user_message(mut self, content: &str) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Adds an assistant message.
    pub fn with_assistant_message(mut self, content: &str) -> Self {
        self.messages.push(Message::assistant(content));
        self
    }

    /// Adds a system message.
    pub fn with_system_message(mut self, content: &str) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    /// Adds a context field.
    pub fn with_context(mut self, key: &str, value: Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }

    /// Builds the final `RunState`; every channel starts at version 1.
    pub fn build(self) -> RunState {
        RunState {
            messages: MessagesChannel::new(self.messages, 1),
            context: ContextChannel::new(self.context, 1),
            trace: TraceChannel::default(),
            errors: ErrorsChannel::default(),
        }
    }
}
