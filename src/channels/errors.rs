use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// NodeKind is carried in encoded string form so error events stay
// serde-friendly without depending on the graph types.

/// A recoverable error event recorded on the run state's errors channel.
///
/// Events carry when they happened, the scope they originated from, a
/// message chain, free-form tags, and arbitrary JSON context.
///
/// # Examples
///
/// ```
/// use cropflow::channels::errors::{ErrorDetails, ErrorEvent};
/// use serde_json::json;
///
/// let event = ErrorEvent::node("sensors", 2, ErrorDetails::msg("feed timed out"))
///     .with_tag("provider")
///     .with_context(json!({"timeout_ms": 10000}));
/// assert_eq!(event.tags, vec!["provider"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ErrorEvent {
    #[serde(default = "chrono::Utc::now")]
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub scope: ErrorScope,
    #[serde(default)]
    pub error: ErrorDetails,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl ErrorEvent {
    /// Create a node-scoped error event.
    pub fn node<S: Into<String>>(kind: S, step: u64, error: ErrorDetails) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Node {
                kind: kind.into(),
                step,
            },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Create a scheduler-scoped error event.
    pub fn scheduler(step: u64, error: ErrorDetails) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Scheduler { step },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Create a runner-scoped error event.
    pub fn runner(step: u64, error: ErrorDetails) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Runner { step },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Create an app-scoped error event.
    pub fn app(error: ErrorDetails) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::App,
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Add a single tag to this error event.
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add context metadata to this error event.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

/// Where an error event originated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ErrorScope {
    Node {
        kind: String,
        step: u64,
    },
    Scheduler {
        step: u64,
    },
    Runner {
        step: u64,
    },
    #[default]
    App,
}

/// A message with an optional cause chain and structured details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetails {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorDetails>>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl Default for ErrorDetails {
    fn default() -> Self {
        ErrorDetails {
            message: String::new(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ErrorDetails {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c as &dyn std::error::Error)
    }
}

impl ErrorDetails {
    pub fn msg<M: Into<String>>(m: M) -> Self {
        ErrorDetails {
            message: m.into(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_cause(mut self, cause: ErrorDetails) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}
