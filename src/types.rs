//! Core types for the Cropflow workflow engine.
//!
//! This module defines the fundamental identifiers used throughout the
//! system: [`NodeKind`] for nodes in a workflow graph and [`ChannelType`]
//! for the state channels a barrier can update.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `NodeKind` serves as the unique key for nodes in the execution graph.
/// `Start` and `End` are *virtual* endpoints: they are never registered or
/// executed, they only anchor the topology (entry edges leave `Start`,
/// terminal edges arrive at `End`).
///
/// # Examples
///
/// ```rust
/// use cropflow::types::NodeKind;
///
/// let sensors = NodeKind::Custom("sensors".to_string());
/// assert_eq!(sensors.encode(), "Custom:sensors");
/// assert_eq!(NodeKind::decode("Custom:sensors"), sensors);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Virtual entry point. Edges out of `Start` define where a run begins.
    Start,

    /// Virtual terminal. Edges into `End` mark the workflow's exit points.
    End,

    /// An executable node identified by a user-defined name.
    Custom(String),
}

impl NodeKind {
    /// Encode a `NodeKind` into its persisted string form.
    ///
    /// - `Start` → `"Start"`
    /// - `End` → `"End"`
    /// - `Custom("x")` → `"Custom:x"`
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(s) => format!("Custom:{s}"),
        }
    }

    /// Decode a persisted string form back into a `NodeKind`.
    ///
    /// Unrecognized formats fall back to `Custom(s)` for forward
    /// compatibility.
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeKind::Start
        } else if s == "End" {
            NodeKind::End
        } else if let Some(rest) = s.strip_prefix("Custom:") {
            NodeKind::Custom(rest.to_string())
        } else {
            NodeKind::Custom(s.to_string())
        }
    }

    /// Returns `true` if this is the virtual [`Start`](Self::Start) node.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` if this is the virtual [`End`](Self::End) node.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` if this is an executable custom node.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

// Developer experience: allow string literals where a NodeKind is expected.
impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

/// Identifies a state channel for merge dispatch.
///
/// Each channel type has its own reducer and update semantics: messages and
/// trace and errors are append-only, context is a shallow map union.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// Conversation messages flowing through the run.
    Message,

    /// Named analysis fields shared between nodes (one writer per field).
    Context,

    /// Append-only log of executed node names.
    Trace,

    /// Recoverable error events collected during the run.
    Error,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::Context => write!(f, "context"),
            Self::Trace => write!(f, "trace"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        for kind in [
            NodeKind::Start,
            NodeKind::End,
            NodeKind::Custom("sensors".into()),
        ] {
            assert_eq!(NodeKind::decode(&kind.encode()), kind);
        }
    }

    #[test]
    fn from_str_maps_virtual_endpoints() {
        assert_eq!(NodeKind::from("Start"), NodeKind::Start);
        assert_eq!(NodeKind::from("End"), NodeKind::End);
        assert_eq!(
            NodeKind::from("weather"),
            NodeKind::Custom("weather".to_string())
        );
    }
}
