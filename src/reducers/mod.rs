mod add_errors;
mod add_messages;
mod append_trace;
mod map_merge;
mod reducer_registry;

pub use add_errors::AddErrors;
pub use add_messages::AddMessages;
pub use append_trace::AppendTrace;
pub use map_merge::MapMerge;
pub use reducer_registry::*;

use crate::node::NodePartial;
use crate::state::RunState;
use crate::types::ChannelType;
use std::fmt;

/// Unified reducer trait: every reducer mutates `RunState` using a
/// `NodePartial` delta. Channels implemented: messages (append), context
/// (shallow map union), trace (list concatenation), errors (append).
pub trait Reducer: Send + Sync {
    fn apply(&self, state: &mut RunState, update: &NodePartial);
}

#[derive(Debug)]
pub enum ReducerError {
    UnknownChannel(ChannelType),

    Apply {
        channel: ChannelType,
        message: String,
    },
}

impl fmt::Display for ReducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReducerError::UnknownChannel(channel) => {
                write!(f, "no reducers registered for channel: {channel:?}")
            }
            ReducerError::Apply { channel, message } => {
                write!(f, "reducer apply failed for channel {channel:?}: {message}")
            }
        }
    }
}

impl std::error::Error for ReducerError {}
