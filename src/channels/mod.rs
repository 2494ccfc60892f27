//! Versioned state channels.
//!
//! Run state is organized into independent channels, each carrying a payload
//! and a version number. Versions are bumped by the barrier only when a
//! channel's content actually changed, which gives downstream consumers a
//! cheap change-detection signal.
//!
//! Four channels exist:
//! - **messages** ([`MessagesChannel`]): conversation messages
//! - **context** ([`ContextChannel`]): named analysis fields, one writer each
//! - **trace** ([`TraceChannel`]): append-only log of executed node names
//! - **errors** ([`ErrorsChannel`]): recoverable error events

pub mod errors;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::message::Message;
use errors::ErrorEvent;

/// Common access surface shared by all versioned channels.
pub trait Channel {
    /// Payload type stored in the channel.
    type Payload: Clone;

    /// Mutable access to the payload. Versions are not bumped here; the
    /// barrier owns version accounting.
    fn get_mut(&mut self) -> &mut Self::Payload;

    /// A cloned, point-in-time copy of the payload.
    fn snapshot(&self) -> Self::Payload;

    /// Current channel version.
    fn version(&self) -> u32;

    /// Overwrite the channel version.
    fn set_version(&mut self, version: u32);
}

/// A payload paired with a version number.
///
/// New channels start at version 1. The barrier bumps the version once per
/// superstep in which the content changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedChannel<T> {
    payload: T,
    version: u32,
}

impl<T> VersionedChannel<T> {
    /// Create a channel with an explicit payload and version.
    pub fn new(payload: T, version: u32) -> Self {
        Self { payload, version }
    }
}

impl<T: Default> Default for VersionedChannel<T> {
    fn default() -> Self {
        Self {
            payload: T::default(),
            version: 1,
        }
    }
}

impl<T: Clone> Channel for VersionedChannel<T> {
    type Payload = T;

    fn get_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    fn snapshot(&self) -> T {
        self.payload.clone()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }
}

impl<T> VersionedChannel<Vec<T>> {
    /// Number of entries currently in the channel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the channel holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Conversation messages.
pub type MessagesChannel = VersionedChannel<Vec<Message>>;

/// Named analysis fields (one writer per field).
pub type ContextChannel = VersionedChannel<FxHashMap<String, Value>>;

/// Append-only log of executed node names.
pub type TraceChannel = VersionedChannel<Vec<String>>;

/// Recoverable error events.
pub type ErrorsChannel = VersionedChannel<Vec<ErrorEvent>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_start_at_version_one() {
        let channel = TraceChannel::default();
        assert_eq!(channel.version(), 1);
        assert!(channel.is_empty());
    }

    #[test]
    fn snapshot_is_independent_of_mutation() {
        let mut channel = TraceChannel::new(vec!["sensors".to_string()], 1);
        let snap = channel.snapshot();
        channel.get_mut().push("weather".to_string());
        assert_eq!(snap.len(), 1);
        assert_eq!(channel.len(), 2);
    }
}
