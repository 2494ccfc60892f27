//! In-process event bus for run observability.
//!
//! Nodes and the runner emit structured [`Event`]s through a shared flume
//! channel; a background listener broadcasts them to every registered
//! [`EventSink`] (stdout, memory, channel forwarding).

mod bus;
mod event;
mod sink;

pub use bus::EventBus;
pub use event::{DiagnosticEvent, Event, NodeEvent};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
