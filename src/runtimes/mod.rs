//! Workflow runtime: the superstep loop and its configuration.
//!
//! The runtime layer drives a compiled [`App`](crate::app::App) against one
//! run state. [`WorkflowRunner`] computes the ready set each superstep (all
//! upstreams complete, not yet run), hands it to the scheduler, and applies
//! the barrier — repeating until no node is eligible.

pub mod runner;
pub mod runtime_config;

pub use runner::{RunnerError, WorkflowRunner};
pub use runtime_config::{EventBusConfig, RuntimeConfig, SinkConfig};
