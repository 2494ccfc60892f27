//! Concurrent superstep execution.
//!
//! The scheduler runs one superstep at a time: every node in the frontier
//! that has not yet executed this run is spawned as a task (bounded by a
//! semaphore), and their partial updates are collected for the barrier.

pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerError, SchedulerState, StepRunResult};
