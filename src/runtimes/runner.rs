use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::instrument;

use crate::app::App;
use crate::event_bus::{Event, EventBus};
use crate::node::NodePartial;
use crate::schedulers::{Scheduler, SchedulerError, SchedulerState};
use crate::state::RunState;
use crate::types::NodeKind;
use crate::utils::id_generator::IdGenerator;

/// Drives one compiled workflow to completion.
///
/// The runner owns the event bus for its runs and executes the superstep
/// loop: compute the ready set, run it concurrently through the scheduler,
/// merge partials at the barrier, repeat. A node enters the ready set only
/// when **all** of its upstream dependencies have completed, which is what
/// makes multi-upstream fan-in (the synthesis node) observe every branch
/// result.
pub struct WorkflowRunner {
    app: Arc<App>,
    event_bus: EventBus,
}

#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The graph declares no edges out of Start.
    #[error("no nodes to run from Start (empty entry)")]
    #[diagnostic(
        code(cropflow::runner::no_entry),
        help("Add edges from NodeKind::Start; compile-time validation normally catches this.")
    )]
    NoEntryNodes,

    /// A node failed fatally during a superstep.
    #[error(transparent)]
    #[diagnostic(code(cropflow::runner::scheduler))]
    Scheduler(#[from] SchedulerError),

    /// The barrier failed to apply reducers.
    #[error("barrier error: {0}")]
    #[diagnostic(code(cropflow::runner::barrier))]
    Barrier(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl WorkflowRunner {
    /// Create a runner with the event bus described by the app's runtime
    /// configuration.
    #[must_use]
    pub fn new(app: Arc<App>) -> Self {
        let event_bus = app.runtime_config().event_bus.build_event_bus();
        Self::with_bus(app, event_bus)
    }

    /// Create a runner with a caller-provided event bus (per-run capture,
    /// test sinks). Starts the bus listener.
    #[must_use]
    pub fn with_bus(app: Arc<App>, event_bus: EventBus) -> Self {
        event_bus.listen_for_events();
        Self { app, event_bus }
    }

    /// Nodes eligible for the next superstep: registered, not yet run, and
    /// with every upstream completed. Sorted by name so scheduling order is
    /// deterministic.
    fn ready_nodes(&self, completed: &FxHashSet<NodeKind>) -> Vec<NodeKind> {
        let upstreams = self.app.upstreams();
        let mut ready: Vec<NodeKind> = self
            .app
            .nodes()
            .keys()
            .filter(|kind| !completed.contains(*kind))
            .filter(|kind| {
                upstreams.get(*kind).is_some_and(|ups| {
                    ups.iter().all(|up| up.is_start() || completed.contains(up))
                })
            })
            .cloned()
            .collect();
        ready.sort_by_key(|kind| kind.encode());
        ready
    }

    /// Run the workflow to completion and return the final state.
    ///
    /// The loop terminates when no node is eligible: in a validated graph
    /// that means every reachable node has executed, or a fatal node error
    /// aborted the run.
    #[instrument(skip(self, initial_state), err)]
    pub async fn run(&self, initial_state: RunState) -> Result<RunState, RunnerError> {
        let entry_is_empty = self
            .app
            .edges()
            .get(&NodeKind::Start)
            .map(|targets| targets.is_empty())
            .unwrap_or(true);
        if entry_is_empty {
            return Err(RunnerError::NoEntryNodes);
        }

        let run_id = IdGenerator::new().generate_run_id();
        tracing::info!(run_id = %run_id, "workflow run started");

        let concurrency_limit = self
            .app
            .runtime_config()
            .concurrency_limit
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });
        let scheduler = Scheduler::new(concurrency_limit);
        let mut scheduler_state = SchedulerState::default();
        let mut state = initial_state;
        let mut step: u64 = 0;

        loop {
            let frontier = self.ready_nodes(&scheduler_state.completed);
            if frontier.is_empty() {
                break;
            }
            step += 1;

            let schedule_span =
                tracing::info_span!("schedule", step, frontier_len = frontier.len());
            let snapshot = state.snapshot();
            let result = schedule_span
                .in_scope(|| {
                    scheduler.superstep(
                        &mut scheduler_state,
                        self.app.nodes(),
                        frontier,
                        snapshot,
                        step,
                        self.event_bus.get_sender(),
                    )
                })
                .await?;

            let partials: Vec<NodePartial> =
                result.outputs.into_iter().map(|(_, partial)| partial).collect();

            let barrier_span =
                tracing::info_span!("barrier", step, ran_nodes_len = result.ran_nodes.len());
            let outcome = barrier_span
                .in_scope(|| self.app.apply_barrier(&mut state, &result.ran_nodes, partials))
                .await
                .map_err(RunnerError::Barrier)?;

            tracing::debug!(
                step,
                updated_channels = ?outcome.updated_channels,
                error_count = outcome.errors.len(),
                "barrier applied"
            );
        }

        tracing::info!(run_id = %run_id, steps = step, "workflow run completed");
        let _ = self
            .event_bus
            .get_sender()
            .send(Event::diagnostic("run", format!("completed after {step} supersteps")));
        // Flush queued events into the sinks before the bus goes away.
        self.event_bus.stop_listener().await;

        Ok(state)
    }
}
