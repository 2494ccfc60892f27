use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

use crate::event_bus::Event;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Executes the nodes of one superstep concurrently.
///
/// Nodes are spawned as tokio tasks against a shared semaphore so at most
/// `concurrency_limit` run at once. `ran_nodes` preserves scheduling order
/// (frontier order after gating) regardless of completion order.
#[derive(Clone, Debug)]
pub struct Scheduler {
    concurrency_limit: usize,
}

/// Per-run bookkeeping carried between supersteps.
///
/// `completed` is the at-most-once guard: a node that appears here is never
/// scheduled again within the same run. It doubles as the eligibility input
/// for fan-in gating in the runner.
#[derive(Clone, Debug, Default)]
pub struct SchedulerState {
    /// Nodes that finished successfully this run.
    pub completed: FxHashSet<NodeKind>,
}

/// Outcome of one superstep.
#[derive(Debug, Default)]
pub struct StepRunResult {
    /// Nodes that executed, in scheduling order.
    pub ran_nodes: Vec<NodeKind>,
    /// Frontier entries that were gated out (virtual endpoints, repeats).
    pub skipped_nodes: Vec<NodeKind>,
    /// Partial updates per executed node, aligned with `ran_nodes`.
    pub outputs: Vec<(NodeKind, NodePartial)>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    /// A node returned a fatal error.
    #[error("node {kind} failed at step {step}: {source}")]
    #[diagnostic(code(cropflow::scheduler::node_run))]
    NodeRun {
        kind: NodeKind,
        step: u64,
        #[source]
        source: NodeError,
    },

    /// The frontier referenced a node missing from the registry.
    #[error("frontier references unregistered node {kind}")]
    #[diagnostic(
        code(cropflow::scheduler::unregistered),
        help("Compile-time validation should prevent this; the graph and frontier disagree.")
    )]
    UnregisteredNode { kind: NodeKind },

    /// A spawned node task panicked or was cancelled.
    #[error("node task join error: {0}")]
    #[diagnostic(code(cropflow::scheduler::join))]
    Join(#[from] JoinError),
}

impl Scheduler {
    /// Create a scheduler with the given concurrency limit (minimum 1).
    #[must_use]
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    /// Whether a frontier entry should execute: custom nodes only, and at
    /// most once per run.
    #[must_use]
    pub fn should_run(&self, state: &SchedulerState, kind: &NodeKind) -> bool {
        kind.is_custom() && !state.completed.contains(kind)
    }

    /// Execute one superstep over the given frontier.
    ///
    /// Every eligible node runs concurrently against the same immutable
    /// snapshot. Successful nodes are recorded in `state.completed`; a fatal
    /// node error aborts the superstep and surfaces as
    /// [`SchedulerError::NodeRun`].
    pub async fn superstep(
        &self,
        state: &mut SchedulerState,
        nodes: &FxHashMap<NodeKind, Arc<dyn Node>>,
        frontier: Vec<NodeKind>,
        snapshot: StateSnapshot,
        step: u64,
        event_sender: flume::Sender<Event>,
    ) -> Result<StepRunResult, SchedulerError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut ran_nodes: Vec<NodeKind> = Vec::new();
        let mut skipped_nodes: Vec<NodeKind> = Vec::new();
        let mut handles: Vec<JoinHandle<Result<NodePartial, NodeError>>> = Vec::new();

        for kind in frontier {
            if !self.should_run(state, &kind) {
                skipped_nodes.push(kind);
                continue;
            }

            let node = nodes
                .get(&kind)
                .cloned()
                .ok_or_else(|| SchedulerError::UnregisteredNode { kind: kind.clone() })?;
            let ctx = NodeContext {
                node_id: kind.to_string(),
                step,
                event_bus_sender: event_sender.clone(),
            };
            let task_snapshot = snapshot.clone();
            let permits = semaphore.clone();

            tracing::debug!(node = %kind, step, "scheduling node");
            let handle = tokio::spawn(async move {
                // The semaphore only closes when dropped; a failed acquire
                // just means we run unthrottled during shutdown.
                let _permit = permits.acquire_owned().await.ok();
                node.run(task_snapshot, ctx).await
            });
            ran_nodes.push(kind);
            handles.push(handle);
        }

        let mut outputs: Vec<(NodeKind, NodePartial)> = Vec::with_capacity(handles.len());
        for (kind, handle) in ran_nodes.iter().zip(handles) {
            match handle.await {
                Ok(Ok(partial)) => {
                    state.completed.insert(kind.clone());
                    outputs.push((kind.clone(), partial));
                }
                Ok(Err(source)) => {
                    return Err(SchedulerError::NodeRun {
                        kind: kind.clone(),
                        step,
                        source,
                    });
                }
                Err(join_error) => return Err(SchedulerError::Join(join_error)),
            }
        }

        Ok(StepRunResult {
            ran_nodes,
            skipped_nodes,
            outputs,
        })
    }
}
