use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::channels::Channel;
use crate::channels::errors::{ErrorEvent, ErrorScope};
use crate::event_bus::EventBus;
use crate::message::Message;
use crate::node::{Node, NodePartial};
use crate::reducers::ReducerRegistry;
use crate::runtimes::runner::{RunnerError, WorkflowRunner};
use crate::runtimes::RuntimeConfig;
use crate::state::RunState;
use crate::types::NodeKind;
use crate::utils::collections::new_context_map;
use tracing::instrument;

/// The compiled, immutable workflow plan.
///
/// `App` holds the validated graph topology (node registry, forward edges,
/// and a precomputed reverse-dependency map), the reducer registry that
/// merges node partials, and the runtime configuration. It is `Clone` and
/// safe to share across concurrent runs: each run operates on its own
/// [`RunState`] and event bus.
///
/// # Examples
///
/// ```rust,no_run
/// use cropflow::graphs::GraphBuilder;
/// use cropflow::state::RunState;
/// use cropflow::types::NodeKind;
///
/// # struct MyNode;
/// # #[async_trait::async_trait]
/// # impl cropflow::node::Node for MyNode {
/// #     async fn run(&self, _: cropflow::state::StateSnapshot, _: cropflow::node::NodeContext) -> Result<cropflow::node::NodePartial, cropflow::node::NodeError> {
/// #         Ok(cropflow::node::NodePartial::default())
/// #     }
/// # }
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let app = GraphBuilder::new()
///     .add_node(NodeKind::Custom("process".into()), MyNode)
///     .add_edge(NodeKind::Start, NodeKind::Custom("process".into()))
///     .add_edge(NodeKind::Custom("process".into()), NodeKind::End)
///     .compile()?;
///
/// let final_state = app.invoke(RunState::new_with_user_message("Hello")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct App {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    upstreams: FxHashMap<NodeKind, Vec<NodeKind>>,
    reducer_registry: ReducerRegistry,
    runtime_config: RuntimeConfig,
}

/// Result of applying node partials at a barrier.
///
/// Channel updates and error events are reported in a deterministic order so
/// downstream consumers observe stable behaviour across executions.
#[derive(Debug, Clone, Default)]
pub struct BarrierOutcome {
    /// Channel identifiers that were updated during the barrier.
    pub updated_channels: Vec<&'static str>,
    /// Aggregated error events emitted by nodes in the superstep.
    pub errors: Vec<ErrorEvent>,
}

impl App {
    /// Internal (crate) factory to build an App while keeping the registries
    /// private. The reverse-dependency map is derived here once; the runner
    /// reads it on every superstep to gate fan-in eligibility.
    pub(crate) fn from_parts(
        nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
        edges: FxHashMap<NodeKind, Vec<NodeKind>>,
        runtime_config: RuntimeConfig,
    ) -> Self {
        let mut upstreams: FxHashMap<NodeKind, Vec<NodeKind>> = FxHashMap::default();
        for (from, targets) in &edges {
            for to in targets {
                if to.is_custom() {
                    let entry = upstreams.entry(to.clone()).or_default();
                    if !entry.contains(from) {
                        entry.push(from.clone());
                    }
                }
            }
        }
        for list in upstreams.values_mut() {
            list.sort_by_key(|k| k.encode());
        }

        App {
            nodes,
            edges,
            upstreams,
            reducer_registry: ReducerRegistry::default(),
            runtime_config,
        }
    }

    /// The node registry, keyed by `NodeKind`.
    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<NodeKind, Arc<dyn Node>> {
        &self.nodes
    }

    /// The forward edges of the graph.
    #[must_use]
    pub fn edges(&self) -> &FxHashMap<NodeKind, Vec<NodeKind>> {
        &self.edges
    }

    /// The reverse-dependency map: for each custom node, the nodes that must
    /// complete before it becomes eligible (`Start` counts as complete).
    #[must_use]
    pub fn upstreams(&self) -> &FxHashMap<NodeKind, Vec<NodeKind>> {
        &self.upstreams
    }

    /// The runtime configuration.
    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    /// Execute the workflow to completion against a fresh run state.
    ///
    /// This is the primary entry point for running a compiled graph. It
    /// builds the event bus described by the runtime configuration, drives
    /// supersteps until no node is eligible, and returns the final
    /// accumulated state.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when a node fails fatally or the graph has no
    /// entry edges.
    #[instrument(skip(self, initial_state), err)]
    pub async fn invoke(&self, initial_state: RunState) -> Result<RunState, RunnerError> {
        let event_bus = self.runtime_config.event_bus.build_event_bus();
        let runner = WorkflowRunner::with_bus(Arc::new(self.clone()), event_bus);
        runner.run(initial_state).await
    }

    /// Execute the workflow while capturing events through an in-memory sink.
    ///
    /// Convenience for tests and diagnostics; the returned sink holds every
    /// event emitted during the run.
    pub async fn invoke_with_memory_sink(
        &self,
        initial_state: RunState,
    ) -> (Result<RunState, RunnerError>, crate::event_bus::MemorySink) {
        let sink = crate::event_bus::MemorySink::new();
        let event_bus = EventBus::with_sink(sink.clone());
        let runner = WorkflowRunner::with_bus(Arc::new(self.clone()), event_bus);
        let result = runner.run(initial_state).await;
        (result, sink)
    }

    /// Merge node outputs and apply state reductions after a superstep.
    ///
    /// Aggregates messages, context fields, trace entries and errors from
    /// all partials of the superstep, applies the registered reducers, and
    /// bumps channel versions only where content changed. Context keys are
    /// applied in sorted order and errors are sorted by scope, timestamp and
    /// message so merge results never depend on completion order.
    #[instrument(skip(self, state, run_ids, node_partials), err)]
    pub async fn apply_barrier(
        &self,
        state: &mut RunState,
        run_ids: &[NodeKind],
        node_partials: Vec<NodePartial>,
    ) -> Result<BarrierOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let mut messages_all: Vec<Message> = Vec::new();
        let mut context_all = new_context_map();
        let mut trace_all: Vec<String> = Vec::new();
        let mut errors_all: Vec<ErrorEvent> = Vec::new();

        for (i, partial) in node_partials.iter().enumerate() {
            let fallback = NodeKind::Custom("?".to_string());
            let nid = run_ids.get(i).unwrap_or(&fallback);

            if let Some(ms) = &partial.messages
                && !ms.is_empty()
            {
                tracing::debug!(node = %nid, count = ms.len(), "node produced messages");
                messages_all.extend(ms.clone());
            }

            if let Some(cx) = &partial.context
                && !cx.is_empty()
            {
                tracing::debug!(node = %nid, keys = cx.len(), "node produced context");
                // Sort keys to keep the merged map deterministic across runs.
                let mut sorted_pairs: Vec<_> = cx.iter().collect();
                sorted_pairs.sort_by(|(left, _), (right, _)| left.cmp(right));
                for (k, v) in sorted_pairs {
                    context_all.insert(k.clone(), v.clone());
                }
            }

            if let Some(tr) = &partial.trace
                && !tr.is_empty()
            {
                trace_all.extend(tr.iter().cloned());
            }

            if let Some(errs) = &partial.errors
                && !errs.is_empty()
            {
                tracing::debug!(node = %nid, count = errs.len(), "node produced errors");
                errors_all.extend(errs.clone());
            }
        }

        fn scope_sort_key(scope: &ErrorScope) -> (u8, &str, u64) {
            match scope {
                ErrorScope::Node { kind, step } => (0, kind.as_str(), *step),
                ErrorScope::Scheduler { step } => (1, "", *step),
                ErrorScope::Runner { step } => (2, "", *step),
                ErrorScope::App => (3, "", 0),
            }
        }

        // Sort aggregated errors so downstream consumers observe a stable order.
        errors_all.sort_by(|a, b| {
            let key_a = scope_sort_key(&a.scope);
            let key_b = scope_sort_key(&b.scope);
            key_a
                .cmp(&key_b)
                .then_with(|| a.when.cmp(&b.when))
                .then_with(|| a.error.message.cmp(&b.error.message))
        });

        let merged_updates = NodePartial {
            messages: (!messages_all.is_empty()).then_some(messages_all),
            context: (!context_all.is_empty()).then_some(context_all),
            trace: (!trace_all.is_empty()).then_some(trace_all),
            errors: (!errors_all.is_empty()).then(|| errors_all.clone()),
        };

        // Record before-states for version bump decisions.
        let messages_before_len = state.messages.len();
        let messages_before_ver = state.messages.version();
        let context_before = state.context.snapshot();
        let context_before_ver = state.context.version();
        let trace_before_len = state.trace.len();
        let trace_before_ver = state.trace.version();
        let errors_before_len = state.errors.len();
        let errors_before_ver = state.errors.version();

        // Apply reducers (they do NOT bump versions).
        self.reducer_registry.apply_all(&mut *state, &merged_updates)?;

        // Detect changes and bump versions per channel.
        let mut updated: Vec<&'static str> = Vec::new();

        if state.messages.len() != messages_before_len {
            state
                .messages
                .set_version(messages_before_ver.saturating_add(1));
            tracing::debug!(
                channel = "messages",
                before = messages_before_len,
                after = state.messages.len(),
                version = state.messages.version(),
                "channel updated"
            );
            updated.push("messages");
        }

        if state.context.snapshot() != context_before {
            state
                .context
                .set_version(context_before_ver.saturating_add(1));
            tracing::debug!(
                channel = "context",
                before = context_before.len(),
                version = state.context.version(),
                "channel updated"
            );
            updated.push("context");
        }

        if state.trace.len() != trace_before_len {
            state.trace.set_version(trace_before_ver.saturating_add(1));
            updated.push("trace");
        }

        if state.errors.len() != errors_before_len {
            state
                .errors
                .set_version(errors_before_ver.saturating_add(1));
            updated.push("errors");
        }

        Ok(BarrierOutcome {
            updated_channels: updated,
            errors: errors_all,
        })
    }
}
