use super::Reducer;
use crate::{channels::Channel, node::NodePartial, state::RunState};

/// Trace merge: list concatenation. Associative and order-insensitive beyond
/// "all entries present", which is what makes concurrent writers safe.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct AppendTrace;
impl Reducer for AppendTrace {
    fn apply(&self, state: &mut RunState, update: &NodePartial) {
        if let Some(trace_update) = &update.trace
            && !trace_update.is_empty()
        {
            state.trace.get_mut().extend(trace_update.iter().cloned());
        }
    }
}
