use super::Reducer;
use crate::{channels::Channel, node::NodePartial, state::RunState};

/// Context merge: shallow map union. Field ownership is one writer per
/// field, so concurrent partials never collide on a key.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct MapMerge;
impl Reducer for MapMerge {
    fn apply(&self, state: &mut RunState, update: &NodePartial) {
        if let Some(context_update) = &update.context
            && !context_update.is_empty()
        {
            let state_map = state.context.get_mut();
            for (k, v) in context_update.iter() {
                state_map.insert(k.clone(), v.clone());
            }
        }
    }
}
