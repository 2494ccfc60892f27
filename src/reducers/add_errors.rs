use super::Reducer;
use crate::{channels::Channel, node::NodePartial, state::RunState};

#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct AddErrors;
impl Reducer for AddErrors {
    fn apply(&self, state: &mut RunState, update: &NodePartial) {
        if let Some(errors_update) = &update.errors
            && !errors_update.is_empty()
        {
            state.errors.get_mut().extend(errors_update.iter().cloned());
        }
    }
}
