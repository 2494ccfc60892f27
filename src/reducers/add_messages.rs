use super::Reducer;
use crate::{channels::Channel, node::NodePartial, state::RunState};

#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct AddMessages;
impl Reducer for AddMessages {
    fn apply(&self, state: &mut RunState, update: &NodePartial) {
        if let Some(messages_update) = &update.messages
            && !messages_update.is_empty()
        {
            state.messages.get_mut().extend(messages_update.clone());
        }
    }
}
