//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod nodes;
pub mod providers;

pub use nodes::*;
pub use providers::*;

use cropflow::state::RunState;

/// Run state seeded with one user message.
pub fn state_with_user(text: &str) -> RunState {
    RunState::new_with_user_message(text)
}
