//! Constructors for the hash containers used across the engine.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// A fresh, empty context map with the engine's standard hasher.
#[must_use]
pub fn new_context_map() -> FxHashMap<String, Value> {
    FxHashMap::default()
}
