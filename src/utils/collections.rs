//! Collection constructors shared by the crate and its tests.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Creates an empty state-value map with the crate's standard hasher.
#[must_use]
pub fn new_state_map() -> FxHashMap<String, Value> {
    FxHashMap::default()
}
