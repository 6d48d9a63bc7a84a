//! Structural deduplication.

use alloc::vec::Vec;
use ripple_core::{Snapshot, Value};

/// Drops every item deep-equal to an earlier one. The first occurrence wins.
///
/// Keys are dropped: the result is unkeyed.
pub fn unique_snapshot(input: &Snapshot) -> Snapshot {
    let mut values: Vec<Value> = Vec::with_capacity(input.len());
    for value in input.values() {
        if !values.iter().any(|seen| seen == value) {
            values.push(value.clone());
        }
    }
    Snapshot::new(values)
}
