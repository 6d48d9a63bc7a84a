//! Snapshot map and pluck operators.

use alloc::vec::Vec;
use ripple_core::{Snapshot, Value};

/// Applies `mapper(item, index)` to every item.
///
/// The output has the same length and order as the input, and the same keys.
pub fn map_snapshot<F>(input: &Snapshot, mut mapper: F) -> Snapshot
where
    F: FnMut(&Value, usize) -> Value,
{
    let values: Vec<Value> = input
        .values()
        .iter()
        .enumerate()
        .map(|(index, value)| mapper(value, index))
        .collect();
    Snapshot::from_parts(values, input.keys().map(|k| k.to_vec()))
}

/// Projects the named field of every item; missing fields become `Null`.
pub fn pluck_snapshot(input: &Snapshot, field: &str) -> Snapshot {
    map_snapshot(input, |value, _| value.field(field))
}
