//! Snapshot operators for collection stages.
//!
//! This module provides the pure per-stage transforms:
//! - Filter: keeps items matching a predicate, with their keys
//! - Map: transforms each item, keys unchanged
//! - Pluck: projects one named field of each item
//! - Unique: drops structurally duplicate items

mod filter;
mod map;
mod unique;

pub use filter::filter_snapshot;
pub use map::{map_snapshot, pluck_snapshot};
pub use unique::unique_snapshot;
