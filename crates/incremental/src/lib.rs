//! Ripple Incremental - Keyed reconciliation for Ripple collections.
//!
//! This crate holds the pure, non-reactive half of a live collection: the
//! per-stage snapshot operators, a positional memo that lets a stage skip
//! unchanged items, and the reconciler that patches the exposed snapshot
//! instead of replacing it.
//!
//! # Core Concepts
//!
//! - `Patch` / `PatchOp`: The ordered edits applied by one reconciliation
//! - `Memo<R>`: Per-position inputs and outputs of one stage run
//!
//! # Operators
//!
//! - `filter_snapshot`: Keeps items matching a predicate, with their keys
//! - `map_snapshot` / `pluck_snapshot`: Transforms items, keys unchanged
//! - `unique_snapshot`: Drops structural duplicates, and the keys
//! - `reconcile`: Remove, insert, move, then update
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{KeySelector, Snapshot, Value};
//! use ripple_incremental::reconcile;
//!
//! let selector = KeySelector::field("id");
//! let item = |id: i64, v: &str| Value::object([("id", Value::Int(id)), ("v", Value::from(v))]);
//!
//! let mut live = Snapshot::select(vec![item(1, "A"), item(2, "B")], Some(&selector));
//! let kept = live.values()[1].clone();
//!
//! let next = Snapshot::select(vec![item(1, "Updated"), item(2, "B")], Some(&selector));
//! let patch = reconcile(&mut live, &next);
//!
//! assert_eq!(patch.updated(), 1);
//! assert!(live.values()[1].ptr_eq(&kept));
//! ```

#![no_std]

extern crate alloc;

pub mod memo;
pub mod operators;
pub mod patch;
pub mod reconcile;

pub use memo::{memoize, Memo};
pub use operators::{filter_snapshot, map_snapshot, pluck_snapshot, unique_snapshot};
pub use patch::{Patch, PatchOp};
pub use reconcile::{insert_items, move_items, reconcile, remove_items, update_items};
