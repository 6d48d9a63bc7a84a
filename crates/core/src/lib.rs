//! Ripple Core - Values, keys and snapshots for Ripple reactive collections.
//!
//! This crate provides the foundational types shared by the Ripple crates:
//!
//! - `Value`: Dynamic items carried through collection pipelines
//! - `PlainValue`: Items that project themselves to a plain `Value`
//! - `Key` / `KeySelector`: Per-item identity of keyed collections
//! - `Snapshot`: Paired (values, keys) state of a collection at one instant
//! - `Error`: Error types for snapshot construction
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{Key, KeySelector, Snapshot, Value};
//!
//! let items = vec![
//!     Value::object([("id", Value::Int(1)), ("v", Value::from("A"))]),
//!     Value::object([("id", Value::Int(2)), ("v", Value::from("B"))]),
//! ];
//!
//! let snap = Snapshot::select(items, Some(&KeySelector::field("id")));
//! assert_eq!(snap.key_at(1), Some(&Key::Int(2)));
//! assert_eq!(snap.values()[0].field("v"), Value::from("A"));
//! ```

#![no_std]

extern crate alloc;

mod error;
mod key;
mod snapshot;
mod value;

pub use error::{Error, Result};
pub use key::{Key, KeySelector};
pub use snapshot::Snapshot;
pub use value::{PlainValue, Record, Value};
