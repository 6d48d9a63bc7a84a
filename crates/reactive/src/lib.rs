//! Ripple Reactive - Live collections with automatic dependency tracking.
//!
//! This crate keeps derived sequences current. A collection reads an ordered
//! source, runs it through a chain of stages, and reconciles the result into
//! the sequence it exposes. Whenever the source changes, or a reactive value
//! read inside a stage changes, the chain is re-derived and subscribers are
//! notified once.
//!
//! # Core Concepts
//!
//! - `Observable<T>`: A reactive cell; reading it inside a capture records it
//! - `DependencyWatcher`: Keeps one subscription per source a callback read
//! - `LazyWrapper`: A callable that signals when what it last read changes
//! - `Collection`: Source plus stages plus a reconciled live snapshot
//!
//! # Key Features
//!
//! - `filter()` / `map()` / `pluck()` / `unique()` / `apply()`: chainable stages
//! - `Collection::keyed()`: surviving items keep their instance across updates
//! - `subscribe()`: one notification per change, with the new items
//!
//! # Example
//!
//! ```ignore
//! use ripple_reactive::{Collection, Observable, Value};
//!
//! let source = Observable::new(vec![
//!     Value::object([("message", Value::from("Howdy"))]),
//!     Value::object([("message", Value::from("Hi"))]),
//! ]);
//!
//! let messages = Collection::new(&source).pluck("message");
//! let _sub = messages.subscribe(|items| println!("{} messages", items.len()));
//!
//! source.push(Value::object([("message", Value::from("Hola"))]));
//! assert_eq!(messages.len(), 3);
//! ```
//!
//! Reactivity is single-threaded: handles are `Rc`-based and the capture
//! stack is thread-local.

pub mod capture;
pub mod collection;
pub mod observable;
pub mod source;
pub mod stage;
pub mod subscription;
pub mod watcher;
pub mod wrapper;

pub use capture::{untracked, Dependency, SourceId};
pub use collection::{Collection, CollectionBuilder, CollectionOptions};
pub use observable::Observable;
pub use source::SequenceSource;
pub use stage::{Stage, StageCache, StageId, StageKind};
pub use subscription::{ChangeCallback, Notifier, Subscription, SubscriptionId};
pub use watcher::DependencyWatcher;
pub use wrapper::{wrap, LazyWrapper};

// Re-export commonly used types from dependencies
pub use ripple_core::{Key, KeySelector, Snapshot, Value};
pub use ripple_incremental::{Patch, PatchOp};
