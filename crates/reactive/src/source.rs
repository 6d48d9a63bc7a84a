//! Sources a collection can be built from.

use crate::observable::Observable;
use crate::subscription::Subscription;
use ripple_core::Value;
use std::rc::Rc;

/// An ordered sequence of values that announces its changes.
pub trait SequenceSource {
    /// Returns the current items without registering a dependency.
    fn peek_values(&self) -> Vec<Value>;

    /// Calls `listener` after every change until the subscription is dropped.
    fn watch_values(&self, listener: Rc<dyn Fn()>) -> Subscription;
}

impl SequenceSource for Observable<Vec<Value>> {
    fn peek_values(&self) -> Vec<Value> {
        self.peek()
    }

    fn watch_values(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.subscribe(move |_| listener())
    }
}
