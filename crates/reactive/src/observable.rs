//! Observable cell implementation.
//!
//! `Observable<T>` is the reactive source the rest of the crate is built on:
//! a shared value whose tracked reads register a dependency with the current
//! capture frame, and whose writes notify subscribers.

use crate::capture::{self, Dependency, SourceId};
use crate::subscription::{Notifier, Subscription};
use ripple_core::{PlainValue, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

struct ObservableInner<T> {
    id: SourceId,
    value: RefCell<T>,
    version: Cell<u64>,
    notifier: Notifier<T>,
}

impl<T: Clone + 'static> Dependency for ObservableInner<T> {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version.get()
    }

    fn watch(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.notifier.subscribe(move |_| listener())
    }
}

/// A shared reactive value.
///
/// Cloning yields another handle to the same cell.
///
/// # Example
///
/// ```ignore
/// use ripple_reactive::Observable;
///
/// let count = Observable::new(1);
/// let sub = count.subscribe(|v| println!("count is now {}", v));
///
/// count.set(2); // notifies
/// count.set(2); // same value, no notification
/// ```
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Creates a new cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                id: capture::next_source_id(),
                value: RefCell::new(value),
                version: Cell::new(0),
                notifier: Notifier::new(),
            }),
        }
    }

    /// Returns the current value and registers a dependency.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Returns the current value without registering a dependency.
    pub fn peek(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Reads the current value by reference and registers a dependency.
    ///
    /// The cell is borrowed while `f` runs; writing to it from `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&*self.inner.value.borrow())
    }

    /// Stores `value` and notifies, unless it equals the current value.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        let same = capture::untracked(|| *self.inner.value.borrow() == value);
        if same {
            return;
        }
        *self.inner.value.borrow_mut() = value;
        self.publish();
    }

    /// Stores `value`, always notifies, and returns the previous value.
    pub fn replace(&self, value: T) -> T {
        let previous = std::mem::replace(&mut *self.inner.value.borrow_mut(), value);
        self.publish();
        previous
    }

    /// Mutates the value in place and always notifies.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.inner.value.borrow_mut());
        self.publish();
    }

    /// Subscribes to every change of the value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.inner.notifier.subscribe(callback)
    }

    /// Number of writes that notified so far.
    #[inline]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    #[inline]
    pub fn subscriber_count(&self) -> usize {
        self.inner.notifier.len()
    }

    #[inline]
    pub fn source_id(&self) -> SourceId {
        self.inner.id
    }

    fn track(&self) {
        capture::record(self.inner.id, || {
            Rc::clone(&self.inner) as Rc<dyn Dependency>
        });
    }

    fn publish(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
        let value = self.inner.value.borrow().clone();
        self.inner.notifier.notify(&value);
    }
}

impl<T: Clone + 'static> Observable<Vec<T>> {
    /// Appends an item and notifies.
    pub fn push(&self, item: T) {
        self.update(|items| items.push(item));
    }

    /// Inserts an item at `index` (clamped to the length) and notifies.
    pub fn insert(&self, index: usize, item: T) {
        self.update(|items| {
            let index = index.min(items.len());
            items.insert(index, item);
        });
    }

    /// Removes the item at `index`. Notifies only if an item was removed.
    pub fn remove_at(&self, index: usize) -> Option<T> {
        if index >= self.inner.value.borrow().len() {
            return None;
        }
        let removed = self.inner.value.borrow_mut().remove(index);
        self.publish();
        Some(removed)
    }

    /// Returns the length and registers a dependency.
    pub fn len(&self) -> usize {
        self.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + 'static> Dependency for Observable<T> {
    fn source_id(&self) -> SourceId {
        self.inner.id
    }

    fn version(&self) -> u64 {
        self.inner.version.get()
    }

    fn watch(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.inner.watch(listener)
    }
}

impl PlainValue for Observable<Value> {
    fn plain_value(&self) -> Value {
        self.get()
    }
}

impl From<Observable<Value>> for Value {
    fn from(cell: Observable<Value>) -> Self {
        Value::dynamic(cell)
    }
}

impl<T: Default + Clone + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("value", &self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<usize>>, impl Fn(&i32) + 'static) {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        (count, move |_: &i32| count_clone.set(count_clone.get() + 1))
    }

    #[test]
    fn test_observable_get_set() {
        let obs = Observable::new(1);
        assert_eq!(obs.get(), 1);

        obs.set(2);
        assert_eq!(obs.peek(), 2);
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn test_observable_set_same_value_is_noop() {
        let obs = Observable::new(5);
        let (count, callback) = counter();
        let _sub = obs.subscribe(callback);

        obs.set(5);
        assert_eq!(count.get(), 0);
        assert_eq!(obs.version(), 0);

        obs.set(6);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_observable_replace_always_notifies() {
        let obs = Observable::new(5);
        let (count, callback) = counter();
        let _sub = obs.subscribe(callback);

        assert_eq!(obs.replace(5), 5);
        obs.update(|v| *v += 1);

        assert_eq!(count.get(), 2);
        assert_eq!(obs.peek(), 6);
    }

    #[test]
    fn test_observable_subscriber_sees_new_value() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        let _sub = obs.subscribe(move |v| seen_clone.set(*v));

        obs.set(42);
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn test_observable_get_is_tracked() {
        let obs = Observable::new(1);
        let (_, deps) = capture::collect(|| obs.get());
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source_id(), obs.source_id());

        let (_, deps) = capture::collect(|| obs.peek());
        assert!(deps.is_empty());
    }

    #[test]
    fn test_observable_vec_helpers() {
        let obs = Observable::new(vec![1, 2, 3]);
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let _sub = obs.subscribe(move |_| count_clone.set(count_clone.get() + 1));

        obs.push(4);
        obs.insert(0, 0);
        obs.insert(100, 5);
        assert_eq!(obs.remove_at(1), Some(1));
        assert_eq!(obs.remove_at(10), None);

        assert_eq!(obs.peek(), vec![0, 2, 3, 4, 5]);
        assert_eq!(obs.len(), 5);
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn test_observable_as_plain_value() {
        let cell = Observable::new(Value::Int(1));
        let item = Value::object([("count", Value::from(cell.clone()))]);

        assert_eq!(item.field("count").unwrap_plain(), Value::Int(1));

        let (_, deps) = capture::collect(|| item.field("count").unwrap_plain());
        assert_eq!(deps.len(), 1);

        cell.set(Value::Int(2));
        assert_eq!(item, Value::object([("count", Value::Int(2))]));
    }

    #[test]
    fn test_observable_subscription_drop() {
        let obs = Observable::new(0);
        {
            let _sub = obs.subscribe(|_| {});
            assert_eq!(obs.subscriber_count(), 1);
        }
        assert_eq!(obs.subscriber_count(), 0);
    }
}
