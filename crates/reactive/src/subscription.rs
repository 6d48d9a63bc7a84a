//! Subscription management for reactive values.
//!
//! This module provides `Notifier`, the listener list shared by every
//! subscribable type in this crate, and `Subscription`, the guard that
//! removes a listener when it is disposed or dropped.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Unique identifier for a subscription within one notifier.
pub type SubscriptionId = u64;

/// Callback type for change notifications.
pub type ChangeCallback<T> = Box<dyn Fn(&T)>;

struct Listener<T: ?Sized> {
    active: Rc<Cell<bool>>,
    callback: ChangeCallback<T>,
}

impl<T: ?Sized> Listener<T> {
    fn notify(&self, value: &T) {
        if self.active.get() {
            (self.callback)(value);
        }
    }
}

struct NotifierInner<T: ?Sized> {
    listeners: RefCell<BTreeMap<SubscriptionId, Rc<Listener<T>>>>,
    next_id: Cell<SubscriptionId>,
}

impl<T: ?Sized> NotifierInner<T> {
    fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.listeners.borrow_mut().remove(&id);
        match removed {
            Some(listener) => {
                listener.active.set(false);
                true
            }
            None => false,
        }
    }
}

impl<T: ?Sized> Drop for NotifierInner<T> {
    fn drop(&mut self) {
        for listener in self.listeners.get_mut().values() {
            listener.active.set(false);
        }
    }
}

/// A list of listeners notified in registration order.
///
/// Cloning a notifier yields another handle to the same list. Dispatch works
/// on a snapshot of the list, so listeners may subscribe, unsubscribe or
/// dispose during a notification; a listener removed mid-dispatch is skipped.
pub struct Notifier<T: ?Sized> {
    inner: Rc<NotifierInner<T>>,
}

impl<T: ?Sized> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized + 'static> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> Notifier<T> {
    /// Creates a notifier with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(NotifierInner {
                listeners: RefCell::new(BTreeMap::new()),
                next_id: Cell::new(1),
            }),
        }
    }

    /// Subscribes to notifications with the given callback.
    ///
    /// The listener stays registered until the returned guard is disposed or
    /// dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let active = Rc::new(Cell::new(true));
        let listener = Rc::new(Listener {
            active: Rc::clone(&active),
            callback: Box::new(callback),
        });
        self.inner.listeners.borrow_mut().insert(id, listener);

        let weak: Weak<NotifierInner<T>> = Rc::downgrade(&self.inner);
        Subscription::new(id, active, move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(id);
            }
        })
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    /// Notifies all active listeners.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Rc<Listener<T>>> =
            self.inner.listeners.borrow().values().cloned().collect();
        for listener in snapshot {
            listener.notify(value);
        }
    }

    /// Returns the number of registered listeners.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Returns true if there are no listeners.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.listeners.borrow().is_empty()
    }

    /// Returns all subscription IDs in registration order.
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.inner.listeners.borrow().keys().copied().collect()
    }

    /// Removes every listener.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.inner.listeners.borrow_mut());
        for listener in removed.values() {
            listener.active.set(false);
        }
    }
}

impl<T: ?Sized> fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

/// A registered listener.
///
/// Dropping the guard unsubscribes. Call [`Subscription::detach`] to keep
/// the listener for as long as its notifier lives.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriptionId,
    active: Rc<Cell<bool>>,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new<F>(id: SubscriptionId, active: Rc<Cell<bool>>, release: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            id,
            active,
            release: Some(Box::new(release)),
        }
    }

    /// Creates a guard that holds nothing.
    pub fn empty() -> Self {
        Self {
            id: 0,
            active: Rc::new(Cell::new(false)),
            release: None,
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns whether the listener is still registered.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Removes the listener. Calling this more than once has no effect.
    pub fn dispose(&mut self) {
        self.active.set(false);
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Forgets the guard without unsubscribing.
    pub fn detach(mut self) {
        self.release = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_subscribe() {
        let notifier: Notifier<i32> = Notifier::new();

        let sub1 = notifier.subscribe(|_| {});
        let sub2 = notifier.subscribe(|_| {});

        assert_eq!(sub1.id(), 1);
        assert_eq!(sub2.id(), 2);
        assert_eq!(notifier.len(), 2);
        assert_eq!(notifier.subscription_ids(), vec![1, 2]);
    }

    #[test]
    fn test_notifier_notify_in_order() {
        let notifier: Notifier<i32> = Notifier::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s1 = seen.clone();
        let _a = notifier.subscribe(move |v| s1.borrow_mut().push(("a", *v)));
        let s2 = seen.clone();
        let _b = notifier.subscribe(move |v| s2.borrow_mut().push(("b", *v)));

        notifier.notify(&7);

        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_subscription_dispose() {
        let notifier: Notifier<()> = Notifier::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();

        let mut sub = notifier.subscribe(move |_| count_clone.set(count_clone.get() + 1));
        notifier.notify(&());
        assert!(sub.is_active());

        sub.dispose();
        sub.dispose();
        notifier.notify(&());

        assert!(!sub.is_active());
        assert_eq!(count.get(), 1);
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let notifier: Notifier<()> = Notifier::new();
        {
            let _sub = notifier.subscribe(|_| {});
            assert_eq!(notifier.len(), 1);
        }
        assert_eq!(notifier.len(), 0);
    }

    #[test]
    fn test_subscription_detach() {
        let notifier: Notifier<()> = Notifier::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();

        notifier
            .subscribe(move |_| count_clone.set(count_clone.get() + 1))
            .detach();
        notifier.notify(&());

        assert_eq!(notifier.len(), 1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_notifier_unsubscribe() {
        let notifier: Notifier<()> = Notifier::new();
        let sub = notifier.subscribe(|_| {});
        let id = sub.id();

        assert!(notifier.unsubscribe(id));
        assert!(!sub.is_active());
        assert!(!notifier.unsubscribe(id)); // Already removed
    }

    #[test]
    fn test_listener_removed_during_dispatch_is_skipped() {
        let notifier: Notifier<()> = Notifier::new();
        let count = Rc::new(Cell::new(0));
        let second: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let second_clone = second.clone();
        let _first = notifier.subscribe(move |_| {
            if let Some(mut sub) = second_clone.borrow_mut().take() {
                sub.dispose();
            }
        });
        let count_clone = count.clone();
        *second.borrow_mut() =
            Some(notifier.subscribe(move |_| count_clone.set(count_clone.get() + 1)));

        notifier.notify(&());

        assert_eq!(count.get(), 0);
        assert_eq!(notifier.len(), 1);
    }

    #[test]
    fn test_subscribe_during_dispatch() {
        let notifier: Notifier<()> = Notifier::new();
        let added: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let handle = notifier.clone();
        let added_clone = added.clone();
        let _sub = notifier.subscribe(move |_| {
            added_clone.borrow_mut().push(handle.subscribe(|_| {}));
        });

        notifier.notify(&());
        assert_eq!(notifier.len(), 2);
    }

    #[test]
    fn test_notifier_clear() {
        let notifier: Notifier<()> = Notifier::new();
        let sub1 = notifier.subscribe(|_| {});
        let sub2 = notifier.subscribe(|_| {});

        notifier.clear();

        assert!(notifier.is_empty());
        assert!(!sub1.is_active());
        assert!(!sub2.is_active());
    }

    #[test]
    fn test_subscription_outlives_notifier() {
        let notifier: Notifier<()> = Notifier::new();
        let mut sub = notifier.subscribe(|_| {});
        drop(notifier);

        assert!(!sub.is_active());
        sub.dispose();
    }

    #[test]
    fn test_empty_subscription() {
        let mut sub = Subscription::empty();
        assert!(!sub.is_active());
        sub.dispose();
    }
}
