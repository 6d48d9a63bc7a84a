//! Lazy dependency-tracking wrapper.
//!
//! A `LazyWrapper` runs its function only when called. Each call records the
//! reactive sources the function read; until the next call, every change to
//! one of them raises one notification on the wrapper. The function is never
//! re-run as a side effect of a change.

use crate::subscription::{Notifier, Subscription};
use crate::watcher::DependencyWatcher;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

struct Tracked {
    watcher: DependencyWatcher,
    _forward: Subscription,
}

struct WrapperInner<A, R> {
    func: Box<dyn Fn(A) -> R>,
    current: RefCell<Option<Tracked>>,
    changes: Notifier<()>,
    calls: Cell<u64>,
}

/// A callable that tracks what its last call read.
///
/// Arguments are passed as one value `A`; use a tuple for several. Anything
/// the function needs besides its arguments is captured by the closure.
///
/// # Example
///
/// ```ignore
/// use ripple_reactive::{wrap, Observable};
///
/// let obs = Observable::new(10);
/// let source = obs.clone();
/// let wrapped = wrap(move |offset: i32| offset + source.get());
///
/// let _sub = wrapped.subscribe(|_| println!("inputs changed"));
/// assert_eq!(wrapped.call(5), 15);
///
/// obs.set(11); // prints once, does not call the function
/// ```
pub struct LazyWrapper<A, R> {
    inner: Rc<WrapperInner<A, R>>,
}

impl<A, R> Clone for LazyWrapper<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static, R: 'static> LazyWrapper<A, R> {
    /// Wraps `func`. Nothing runs until the first call.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(A) -> R + 'static,
    {
        Self {
            inner: Rc::new(WrapperInner {
                func: Box::new(func),
                current: RefCell::new(None),
                changes: Notifier::new(),
                calls: Cell::new(0),
            }),
        }
    }

    /// Runs the function and tracks what it reads until the next call.
    ///
    /// The dependencies of the previous call are released first.
    pub fn call(&self, args: A) -> R {
        self.release();
        self.inner.calls.set(self.inner.calls.get() + 1);

        let func = &self.inner.func;
        let (watcher, result) = DependencyWatcher::track(|| func(args));

        let weak: Weak<WrapperInner<A, R>> = Rc::downgrade(&self.inner);
        let forward = watcher.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.changes.notify(&());
            }
        });

        *self.inner.current.borrow_mut() = Some(Tracked {
            watcher,
            _forward: forward,
        });
        result
    }

    /// Subscribes to change notifications.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&()) + 'static,
    {
        self.inner.changes.subscribe(callback)
    }

    #[inline]
    pub fn changes(&self) -> &Notifier<()> {
        &self.inner.changes
    }

    /// Number of sources read by the last call that are still watched.
    pub fn dependency_count(&self) -> usize {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map_or(0, |tracked| tracked.watcher.dependency_count())
    }

    /// Number of explicit calls so far.
    #[inline]
    pub fn call_count(&self) -> u64 {
        self.inner.calls.get()
    }

    /// Stops watching the dependencies of the last call.
    pub fn dispose(&self) {
        self.release();
    }

    fn release(&self) {
        let previous = self.inner.current.borrow_mut().take();
        if let Some(tracked) = previous {
            tracked.watcher.dispose();
        }
    }
}

impl<A, R> fmt::Debug for LazyWrapper<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyWrapper")
            .field("calls", &self.inner.calls.get())
            .field("tracking", &self.inner.current.borrow().is_some())
            .finish()
    }
}

/// Wraps `func` in a [`LazyWrapper`].
pub fn wrap<A, R, F>(func: F) -> LazyWrapper<A, R>
where
    A: 'static,
    R: 'static,
    F: Fn(A) -> R + 'static,
{
    LazyWrapper::new(func)
}
