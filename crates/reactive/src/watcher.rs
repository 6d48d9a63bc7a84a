//! Dependency watcher.
//!
//! A `DependencyWatcher` runs a callback under capture and keeps exactly one
//! subscription per reactive source the callback read on its last run. When
//! one of those sources later changes, the watcher raises a change signal; it
//! never re-runs the callback on its own.
//!
//! # Invariants
//!
//! 1. After a run, the subscribed sources equal the sources read by that run.
//!    Sources read on both runs keep their original subscription.
//! 2. A run that reads nothing disposes the watcher.
//! 3. A run requested while a run is in progress is skipped, and change
//!    signals raised during a run are dropped.
//! 4. A panic in the callback propagates; the watcher stays usable.

use crate::capture::{self, Dependency, SourceId};
use crate::subscription::{Notifier, Subscription};
use hashbrown::{HashMap, HashSet};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

type Callback = Box<dyn FnMut()>;

struct WatcherInner {
    callback: RefCell<Option<Callback>>,
    dependencies: RefCell<HashMap<SourceId, Subscription>>,
    evaluating: Cell<bool>,
    disposed: Cell<bool>,
    evaluations: Cell<u64>,
    changes: Notifier<()>,
}

impl WatcherInner {
    fn signal(&self) {
        if self.disposed.get() {
            return;
        }
        if self.evaluating.get() {
            trace!("watcher signal suppressed during evaluation");
            return;
        }
        self.changes.notify(&());
    }
}

/// Clears a re-entrancy flag when dropped, including during unwinding.
pub(crate) struct ReentrancyGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> ReentrancyGuard<'a> {
    /// Sets `flag`, or returns `None` if it is already set.
    pub(crate) fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Tracks the reactive sources read by a callback.
///
/// Cloning yields another handle to the same watcher. Dropping the last
/// handle releases every subscription.
#[derive(Clone)]
pub struct DependencyWatcher {
    inner: Rc<WatcherInner>,
}

impl DependencyWatcher {
    /// Creates a watcher and runs `callback` once immediately.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut() + 'static,
    {
        let watcher = Self::empty(Some(Box::new(callback)));
        watcher.run();
        watcher
    }

    /// Evaluates `f` once under a new watcher and returns both.
    ///
    /// The watcher has no callback of its own: `run` does nothing, and the
    /// dependencies stay those read by `f` until the watcher is disposed.
    pub fn track<R>(f: impl FnOnce() -> R) -> (Self, R) {
        let watcher = Self::empty(None);
        let result = watcher.evaluate(f);
        watcher.dispose_if_idle();
        (watcher, result)
    }

    fn empty(callback: Option<Callback>) -> Self {
        Self {
            inner: Rc::new(WatcherInner {
                callback: RefCell::new(callback),
                dependencies: RefCell::new(HashMap::new()),
                evaluating: Cell::new(false),
                disposed: Cell::new(false),
                evaluations: Cell::new(0),
                changes: Notifier::new(),
            }),
        }
    }

    /// Runs the callback again and resubscribes to what it read.
    ///
    /// Returns false if the run was skipped: the watcher is disposed, a run
    /// is already in progress, or there is no callback.
    pub fn run(&self) -> bool {
        if self.inner.disposed.get() || self.inner.evaluating.get() {
            return false;
        }
        {
            let mut slot = match self.inner.callback.try_borrow_mut() {
                Ok(slot) => slot,
                Err(_) => return false,
            };
            let Some(callback) = slot.as_mut() else {
                return false;
            };
            self.evaluate(|| callback());
        }
        self.dispose_if_idle();
        true
    }

    fn evaluate<R>(&self, f: impl FnOnce() -> R) -> R {
        let Some(_guard) = ReentrancyGuard::enter(&self.inner.evaluating) else {
            return f();
        };
        self.inner.evaluations.set(self.inner.evaluations.get() + 1);
        let (result, deps) = capture::collect(f);
        self.sync(deps);
        result
    }

    fn dispose_if_idle(&self) {
        if self.dependency_count() == 0 {
            trace!("watcher read no dependencies, disposing");
            self.dispose();
        }
    }

    fn sync(&self, deps: Vec<Rc<dyn Dependency>>) {
        if self.inner.disposed.get() {
            return;
        }
        let wanted: HashSet<SourceId> = deps.iter().map(|dep| dep.source_id()).collect();

        let (stale, added): (Vec<Subscription>, Vec<Rc<dyn Dependency>>) = {
            let mut current = self.inner.dependencies.borrow_mut();
            let ids: Vec<SourceId> = current
                .keys()
                .filter(|id| !wanted.contains(*id))
                .copied()
                .collect();
            let stale = ids.into_iter().filter_map(|id| current.remove(&id)).collect();
            let added = deps
                .into_iter()
                .filter(|dep| !current.contains_key(&dep.source_id()))
                .collect();
            (stale, added)
        };

        trace!(
            dropped = stale.len(),
            added = added.len(),
            kept = wanted.len() - added.len(),
            "watcher dependencies synced"
        );
        drop(stale);

        let fresh: Vec<(SourceId, Subscription)> = added
            .iter()
            .map(|dep| (dep.source_id(), dep.watch(self.listener())))
            .collect();
        self.inner.dependencies.borrow_mut().extend(fresh);
    }

    fn listener(&self) -> Rc<dyn Fn()> {
        let weak: Weak<WatcherInner> = Rc::downgrade(&self.inner);
        Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.signal();
            }
        })
    }

    /// Releases every subscription. Later runs and signals are ignored.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let released = std::mem::take(&mut *self.inner.dependencies.borrow_mut());
        drop(released);
        if let Ok(mut slot) = self.inner.callback.try_borrow_mut() {
            slot.take();
        }
    }

    /// Returns true while the watcher holds at least one subscription.
    pub fn is_active(&self) -> bool {
        !self.inner.disposed.get() && self.dependency_count() > 0
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of distinct sources currently subscribed.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    /// Number of runs performed so far.
    #[inline]
    pub fn evaluation_count(&self) -> u64 {
        self.inner.evaluations.get()
    }

    /// Subscribes to the change signal.
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
}

impl fmt::Debug for DependencyWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyWatcher")
            .field("dependencies", &self.dependency_count())
            .field("evaluations", &self.evaluation_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
