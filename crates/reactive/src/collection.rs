//! Live collections.
//!
//! A `Collection` derives an ordered sequence from a source through a chain
//! of stages and keeps it current. Every change of the source, and every
//! change of a value read by an iterated stage, re-derives the whole chain;
//! the result is reconciled into the exposed snapshot and subscribers are
//! notified once.
//!
//! # Invariants
//!
//! 1. Stages run in registration order; each consumes the previous output.
//! 2. One triggering change produces exactly one notification.
//! 3. In a keyed collection, items whose key survives and whose value is
//!    deep-equal keep their instance across updates.
//! 4. After `dispose`, the collection holds no subscriptions and ignores
//!    further updates and stage registrations.

use crate::capture::{self, Dependency, SourceId};
use crate::source::SequenceSource;
use crate::stage::{Stage, StageCache, StageId, StageKind};
use crate::subscription::{Notifier, Subscription};
use crate::watcher::ReentrancyGuard;
use hashbrown::HashMap;
use ripple_core::{Key, KeySelector, Snapshot, Value};
use ripple_incremental::{reconcile, Patch};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

/// Options for a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Reuse per-item results of iterated stages across runs.
    pub cache: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self { cache: true }
    }
}

struct CollectionInner {
    id: SourceId,
    source: Box<dyn SequenceSource>,
    selector: Option<KeySelector>,
    options: CollectionOptions,
    stages: RefCell<Vec<Stage>>,
    cache: RefCell<HashMap<StageId, Rc<StageCache>>>,
    live: RefCell<Snapshot>,
    last_patch: RefCell<Patch>,
    notifier: Notifier<[Value]>,
    source_subscription: RefCell<Option<Subscription>>,
    updating: Cell<bool>,
    disposed: Cell<bool>,
    next_stage_id: Cell<StageId>,
    refreshes: Cell<u64>,
    version: Cell<u64>,
}

/// A live, derived, ordered collection.
///
/// Cloning yields another handle to the same collection. Chain methods take
/// the handle by value and return it.
///
/// # Example
///
/// ```ignore
/// use ripple_core::Value;
/// use ripple_reactive::{Collection, Observable};
///
/// let source = Observable::new(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
/// let evens = Collection::new(&source)
///     .filter(|v, _| v.as_i64().is_some_and(|x| x % 2 == 0));
///
/// source.push(Value::Int(4));
/// assert_eq!(evens.peek(), vec![Value::Int(2), Value::Int(4)]);
/// ```
#[derive(Clone)]
pub struct Collection {
    inner: Rc<CollectionInner>,
}

impl Collection {
    /// Creates an unkeyed collection. Every update replaces its contents.
    pub fn new<S>(source: &S) -> Self
    where
        S: SequenceSource + Clone + 'static,
    {
        CollectionBuilder::new(source).build()
    }

    /// Creates a keyed collection. Updates are reconciled item by item.
    pub fn keyed<S>(source: &S, selector: impl Into<KeySelector>) -> Self
    where
        S: SequenceSource + Clone + 'static,
    {
        CollectionBuilder::new(source).key(selector).build()
    }

    fn from_builder(builder: CollectionBuilder) -> Self {
        let CollectionBuilder {
            source,
            selector,
            options,
        } = builder;

        let live = capture::untracked(|| Snapshot::select(source.peek_values(), selector.as_ref()));
        let inner = Rc::new(CollectionInner {
            id: capture::next_source_id(),
            source,
            selector,
            options,
            stages: RefCell::new(Vec::new()),
            cache: RefCell::new(HashMap::new()),
            live: RefCell::new(live),
            last_patch: RefCell::new(Patch::new()),
            notifier: Notifier::new(),
            source_subscription: RefCell::new(None),
            updating: Cell::new(false),
            disposed: Cell::new(false),
            next_stage_id: Cell::new(1),
            refreshes: Cell::new(0),
            version: Cell::new(0),
        });

        let collection = Self { inner };
        let subscription = collection.inner.source.watch_values(collection.refresher());
        *collection.inner.source_subscription.borrow_mut() = Some(subscription);

        debug!(
            collection = collection.inner.id,
            len = collection.len(),
            keyed = collection.is_keyed(),
            "collection created"
        );
        collection
    }

    fn refresher(&self) -> Rc<dyn Fn()> {
        let weak: Weak<CollectionInner> = Rc::downgrade(&self.inner);
        Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                Collection { inner }.refresh();
            }
        })
    }

    /// Keeps items for which `predicate(item, index)` is true.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Value, usize) -> bool + 'static,
    {
        self.register(StageKind::filter(predicate))
    }

    /// Like [`Collection::filter`], passing `context` to the predicate.
    pub fn filter_with<C, F>(self, context: C, predicate: F) -> Self
    where
        C: 'static,
        F: Fn(&C, &Value, usize) -> bool + 'static,
    {
        self.register(StageKind::filter(move |item, index| predicate(&context, item, index)))
    }

    /// Replaces every item by `mapper(item, index)`.
    pub fn map<F>(self, mapper: F) -> Self
    where
        F: Fn(&Value, usize) -> Value + 'static,
    {
        self.register(StageKind::map(mapper))
    }

    /// Like [`Collection::map`], passing `context` to the mapper.
    pub fn map_with<C, F>(self, context: C, mapper: F) -> Self
    where
        C: 'static,
        F: Fn(&C, &Value, usize) -> Value + 'static,
    {
        self.register(StageKind::map(move |item, index| mapper(&context, item, index)))
    }

    /// Projects the named field of every item; missing fields become `Null`.
    pub fn pluck(self, field: impl Into<String>) -> Self {
        self.register(StageKind::pluck(field))
    }

    /// Drops items deep-equal to an earlier one. The result is unkeyed.
    pub fn unique(self) -> Self {
        self.register(StageKind::Unique)
    }

    /// Appends a pure whole-snapshot transform.
    pub fn apply<F>(self, transform: F) -> Self
    where
        F: Fn(&Snapshot) -> Snapshot + 'static,
    {
        self.register(StageKind::custom(transform))
    }

    fn register(self, kind: StageKind) -> Self {
        let inner = &self.inner;
        if inner.disposed.get() {
            warn!(collection = inner.id, stage = kind.name(), "stage ignored on disposed collection");
            return self;
        }

        if inner.updating.get() {
            warn!(collection = inner.id, stage = kind.name(), "stage ignored during update");
            return self;
        }

        let next = {
            let _guard = ReentrancyGuard::enter(&inner.updating);

            let id = inner.next_stage_id.get();
            inner.next_stage_id.set(id + 1);

            let mut stage = Stage::new(id, kind);
            let refresh = self.refresher();
            stage.on_change(move || refresh());

            let input = inner.live.borrow().clone();
            let cache = Rc::new(stage.run(&input, None, inner.options.cache));
            let next = cache.output().clone();
            inner.cache.borrow_mut().insert(id, cache);
            inner.stages.borrow_mut().push(stage);
            self.reconcile_into_live(next)
        };

        if inner.disposed.get() {
            self.release();
            return self;
        }

        trace!(collection = inner.id, stages = self.stage_count(), "stage registered");
        self.publish(next);
        self
    }

    /// Re-derives the collection from its source and notifies once.
    ///
    /// Called automatically on every source change and every change of a
    /// value read by an iterated stage. Does nothing while an update of this
    /// collection is already running, or after disposal.
    pub fn refresh(&self) {
        let inner = &self.inner;
        if inner.disposed.get() {
            trace!(collection = inner.id, "refresh ignored on disposed collection");
            return;
        }

        let values = {
            let Some(_guard) = ReentrancyGuard::enter(&inner.updating) else {
                trace!(collection = inner.id, "refresh skipped during update");
                return;
            };
            inner.refreshes.set(inner.refreshes.get() + 1);

            let next = capture::untracked(|| self.derive());
            self.reconcile_into_live(next)
        };

        if inner.disposed.get() {
            self.release();
            return;
        }
        self.publish(values);
    }

    fn derive(&self) -> Snapshot {
        let inner = &self.inner;
        let mut snapshot = Snapshot::select(inner.source.peek_values(), inner.selector.as_ref());

        // A stage whose reads changed invalidates the item cache of every
        // stage after it.
        let mut invalidated = false;
        let stages = inner.stages.borrow();
        for stage in stages.iter() {
            let previous = inner.cache.borrow().get(&stage.id()).cloned();
            let dirty = stage.take_dirty();
            let stale = previous.as_deref().is_some_and(StageCache::is_stale);
            invalidated |= dirty || stale;
            let use_cache = inner.options.cache && !invalidated;

            let cache = Rc::new(stage.run(&snapshot, previous, use_cache));
            snapshot = cache.output().clone();
            inner.cache.borrow_mut().insert(stage.id(), cache);
        }
        snapshot
    }

    fn reconcile_into_live(&self, next: Snapshot) -> Vec<Value> {
        let inner = &self.inner;
        let patch = capture::untracked(|| reconcile(&mut inner.live.borrow_mut(), &next));

        debug!(
            collection = inner.id,
            removed = patch.removed(),
            inserted = patch.inserted(),
            moved = patch.moved(),
            updated = patch.updated(),
            replaced = patch.is_replace(),
            len = next.len(),
            "collection patched"
        );

        *inner.last_patch.borrow_mut() = patch;
        inner.live.borrow().values().to_vec()
    }

    fn publish(&self, values: Vec<Value>) {
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner.notifier.notify(values.as_slice());
    }

    /// Returns the current items and registers a dependency.
    pub fn get(&self) -> Vec<Value> {
        self.track();
        self.peek()
    }

    /// Returns the current items without registering a dependency.
    pub fn peek(&self) -> Vec<Value> {
        self.inner.live.borrow().values().to_vec()
    }

    /// Reads the current items by reference and registers a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&[Value]) -> R) -> R {
        self.track();
        f(self.inner.live.borrow().values())
    }

    /// Returns the keys of the current items, if the collection is keyed.
    pub fn keys(&self) -> Option<Vec<Key>> {
        self.inner.live.borrow().keys().map(<[Key]>::to_vec)
    }

    /// Returns a copy of the current (values, keys) state.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.live.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.live.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.live.borrow().is_empty()
    }

    /// Returns true if the collection was created with a key selector.
    pub fn is_keyed(&self) -> bool {
        self.inner.selector.is_some()
    }

    /// Subscribes to updates. The callback receives the new items.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Value]) + 'static,
    {
        self.inner.notifier.subscribe(callback)
    }

    #[inline]
    pub fn subscription_count(&self) -> usize {
        self.inner.notifier.len()
    }

    pub fn stage_count(&self) -> usize {
        self.inner.stages.borrow().len()
    }

    /// Operations applied by the most recent update.
    pub fn last_patch(&self) -> Patch {
        self.inner.last_patch.borrow().clone()
    }

    /// Number of refreshes performed so far.
    #[inline]
    pub fn refresh_count(&self) -> u64 {
        self.inner.refreshes.get()
    }

    #[inline]
    pub fn options(&self) -> CollectionOptions {
        self.inner.options
    }

    #[inline]
    pub fn source_id(&self) -> SourceId {
        self.inner.id
    }

    /// Releases the source subscription, every stage and the cache.
    ///
    /// Calling this more than once has no effect. Called from inside a
    /// stage, the release happens once the running update completes.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.replace(true) {
            return;
        }
        if inner.updating.get() {
            trace!(collection = inner.id, "dispose deferred until update completes");
            return;
        }
        self.release();
    }

    fn release(&self) {
        let inner = &self.inner;
        let source_subscription = inner.source_subscription.borrow_mut().take();
        drop(source_subscription);

        let mut stages = std::mem::take(&mut *inner.stages.borrow_mut());
        for stage in stages.iter_mut() {
            stage.dispose();
        }
        drop(stages);

        let cache = std::mem::take(&mut *inner.cache.borrow_mut());
        drop(cache);
        inner.notifier.clear();

        debug!(collection = inner.id, "collection disposed");
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    fn track(&self) {
        capture::record(self.inner.id, || Rc::new(self.clone()) as Rc<dyn Dependency>);
    }
}

impl Dependency for Collection {
    fn source_id(&self) -> SourceId {
        self.inner.id
    }

    fn version(&self) -> u64 {
        self.inner.version.get()
    }

    fn watch(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.inner.notifier.subscribe(move |_| listener())
    }
}

impl SequenceSource for Collection {
    fn peek_values(&self) -> Vec<Value> {
        self.peek()
    }

    fn watch_values(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.watch(listener)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.inner.id)
            .field("len", &self.len())
            .field("keyed", &self.is_keyed())
            .field("stages", &self.stage_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Builder for a [`Collection`].
///
/// # Example
///
/// ```ignore
/// let items = CollectionBuilder::new(&source)
///     .key("id")
///     .cache(false)
///     .build()
///     .map(|item, _| item.field("label"));
/// ```
pub struct CollectionBuilder {
    source: Box<dyn SequenceSource>,
    selector: Option<KeySelector>,
    options: CollectionOptions,
}

impl CollectionBuilder {
    /// Creates a builder over `source`; the builder keeps its own handle.
    pub fn new<S>(source: &S) -> Self
    where
        S: SequenceSource + Clone + 'static,
    {
        Self {
            source: Box::new(source.clone()),
            selector: None,
            options: CollectionOptions::default(),
        }
    }

    /// Sets the key selector: a field name or a [`KeySelector`].
    pub fn key(mut self, selector: impl Into<KeySelector>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Enables or disables per-item caching of iterated stages.
    pub fn cache(mut self, enabled: bool) -> Self {
        self.options.cache = enabled;
        self
    }

    pub fn options(mut self, options: CollectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Collection {
        Collection::from_builder(self)
    }
}
