//! Pipeline stages.
//!
//! A stage turns one snapshot into another. Filter and map stages are
//! iterated: they call a user function per item, run through a
//! [`LazyWrapper`] so the reactive reads of that function are tracked, and
//! reuse per-item results from their previous run when the item has not
//! moved or changed. Pluck, unique and custom stages are pure and are fully
//! recomputed on every run.

use crate::capture::{self, Dependency};
use crate::subscription::Subscription;
use crate::wrapper::LazyWrapper;
use ripple_core::{Snapshot, Value};
use ripple_incremental::{filter_snapshot, map_snapshot, memoize, pluck_snapshot, unique_snapshot, Memo};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Identity of a stage within its collection; also its cache key.
pub type StageId = u64;

/// Per-item function of an iterated stage: `(item, index)`.
pub type ItemFn<R> = Rc<dyn Fn(&Value, usize) -> R>;

/// Whole-snapshot function of a custom stage.
pub type SnapshotFn = Rc<dyn Fn(&Snapshot) -> Snapshot>;

/// What a stage does.
#[derive(Clone)]
pub enum StageKind {
    /// Keep items for which the predicate holds.
    Filter(ItemFn<bool>),
    /// Replace every item by the function's result.
    Map(ItemFn<Value>),
    /// Project a named field of every item.
    Pluck(String),
    /// Drop structural duplicates.
    Unique,
    /// Arbitrary pure transform.
    Custom(SnapshotFn),
}

impl StageKind {
    pub fn filter<F>(predicate: F) -> Self
    where
        F: Fn(&Value, usize) -> bool + 'static,
    {
        StageKind::Filter(Rc::new(predicate))
    }

    pub fn map<F>(mapper: F) -> Self
    where
        F: Fn(&Value, usize) -> Value + 'static,
    {
        StageKind::Map(Rc::new(mapper))
    }

    pub fn pluck(field: impl Into<String>) -> Self {
        StageKind::Pluck(field.into())
    }

    pub fn custom<F>(transform: F) -> Self
    where
        F: Fn(&Snapshot) -> Snapshot + 'static,
    {
        StageKind::Custom(Rc::new(transform))
    }

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Filter(_) => "filter",
            StageKind::Map(_) => "map",
            StageKind::Pluck(_) => "pluck",
            StageKind::Unique => "unique",
            StageKind::Custom(_) => "custom",
        }
    }

    /// Returns true for stages driven by a per-item function.
    pub fn is_iterated(&self) -> bool {
        matches!(self, StageKind::Filter(_) | StageKind::Map(_))
    }
}

impl fmt::Debug for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Pluck(field) => f.debug_tuple("Pluck").field(field).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Result of one item of an iterated stage, with the reads that produced it
/// and the version each source had at the time.
#[derive(Clone)]
struct Cached {
    output: Value,
    reads: Vec<(Rc<dyn Dependency>, u64)>,
}

impl Cached {
    fn replay(&self) {
        for (dep, _) in &self.reads {
            capture::record(dep.source_id(), || Rc::clone(dep));
        }
    }

    fn is_current(&self) -> bool {
        self.reads.iter().all(|(dep, version)| dep.version() == *version)
    }
}

impl fmt::Debug for Cached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cached")
            .field("output", &self.output)
            .field("reads", &self.reads.len())
            .finish()
    }
}

/// What a stage produced on its last run.
#[derive(Clone, Debug, Default)]
pub struct StageCache {
    output: Snapshot,
    memo: Option<Memo<Cached>>,
}

impl StageCache {
    #[inline]
    pub fn output(&self) -> &Snapshot {
        &self.output
    }

    /// Number of items reused from the run before.
    pub fn hits(&self) -> usize {
        self.memo.as_ref().map_or(0, Memo::hits)
    }

    /// Returns true if a reactive value read by this run has changed since.
    pub fn is_stale(&self) -> bool {
        self.memo
            .as_ref()
            .is_some_and(|memo| memo.outputs().iter().any(|cached| !cached.is_current()))
    }
}

struct StageRun {
    input: Snapshot,
    previous: Option<Rc<StageCache>>,
    use_cache: bool,
}

/// One registered step of a collection pipeline.
pub struct Stage {
    id: StageId,
    kind: StageKind,
    tracker: Option<LazyWrapper<StageRun, StageCache>>,
    dirty: Rc<Cell<bool>>,
    watch: Option<Subscription>,
}

impl Stage {
    pub fn new(id: StageId, kind: StageKind) -> Self {
        let tracker = kind.is_iterated().then(|| {
            let kind = kind.clone();
            LazyWrapper::new(move |run: StageRun| evaluate(&kind, run))
        });
        Self {
            id,
            kind,
            tracker,
            dirty: Rc::new(Cell::new(false)),
            watch: None,
        }
    }

    #[inline]
    pub fn id(&self) -> StageId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> &StageKind {
        &self.kind
    }

    /// Calls `listener` whenever a reactive value read by the last run
    /// changes. The stage is marked dirty first.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn() + 'static,
    {
        let Some(tracker) = &self.tracker else {
            return;
        };
        let dirty = Rc::clone(&self.dirty);
        self.watch = Some(tracker.subscribe(move |_| {
            dirty.set(true);
            listener();
        }));
    }

    /// Runs the stage on `input`.
    ///
    /// With `use_cache`, items are reused from `previous` where possible.
    pub fn run(&self, input: &Snapshot, previous: Option<Rc<StageCache>>, use_cache: bool) -> StageCache {
        let run = StageRun {
            input: input.clone(),
            previous,
            use_cache,
        };
        let cache = match &self.tracker {
            Some(tracker) => tracker.call(run),
            None => capture::untracked(|| evaluate(&self.kind, run)),
        };
        trace!(
            stage = self.id,
            kind = self.kind.name(),
            input = input.len(),
            output = cache.output.len(),
            hits = cache.hits(),
            "stage evaluated"
        );
        cache
    }

    /// Returns whether a tracked read changed since the last call, and
    /// clears the mark.
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    /// Number of reactive sources the last run read.
    pub fn dependency_count(&self) -> usize {
        self.tracker.as_ref().map_or(0, LazyWrapper::dependency_count)
    }

    /// Releases every subscription held by the stage.
    pub fn dispose(&mut self) {
        self.watch = None;
        if let Some(tracker) = &self.tracker {
            tracker.dispose();
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}

fn evaluate(kind: &StageKind, run: StageRun) -> StageCache {
    let previous = run
        .previous
        .as_deref()
        .filter(|cache| run.use_cache && !cache.is_stale())
        .and_then(|cache| cache.memo.as_ref());

    match kind {
        StageKind::Filter(predicate) => {
            let memo = memoize_items(&run.input, previous, |item, index| Value::Bool(predicate(item, index)));
            let output = {
                let outputs = memo.outputs();
                filter_snapshot(&run.input, |_, index| {
                    outputs.get(index).and_then(|c| c.output.as_bool()).unwrap_or(false)
                })
            };
            StageCache {
                output,
                memo: Some(memo),
            }
        }
        StageKind::Map(mapper) => {
            let memo = memoize_items(&run.input, previous, |item, index| mapper(item, index));
            let output = {
                let outputs = memo.outputs();
                map_snapshot(&run.input, |_, index| {
                    outputs.get(index).map(|c| c.output.clone()).unwrap_or_default()
                })
            };
            StageCache {
                output,
                memo: Some(memo),
            }
        }
        StageKind::Pluck(field) => StageCache {
            output: pluck_snapshot(&run.input, field),
            memo: None,
        },
        StageKind::Unique => StageCache {
            output: unique_snapshot(&run.input),
            memo: None,
        },
        StageKind::Custom(transform) => StageCache {
            output: transform(&run.input),
            memo: None,
        },
    }
}

/// Evaluates `f` per item under its own capture, so each cached output keeps
/// the reads that produced it; those reads are replayed on a hit.
fn memoize_items<F>(input: &Snapshot, previous: Option<&Memo<Cached>>, f: F) -> Memo<Cached>
where
    F: Fn(&Value, usize) -> Value,
{
    memoize(
        input,
        previous,
        |item, index| {
            let (output, deps) = capture::collect(|| f(item, index));
            capture::replay(&deps);
            let reads = deps
                .into_iter()
                .map(|dep| {
                    let version = dep.version();
                    (dep, version)
                })
                .collect();
            Cached { output, reads }
        },
        Cached::replay,
    )
}
