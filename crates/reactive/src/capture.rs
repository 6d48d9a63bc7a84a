//! Dependency capture.
//!
//! Every tracked read of a reactive source reports itself through [`record`].
//! Reads land in the innermost frame of a thread-local stack: a recording
//! frame collects the distinct sources read, an ignoring frame swallows them.
//! With no frame on the stack, reads are not tracked at all.

use crate::subscription::Subscription;
use hashbrown::HashSet;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a reactive source.
pub type SourceId = u64;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a fresh source identity.
pub fn next_source_id() -> SourceId {
    NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A reactive source that can be read under capture and watched for changes.
pub trait Dependency {
    /// Stable identity used to deduplicate reads.
    fn source_id(&self) -> SourceId;

    /// Counter that changes on every change of the source.
    fn version(&self) -> u64;

    /// Calls `listener` after every change until the subscription is dropped.
    fn watch(&self, listener: Rc<dyn Fn()>) -> Subscription;
}

enum Frame {
    Recording {
        seen: HashSet<SourceId>,
        deps: Vec<Rc<dyn Dependency>>,
    },
    Ignoring,
}

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Starts recording reads in a new innermost frame.
pub fn begin_capture() {
    push(Frame::Recording {
        seen: HashSet::new(),
        deps: Vec::new(),
    });
}

/// Ends the innermost frame and returns the sources it recorded, in order of
/// first read.
pub fn end_capture() -> Vec<Rc<dyn Dependency>> {
    match pop() {
        Some(Frame::Recording { deps, .. }) => deps,
        _ => Vec::new(),
    }
}

/// Returns true if reads are currently being recorded.
pub fn currently_capturing() -> bool {
    FRAMES.with(|frames| matches!(frames.borrow().last(), Some(Frame::Recording { .. })))
}

/// Number of frames on the stack.
pub fn depth() -> usize {
    FRAMES.with(|frames| frames.borrow().len())
}

/// Reports a read of source `id` to the innermost frame.
///
/// `dependency` is only called the first time `id` is seen by that frame.
pub fn record<F>(id: SourceId, dependency: F)
where
    F: FnOnce() -> Rc<dyn Dependency>,
{
    FRAMES.with(|frames| {
        if let Some(Frame::Recording { seen, deps }) = frames.borrow_mut().last_mut() {
            if seen.insert(id) {
                deps.push(dependency());
            }
        }
    });
}

/// Reports previously recorded sources again, as if they had just been read.
pub fn replay(deps: &[Rc<dyn Dependency>]) {
    for dep in deps {
        record(dep.source_id(), || Rc::clone(dep));
    }
}

/// Runs `f` in a fresh recording frame and returns its result together with
/// the sources it read.
///
/// The frame is popped even if `f` panics.
pub fn collect<R>(f: impl FnOnce() -> R) -> (R, Vec<Rc<dyn Dependency>>) {
    begin_capture();
    let guard = FrameGuard::armed();
    let result = f();
    guard.disarm();
    (result, end_capture())
}

/// Runs `f` with tracking suspended.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    push(Frame::Ignoring);
    let _guard = FrameGuard::armed();
    f()
}

fn push(frame: Frame) {
    FRAMES.with(|frames| frames.borrow_mut().push(frame));
}

fn pop() -> Option<Frame> {
    FRAMES
        .try_with(|frames| frames.borrow_mut().pop())
        .ok()
        .flatten()
}

struct FrameGuard {
    armed: bool,
}

impl FrameGuard {
    fn armed() -> Self {
        Self { armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if self.armed {
            pop();
        }
    }
}
