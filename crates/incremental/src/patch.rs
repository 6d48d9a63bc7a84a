//! Patch records produced by reconciliation.
//!
//! A `Patch` lists the operations that were applied to a live snapshot, in
//! the order they were applied, so subscribers and logs can see what changed.

use alloc::vec::Vec;
use ripple_core::Key;

/// One applied operation.
///
/// Indices are positions in the live sequence at the moment the operation
/// was applied.
#[derive(Clone, Debug, PartialEq)]
pub enum PatchOp {
    /// Item with `key` removed at `index`.
    Remove { index: usize, key: Key },
    /// Item with `key` inserted at `index`.
    Insert { index: usize, key: Key },
    /// Item with `key` relocated from `from` to `to`.
    Move { from: usize, to: usize, key: Key },
    /// Value at `index` replaced; the key is unchanged.
    Update { index: usize, key: Key },
    /// Whole sequence replaced with `len` items.
    Replace { len: usize },
}

/// Ordered list of operations applied by one reconciliation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    /// Creates a new empty patch.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a patch recording a full replacement.
    pub fn replaced(len: usize) -> Self {
        Self {
            ops: alloc::vec![PatchOp::Replace { len }],
        }
    }

    #[inline]
    pub fn push(&mut self, op: PatchOp) {
        self.ops.push(op);
    }

    #[inline]
    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    /// Returns true if nothing was applied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the number of applied operations.
    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the patch is a full replacement.
    pub fn is_replace(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, PatchOp::Replace { .. }))
    }

    pub fn removed(&self) -> usize {
        self.count(|op| matches!(op, PatchOp::Remove { .. }))
    }

    pub fn inserted(&self) -> usize {
        self.count(|op| matches!(op, PatchOp::Insert { .. }))
    }

    pub fn moved(&self) -> usize {
        self.count(|op| matches!(op, PatchOp::Move { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|op| matches!(op, PatchOp::Update { .. }))
    }

    fn count(&self, pred: impl Fn(&PatchOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    /// Appends the operations of another patch.
    pub fn merge(&mut self, other: Patch) {
        self.ops.extend(other.ops);
    }

    /// Clears all operations.
    pub fn clear(&mut self) {
        self.ops.clear();
    }
}
