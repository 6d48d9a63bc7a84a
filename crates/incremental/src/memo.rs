//! Positional per-item memoization.
//!
//! A `Memo` remembers, for one run of an iterated stage, the input value and
//! key at every position together with the output computed for it. On the
//! next run an item is a hit when the same key sits at the same position and
//! the value is strictly equal to the remembered input (see
//! [`Value::strict_eq`]: `Int(1)` does not hit a remembered `Float(1.0)`).

use alloc::vec::Vec;
use ripple_core::{Key, Snapshot, Value};

/// Inputs and outputs of one memoized run.
#[derive(Clone, Debug)]
pub struct Memo<R> {
    inputs: Vec<Value>,
    keys: Option<Vec<Key>>,
    outputs: Vec<R>,
    hits: usize,
}

impl<R> Default for Memo<R> {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            keys: None,
            outputs: Vec::new(),
            hits: 0,
        }
    }
}

impl<R> Memo<R> {
    /// Creates an empty memo that never hits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the remembered output for the item at `index`, if reusable.
    pub fn lookup(&self, index: usize, key: Option<&Key>, value: &Value) -> Option<&R> {
        let cached = self.inputs.get(index)?;
        let cached_key = self.keys.as_ref().and_then(|keys| keys.get(index));
        if cached_key != key || !cached.strict_eq(value) {
            return None;
        }
        self.outputs.get(index)
    }

    /// Outputs in input order.
    #[inline]
    pub fn outputs(&self) -> &[R] {
        &self.outputs
    }

    /// Number of items reused from the previous run.
    #[inline]
    pub fn hits(&self) -> usize {
        self.hits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Evaluates every item of `input`, reusing outputs from `previous` where
/// possible.
///
/// `eval(item, index)` runs on a miss; `on_hit(output)` runs on a hit, before
/// the output is reused.
pub fn memoize<R, E, H>(input: &Snapshot, previous: Option<&Memo<R>>, mut eval: E, mut on_hit: H) -> Memo<R>
where
    R: Clone,
    E: FnMut(&Value, usize) -> R,
    H: FnMut(&R),
{
    let mut outputs = Vec::with_capacity(input.len());
    let mut hits = 0;

    for (index, (value, key)) in input.iter().enumerate() {
        match previous.and_then(|memo| memo.lookup(index, key, value)) {
            Some(cached) => {
                on_hit(cached);
                hits += 1;
                outputs.push(cached.clone());
            }
            None => outputs.push(eval(value, index)),
        }
    }

    Memo {
        inputs: input.values().to_vec(),
        keys: input.keys().map(<[Key]>::to_vec),
        outputs,
        hits,
    }
}
