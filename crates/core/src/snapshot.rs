//! Paired (values, keys) state of a collection.

use crate::error::{Error, Result};
use crate::key::{Key, KeySelector};
use crate::value::Value;
use alloc::collections::BTreeSet;
use alloc::vec::Vec;

/// An ordered sequence of values with an optional parallel key sequence.
///
/// When keyed, `values.len() == keys.len()` always holds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    values: Vec<Value>,
    keys: Option<Vec<Key>>,
}

impl Snapshot {
    /// Creates an unkeyed snapshot.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values, keys: None }
    }

    /// Creates a keyed snapshot, validating length and key uniqueness.
    pub fn keyed(values: Vec<Value>, keys: Vec<Key>) -> Result<Self> {
        if values.len() != keys.len() {
            return Err(Error::length_mismatch(values.len(), keys.len()));
        }
        let mut seen = BTreeSet::new();
        for key in &keys {
            if !seen.insert(key) {
                return Err(Error::duplicate_key(key.clone()));
            }
        }
        Ok(Self {
            values,
            keys: Some(keys),
        })
    }

    /// Builds a snapshot from values, deriving keys when a selector is given.
    ///
    /// Keys are not checked for uniqueness here; the reconciler tolerates
    /// duplicates.
    pub fn select(values: Vec<Value>, selector: Option<&KeySelector>) -> Self {
        let keys = selector.map(|s| s.keys_of(&values));
        Self { values, keys }
    }

    /// Assembles a snapshot from parts produced by a stage.
    ///
    /// A key list whose length differs from the values is discarded.
    pub fn from_parts(values: Vec<Value>, keys: Option<Vec<Key>>) -> Self {
        let keys = keys.filter(|k| k.len() == values.len());
        Self { values, keys }
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[inline]
    pub fn keys(&self) -> Option<&[Key]> {
        self.keys.as_deref()
    }

    #[inline]
    pub fn is_keyed(&self) -> bool {
        self.keys.is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn key_at(&self, index: usize) -> Option<&Key> {
        self.keys.as_ref().and_then(|k| k.get(index))
    }

    /// Iterates over `(value, key)` pairs; keys are `None` when unkeyed.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, Option<&Key>)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, v)| (v, self.key_at(i)))
    }

    /// Mutable access to both parallel sequences.
    pub fn parts_mut(&mut self) -> (&mut Vec<Value>, Option<&mut Vec<Key>>) {
        (&mut self.values, self.keys.as_mut())
    }

    /// Replaces the contents with `other`'s.
    pub fn assign(&mut self, other: &Snapshot) {
        self.values.clone_from(&other.values);
        self.keys.clone_from(&other.keys);
    }

    pub fn into_parts(self) -> (Vec<Value>, Option<Vec<Key>>) {
        (self.values, self.keys)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_snapshot_unkeyed() {
        let snap = Snapshot::new(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(snap.len(), 2);
        assert!(!snap.is_keyed());
        assert!(snap.key_at(0).is_none());
    }

    #[test]
    fn test_snapshot_keyed_validation() {
        let ok = Snapshot::keyed(vec![Value::Int(1)], vec![Key::Int(1)]);
        assert!(ok.is_ok());

        let err = Snapshot::keyed(vec![Value::Int(1)], vec![]).unwrap_err();
        assert_eq!(err, Error::length_mismatch(1, 0));

        let err = Snapshot::keyed(
            vec![Value::Int(1), Value::Int(2)],
            vec![Key::Int(5), Key::Int(5)],
        )
        .unwrap_err();
        assert_eq!(err, Error::duplicate_key(5i64));
    }

    #[test]
    fn test_snapshot_select() {
        let items = vec![
            Value::object([("id", Value::Int(2))]),
            Value::object([("id", Value::Int(1))]),
        ];
        let selector = KeySelector::field("id");
        let snap = Snapshot::select(items.clone(), Some(&selector));
        assert_eq!(snap.keys(), Some(&[Key::Int(2), Key::Int(1)][..]));

        let snap = Snapshot::select(items, None);
        assert!(snap.keys().is_none());
    }

    #[test]
    fn test_snapshot_from_parts_drops_bad_keys() {
        let snap = Snapshot::from_parts(vec![Value::Int(1)], Some(vec![]));
        assert!(!snap.is_keyed());
    }

    #[test]
    fn test_snapshot_iter() {
        let snap = Snapshot::keyed(
            vec![Value::from("a"), Value::from("b")],
            vec![Key::Int(1), Key::Int(2)],
        )
        .unwrap();
        let pairs: Vec<_> = snap.iter().map(|(v, k)| (v.clone(), k.cloned())).collect();
        assert_eq!(pairs[1], (Value::from("b"), Some(Key::Int(2))));
    }
}
