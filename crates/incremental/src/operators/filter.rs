//! Snapshot filter operator.

use alloc::vec::Vec;
use ripple_core::Snapshot;
use ripple_core::Value;

/// Keeps the items for which `predicate(item, index)` is true.
///
/// Survivors keep their keys and their relative order.
///
/// # Example
///
/// ```ignore
/// let snap = Snapshot::new(vec![Value::Int(1), Value::Int(2), Value::Int(4)]);
/// let even = filter_snapshot(&snap, |v, _| v.as_i64().unwrap_or(1) % 2 == 0);
/// // Result: [2, 4]
/// ```
pub fn filter_snapshot<F>(input: &Snapshot, mut predicate: F) -> Snapshot
where
    F: FnMut(&Value, usize) -> bool,
{
    let mut values = Vec::new();
    let mut keys = input.keys().map(|_| Vec::new());

    for (index, (value, key)) in input.iter().enumerate() {
        if !predicate(value, index) {
            continue;
        }
        values.push(value.clone());
        if let (Some(keys), Some(key)) = (keys.as_mut(), key) {
            keys.push(key.clone());
        }
    }

    Snapshot::from_parts(values, keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use ripple_core::Key;

    #[test]
    fn test_filter_snapshot_basic() {
        let snap = Snapshot::new(vec![1, 2, 3, 4, 5].into_iter().map(Value::from).collect());
        let filtered = filter_snapshot(&snap, |v, _| v.as_i64().is_some_and(|x| x % 2 == 0));

        assert_eq!(filtered.values(), &[Value::Int(2), Value::Int(4)]);
        assert!(!filtered.is_keyed());
    }

    #[test]
    fn test_filter_snapshot_preserves_keys() {
        let snap = Snapshot::keyed(
            vec![Value::from("a"), Value::from("b"), Value::from("c")],
            vec![Key::Int(1), Key::Int(2), Key::Int(3)],
        )
        .unwrap();

        let filtered = filter_snapshot(&snap, |v, _| v.as_str() != Some("b"));

        assert_eq!(filtered.keys(), Some(&[Key::Int(1), Key::Int(3)][..]));
    }

    #[test]
    fn test_filter_snapshot_passes_index() {
        let snap = Snapshot::new(vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
        let filtered = filter_snapshot(&snap, |_, i| i != 1);
        assert_eq!(filtered.values(), &[Value::Int(10), Value::Int(30)]);
    }

    #[test]
    fn test_filter_snapshot_empty() {
        let snap = Snapshot::default();
        assert!(filter_snapshot(&snap, |_, _| true).is_empty());
    }
}
