//! Keyed reconciliation.
//!
//! `reconcile` brings a live snapshot in line with a newly derived one using
//! the smallest set of positional edits it can find cheaply. Edits run in a
//! fixed order: remove, insert, move, update. Items whose key survives and
//! whose value is deep-equal keep their instance.

use crate::patch::{Patch, PatchOp};
use alloc::vec::Vec;
use hashbrown::HashSet;
use ripple_core::{Key, Snapshot, Value};

/// Patches `live` so that it equals `next` in content and order.
///
/// Both snapshots must carry non-empty key lists for a keyed patch; otherwise
/// the live snapshot is replaced wholesale and the patch holds a single
/// `Replace` operation.
pub fn reconcile(live: &mut Snapshot, next: &Snapshot) -> Patch {
    let keyed = matches!(
        (live.keys(), next.keys()),
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty()
    );
    if !keyed {
        return replace(live, next);
    }

    let (next_values, next_keys) = match next.keys() {
        Some(keys) => (next.values(), keys),
        None => return replace(live, next),
    };

    let mut patch = Patch::new();
    {
        let (values, keys) = live.parts_mut();
        if let Some(keys) = keys {
            remove_items(values, keys, next_keys, &mut patch);
            insert_items(values, keys, next_values, next_keys, &mut patch);
            move_items(values, keys, next_keys, &mut patch);
            update_items(values, keys, next_values, &mut patch);
        }
    }

    // Duplicate keys can leave the sequences out of step.
    if live.keys() != Some(next_keys) || live.len() != next.len() {
        return replace(live, next);
    }
    patch
}

fn replace(live: &mut Snapshot, next: &Snapshot) -> Patch {
    live.assign(next);
    Patch::replaced(next.len())
}

/// Removes every item whose key is absent from `next_keys`.
pub fn remove_items(
    values: &mut Vec<Value>,
    keys: &mut Vec<Key>,
    next_keys: &[Key],
    patch: &mut Patch,
) {
    let wanted: HashSet<&Key> = next_keys.iter().collect();
    let mut index = 0;
    while index < keys.len() {
        if wanted.contains(&keys[index]) {
            index += 1;
            continue;
        }
        let key = keys.remove(index);
        if index < values.len() {
            values.remove(index);
        }
        patch.push(PatchOp::Remove { index, key });
    }
}

/// Inserts every item of `next_keys` that is not yet live, at the index the
/// key occupies in the new sequence, clamped to the live length.
pub fn insert_items(
    values: &mut Vec<Value>,
    keys: &mut Vec<Key>,
    next_values: &[Value],
    next_keys: &[Key],
    patch: &mut Patch,
) {
    let present: HashSet<Key> = keys.iter().cloned().collect();
    for (target, key) in next_keys.iter().enumerate() {
        if present.contains(key) {
            continue;
        }
        let Some(value) = next_values.get(target) else {
            continue;
        };
        let index = target.min(keys.len()).min(values.len());
        keys.insert(index, key.clone());
        values.insert(index, value.clone());
        patch.push(PatchOp::Insert {
            index,
            key: key.clone(),
        });
    }
}

/// Walks `next_keys` by target index and relocates each live item whose
/// position differs. Each relocation is one removal and one insertion per
/// sequence.
pub fn move_items(
    values: &mut Vec<Value>,
    keys: &mut Vec<Key>,
    next_keys: &[Key],
    patch: &mut Patch,
) {
    for (target, key) in next_keys.iter().enumerate() {
        if target >= keys.len() {
            break;
        }
        let Some(from) = keys[target..]
            .iter()
            .position(|k| k == key)
            .map(|offset| offset + target)
        else {
            continue;
        };
        if from == target || from >= values.len() {
            continue;
        }

        let moved_key = keys.remove(from);
        keys.insert(target, moved_key);
        let moved_value = values.remove(from);
        values.insert(target, moved_value);
        patch.push(PatchOp::Move {
            from,
            to: target,
            key: key.clone(),
        });
    }
}

/// Replaces, in place, every live value that is not deep-equal to the new
/// value at the same position.
pub fn update_items(
    values: &mut [Value],
    keys: &[Key],
    next_values: &[Value],
    patch: &mut Patch,
) {
    for (index, (live, next)) in values.iter_mut().zip(next_values).enumerate() {
        if *live == *next {
            continue;
        }
        *live = next.clone();
        patch.push(PatchOp::Update {
            index,
            key: keys.get(index).cloned().unwrap_or(Key::Null),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec;

    fn item(id: i64, v: &str) -> Value {
        Value::object([("id", Value::Int(id)), ("v", Value::from(v))])
    }

    fn keyed(items: Vec<Value>) -> Snapshot {
        let keys = items.iter().map(|i| Key::from_value(&i.field("id"))).collect();
        Snapshot::keyed(items, keys).unwrap()
    }

    fn labels(snap: &Snapshot) -> Vec<String> {
        snap.values()
            .iter()
            .map(|v| String::from(v.field("v").as_str().unwrap_or("")))
            .collect()
    }

    fn ints(ids: &[i64]) -> Vec<Key> {
        ids.iter().map(|&i| Key::Int(i)).collect()
    }

    #[test]
    fn test_reconcile_update_insert_retains_identity() {
        let mut live = keyed(vec![item(1, "A"), item(2, "B"), item(3, "C")]);
        let b = live.values()[1].clone();
        let c = live.values()[2].clone();

        let next = keyed(vec![item(1, "Updated"), item(4, "New"), item(2, "B"), item(3, "C")]);
        let patch = reconcile(&mut live, &next);

        assert_eq!(labels(&live), vec!["Updated", "New", "B", "C"]);
        assert_eq!(live.keys(), next.keys());
        assert!(live.values()[2].ptr_eq(&b));
        assert!(live.values()[3].ptr_eq(&c));
        assert_eq!(patch.inserted(), 1);
        assert_eq!(patch.updated(), 1);
        assert_eq!(patch.removed(), 0);
        assert!(!patch.is_replace());
    }

    #[test]
    fn test_reconcile_remove_keeps_others() {
        let mut live = keyed(vec![item(1, "A"), item(2, "B"), item(3, "C")]);
        let a = live.values()[0].clone();
        let c = live.values()[2].clone();

        let next = keyed(vec![item(1, "A"), item(3, "C")]);
        let patch = reconcile(&mut live, &next);

        assert_eq!(labels(&live), vec!["A", "C"]);
        assert!(live.values()[0].ptr_eq(&a));
        assert!(live.values()[1].ptr_eq(&c));
        assert_eq!(patch.ops(), &[PatchOp::Remove { index: 1, key: Key::Int(2) }]);
    }

    #[test]
    fn test_reconcile_reorder() {
        let mut live = keyed(vec![item(1, "A"), item(2, "B"), item(3, "C")]);
        let a = live.values()[0].clone();

        let next = keyed(vec![item(3, "C"), item(1, "A"), item(2, "B")]);
        let patch = reconcile(&mut live, &next);

        assert_eq!(labels(&live), vec!["C", "A", "B"]);
        assert!(live.values()[1].ptr_eq(&a));
        assert_eq!(patch.moved(), 1);
        assert_eq!(patch.updated(), 0);
    }

    #[test]
    fn test_reconcile_unkeyed_replaces() {
        let mut live = Snapshot::new(vec![Value::Int(1), Value::Int(2)]);
        let next = Snapshot::new(vec![Value::Int(2)]);
        let patch = reconcile(&mut live, &next);

        assert!(patch.is_replace());
        assert_eq!(live.values(), &[Value::Int(2)]);
    }

    #[test]
    fn test_reconcile_empty_sides_replace() {
        let mut live = keyed(vec![]);
        let next = keyed(vec![item(1, "A")]);
        assert!(reconcile(&mut live, &next).is_replace());
        assert_eq!(live.keys(), Some(&ints(&[1])[..]));

        let next = keyed(vec![]);
        assert!(reconcile(&mut live, &next).is_replace());
        assert!(live.is_empty());
    }

    #[test]
    fn test_reconcile_identical_is_empty() {
        let mut live = keyed(vec![item(1, "A"), item(2, "B")]);
        let next = keyed(vec![item(1, "A"), item(2, "B")]);
        assert!(reconcile(&mut live, &next).is_empty());
    }

    #[test]
    fn test_reconcile_duplicate_keys_do_not_panic() {
        let mut live = Snapshot::from_parts(
            vec![Value::Int(1), Value::Int(2)],
            Some(ints(&[1, 2])),
        );
        let next = Snapshot::from_parts(
            vec![Value::Int(3), Value::Int(4), Value::Int(5)],
            Some(ints(&[7, 7, 2])),
        );
        reconcile(&mut live, &next);
        assert_eq!(live.values(), next.values());
        assert_eq!(live.keys(), next.keys());
    }

    #[test]
    fn test_remove_items_step() {
        let mut values = vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)];
        let mut keys = ints(&[1, 2, 3, 4]);
        let mut patch = Patch::new();

        remove_items(&mut values, &mut keys, &ints(&[2, 4]), &mut patch);

        assert_eq!(keys, ints(&[2, 4]));
        assert_eq!(values, vec![Value::Int(2), Value::Int(4)]);
        assert_eq!(patch.removed(), 2);
    }

    #[test]
    fn test_insert_items_step() {
        let mut values = vec![Value::Int(2)];
        let mut keys = ints(&[2]);
        let next_values = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
        let mut patch = Patch::new();

        insert_items(&mut values, &mut keys, &next_values, &ints(&[1, 2, 3]), &mut patch);

        assert_eq!(keys, ints(&[1, 2, 3]));
        assert_eq!(values, next_values);
        assert_eq!(
            patch.ops(),
            &[
                PatchOp::Insert { index: 0, key: Key::Int(1) },
                PatchOp::Insert { index: 2, key: Key::Int(3) },
            ]
        );
    }

    #[test]
    fn test_insert_items_without_remove_step() {
        let mut values = vec![Value::Int(9)];
        let mut keys = ints(&[9]);
        let next_values = vec![Value::Int(1), Value::Int(2)];
        let mut patch = Patch::new();

        insert_items(&mut values, &mut keys, &next_values, &ints(&[1, 2]), &mut patch);

        assert_eq!(keys, ints(&[1, 2, 9]));
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(9)]);
    }

    #[test]
    fn test_move_items_step() {
        let mut values = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
        let mut keys = ints(&[1, 2, 3]);
        let mut patch = Patch::new();

        move_items(&mut values, &mut keys, &ints(&[2, 3, 1]), &mut patch);

        assert_eq!(keys, ints(&[2, 3, 1]));
        assert_eq!(values, vec![Value::Int(2), Value::Int(3), Value::Int(1)]);
        assert!(patch.moved() >= 1);
    }

    #[test]
    fn test_update_items_step() {
        let mut values = vec![Value::Int(1), Value::Int(2)];
        let keys = ints(&[1, 2]);
        let mut patch = Patch::new();

        update_items(&mut values, &keys, &[Value::Int(1), Value::Int(20)], &mut patch);

        assert_eq!(values, vec![Value::Int(1), Value::Int(20)]);
        assert_eq!(patch.ops(), &[PatchOp::Update { index: 1, key: Key::Int(2) }]);
    }
}
