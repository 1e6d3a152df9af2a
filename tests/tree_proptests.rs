//! Property-based tests for the concurrent tree.
//!
//! These tests verify invariants that should hold for all inputs, using
//! differential testing against `BTreeSet` as a sequential oracle.

use proptest::prelude::*;
use relaxed_avl::{AvlTree, RelaxedAvlTree};
use std::collections::BTreeSet;

// ============================================================================
//  Strategies
// ============================================================================

/// Strategy for keys in a narrow range, so operations collide often.
fn narrow_key() -> impl Strategy<Value = u64> {
    0u64..64
}

/// Strategy for keys over the whole space.
fn wide_key() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// Strategy for a set of unique keys.
fn unique_keys(max_count: usize) -> impl Strategy<Value = Vec<u64>> {
    prop::collection::btree_set(wide_key(), 0..=max_count)
        .prop_map(|set| set.into_iter().collect())
}

/// Operations for random differential testing.
#[derive(Debug, Clone)]
enum Op {
    Insert(u64),
    Remove(u64),
    Contains(u64),
}

/// Strategy for generating random operations over colliding keys.
fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => narrow_key().prop_map(Op::Insert),
            2 => narrow_key().prop_map(Op::Remove),
            1 => narrow_key().prop_map(Op::Contains),
        ],
        0..=max_ops,
    )
}

// ============================================================================
//  Basic Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every inserted key should be findable.
    #[test]
    fn insert_then_contains(key in wide_key()) {
        let tree: AvlTree<u64> = AvlTree::new();
        prop_assert!(tree.insert(key));
        prop_assert!(tree.contains(&key));
    }

    /// The second insert of the same key is rejected and changes nothing.
    #[test]
    fn duplicate_insert_is_rejected(key in wide_key()) {
        let tree: AvlTree<u64> = AvlTree::new();
        prop_assert!(tree.insert(key));
        prop_assert!(!tree.insert(key));
        prop_assert_eq!(tree.len(), 1);
    }

    /// Removing a missing key reports absence and changes nothing.
    #[test]
    fn remove_missing_returns_none(keys in unique_keys(32), missing in wide_key()) {
        prop_assume!(!keys.contains(&missing));

        let tree: AvlTree<u64> = AvlTree::new();
        for &key in &keys {
            tree.insert(key);
        }

        prop_assert_eq!(tree.remove(&missing), None);
        prop_assert_eq!(tree.len(), keys.len());
    }

    /// insert(k) then remove(k) returns the key and restores the key set.
    #[test]
    fn insert_remove_round_trip(keys in unique_keys(32), extra in wide_key()) {
        prop_assume!(!keys.contains(&extra));

        let tree: AvlTree<u64> = AvlTree::new();
        for &key in &keys {
            tree.insert(key);
        }
        let before = tree.to_vec();

        prop_assert!(tree.insert(extra));
        prop_assert_eq!(tree.remove(&extra), Some(extra));
        prop_assert_eq!(tree.to_vec(), before);
    }
}

// ============================================================================
//  Differential Testing Against BTreeSet
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every operation must report exactly what the oracle reports, and
    /// the final in-order traversal must equal the oracle's key set in
    /// strictly ascending order.
    #[test]
    fn matches_the_sequential_oracle(ops in operations(200)) {
        let tree: AvlTree<u64> = AvlTree::new();
        let mut oracle = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(key) => {
                    prop_assert_eq!(tree.insert(key), oracle.insert(key))
                }
                Op::Remove(key) => {
                    prop_assert_eq!(tree.remove(&key), oracle.take(&key))
                }
                Op::Contains(key) => {
                    prop_assert_eq!(tree.contains(&key), oracle.contains(&key))
                }
            }
        }

        let keys = tree.to_vec();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]), "in-order not ascending");
        prop_assert_eq!(&keys, &oracle.iter().copied().collect::<Vec<_>>());
        prop_assert_eq!(tree.len(), oracle.len());
    }

    /// The deferred-repair variant must agree with the oracle the same
    /// way - relaxed balance never changes membership semantics.
    #[test]
    fn deferred_repair_matches_the_oracle(ops in operations(200)) {
        let tree: RelaxedAvlTree<u64> = RelaxedAvlTree::new();
        let mut oracle = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(key) => {
                    prop_assert_eq!(tree.insert(key), oracle.insert(key))
                }
                Op::Remove(key) => {
                    prop_assert_eq!(tree.remove(&key), oracle.take(&key))
                }
                Op::Contains(key) => {
                    prop_assert_eq!(tree.contains(&key), oracle.contains(&key))
                }
            }
        }

        let keys = tree.to_vec();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]), "in-order not ascending");
        prop_assert_eq!(&keys, &oracle.iter().copied().collect::<Vec<_>>());
    }

    /// Bulk insert of a unique key set, then remove of a prefix, leaves
    /// exactly the suffix.
    #[test]
    fn bulk_insert_then_partial_remove(keys in unique_keys(64), split in 0usize..64) {
        let tree: AvlTree<u64> = AvlTree::new();
        for &key in &keys {
            prop_assert!(tree.insert(key));
        }

        let split = split.min(keys.len());
        for key in &keys[..split] {
            prop_assert_eq!(tree.remove(key), Some(*key));
        }

        let mut survivors: Vec<u64> = keys[split..].to_vec();
        survivors.sort_unstable();
        prop_assert_eq!(tree.to_vec(), survivors);
    }
}
