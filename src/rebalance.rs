//! Filepath: src/rebalance.rs
//!
//! Rotation-based rebalancing.
//!
//! The rebalance step runs at a node whose height or child structure just
//! changed: refresh the cached height, evaluate the balance factor
//! `height(left) - height(right)`, and repair `|balance| > 1` with the
//! standard AVL casework (LL/LR and their mirrors).
//!
//! # Locking
//! Every entry point takes the *owner slot* of the pivot (the parent's
//! child link, or the tree's root slot) together with the pivot's guard.
//! The caller holds the owner's lock, so the slot rewrite a rotation
//! performs is never observable half-done: a traversal entering the
//! affected region needs either the owner's lock or the pivot's, and both
//! are held here. The grandchild that changes parents during a rotation is
//! not locked - none of its fields are written, only its owner changes.
//!
//! # Relaxed balance
//! [`repair_upward`] walks the recorded ancestor path bottom-up,
//! re-acquiring parent-then-child and revalidating each link by `Arc`
//! identity. A link that went stale under a concurrent restructure
//! abandons the remainder of the walk; the operation that restructured the
//! region repairs it under its own walk, and until then the strict AVL
//! bound may be exceeded there. That window is the "relaxed" part of the
//! contract.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::metrics;
use crate::node::{height_of, lock, Dir, Link, NodeGuard, NodeRef};
use crate::tracing_helpers::debug_log;

/// Rebalancing policy: how far remove propagates repair.
///
/// The two policies differ only in whether an unlink walks the full
/// ancestor path or runs the rebalance step at the splice parent alone.
/// Insert always repairs the full path under either policy.
pub trait RepairPolicy {
    /// `true`: remove repairs every recorded ancestor, deepest first.
    /// `false`: remove repairs the splice parent only and leaves ancestor
    /// repair to later operations through the region.
    const REPAIR_ANCESTORS_ON_REMOVE: bool;
}

/// Insert and remove both repair the full ancestor path.
#[derive(Debug, Clone, Copy, Default)]
pub struct EagerRepair;

impl RepairPolicy for EagerRepair {
    const REPAIR_ANCESTORS_ON_REMOVE: bool = true;
}

/// Remove repairs only the splice parent; ancestors are repaired by later
/// operations passing through. Trades tighter balance for shorter lock
/// residency on the remove path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredRepair;

impl RepairPolicy for DeferredRepair {
    const REPAIR_ANCESTORS_ON_REMOVE: bool = false;
}

/// Balance factor of the node behind `guard`: `height(left) - height(right)`.
///
/// Locks each child briefly for the height read.
fn balance_of<K>(guard: &NodeGuard<K>) -> i64 {
    i64::from(height_of(&guard.left)) - i64::from(height_of(&guard.right))
}

/// Single right rotation of the subtree owned by `slot`.
///
/// `pivot` guards the node stored in `slot`; its left child must be
/// present (guaranteed by the caller's balance check). The demoted pivot's
/// height is recomputed before the promoted child's, because the latter
/// depends on the former.
fn rotate_right<K>(slot: &mut Link<K>, pivot: &mut NodeGuard<K>) {
    let Some(x_arc) = pivot.left.take() else {
        return;
    };
    let mut x = lock(&x_arc);

    // x's right subtree crosses over to become the pivot's left.
    pivot.left = x.right.take();
    pivot.height = 1 + height_of(&pivot.left).max(height_of(&pivot.right));

    // The pivot descends to x's right; the slot now owns x.
    x.right = slot.take();
    x.height = 1 + height_of(&x.left).max(pivot.height);
    *slot = Some(x_arc);

    metrics::count_rotation();
}

/// Single left rotation of the subtree owned by `slot`. Mirror of
/// [`rotate_right`].
fn rotate_left<K>(slot: &mut Link<K>, pivot: &mut NodeGuard<K>) {
    let Some(x_arc) = pivot.right.take() else {
        return;
    };
    let mut x = lock(&x_arc);

    pivot.right = x.left.take();
    pivot.height = 1 + height_of(&pivot.left).max(height_of(&pivot.right));

    x.left = slot.take();
    x.height = 1 + height_of(&x.right).max(pivot.height);
    *slot = Some(x_arc);

    metrics::count_rotation();
}

/// The rebalance step: refresh the cached height of the node behind
/// `guard`, then repair any imbalance with one or two rotations.
///
/// The caller holds the lock of `slot`'s owner and `guard` itself; after
/// the call `slot` owns the (possibly new) subtree root.
pub(crate) fn rebalance_at<K>(slot: &mut Link<K>, guard: &mut NodeGuard<K>) {
    metrics::count_repair_step();

    let hl = height_of(&guard.left);
    let hr = height_of(&guard.right);
    guard.height = 1 + hl.max(hr);

    let balance = i64::from(hl) - i64::from(hr);

    if balance > 1 {
        // Left-heavy. hl >= 2, so the left child exists.
        let left_balance = match &guard.left {
            Some(left) => balance_of(&lock(left)),
            None => return,
        };

        if left_balance < 0 {
            // Left-right: rotate the left child left first.
            if let Some(left_arc) = guard.left.clone() {
                let mut left = lock(&left_arc);
                rotate_left(&mut guard.left, &mut left);
            }
        }
        rotate_right(slot, guard);
    } else if balance < -1 {
        // Right-heavy mirror.
        let right_balance = match &guard.right {
            Some(right) => balance_of(&lock(right)),
            None => return,
        };

        if right_balance > 0 {
            // Right-left: rotate the right child right first.
            if let Some(right_arc) = guard.right.clone() {
                let mut right = lock(&right_arc);
                rotate_right(&mut guard.right, &mut right);
            }
        }
        rotate_left(slot, guard);
    }
}

/// Bottom-up repair of a recorded ancestor path after a structural change.
///
/// `path` is the ancestor chain of the change point, outermost first, as
/// the cursor recorded it; `steps` caps how many of the deepest entries
/// are repaired (`path.len()` for the full walk, `1` for the deferred
/// remove policy). Ancestors are repaired deepest first; for each, the
/// owner's lock is re-acquired (the parent's node lock, or the tree's
/// root lock for the outermost entry), the recorded link is revalidated by
/// `Arc` identity, and only then is the ancestor itself locked and
/// rebalanced. Locks are released between steps, so the walk holds the
/// same root-to-leaf acquisition order as a descent.
///
/// Revalidation matters for more than staleness: a rotation may move a
/// node *above* its recorded parent, and locking the pair in the recorded
/// order would then run child-to-parent, the one order that can deadlock.
/// Checking the link under the parent's lock first makes that impossible -
/// while the parent is held, no rotation can lift the child past it.
pub(crate) fn repair_upward<K>(root_slot: &Mutex<Link<K>>, path: &[NodeRef<K>], steps: usize) {
    let start = path.len().saturating_sub(steps);
    for depth in (start..path.len()).rev() {
        let target = &path[depth];

        if depth == 0 {
            let mut slot = root_slot.lock();
            let still_root = matches!(&*slot, Some(root) if Arc::ptr_eq(root, target));
            if !still_root {
                metrics::count_repair_abandoned();
                debug_log!(depth, "repair walk abandoned: root slot changed");
                return;
            }

            let mut guard = lock(target);
            rebalance_at(&mut slot, &mut guard);
        } else {
            let parent = &path[depth - 1];
            let mut parent_guard = lock(parent);

            let dir = if matches!(&parent_guard.left, Some(c) if Arc::ptr_eq(c, target)) {
                Dir::Left
            } else if matches!(&parent_guard.right, Some(c) if Arc::ptr_eq(c, target)) {
                Dir::Right
            } else {
                metrics::count_repair_abandoned();
                debug_log!(depth, "repair walk abandoned: ancestor link went stale");
                return;
            };

            let mut guard = lock(target);
            rebalance_at(parent_guard.child_mut(dir), &mut guard);
        }
    }
}
