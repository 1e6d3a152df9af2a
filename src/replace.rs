//! Filepath: src/replace.rs
//!
//! Replacement selection for remove.
//!
//! Deleting an internal node leaves a hole; the replacement is its in-order
//! predecessor (maximum of the left subtree) or, when there is no left
//! subtree, its in-order successor (minimum of the right subtree). The
//! extreme node is reached by coupled descent inside the victim's subtree
//! and unlinked from its old slot, with its only possible child spliced
//! into the gap it leaves.
//!
//! The victim's lock is held by the caller for the whole selection; the
//! descent below it holds at most two additional locks at a time, coupled
//! exactly like a tree-level traversal.

use std::mem;

use crate::node::{height_of, lock, Dir, NodeGuard, NodeRef};

/// A selected replacement, detached from its old slot.
pub(crate) struct Replacement<K> {
    /// The replacement node itself.
    pub(crate) node: NodeRef<K>,

    /// Its guard, still held, so the node is never observable outside the
    /// tree unlocked.
    pub(crate) guard: NodeGuard<K>,

    /// The nodes walked between the victim (exclusive) and the
    /// replacement (exclusive), outermost first. After the splice these
    /// sit below the replacement; together they are the inner half of the
    /// remove's repair path, down to the parent the replacement was cut
    /// away from.
    pub(crate) walked: Vec<NodeRef<K>>,
}

/// Selects and unlinks the replacement for the node behind `victim`.
///
/// `None` means the victim is a leaf and has no replacement.
pub(crate) fn find_replacement<K>(victim: &mut NodeGuard<K>) -> Option<Replacement<K>> {
    if victim.left.is_some() {
        unlink_extreme(victim, Dir::Left)
    } else if victim.right.is_some() {
        unlink_extreme(victim, Dir::Right)
    } else {
        None
    }
}

/// Descends the `side` subtree of the victim to its far end (right-most
/// for the left subtree, left-most for the right) and unlinks that node.
///
/// The extreme node has no child in the walk direction; its child on the
/// `side` direction, if any, is spliced into the vacated slot. The spliced
/// grandchild itself is not locked - none of its fields change, only its
/// owner.
fn unlink_extreme<K>(victim: &mut NodeGuard<K>, side: Dir) -> Option<Replacement<K>> {
    let walk = match side {
        Dir::Left => Dir::Right,
        Dir::Right => Dir::Left,
    };

    let mut cur = victim.child(side).clone()?;
    let mut cur_guard = lock(&cur);
    let mut parent: Option<NodeGuard<K>> = None;
    let mut walked: Vec<NodeRef<K>> = Vec::new();

    loop {
        let Some(next) = cur_guard.child(walk).clone() else {
            break;
        };

        // Trailing lock goes first, then couple onto the next node.
        parent = None;
        let next_guard = lock(&next);
        let prev_guard = mem::replace(&mut cur_guard, next_guard);
        walked.push(mem::replace(&mut cur, next));
        parent = Some(prev_guard);
    }

    // Unlink the extreme node, splicing its inner child into the gap.
    let spare = cur_guard.child_mut(side).take();
    match parent {
        None => {
            // The replacement is the victim's direct child.
            *victim.child_mut(side) = spare;
        }
        Some(mut parent_guard) => {
            *parent_guard.child_mut(walk) = spare;
            parent_guard.height =
                1 + height_of(&parent_guard.left).max(height_of(&parent_guard.right));
        }
    }

    Some(Replacement {
        node: cur,
        guard: cur_guard,
        walked,
    })
}
