//! Filepath: src/cursor.rs
//!
//! Lock-coupling (hand-over-hand) traversal.
//!
//! [`Cursor`] owns the guard of the node it rests on and, optionally, the
//! guard of that node's parent. Advancing acquires the next node's lock
//! *before* the trailing lock is released, so at every instant at least one
//! lock along the active path is held and no concurrent operation can
//! unlink or relocate the subtree under the cursor. At most two node locks
//! are live at any moment.
//!
//! # Type-State
//! The guards are private and only move through the methods here, so
//! releasing out of hand-over-hand order is unrepresentable: there is no
//! way to drop the leading guard while keeping a trailing one, and no way
//! to acquire a node that is not a child of the held node.
//!
//! Every cursor records the `Arc`s of the nodes it passed, root first. The
//! caller turns that path into the bottom-up repair walk after a structural
//! change (see [`crate::rebalance::repair_upward`]).

use std::mem;

use crate::node::{lock, Dir, Link, Node, NodeGuard, NodeRef};

/// Retained guard of the current node's parent, plus the direction of the
/// slot pointing at the current node.
struct Parent<K> {
    guard: NodeGuard<K>,
    dir: Dir,
}

/// A hand-over-hand traversal in progress.
pub(crate) struct Cursor<K> {
    parent: Option<Parent<K>>,
    cur: NodeRef<K>,
    cur_guard: NodeGuard<K>,
    /// Ancestors of `cur`, outermost first.
    path: Vec<NodeRef<K>>,
}

impl<K> Cursor<K> {
    /// Starts a traversal at the root node of `root_slot`.
    ///
    /// Returns `None` for an empty tree. The caller must hold the tree's
    /// root lock across this call and release it afterwards, so the first
    /// node lock is acquired before the root pointer can change.
    pub(crate) fn start(root_slot: &Link<K>) -> Option<Self> {
        let root = root_slot.clone()?;
        let root_guard = lock(&root);

        Some(Self {
            parent: None,
            cur: root,
            cur_guard: root_guard,
            path: Vec::new(),
        })
    }

    /// Key of the current node.
    pub(crate) fn key(&self) -> &K {
        &self.cur_guard.key
    }

    /// Mutable access to the current node, lock held.
    pub(crate) fn node_mut(&mut self) -> &mut Node<K> {
        &mut self.cur_guard
    }

    /// Hand-over-hand step: lock the child in `dir`, then release the
    /// current node. Returns `false` (cursor unmoved) if the child is
    /// absent.
    pub(crate) fn advance(&mut self, dir: Dir) -> bool {
        let Some(child) = self.cur_guard.child(dir).clone() else {
            return false;
        };

        let child_guard = lock(&child);
        let prev_guard = mem::replace(&mut self.cur_guard, child_guard);
        let prev = mem::replace(&mut self.cur, child);
        drop(prev_guard);
        self.path.push(prev);

        true
    }

    /// Step that keeps the vacated node locked as the parent (used by
    /// remove, which must rewrite the parent's child slot on a match).
    /// The previously retained parent guard, if any, is released first, so
    /// no more than two locks are held at once.
    pub(crate) fn advance_tracking_parent(&mut self, dir: Dir) -> bool {
        let Some(child) = self.cur_guard.child(dir).clone() else {
            return false;
        };

        self.parent = None;
        let child_guard = lock(&child);
        let prev_guard = mem::replace(&mut self.cur_guard, child_guard);
        let prev = mem::replace(&mut self.cur, child);
        self.parent = Some(Parent {
            guard: prev_guard,
            dir,
        });
        self.path.push(prev);

        true
    }

    /// Finishes the traversal, releasing every held lock.
    ///
    /// Returns the full path walked, outermost first, *including* the
    /// current node - the ancestor chain of anything linked below the
    /// current node, ready for the upward repair walk.
    pub(crate) fn into_path(self) -> Vec<NodeRef<K>> {
        let Self {
            parent,
            cur,
            cur_guard,
            mut path,
        } = self;

        drop(cur_guard);
        drop(parent);
        path.push(cur);

        path
    }

    /// Dismantles the cursor for an unlink at the current node.
    ///
    /// Returns the retained parent guard with the direction of its slot
    /// pointing at the current node (`None` when the cursor never moved,
    /// i.e. the current node is the root), the current node's guard, and
    /// the ancestor path of the current node (current node *not*
    /// included - it is about to leave the tree).
    #[allow(clippy::type_complexity)]
    pub(crate) fn into_unlink_parts(
        self,
    ) -> (Option<(NodeGuard<K>, Dir)>, NodeGuard<K>, Vec<NodeRef<K>>) {
        let Self {
            parent,
            cur: _,
            cur_guard,
            path,
        } = self;

        let parent = parent.map(|p| (p.guard, p.dir));
        (parent, cur_guard, path)
    }
}
