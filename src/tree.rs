//! Filepath: src/tree.rs
//!
//! The concurrent relaxed-AVL tree.
//!
//! [`AvlTree<K, P>`] is the public handle: a root slot guarded by its own
//! mutex (the root has no parent node to lock) and an atomic element
//! count. Every operation takes the root lock only long enough to read or
//! replace the root pointer, then hands off to per-node lock coupling for
//! the rest of the walk; rebalancing runs bottom-up from the point of
//! change as the last step, after the operation's own locks are released.
//!
//! # Concurrency Model
//! Operations block on contended node locks and always complete; there are
//! no retries and no timeouts. Deadlock freedom comes from a single global
//! acquisition order - root lock, then nodes root-to-leaf - which descent,
//! replacement search, rotation, and the upward repair walk all follow.
//!
//! # Relaxed Balance
//! The binary-search-tree order invariant holds at every quiescent point.
//! The strict AVL height bound holds on any path an operation has just
//! repaired; elsewhere it may be transiently exceeded until a later
//! operation passes through the region (see [`crate::rebalance`]).
//!
//! # Example
//!
//! ```rust
//! use relaxed_avl::AvlTree;
//!
//! let tree: AvlTree<u64> = AvlTree::new();
//! assert!(tree.insert(5));
//! assert!(tree.insert(3));
//! assert!(!tree.insert(5)); // duplicate
//! assert!(tree.contains(&3));
//! assert_eq!(tree.remove(&3), Some(3));
//! assert_eq!(tree.len(), 1);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cursor::Cursor;
use crate::node::{height_of, lock, Dir, Link, Node, NodeGuard, NodeRef};
use crate::rebalance::{repair_upward, DeferredRepair, EagerRepair, RepairPolicy};
use crate::replace::{find_replacement, Replacement};

/// A thread-safe, height-balanced binary search tree with per-node locks.
///
/// Shared references suffice for every operation; wrap the tree in an
/// [`Arc`] to share it across threads.
///
/// The `P` parameter selects the [`RepairPolicy`]: how far remove
/// propagates rebalancing along the ancestor path. The default
/// [`EagerRepair`] repairs the full path on both insert and remove.
pub struct AvlTree<K, P = EagerRepair> {
    /// The root slot. Its mutex guards only this pointer; node fields are
    /// guarded by the nodes' own locks.
    root: Mutex<Link<K>>,

    /// Number of keys in the tree. Relaxed: exact at quiescent points,
    /// approximate while mutations are in flight.
    len: AtomicUsize,

    _policy: PhantomData<P>,
}

/// An [`AvlTree`] whose removes repair only the splice point, deferring
/// ancestor repair to later operations through the region.
pub type RelaxedAvlTree<K> = AvlTree<K, DeferredRepair>;

impl<K, P> AvlTree<K, P> {
    /// Creates an empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: Mutex::new(None),
            len: AtomicUsize::new(0),
            _policy: PhantomData,
        }
    }

    /// Number of keys in the tree.
    ///
    /// Exact when no mutation is in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(AtomicOrdering::Relaxed)
    }

    /// `true` if the tree holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Height of the tree: 0 when empty.
    ///
    /// Reads the root's cached height; like every cached height it is
    /// authoritative once the repair covering the last change completed.
    #[must_use]
    pub fn height(&self) -> u32 {
        let root = self.root.lock();
        height_of(&root)
    }

    /// Visits every key in ascending order.
    ///
    /// Locks each node briefly as it is visited, without coupling; the
    /// result is only a consistent snapshot when the tree is quiescent.
    /// Intended for debugging dumps and post-join verification.
    pub fn for_each_inorder<F>(&self, mut f: F)
    where
        F: FnMut(&K),
    {
        let root = self.root.lock();
        let mut cur: Link<K> = root.clone();
        drop(root);

        let mut stack: Vec<NodeRef<K>> = Vec::new();
        loop {
            while let Some(node) = cur {
                cur = lock(&node).left.clone();
                stack.push(node);
            }

            let Some(node) = stack.pop() else {
                break;
            };
            let guard = lock(&node);
            f(&guard.key);
            cur = guard.right.clone();
        }
    }

    /// Collects every key in ascending order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<K>
    where
        K: Clone,
    {
        let mut out = Vec::with_capacity(self.len());
        self.for_each_inorder(|key| out.push(key.clone()));
        out
    }
}

impl<K, P> AvlTree<K, P>
where
    K: Ord,
    P: RepairPolicy,
{
    /// Inserts `key`. Returns `false` (tree unchanged) if it was already
    /// present.
    ///
    /// Couples down to the insertion point, links the new leaf under the
    /// still-held parent lock, then repairs the recorded ancestor path
    /// bottom-up.
    pub fn insert(&self, key: K) -> bool {
        let mut root = self.root.lock();
        let Some(mut cursor) = Cursor::start(&root) else {
            // Empty tree: the new node becomes the root. Height 1,
            // trivially balanced, nothing to repair.
            *root = Some(Node::new_ref(key));
            drop(root);
            self.len.fetch_add(1, AtomicOrdering::Relaxed);
            return true;
        };
        drop(root);

        let dir = loop {
            match key.cmp(cursor.key()) {
                Ordering::Equal => return false,
                Ordering::Less => {
                    if !cursor.advance(Dir::Left) {
                        break Dir::Left;
                    }
                }
                Ordering::Greater => {
                    if !cursor.advance(Dir::Right) {
                        break Dir::Right;
                    }
                }
            }
        };

        {
            let parent = cursor.node_mut();
            *parent.child_mut(dir) = Some(Node::new_ref(key));
            parent.height = 1 + height_of(&parent.left).max(height_of(&parent.right));
        }
        self.len.fetch_add(1, AtomicOrdering::Relaxed);

        let path = cursor.into_path();
        repair_upward(&self.root, &path, path.len());

        true
    }

    /// `true` if `key` is in the tree.
    ///
    /// Read-only, but still couples locks downward: a plain unlocked walk
    /// could observe a rotation half-done.
    pub fn contains(&self, key: &K) -> bool {
        let root = self.root.lock();
        let Some(mut cursor) = Cursor::start(&root) else {
            return false;
        };
        drop(root);

        loop {
            match key.cmp(cursor.key()) {
                Ordering::Equal => return true,
                Ordering::Less => {
                    if !cursor.advance(Dir::Left) {
                        return false;
                    }
                }
                Ordering::Greater => {
                    if !cursor.advance(Dir::Right) {
                        return false;
                    }
                }
            }
        }
    }

    /// Removes `key`, returning the stored key if it was present.
    ///
    /// The root is a special first step: with no parent node to couple
    /// with, a root match rewrites the root slot under the still-held
    /// root lock. Otherwise the descent tracks the parent so the match's
    /// child slot can be rewritten and the replacement (in-order
    /// predecessor or successor) is spliced in. Repair then walks the
    /// ancestors of the *vacated* position - the slot the replacement was
    /// cut away from, the deepest structural change - as far as the
    /// [`RepairPolicy`] asks.
    pub fn remove(&self, key: &K) -> Option<K>
    where
        K: Clone,
    {
        let mut root = self.root.lock();
        let Some(mut cursor) = Cursor::start(&root) else {
            return None;
        };

        let mut probe = key.cmp(cursor.key());
        if probe == Ordering::Equal {
            let (_, mut victim, _) = cursor.into_unlink_parts();
            let removed = victim.key.clone();
            let (occupant, inner_path) = Self::splice_out(&mut victim);
            *root = occupant;
            drop(victim);
            drop(root);
            self.len.fetch_sub(1, AtomicOrdering::Relaxed);

            // The replacement, now the root, heads the repair path down to
            // the slot it was cut away from.
            repair_upward(&self.root, &inner_path, Self::repair_steps(inner_path.len()));
            return Some(removed);
        }
        drop(root);

        loop {
            let dir = match probe {
                Ordering::Less => Dir::Left,
                Ordering::Greater => Dir::Right,
                Ordering::Equal => break,
            };
            if !cursor.advance_tracking_parent(dir) {
                return None;
            }
            probe = key.cmp(cursor.key());
        }

        // Matched at a non-root node: the cursor advanced at least once,
        // so a parent guard is retained.
        let (parent, mut victim, mut path) = cursor.into_unlink_parts();
        let Some((mut parent_guard, dir)) = parent else {
            return None;
        };

        let removed = victim.key.clone();
        let (occupant, inner_path) = Self::splice_out(&mut victim);
        *parent_guard.child_mut(dir) = occupant;
        parent_guard.height =
            1 + height_of(&parent_guard.left).max(height_of(&parent_guard.right));
        drop(victim);
        drop(parent_guard);
        self.len.fetch_sub(1, AtomicOrdering::Relaxed);

        // Ancestors of the vacated position, root first: the victim's
        // ancestors, then the replacement standing in its place, then the
        // nodes down to the slot the replacement was cut away from.
        path.extend(inner_path);
        repair_upward(&self.root, &path, Self::repair_steps(path.len()));

        Some(removed)
    }

    /// Detaches the victim's replacement and hands it the victim's
    /// children. Returns the new occupant of the victim's slot (`None`
    /// when the victim was a leaf) plus the repair chain below the slot:
    /// the replacement followed by the nodes it was cut away from, root
    /// first. The victim's child links are cleared, so a stale traversal
    /// path can never re-enter the tree through the unlinked node.
    fn splice_out(victim: &mut NodeGuard<K>) -> (Link<K>, Vec<NodeRef<K>>) {
        match find_replacement(victim) {
            Some(rep) => {
                let Replacement {
                    node,
                    guard: mut rep_guard,
                    walked,
                } = rep;
                rep_guard.left = victim.left.take();
                rep_guard.right = victim.right.take();
                rep_guard.height =
                    1 + height_of(&rep_guard.left).max(height_of(&rep_guard.right));
                drop(rep_guard);

                let mut inner_path = Vec::with_capacity(walked.len() + 1);
                inner_path.push(node.clone());
                inner_path.extend(walked);
                (Some(node), inner_path)
            }
            None => (None, Vec::new()),
        }
    }

    /// How many of the deepest repair-path entries to walk, per policy.
    const fn repair_steps(path_len: usize) -> usize {
        if P::REPAIR_ANCESTORS_ON_REMOVE {
            path_len
        } else {
            1
        }
    }
}

impl<K, P> Default for AvlTree<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P> fmt::Debug for AvlTree<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvlTree")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<K, P> Drop for AvlTree<K, P> {
    fn drop(&mut self) {
        // Unique access: no operation is in flight, so no locks are
        // needed. Dismantle iteratively - the default recursive drop
        // would recurse once per tree level.
        let mut stack: Vec<NodeRef<K>> = self.root.get_mut().take().into_iter().collect();
        while let Some(node) = stack.pop() {
            if let Ok(mutex) = Arc::try_unwrap(node) {
                let inner = mutex.into_inner();
                stack.extend(inner.left);
                stack.extend(inner.right);
            }
        }
    }
}
