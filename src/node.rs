//! Filepath: src/node.rs
//!
//! Lockable tree node.
//!
//! [`Node`] is the tree cell: a key, two owned child links, and a cached
//! subtree height, all guarded by the `parking_lot::Mutex` wrapping the node.
//! The mutex *is* the per-node lock of the fine-grained locking protocol;
//! no field is read or written without it.
//!
//! # Concurrency Model
//! Locks are acquired through [`lock`], which returns an *owning* guard
//! (`ArcMutexGuard`, via `parking_lot`'s `arc_lock` feature). An owning
//! guard keeps its node alive on its own, so hand-over-hand traversal can
//! release the trailing guard without any borrow tying it to the leading
//! one. Every acquisition is counted by the [`crate::metrics`] collaborator.
//!
//! # Ownership
//! A node is owned by exactly one slot: its parent's `left`/`right` link or
//! the tree's root slot. `Arc` clones held by in-flight operations (cursor
//! paths, guards) are transient and never outlive the operation.

use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use crate::metrics;

/// Shared handle to a lockable node.
pub(crate) type NodeRef<K> = Arc<Mutex<Node<K>>>;

/// An optional owned subtree. `None` is the empty subtree.
pub(crate) type Link<K> = Option<NodeRef<K>>;

/// Owning lock guard for a node.
///
/// Holds its own `Arc`, so the guard stays valid while locals move around.
pub(crate) type NodeGuard<K> = ArcMutexGuard<RawMutex, Node<K>>;

/// Descent direction out of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dir {
    Left,
    Right,
}

/// A binary search tree cell.
///
/// `height` caches the height of the subtree rooted here: 0 for an absent
/// subtree, `1 + max(height(left), height(right))` otherwise. It must be
/// recomputed (under this node's lock) whenever a child link changes.
#[derive(Debug)]
pub(crate) struct Node<K> {
    pub(crate) key: K,
    pub(crate) left: Link<K>,
    pub(crate) right: Link<K>,
    pub(crate) height: u32,
}

impl<K> Node<K> {
    /// Creates a detached leaf node holding `key`.
    pub(crate) const fn new(key: K) -> Self {
        Self {
            key,
            left: None,
            right: None,
            height: 1,
        }
    }

    /// Creates a shareable leaf node holding `key`.
    pub(crate) fn new_ref(key: K) -> NodeRef<K> {
        Arc::new(Mutex::new(Self::new(key)))
    }

    /// The child link in direction `dir`.
    pub(crate) const fn child(&self, dir: Dir) -> &Link<K> {
        match dir {
            Dir::Left => &self.left,
            Dir::Right => &self.right,
        }
    }

    /// Mutable child link in direction `dir`.
    pub(crate) const fn child_mut(&mut self, dir: Dir) -> &mut Link<K> {
        match dir {
            Dir::Left => &mut self.left,
            Dir::Right => &mut self.right,
        }
    }
}

/// Acquires a node's lock, counting the acquisition.
///
/// Blocks until the lock is available. With the `tracing` feature enabled,
/// acquisitions that had to wait longer than one millisecond are logged.
#[inline]
pub(crate) fn lock<K>(node: &NodeRef<K>) -> NodeGuard<K> {
    metrics::count_lock_acquisition();

    #[cfg(feature = "tracing")]
    {
        if let Some(guard) = node.try_lock_arc() {
            return guard;
        }

        let start = std::time::Instant::now();
        let guard = node.lock_arc();
        let waited = start.elapsed();
        if waited.as_millis() >= 1 {
            crate::tracing_helpers::warn_log!(
                waited_us = waited.as_micros() as u64,
                "SLOW_LOCK"
            );
        }
        return guard;
    }

    #[cfg(not(feature = "tracing"))]
    node.lock_arc()
}

/// Cached height of an optional subtree.
///
/// Locks the child for the read; the child's `height` field is guarded by
/// the child's own lock, same as every other field.
#[inline]
pub(crate) fn height_of<K>(link: &Link<K>) -> u32 {
    link.as_ref().map_or(0, |node| lock(node).height)
}
