//! Filepath: src/metrics.rs
//!
//! Process-wide diagnostic counters.
//!
//! The counters live outside the tree so the node stays a pure tree cell;
//! benchmark drivers read them instead of threading a counter through
//! every node. They use relaxed atomics: they are diagnostics, not
//! synchronization, and a torn snapshot across counters is acceptable.
//!
//! # Usage
//!
//! ```rust
//! use relaxed_avl::{get_lock_metrics, reset_lock_metrics, AvlTree};
//!
//! reset_lock_metrics();
//! let tree: AvlTree<u64> = AvlTree::new();
//! tree.insert(1);
//! tree.insert(2);
//! let metrics = get_lock_metrics();
//! assert!(metrics.lock_acquisitions > 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Node-lock acquisitions (the "throughput" counter of the benchmark
/// drivers). Does not include acquisitions of the tree's root lock.
static LOCK_ACQUISITIONS: AtomicU64 = AtomicU64::new(0);

/// Single rotations performed (a double rotation counts twice).
static ROTATIONS: AtomicU64 = AtomicU64::new(0);

/// Rebalance steps executed (height refresh, with or without rotation).
static REPAIR_STEPS: AtomicU64 = AtomicU64::new(0);

/// Upward repair walks abandoned because a recorded ancestor link went
/// stale under a concurrent restructure.
static REPAIRS_ABANDONED: AtomicU64 = AtomicU64::new(0);

/// Snapshot of all diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockMetrics {
    /// Node-lock acquisitions.
    pub lock_acquisitions: u64,
    /// Single rotations performed.
    pub rotations: u64,
    /// Rebalance steps executed.
    pub repair_steps: u64,
    /// Upward repair walks abandoned on a stale path.
    pub repairs_abandoned: u64,
}

#[inline]
pub(crate) fn count_lock_acquisition() {
    LOCK_ACQUISITIONS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn count_rotation() {
    ROTATIONS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn count_repair_step() {
    REPAIR_STEPS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn count_repair_abandoned() {
    REPAIRS_ABANDONED.fetch_add(1, Ordering::Relaxed);
}

/// Reads all counters.
#[must_use]
pub fn get_lock_metrics() -> LockMetrics {
    LockMetrics {
        lock_acquisitions: LOCK_ACQUISITIONS.load(Ordering::Relaxed),
        rotations: ROTATIONS.load(Ordering::Relaxed),
        repair_steps: REPAIR_STEPS.load(Ordering::Relaxed),
        repairs_abandoned: REPAIRS_ABANDONED.load(Ordering::Relaxed),
    }
}

/// Resets all counters to zero.
///
/// Counters are process-wide; resetting while other trees are active mixes
/// their activity into the next snapshot.
pub fn reset_lock_metrics() {
    LOCK_ACQUISITIONS.store(0, Ordering::Relaxed);
    ROTATIONS.store(0, Ordering::Relaxed);
    REPAIR_STEPS.store(0, Ordering::Relaxed);
    REPAIRS_ABANDONED.store(0, Ordering::Relaxed);
}
