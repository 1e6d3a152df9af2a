//! # `relaxed-avl`
//!
//! A concurrent, height-balanced binary search tree using per-node locks
//! and hand-over-hand (lock-coupling) traversal.
//!
//! Threads insert, remove, and query concurrently without a global
//! exclusion lock: every structural operation couples down the tree
//! holding at most two node locks at a time, and rebalancing walks the
//! changed path bottom-up under the same discipline. Balance is
//! *relaxed*-AVL: the search-tree order invariant holds at every quiescent
//! point, while the strict height bound may be transiently exceeded in a
//! region until a later operation passing through repairs it.
//!
//! | Operation | Guarantee |
//! |-----------|-----------|
//! | `insert`  | `false` on duplicate, full ancestor-path repair |
//! | `remove`  | returns the stored key, repair per [`RepairPolicy`] |
//! | `contains`| lock-coupled read, safe against concurrent rotation |
//!
//! ## Thread Safety
//!
//! `AvlTree<K>` is `Send + Sync` for `K: Send`; share it with an
//! [`Arc`](std::sync::Arc):
//!
//! ```rust
//! use relaxed_avl::AvlTree;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let tree = Arc::new(AvlTree::<u64>::new());
//! let handles: Vec<_> = (0..4)
//!     .map(|t| {
//!         let tree = Arc::clone(&tree);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 tree.insert(t * 100 + i);
//!             }
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(tree.len(), 400);
//! ```
//!
//! ## Repair Policies
//!
//! How far a remove propagates rebalancing is the [`RepairPolicy`]
//! parameter. [`EagerRepair`] (the default) repairs the full ancestor path
//! on every mutation; [`DeferredRepair`] lets removes repair only the
//! splice point ([`RelaxedAvlTree`] is the alias for that variant).
//!
//! ## Diagnostics
//!
//! Lock acquisitions, rotations, and repair-walk outcomes are counted by
//! the [`metrics`] collaborator (see [`get_lock_metrics`]). With the
//! `tracing` feature enabled, slow lock acquisitions and abandoned repair
//! walks are logged through the `tracing` crate.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod cursor;
mod node;
mod replace;
mod tracing_helpers;

pub mod metrics;
pub mod rebalance;
pub mod tree;

pub use metrics::{get_lock_metrics, reset_lock_metrics, LockMetrics};
pub use rebalance::{DeferredRepair, EagerRepair, RepairPolicy};
pub use tree::{AvlTree, RelaxedAvlTree};
