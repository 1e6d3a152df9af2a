//! Benchmarks for the concurrent tree using Divan.
//!
//! Run with: `cargo bench --bench tree`

#![allow(clippy::cast_possible_truncation)]

use divan::{black_box, Bencher};
use relaxed_avl::{AvlTree, RelaxedAvlTree};
use std::sync::atomic::{AtomicU64, Ordering};

fn main() {
    divan::main();
}

const SIZES: &[u64] = &[1_000, 10_000, 100_000];

/// Spreads sequential indexes over the key space.
const fn mix(i: u64) -> u64 {
    i.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

// =============================================================================
// Construction
// =============================================================================

#[divan::bench_group]
mod construction {
    use super::{AvlTree, RelaxedAvlTree};

    #[divan::bench]
    fn new_eager() -> AvlTree<u64> {
        AvlTree::new()
    }

    #[divan::bench]
    fn new_deferred() -> RelaxedAvlTree<u64> {
        RelaxedAvlTree::new()
    }
}

// =============================================================================
// Single-Threaded Operations
// =============================================================================

#[divan::bench(args = SIZES)]
fn insert_scattered(bencher: Bencher, n: u64) {
    bencher.bench(|| {
        let tree = AvlTree::<u64>::new();
        for i in 0..n {
            tree.insert(black_box(mix(i)));
        }
        tree
    });
}

#[divan::bench(args = SIZES)]
fn insert_ascending(bencher: Bencher, n: u64) {
    bencher.bench(|| {
        let tree = AvlTree::<u64>::new();
        for i in 0..n {
            tree.insert(black_box(i));
        }
        tree
    });
}

#[divan::bench(args = SIZES)]
fn contains_hit(bencher: Bencher, n: u64) {
    let tree = AvlTree::<u64>::new();
    for i in 0..n {
        tree.insert(mix(i));
    }

    let mut i = 0u64;
    bencher.bench_local(move || {
        i = i.wrapping_add(1);
        tree.contains(black_box(&mix(i % n)))
    });
}

#[divan::bench(args = SIZES)]
fn contains_miss(bencher: Bencher, n: u64) {
    let tree = AvlTree::<u64>::new();
    for i in 0..n {
        tree.insert(mix(i));
    }

    let mut i = 0u64;
    bencher.bench_local(move || {
        i = i.wrapping_add(1);
        // Odd offset never collides with the mixed insert keys.
        tree.contains(black_box(&mix(n + i % n)))
    });
}

#[divan::bench(args = SIZES)]
fn remove_then_reinsert(bencher: Bencher, n: u64) {
    let tree = AvlTree::<u64>::new();
    for i in 0..n {
        tree.insert(mix(i));
    }

    let mut i = 0u64;
    bencher.bench_local(move || {
        i = i.wrapping_add(1);
        let key = mix(i % n);
        let removed = tree.remove(black_box(&key));
        tree.insert(key);
        removed
    });
}

// =============================================================================
// Concurrent Scaling
// =============================================================================

#[divan::bench(threads = [1, 2, 4, 8])]
fn concurrent_mixed(bencher: Bencher) {
    const KEY_SPACE: u64 = 1 << 16;

    let tree = AvlTree::<u64>::new();
    for i in 0..KEY_SPACE / 2 {
        tree.insert(mix(i) % KEY_SPACE);
    }

    let ticket = AtomicU64::new(0);
    bencher.bench(|| {
        let i = ticket.fetch_add(1, Ordering::Relaxed);
        let key = mix(i) % KEY_SPACE;
        match i % 4 {
            0 => {
                tree.insert(key);
            }
            1 => {
                tree.remove(&key);
            }
            _ => {
                tree.contains(&key);
            }
        }
    });
}

#[divan::bench(threads = [1, 2, 4, 8])]
fn concurrent_reads(bencher: Bencher) {
    const KEY_SPACE: u64 = 1 << 16;

    let tree = AvlTree::<u64>::new();
    for i in 0..KEY_SPACE {
        tree.insert(mix(i) % KEY_SPACE);
    }

    let ticket = AtomicU64::new(0);
    bencher.bench(|| {
        let i = ticket.fetch_add(1, Ordering::Relaxed);
        tree.contains(black_box(&(mix(i) % KEY_SPACE)))
    });
}
