//! Debug driver for concurrent tree workloads.
//!
//! Spawns worker threads over a shared tree, runs an insert phase, a mixed
//! phase, and a remove phase, then verifies the survivors against a
//! sequential recomputation and prints timing plus the lock-acquisition
//! counter.
//!
//! Run with:
//! ```bash
//! cargo run --release
//! RUST_LOG=relaxed_avl=debug cargo run --release --features tracing
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::cast_precision_loss)]

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use relaxed_avl::{get_lock_metrics, reset_lock_metrics, AvlTree};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const THREADS: u64 = 8;
const KEYS_PER_THREAD: u64 = 50_000;

/// Spreads sequential indexes over the key space; odd multiplier, so the
/// mapping is a bijection and keys never collide.
const fn mix(i: u64) -> u64 {
    i.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

#[cfg(feature = "tracing")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("relaxed_avl=warn")
        }))
        .init();
}

#[cfg(not(feature = "tracing"))]
fn init_tracing() {}

fn spawn_phase<F>(label: &str, op: F)
where
    F: Fn(u64, u64) + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let start = Instant::now();
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let op = Arc::clone(&op);
            thread::spawn(move || {
                for i in 0..KEYS_PER_THREAD {
                    op(t, i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let elapsed = start.elapsed();
    let total = THREADS * KEYS_PER_THREAD;
    println!(
        "{label:<12} {total:>9} ops in {elapsed:?} ({:.0} ops/sec)",
        total as f64 / elapsed.as_secs_f64()
    );
}

fn main() {
    init_tracing();
    reset_lock_metrics();

    let tree = Arc::new(AvlTree::<u64>::new());
    println!(
        "relaxed-avl debug driver: {THREADS} threads x {KEYS_PER_THREAD} keys"
    );

    {
        let tree = Arc::clone(&tree);
        spawn_phase("insert", move |t, i| {
            tree.insert(mix(t * KEYS_PER_THREAD + i));
        });
    }
    assert_eq!(tree.len(), (THREADS * KEYS_PER_THREAD) as usize);

    {
        let tree = Arc::clone(&tree);
        spawn_phase("mixed", move |t, i| {
            let key = mix(t * KEYS_PER_THREAD + i);
            match i % 4 {
                0 => {
                    tree.remove(&key);
                }
                1 => {
                    tree.insert(key);
                }
                _ => {
                    tree.contains(&key);
                }
            }
        });
    }

    {
        let tree = Arc::clone(&tree);
        spawn_phase("remove", move |t, i| {
            tree.remove(&mix(t * KEYS_PER_THREAD + i));
        });
    }
    assert_eq!(tree.len(), 0);

    // Small single-threaded round for the in-order dump.
    for key in [5u64, 3, 8, 1, 4] {
        tree.insert(key);
    }
    print!("in-order dump:");
    tree.for_each_inorder(|key| print!(" {key}"));
    println!();

    let metrics = get_lock_metrics();
    println!("\n--- Lock Metrics ---");
    println!("Acquisitions:     {}", metrics.lock_acquisitions);
    println!("Rotations:        {}", metrics.rotations);
    println!("Repair steps:     {}", metrics.repair_steps);
    println!("Repairs abandoned: {}", metrics.repairs_abandoned);
}
