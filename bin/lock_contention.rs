//! Lock Contention Profiling Binary
//!
//! Profiles operation latency and the lock-acquisition counter to identify
//! contention outliers in concurrent tree workloads. When tracing is
//! enabled, slow lock acquisitions from the tree and slow ops from this
//! binary are written to a JSON log.
//!
//! Run with:
//! ```bash
//! # Without tracing (fast, just stats)
//! cargo run --release --bin lock_contention
//!
//! # With tracing (writes to logs/lock_contention.json)
//! RUST_LOG=relaxed_avl=warn,lock_contention=warn \
//!     cargo run --release --features tracing --bin lock_contention
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use relaxed_avl::{get_lock_metrics, reset_lock_metrics, AvlTree, LockMetrics};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(feature = "tracing")]
type TracingGuard = tracing_appender::non_blocking::WorkerGuard;

#[cfg(not(feature = "tracing"))]
type TracingGuard = ();

// =============================================================================
// Tracing Initialization (JSON to file)
// =============================================================================

#[cfg(feature = "tracing")]
fn init_json_tracing() -> TracingGuard {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_dir = "logs";
    let filter_str = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "relaxed_avl=warn,lock_contention=warn".to_string());

    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::never(log_dir, "lock_contention.json");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_thread_ids(true)
        .with_target(true)
        .with_ansi(false)
        .json()
        .with_filter(EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("warn")));

    let _ = tracing_subscriber::registry().with(file_layer).try_init();

    println!("Tracing enabled: logs/lock_contention.json (filter: {filter_str})");

    guard
}

#[cfg(not(feature = "tracing"))]
fn init_json_tracing() -> TracingGuard {
    println!("Tracing disabled (compile with --features tracing)");
}

// =============================================================================
// Operation Stats (Thread-Local + Aggregation)
// =============================================================================

/// Per-thread operation timing statistics
#[derive(Default)]
struct ThreadOpStats {
    /// Longest operation overall
    max_op_ns: u64,

    /// Number of slow ops (>1ms)
    slow_ops_1ms: u64,

    /// Number of very slow ops (>10ms)
    slow_ops_10ms: u64,

    /// Number of extremely slow ops (>100ms)
    slow_ops_100ms: u64,
}

impl ThreadOpStats {
    const fn record_op(&mut self, op_ns: u64) {
        if op_ns > self.max_op_ns {
            self.max_op_ns = op_ns;
        }

        if op_ns > 1_000_000 {
            self.slow_ops_1ms += 1;
        }

        if op_ns > 10_000_000 {
            self.slow_ops_10ms += 1;
        }

        if op_ns > 100_000_000 {
            self.slow_ops_100ms += 1;
        }
    }

    const fn merge(&mut self, other: &Self) {
        if other.max_op_ns > self.max_op_ns {
            self.max_op_ns = other.max_op_ns;
        }

        self.slow_ops_1ms += other.slow_ops_1ms;
        self.slow_ops_10ms += other.slow_ops_10ms;
        self.slow_ops_100ms += other.slow_ops_100ms;
    }
}

// =============================================================================
// Benchmark Runner
// =============================================================================

struct BenchmarkConfig {
    threads: usize,
    ops_per_thread: usize,
    /// Keys are drawn from `0..key_space`, so threads contend on an
    /// overlapping working set.
    key_space: u64,
}

struct RunResult {
    elapsed: Duration,
    stats: ThreadOpStats,
    metrics: LockMetrics,
}

/// Deterministic per-thread key sequence with heavy cross-thread overlap.
const fn workload_key(thread: usize, i: usize, key_space: u64) -> u64 {
    ((thread as u64 + 1)
        .wrapping_mul(i as u64)
        .wrapping_mul(0x9e37_79b9_7f4a_7c15))
        % key_space
}

fn run_benchmark(config: &BenchmarkConfig) -> RunResult {
    let tree = Arc::new(AvlTree::<u64>::new());
    reset_lock_metrics();

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let tree = Arc::clone(&tree);
            let ops = config.ops_per_thread;
            let key_space = config.key_space;

            thread::spawn(move || {
                let mut stats = ThreadOpStats::default();

                for i in 0..ops {
                    let key = workload_key(t, i, key_space);

                    let op_start = Instant::now();
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
                    let op_elapsed = op_start.elapsed().as_nanos() as u64;

                    stats.record_op(op_elapsed);

                    // Log extremely slow operations in real-time
                    if op_elapsed > 100_000_000 {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            thread = t,
                            op_index = i,
                            key,
                            elapsed_ms = op_elapsed as f64 / 1_000_000.0,
                            "SLOW_OP"
                        );

                        #[cfg(not(feature = "tracing"))]
                        eprintln!(
                            "[T{:02}] SLOW_OP: i={} key={} took {:.2}ms",
                            t,
                            i,
                            key,
                            op_elapsed as f64 / 1_000_000.0
                        );
                    }
                }

                stats
            })
        })
        .collect();

    // Collect and merge stats
    let mut merged = ThreadOpStats::default();
    for h in handles {
        let thread_stats = h.join().unwrap();
        merged.merge(&thread_stats);
    }

    let elapsed = start.elapsed();
    let metrics = get_lock_metrics();

    RunResult {
        elapsed,
        stats: merged,
        metrics,
    }
}

fn print_stats(config: &BenchmarkConfig, result: &RunResult, baseline: Duration) {
    let elapsed = result.elapsed;
    let stats = &result.stats;
    let metrics = result.metrics;

    let total_ops = config.threads * config.ops_per_thread;
    let ops_per_sec = total_ops as f64 / elapsed.as_secs_f64();

    println!("\n{}", "=".repeat(80));
    println!(
        "RESULTS: {} threads x {} ops = {} total (key space {})",
        config.threads, config.ops_per_thread, total_ops, config.key_space
    );
    println!("{}", "=".repeat(80));

    println!("\n--- Timing ---");
    println!("Elapsed:     {elapsed:?}");
    println!("Throughput:  {ops_per_sec:.0} ops/sec");

    println!("\n--- Operation Latency ---");
    println!(
        "Max op:      {:.2} ms",
        stats.max_op_ns as f64 / 1_000_000.0
    );
    println!("Slow >1ms:   {}", stats.slow_ops_1ms);
    println!("Slow >10ms:  {}", stats.slow_ops_10ms);
    println!("Slow >100ms: {}", stats.slow_ops_100ms);

    println!("\n--- Lock Metrics ---");
    println!("Acquisitions:      {}", metrics.lock_acquisitions);
    println!(
        "Acquisitions/op:   {:.2}",
        metrics.lock_acquisitions as f64 / total_ops as f64
    );
    println!("Rotations:         {}", metrics.rotations);
    println!("Repair steps:      {}", metrics.repair_steps);
    println!("Repairs abandoned: {}", metrics.repairs_abandoned);

    // Check for outliers
    let baseline_ms = baseline.as_secs_f64() * 1000.0;
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    if baseline_ms > 0.0 && elapsed_ms > baseline_ms * 3.0 {
        let ratio = elapsed_ms / baseline_ms;
        println!("\n!!! OUTLIER DETECTED: This run was ~{ratio:.1}x slower than median");
    }
}

// =============================================================================
// Main
// =============================================================================

fn main() {
    // Initialize JSON tracing to logs/lock_contention.json
    let _guard = init_json_tracing();

    println!("Lock Contention Profiling");
    println!("=========================\n");

    let configs = vec![BenchmarkConfig {
        threads: 16,
        ops_per_thread: 100_000,
        key_space: 1 << 16,
    }];

    for config in &configs {
        println!(
            "\nRunning: {} threads x {} ops (key space {})...",
            config.threads, config.ops_per_thread, config.key_space
        );

        // Run multiple iterations to catch outliers
        let mut results: Vec<RunResult> = Vec::new();
        for run in 1..=10 {
            print!("  Run {run}/10... ");
            std::io::Write::flush(&mut std::io::stdout()).unwrap();

            let result = run_benchmark(config);
            println!("{:?}", result.elapsed);

            results.push(result);
        }

        let baseline = {
            let mut sorted: Vec<Duration> = results.iter().map(|result| result.elapsed).collect();
            sorted.sort_by_key(Duration::as_nanos);
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 1 {
                sorted[mid]
            } else {
                let lo = sorted[mid - 1].as_secs_f64();
                let hi = sorted[mid].as_secs_f64();

                Duration::from_secs_f64(f64::midpoint(lo, hi))
            }
        };

        // Find the slowest run
        let (slowest_idx, slowest_result) = results
            .iter()
            .enumerate()
            .max_by_key(|(_, result)| result.elapsed.as_nanos())
            .unwrap();

        println!("\n>>> Slowest run was #{} <<<", slowest_idx + 1);
        println!("Baseline (median) run: {baseline:?}");
        print_stats(config, slowest_result, baseline);

        // Also print the fastest for comparison
        let (fastest_idx, fastest_result) = results
            .iter()
            .enumerate()
            .min_by_key(|(_, result)| result.elapsed.as_nanos())
            .unwrap();

        println!(
            "\nFastest run #{}: {:?} (ratio: {:.1}x)",
            fastest_idx + 1,
            fastest_result.elapsed,
            slowest_result.elapsed.as_secs_f64() / fastest_result.elapsed.as_secs_f64()
        );
    }
}
