//! Common test utilities with tracing setup.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     // ... test code with tracing::info!, tracing::debug!, etc.
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Filter directives (e.g., `relaxed_avl=debug`)
//! - `RELAXED_AVL_LOG_DIR`: Log directory (default: `logs/`)
//! - `RELAXED_AVL_LOG_CONSOLE`: Set to "0" to disable console output
//!
//! Logs are written to `logs/relaxed_avl.jsonl` as newline-delimited JSON.

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Ensures tracing is only initialized once across all tests.
static INIT: Once = Once::new();

/// Initialize the tracing subscriber with file and console logging.
///
/// Safe to call multiple times - only the first call takes effect.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("relaxed_avl=info"));

        let log_dir =
            PathBuf::from(env::var("RELAXED_AVL_LOG_DIR").unwrap_or_else(|_| "logs".into()));
        let _ = std::fs::create_dir_all(&log_dir);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("relaxed_avl.jsonl"));

        let file_layer = file.ok().map(|file| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Arc::new(file))
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
        });

        let console = env::var("RELAXED_AVL_LOG_CONSOLE").map_or(true, |v| v != "0");
        let console_layer = console.then(|| {
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .compact()
        });

        let _ = Registry::default()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .try_init();
    });
}
