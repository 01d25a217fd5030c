//! # segmeta Testkit
//!
//! Test utilities for segmeta.
//!
//! This crate provides:
//! - Segment fixtures shaped like the records a data coordinator writes
//! - Catalog harnesses over a recording in-memory store
//! - Property-based test generators using proptest
//! - Opt-in log output for tests
//!
//! ## Usage
//!
//! ```rust
//! use segmeta_testkit::prelude::*;
//!
//! let harness = TestCatalog::new();
//! harness.catalog.add_segment(&flushed_segment()).unwrap();
//! assert_eq!(harness.kv.saved_key_count(), 4);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_test_tracing;
}

pub use fixtures::*;
pub use generators::*;

static TRACING: Once = Once::new();

/// Installs a test-friendly `tracing` subscriber once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`, so row count
/// corrections and partial commits show up in failing test output.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
