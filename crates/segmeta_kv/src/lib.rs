//! # segmeta KV
//!
//! Transactional key-value store contract for the segment catalog.
//!
//! The catalog never talks to a concrete store directly. It is handed a
//! [`TxnKv`] and issues plain, synchronous requests against it. Stores are
//! **opaque**: they know nothing about segments, field logs or channels.
//!
//! ## Design Principles
//!
//! - Keys are UTF-8 strings, values are opaque bytes
//! - Multi-key writes are atomic within one call and bounded by an
//!   operation-count ceiling
//! - Stores must be `Send + Sync`; the catalog holds no locks of its own
//!
//! ## Available Stores
//!
//! - [`InMemoryKv`] - Ordered in-memory store, enforces the transaction ceiling
//! - [`InstrumentedKv`] - Wrapper that records transactions and injects failures
//!
//! ## Example
//!
//! ```rust
//! use segmeta_kv::{InMemoryKv, TxnKv};
//!
//! let kv = InMemoryKv::new();
//! kv.save("meta/a", b"1").unwrap();
//! kv.save("meta/b", b"2").unwrap();
//!
//! let found = kv.load_with_prefix("meta/").unwrap();
//! assert_eq!(found.len(), 2);
//! assert_eq!(kv.load("meta/a").unwrap(), b"1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod instrumented;
mod kv;
mod memory;

pub use error::{KvError, KvResult};
pub use instrumented::{InstrumentedKv, TxnKind, TxnRecord};
pub use kv::{KvBatch, TxnKv, DEFAULT_MAX_TXN_OPS};
pub use memory::InMemoryKv;
