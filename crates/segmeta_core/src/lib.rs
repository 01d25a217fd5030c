//! # segmeta Core
//!
//! Persistent segment metadata catalog over a transactional key-value store.
//!
//! This crate provides:
//! - The catalog key space and its parsers
//! - Compact log path encoding, with explicit legacy paths still accepted
//! - Segment decomposition into header and field log records, and the
//!   reverse, including records written in the older monolithic layout
//! - Bounded multi-transaction writes for batches above the store's ceiling
//! - The [`Catalog`] façade: segment lifecycle, channel checkpoints and
//!   channel tombstones
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use segmeta_core::{Catalog, CatalogConfig, MsgPosition};
//! use segmeta_kv::InMemoryKv;
//!
//! let catalog = Catalog::new(Arc::new(InMemoryKv::new()), CatalogConfig::default()).unwrap();
//!
//! let position = MsgPosition { timestamp: 42, ..MsgPosition::default() };
//! catalog.save_channel_checkpoint("dml-0_v0", &position).unwrap();
//! assert_eq!(catalog.list_channel_checkpoints().unwrap()["dml-0_v0"], position);
//!
//! catalog.mark_channel_deleted("dml-0").unwrap();
//! assert!(catalog.is_channel_dropped("dml-0").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
mod catalog;
mod config;
mod error;
pub mod keys;
pub mod layout;
pub mod log_path;
mod types;

pub use batch::BatchWriter;
pub use catalog::Catalog;
pub use config::{CatalogConfig, DEFAULT_STORAGE_ROOT};
pub use error::{CatalogError, CatalogResult};
pub use keys::SegmentScope;
pub use layout::{DecomposedSegment, StoredSegment};
pub use log_path::{decode_log_path, encode_log_path, LogPath};
pub use types::{
    FieldLog, LogEntry, LogKind, MsgPosition, Segment, SegmentIdent, SegmentState, UniqueId,
};
