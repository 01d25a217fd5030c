//! # segmeta Codec
//!
//! Value encoding for every record the catalog persists.
//!
//! Records are plain `serde` types encoded as CBOR. Struct fields are written
//! in declaration order, so identical records produce identical bytes, which
//! keeps batch contents stable between runs.
//!
//! ## Usage
//!
//! ```
//! use segmeta_codec::{Decode, Encode};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Position {
//!     channel: String,
//!     timestamp: u64,
//! }
//!
//! let pos = Position { channel: "dml-0".into(), timestamp: 1000 };
//! let bytes = pos.encode().unwrap();
//! assert_eq!(Position::decode(&bytes).unwrap(), pos);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;

pub use cbor::{from_cbor, to_cbor};
pub use error::{CodecError, CodecResult};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait for types that can be encoded to CBOR.
pub trait Encode {
    /// Encode this value to CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from CBOR.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl<T: Serialize> Encode for T {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_cbor(self)
    }
}

impl<T: DeserializeOwned> Decode for T {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}
