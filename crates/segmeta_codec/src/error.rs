//! Record codec errors.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// A catalog record could not be turned into bytes or back.
///
/// `record` is the Rust type name of the record involved, so a corrupt
/// segment header and a corrupt checkpoint are told apart in logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The record does not serialize.
    #[error("cannot encode {record} record: {reason}")]
    Unencodable {
        /// Type name of the record.
        record: &'static str,
        /// Serializer message.
        reason: String,
    },

    /// A stored value is empty where a record was expected.
    #[error("stored {record} record is empty")]
    EmptyValue {
        /// Type name of the expected record.
        record: &'static str,
    },

    /// A stored value is not valid CBOR or has the wrong shape.
    #[error("corrupt {record} record: {reason}")]
    Corrupt {
        /// Type name of the expected record.
        record: &'static str,
        /// Deserializer message.
        reason: String,
    },
}

impl CodecError {
    pub(crate) fn unencodable<T: ?Sized, E: ToString>(reason: E) -> Self {
        Self::Unencodable {
            record: std::any::type_name::<T>(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn empty_value<T>() -> Self {
        Self::EmptyValue {
            record: std::any::type_name::<T>(),
        }
    }

    pub(crate) fn corrupt<T, E: ToString>(reason: E) -> Self {
        Self::Corrupt {
            record: std::any::type_name::<T>(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the failure came from reading a stored value.
    #[must_use]
    pub fn is_corrupt_record(&self) -> bool {
        matches!(self, Self::EmptyValue { .. } | Self::Corrupt { .. })
    }
}
