//! # Cryptographic Error Types
//!
//! Structured errors for hashing, note handling and the Merkle accumulator.

use shadow_core::{ErrorKind, FieldError};
use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// An input does not canonically encode a field element.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// The Poseidon hasher rejected its input (e.g. unsupported arity).
    #[error("Poseidon hash failed: {0}")]
    Poseidon(String),

    /// The accumulator already holds `2^depth` leaves.
    #[error("Merkle tree is full ({capacity} leaves)")]
    TreeFull {
        /// Maximum number of leaves.
        capacity: u64,
    },

    /// A leaf index that was never inserted.
    #[error("leaf index {index} out of range (tree has {leaf_count} leaves)")]
    IndexOutOfRange {
        /// The requested index.
        index: u64,
        /// Leaves present when the request was made.
        leaf_count: u64,
    },

    /// A root that is not in the retained history.
    #[error("root {0} is not among the retained roots")]
    UnknownRoot(String),

    /// Tree depth outside 1..=32.
    #[error("unsupported tree depth {0} (expected 1..=32)")]
    InvalidDepth(usize),

    /// Root history of size zero.
    #[error("root history size must be at least 1")]
    InvalidHistorySize,

    /// A stored root history holds more roots than its window.
    #[error("root history holds {len} roots, exceeds capacity {capacity}")]
    HistoryOverCapacity {
        /// Stored roots.
        len: usize,
        /// Window size.
        capacity: usize,
    },

    /// Stored root history entries are not in insertion order.
    #[error("root history entries are out of order")]
    HistoryOutOfOrder,

    /// A deposit note string could not be parsed.
    #[error("malformed deposit note: {0}")]
    MalformedNote(String),
}

impl CryptoError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Field(e) => e.kind(),
            Self::TreeFull { .. } => ErrorKind::TreeFull,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::UnknownRoot(_) => ErrorKind::UnknownRoot,
            Self::Poseidon(_)
            | Self::InvalidDepth(_)
            | Self::InvalidHistorySize
            | Self::HistoryOverCapacity { .. }
            | Self::HistoryOutOfOrder
            | Self::MalformedNote(_) => ErrorKind::Other,
        }
    }
}

impl From<light_poseidon::PoseidonError> for CryptoError {
    fn from(e: light_poseidon::PoseidonError) -> Self {
        Self::Poseidon(e.to_string())
    }
}
