//! Error types for rowsync.

use std::fmt;

use thiserror::Error;

/// Which input of a diff an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The currently accepted sequence
    Old,
    /// The submitted sequence
    New,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Old => f.write_str("old"),
            Self::New => f.write_str("new"),
        }
    }
}

/// Errors that can occur while diffing, replaying or storing lists.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An input sequence contains the same identity key twice
    #[error("invalid {side} sequence: key {key} at index {index} duplicates index {duplicate_of}")]
    InvalidSequence {
        /// Sequence containing the duplicate
        side: Side,
        /// Debug rendering of the duplicated key
        key: String,
        /// Position of the second occurrence
        index: usize,
        /// Position of the first occurrence
        duplicate_of: usize,
    },

    /// A replayed operation addressed a row outside the list
    #[error("operation index {index} out of bounds for list of length {len}")]
    OutOfBounds {
        /// Offending index
        index: usize,
        /// List length at the time of the operation
        len: usize,
    },

    /// The diff computation panicked on a worker
    #[error("diff computation failed: {0}")]
    Computation(String),

    /// An executor could not be started
    #[error("executor error: {0}")]
    Executor(String),

    /// The completion was dropped before a result was delivered
    #[error("diff request abandoned before delivery")]
    Abandoned,

    /// Store rejected an insert because the key is taken
    #[error("store already contains key {0}")]
    DuplicateKey(String),

    /// Store has no row with this key
    #[error("store has no row with key {0}")]
    NotFound(String),
}

/// Result type alias for rowsync operations.
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Create a duplicate-key error for a diff input.
    pub fn invalid_sequence(side: Side, key: &impl fmt::Debug, index: usize, duplicate_of: usize) -> Self {
        Self::InvalidSequence {
            side,
            key: format!("{key:?}"),
            index,
            duplicate_of,
        }
    }

    /// Create a computation error from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self::Computation(msg)
    }

    /// Whether this error reports malformed diff input.
    pub fn is_invalid_sequence(&self) -> bool {
        matches!(self, Self::InvalidSequence { .. })
    }
}
