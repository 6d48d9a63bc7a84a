//! Error types for Ripple snapshots.

use crate::key::Key;
use core::fmt;

/// Result type alias for Ripple operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for snapshot construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Key list length differs from value list length.
    LengthMismatch {
        values: usize,
        keys: usize,
    },
    /// The same key appears twice in one key list.
    DuplicateKey {
        key: Key,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LengthMismatch { values, keys } => {
                write!(
                    f,
                    "Key list length mismatch: {} values, {} keys",
                    values, keys
                )
            }
            Error::DuplicateKey { key } => {
                write!(f, "Duplicate key in snapshot: {}", key)
            }
        }
    }
}

impl Error {
    /// Creates a length mismatch error.
    pub fn length_mismatch(values: usize, keys: usize) -> Self {
        Error::LengthMismatch { values, keys }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(key: impl Into<Key>) -> Self {
        Error::DuplicateKey { key: key.into() }
    }
}
