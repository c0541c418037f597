//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only [`Validation`](ErrorKind::Validation) and
//! [`NotFound`](ErrorKind::NotFound) ever reach a caller synchronously;
//! everything else happens on the scan's own task and ends up as the
//! message of a failed scan.

use derive_more::{Display, Error};
use tally_storage::error::Error as StorageError;
use tally_store::error::Error as StoreError;

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The submission is missing its target or cannot be turned into an
    /// enumerator.
    #[display("invalid submission: {_0}")]
    Validation(#[error(not(source))] String),
    /// No scan with this id is registered (for this backend kind).
    #[display("scan not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// A freshly generated id was already registered.
    #[display("duplicate scan id: {_0}")]
    Duplicate(#[error(not(source))] String),
    /// The root could not be enumerated.
    #[display("enumeration failed: {_0}")]
    Enumeration(#[error(not(source))] String),
    /// The result store rejected a write or read.
    #[display("persistence failed: {_0}")]
    Store(#[error(not(source))] String),
}

impl ErrorKind {
    /// Wrap an enumerator error, keeping its error tree as a child.
    #[track_caller]
    pub fn enumeration(err: StorageError) -> Error {
        let message = (*err).to_string();
        err.raise(ErrorKind::Enumeration(message))
    }

    /// Wrap a result store error, keeping its error tree as a child.
    #[track_caller]
    pub fn store(err: StoreError) -> Error {
        let message = (*err).to_string();
        err.raise(ErrorKind::Store(message))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_enumeration_message() {
        let err = StorageError::from(tally_storage::error::ErrorKind::NotFound(PathBuf::from("/srv/missing")));
        let err = ErrorKind::enumeration(err);
        assert_eq!((*err).to_string(), "enumeration failed: not found: /srv/missing");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_store_message() {
        let err = StoreError::from(tally_store::error::ErrorKind::Duplicate("abc".to_string()));
        let err = ErrorKind::store(err);
        assert_eq!((*err).to_string(), "persistence failed: duplicate scan id: abc");
        assert!(err.is_retryable());
    }
}
