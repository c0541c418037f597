//! Classification Error Types
//!
//! Classifying a file name can't fail; the only fallible operation is parsing
//! a stored category name back into a [`Category`](crate::Category).

use derive_more::{Display, Error};

/// A classification error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for classification operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The string does not name a known category.
    #[display("unknown category: {_0}")]
    UnknownCategory(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
