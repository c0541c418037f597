//! Errors raised while setting up or running the `tally` binary.

use derive_more::{Display, Error};

/// A process-level error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for process-level operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open the result store")]
    Store,
    #[display("HTTP server error")]
    Server,
    #[display("could not run scan")]
    Scan,
    #[display("scan failed: {_0}")]
    ScanFailed(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store | Self::Server)
    }
}
