//! Local filesystem source enumerator.
//!
//! Walks a directory tree on the local filesystem using `tokio::fs` for
//! async I/O.

use crate::backend::FileRecordStream;
use crate::backend::walk::Walk;
use crate::error::{ErrorKind, Result};
use crate::{BackendKind, SourceEnumerator};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Local filesystem source enumerator.
///
/// Produces a record for every regular file below the configured root.
/// Symlinks are not followed.
///
/// # Examples
///
/// ```no_run
/// use tally_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("documents", "/srv/documents")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem enumerator.
    ///
    /// The root is not touched until enumeration starts, so a missing root
    /// is reported by [`enumerate()`](SourceEnumerator::enumerate) instead.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the root is empty.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if root.as_os_str().is_empty() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { name: name.into(), root })
    }
}

#[async_trait]
impl SourceEnumerator for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn enumerate<'a>(&'a self, cancel: &'a CancellationToken) -> FileRecordStream<'a> {
        Walk { root: &self.root, kind: BackendKind::Local, location: None }.stream(cancel)
    }
}
