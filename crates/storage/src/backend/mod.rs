//! Source enumerator trait and implementations.
//!
//! This module defines the [`SourceEnumerator`] trait, which provides a
//! unified interface for listing every file below a root, regardless of where
//! that root lives (local filesystem, S3-compatible services, mounted shares).
//!

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(feature = "s3")]
mod s3;
mod share;
mod walk;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockBackend, MockFailure};
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
pub use self::share::ShareBackend;
use crate::error::Result;
use crate::record::FileRecord;
use crate::target::{BackendKind, Target};
use crate::BackendHandle;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) type FileRecordStream<'a> = Pin<Box<dyn Stream<Item = Result<FileRecord>> + Send + 'a>>;

/// Maximum number of records an enumerator produces between two looks at the
/// cancellation token.
pub const CHECK_INTERVAL: usize = 10;

/// Tracks how many records an enumerator has produced, and decides when it
/// should look at the cancellation token.
///
/// Enumerators look at the token before every [`CHECK_INTERVAL`]th record
/// and at every directory/page boundary.
pub(crate) struct Checkpoint<'a> {
    cancel: &'a CancellationToken,
    produced: usize,
}
impl<'a> Checkpoint<'a> {
    pub(crate) fn new(cancel: &'a CancellationToken) -> Self {
        Self { cancel, produced: 0 }
    }

    /// Call before yielding a record; `true` means stop now.
    pub(crate) fn before_record(&self) -> bool {
        self.produced % CHECK_INTERVAL == 0 && self.cancel.is_cancelled()
    }

    /// Call when crossing into a new directory or page; `true` means stop now.
    pub(crate) fn at_boundary(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn record(&mut self) {
        self.produced += 1;
    }

    pub(crate) fn produced(&self) -> usize {
        self.produced
    }
}

/// Unified interface for source enumerators.
///
/// Each implementation produces a lazy, cancellable sequence of
/// [`FileRecord`]s for the root it was constructed with.
///
/// # Contract
/// - Root-level failures ([`NotFound`](crate::error::ErrorKind::NotFound),
///   [`PermissionDenied`](crate::error::ErrorKind::PermissionDenied)) are
///   yielded as the **first** item, before any record.
/// - Individual unreadable entries below the root are skipped, not yielded
///   as errors.
/// - The cancellation token is checked at most every [`CHECK_INTERVAL`]
///   records and at least once per directory or page. When it fires, the
///   stream simply ends; records produced before that point stand.
/// - Directory or prefix markers are never yielded as records.
/// - Ordering is implementation-defined.
///
/// # Examples
///
/// ```
/// use futures::TryStreamExt;
/// use tally_storage::{CancellationToken, backend::SourceEnumerator, error::Result};
///
/// async fn total_bytes(source: &dyn SourceEnumerator) -> Result<u64> {
///     let cancel = CancellationToken::new();
///     let mut total = 0;
///     let mut stream = source.enumerate(&cancel);
///     while let Some(record) = stream.try_next().await? {
///         total += record.size;
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait SourceEnumerator: Send + Sync {
    /// Name of the enumerator, recorded on the scan's tracing span.
    fn name(&self) -> &str;

    /// Which family of backend this enumerator walks.
    fn kind(&self) -> BackendKind;

    /// Collect every record into a [`Vec`].
    ///
    /// Default implementation collects the results from
    /// [`enumerate()`](Self::enumerate).
    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<FileRecord>> {
        self.enumerate(cancel).try_collect().await
    }

    /// Stream every file below the root.
    fn enumerate<'a>(&'a self, cancel: &'a CancellationToken) -> FileRecordStream<'a>;
}

/// Build the enumerator for a target.
///
/// Construction does not touch the backend: a missing root is reported by
/// the first item of [`enumerate()`](SourceEnumerator::enumerate), not here.
pub async fn connect(name: impl Into<String>, target: &Target) -> Result<BackendHandle> {
    let name = name.into();
    let handle: BackendHandle = match target {
        Target::Local { path } => Arc::new(LocalBackend::new(name, path)?),
        Target::Share { path, share_name } => Arc::new(ShareBackend::new(name, path, share_name)?),
        #[cfg(feature = "s3")]
        Target::ObjectStore(store) => Arc::new(S3Backend::from_target(name, store).await?),
        #[cfg(not(feature = "s3"))]
        Target::ObjectStore(_) => exn::bail!(crate::error::ErrorKind::BackendError(
            "object store support is not enabled in this build".to_string()
        )),
    };
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_interval() {
        let cancel = CancellationToken::new();
        let mut checkpoint = Checkpoint::new(&cancel);
        assert!(!checkpoint.before_record());
        cancel.cancel();
        // Only every CHECK_INTERVAL-th record looks at the token.
        assert!(checkpoint.before_record());
        checkpoint.record();
        assert!(!checkpoint.before_record());
        assert!(checkpoint.at_boundary());
        for _ in 1..CHECK_INTERVAL {
            checkpoint.record();
        }
        assert_eq!(checkpoint.produced(), CHECK_INTERVAL);
        assert!(checkpoint.before_record());
    }

    #[tokio::test]
    async fn test_connect_local() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = Target::Local { path: temp_dir.path().to_path_buf() };
        let handle = connect("local", &target).await.unwrap();
        assert_eq!(handle.kind(), BackendKind::Local);
        assert_eq!(handle.name(), "local");
    }

    #[tokio::test]
    async fn test_connect_share() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = Target::Share { path: temp_dir.path().to_path_buf(), share_name: "Finance".to_string() };
        let handle = connect("share", &target).await.unwrap();
        assert_eq!(handle.kind(), BackendKind::NetworkShare);
    }
}
