//! In-memory source enumerator for testing.

use super::{Checkpoint, FileRecordStream};
use crate::error::ErrorKind;
use crate::{BackendKind, FileRecord, SourceEnumerator};
use async_stream::stream;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

/// Root-level failure a [`MockBackend`] reports instead of any record.
#[derive(Clone, Debug)]
pub enum MockFailure {
    NotFound,
    PermissionDenied,
    Backend(String),
}

/// In-memory source enumerator for testing.
///
/// Behaves like a real enumerator as far as callers can tell: records are
/// classified the same way, prefix markers are skipped and the cancellation
/// token is honoured at the same interval.
///
/// # Examples
///
/// ```
/// use tally_storage::{CancellationToken, backend::{MockBackend, SourceEnumerator}};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("docs/a.pdf", 10), ("docs/b.txt", 20)]);
/// let files = backend.list(&CancellationToken::new()).await?;
/// assert_eq!(files.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MockBackend {
    name: String,
    kind: BackendKind,
    files: Vec<(String, u64)>,
    failure: Option<MockFailure>,
    delay: Option<Duration>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with `(key, size)` pairs.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, u64)>) -> Self {
        Self {
            name: "mock".to_string(),
            kind: BackendKind::Local,
            files: files.into_iter().map(|(key, size)| (key.into(), size)).collect(),
            failure: None,
            delay: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    /// Fail at the root instead of producing records.
    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Sleep before producing each record, to give tests time to stop a scan.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn record(&self, key: &str, size: u64) -> FileRecord {
        let name = key.rsplit('/').next().unwrap_or(key);
        FileRecord::new(self.kind, name, format!("mock://{key}"), size, Some(OffsetDateTime::UNIX_EPOCH))
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, u64); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl SourceEnumerator for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn enumerate<'a>(&'a self, cancel: &'a CancellationToken) -> FileRecordStream<'a> {
        Box::pin(stream! {
            if let Some(failure) = &self.failure {
                let root = PathBuf::from(&self.name);
                let kind = match failure {
                    MockFailure::NotFound => ErrorKind::NotFound(root),
                    MockFailure::PermissionDenied => ErrorKind::PermissionDenied(root),
                    MockFailure::Backend(message) => ErrorKind::BackendError(message.clone()),
                };
                yield Err(exn::Exn::from(kind));
                return;
            }
            let mut checkpoint = Checkpoint::new(cancel);
            for (key, size) in &self.files {
                if key.ends_with('/') {
                    continue;
                }
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if checkpoint.before_record() {
                    break;
                }
                yield Ok(self.record(key, *size));
                checkpoint.record();
            }
        })
    }
}
