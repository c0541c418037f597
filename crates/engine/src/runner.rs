//! Scan job runner.

use crate::error::{ErrorKind, Result};
use crate::registry::{Outcome, Registry, StatusReport};
use crate::summary::summarize;
use crate::{ScanId, ScanRequest};
use exn::ResultExt;
use futures::{FutureExt, TryStreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tally_storage::{BackendHandle, BackendKind, CancellationToken, FileRecord};
use tally_store::{Repository, ScanJob};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::instrument;

/// An accepted scan, already running in the background.
#[derive(Debug)]
pub struct Submission {
    pub id: ScanId,
    /// The scan as it was registered (status `scanning`).
    pub job: ScanJob,
    /// Resolves once the scan has reached its terminal state.
    pub handle: JoinHandle<()>,
}

/// Submits scans and runs each one on its own Tokio task.
///
/// Cheap to clone; clones share the same [`Registry`] and result store.
#[derive(Clone, Debug)]
pub struct Scanner {
    registry: Arc<Registry>,
    repo: Repository,
    timeout: Option<Duration>,
}

impl Scanner {
    pub fn new(registry: Arc<Registry>, repo: Repository) -> Self {
        Self { registry, repo, timeout: None }
    }

    /// Stop every scan automatically once it has run for `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Validate a submission, build its enumerator and start the scan.
    ///
    /// Returns [`ErrorKind::Validation`] if the target is incomplete or no
    /// enumerator can be built for it; nothing is registered in that case.
    pub async fn submit(&self, request: ScanRequest) -> Result<Submission> {
        if request.target.is_empty() {
            exn::bail!(ErrorKind::Validation(format!("missing {} target", request.target.kind())));
        }
        let kind = request.target.kind();
        let enumerator = tally_storage::connect(kind.as_str(), &request.target)
            .await
            .map_err(|err| {
                let message = (*err).to_string();
                err.raise(ErrorKind::Validation(message))
            })?;
        self.submit_with(request, enumerator).await
    }

    /// Start a scan with an already built enumerator.
    ///
    /// The scan is registered (and can be polled or stopped) before this
    /// returns; everything else happens on a spawned task. The enumerator
    /// must walk the same kind of backend as the target.
    pub async fn submit_with(&self, request: ScanRequest, enumerator: BackendHandle) -> Result<Submission> {
        if request.target.is_empty() {
            exn::bail!(ErrorKind::Validation(format!("missing {} target", request.target.kind())));
        }
        if enumerator.kind() != request.target.kind() {
            exn::bail!(ErrorKind::Validation(format!(
                "{} enumerator cannot scan a {} target",
                enumerator.kind(),
                request.target.kind()
            )));
        }
        let id = ScanId::new();
        let started_at = OffsetDateTime::now_utc();
        let job = ScanJob::new(
            id.to_string(),
            request.target.kind(),
            request.display_name(started_at),
            request.target.descriptor(),
            request.target.location().map(str::to_string),
            started_at,
        );
        let cancel = CancellationToken::new();
        self.registry.insert(id, job.kind, &job.name, cancel.clone(), started_at).await?;
        tracing::info!(scan_id = %id, kind = %job.kind, target = %job.target, "Scan submitted");

        let handle = tokio::spawn(self.clone().run(id, job.clone(), enumerator, cancel));
        Ok(Submission { id, job, handle })
    }

    /// Live status of a scan, falling back to the result store for scans no
    /// longer held in memory.
    pub async fn status(&self, id: &ScanId) -> Result<Option<StatusReport>> {
        if let Some(status) = self.registry.status(id).await {
            return Ok(Some(status));
        }
        let job = self.repo.get_scan(&id.to_string()).await.map_err(ErrorKind::store)?;
        Ok(job.map(StatusReport::from))
    }

    /// Ask a running scan of the given kind to stop.
    ///
    /// See [`Registry::stop()`]. A scan that has already been pruned from
    /// memory is looked up in the result store: if it was submitted as
    /// `kind`, stopping it is a no-op that returns `Ok(false)`.
    pub async fn stop(&self, kind: BackendKind, id: &ScanId) -> Result<bool> {
        let err = match self.registry.stop(kind, id).await {
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => err,
            result => return result,
        };
        match self.repo.get_scan(&id.to_string()).await.map_err(ErrorKind::store)? {
            Some(job) if job.kind == kind => Ok(false),
            _ => Err(err),
        }
    }

    #[instrument(name = "scan", skip_all, fields(scan_id = %id, kind = %job.kind, enumerator = %enumerator.name()))]
    async fn run(self, id: ScanId, job: ScanJob, enumerator: BackendHandle, cancel: CancellationToken) {
        let watchdog = self.timeout.map(|timeout| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = tokio::time::sleep(timeout) => {
                        tracing::warn!(timeout_secs = timeout.as_secs(), "Scan timed out, stopping");
                        cancel.cancel();
                    },
                    () = cancel.cancelled() => {},
                }
            })
        });

        let execution = AssertUnwindSafe(self.execute(&job, &enumerator, &cancel)).catch_unwind().await;
        let outcome = match execution {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => self.fail(&job, (*err).to_string()).await,
            Err(panic) => self.fail(&job, format!("scan task panicked: {}", panic_message(&*panic))).await,
        };
        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
        self.registry.finish(&id, outcome).await;
    }

    async fn fail(&self, job: &ScanJob, message: String) -> Outcome {
        tracing::error!(error = %message, "Scan failed");
        // The scan row may never have been created; best effort.
        if let Err(store_err) = self.repo.fail(&job.id, &message).await {
            tracing::debug!(error = %*store_err, "Could not record failure in store");
        }
        Outcome::Failed(message)
    }

    async fn execute(&self, job: &ScanJob, enumerator: &BackendHandle, cancel: &CancellationToken) -> Result<Outcome> {
        self.repo.create(job).await.map_err(ErrorKind::store)?;

        let records: Vec<FileRecord> =
            enumerator.enumerate(cancel).try_collect().await.map_err(ErrorKind::enumeration)?;
        // Either the enumerator ended early because of the token, or it ran
        // to completion just as the token was set; both count as stopped.
        let stopped = cancel.is_cancelled();

        self.repo.append_files(&job.id, &records).await.map_err(ErrorKind::store)?;
        let files_found = u64::try_from(records.len()).or_raise(|| ErrorKind::Store("file count".to_string()))?;

        if stopped {
            self.repo.stop(&job.id).await.map_err(ErrorKind::store)?;
            tracing::info!(files = files_found, "Scan stopped");
            return Ok(Outcome::Stopped { files_found });
        }

        let totals = summarize(&records);
        self.repo.complete(&job.id, &totals).await.map_err(ErrorKind::store)?;
        tracing::info!(files = totals.file_count, bytes = totals.byte_count, "Scan completed");
        Ok(Outcome::Completed(totals))
    }
}

fn panic_message<'a>(panic: &'a (dyn Any + Send + 'static)) -> &'a str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}
