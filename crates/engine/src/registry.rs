//! Live state of every scan this process knows about.

use crate::ScanId;
use crate::error::{ErrorKind, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tally_storage::{BackendKind, CancellationToken};
use tally_store::{ScanJob, ScanStatus, ScanTotals};
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// How a scan ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Completed(ScanTotals),
    Failed(String),
    /// Cancelled after `files_found` records had been produced.
    Stopped { files_found: u64 },
}

#[derive(Debug)]
struct Entry {
    kind: BackendKind,
    name: String,
    status: ScanStatus,
    cancel: CancellationToken,
    result: Option<ScanTotals>,
    error: Option<String>,
    files_found: Option<u64>,
    started_at: OffsetDateTime,
    ended_at: Option<OffsetDateTime>,
}

/// Point-in-time view of one scan, as reported to pollers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusReport {
    #[serde(rename = "id")]
    pub scan_id: String,
    #[serde(rename = "backend_kind")]
    pub kind: BackendKind,
    pub name: String,
    pub status: ScanStatus,
    /// Present once the scan has completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanTotals>,
    /// Present once the scan has failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Records produced before the scan ended (completed or stopped).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_found: Option<u64>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    pub duration_seconds: Option<f64>,
}
impl StatusReport {
    fn new(id: &ScanId, entry: &Entry) -> Self {
        Self {
            scan_id: id.to_string(),
            kind: entry.kind,
            name: entry.name.clone(),
            status: entry.status,
            result: entry.result.clone(),
            error: entry.error.clone(),
            files_found: entry.files_found,
            started_at: entry.started_at,
            ended_at: entry.ended_at,
            duration_seconds: entry.ended_at.map(|ended| (ended - entry.started_at).as_seconds_f64()),
        }
    }
}
impl From<ScanJob> for StatusReport {
    /// Status of a scan that is no longer held in memory.
    fn from(job: ScanJob) -> Self {
        let duration_seconds = job.duration_seconds();
        Self {
            scan_id: job.id,
            kind: job.kind,
            name: job.name,
            status: job.status,
            files_found: job.totals.as_ref().map(|t| t.file_count),
            result: job.totals,
            error: job.error,
            started_at: job.started_at,
            ended_at: job.ended_at,
            duration_seconds,
        }
    }
}

/// Process-wide map from scan id to live scan state.
///
/// Created once at startup and shared (behind an `Arc`) with whatever needs
/// it. All state of an entry is guarded by one lock over the whole map, so a
/// reader never sees a half-finished transition such as `completed` without
/// its result.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<HashMap<ScanId, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new scan in the `scanning` state.
    pub async fn insert(
        &self,
        id: ScanId,
        kind: BackendKind,
        name: impl Into<String>,
        cancel: CancellationToken,
        started_at: OffsetDateTime,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&id) {
            exn::bail!(ErrorKind::Duplicate(id.to_string()));
        }
        let entry = Entry {
            kind,
            name: name.into(),
            status: ScanStatus::Scanning,
            cancel,
            result: None,
            error: None,
            files_found: None,
            started_at,
            ended_at: None,
        };
        entries.insert(id, entry);
        Ok(())
    }

    pub async fn status(&self, id: &ScanId) -> Option<StatusReport> {
        self.entries.read().await.get(id).map(|entry| StatusReport::new(id, entry))
    }

    /// Ask a scan of the given backend kind to stop.
    ///
    /// Idempotent: returns `Ok(true)` if the scan is still running (its
    /// cancellation token is now set), `Ok(false)` if it already reached a
    /// terminal state. A scan registered under another kind is not found.
    pub async fn stop(&self, kind: BackendKind, id: &ScanId) -> Result<bool> {
        let entries = self.entries.read().await;
        let Some(entry) = entries.get(id).filter(|entry| entry.kind == kind) else {
            exn::bail!(ErrorKind::NotFound(id.to_string()));
        };
        if entry.status.is_terminal() {
            return Ok(false);
        }
        entry.cancel.cancel();
        tracing::info!(scan_id = %id, %kind, "Stop requested");
        Ok(true)
    }

    /// Move a scan to its terminal state.
    ///
    /// Returns `false` (and changes nothing) if the scan is unknown or
    /// already terminal.
    pub async fn finish(&self, id: &ScanId, outcome: Outcome) -> bool {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(id).filter(|entry| !entry.status.is_terminal()) else {
            return false;
        };
        match outcome {
            Outcome::Completed(totals) => {
                entry.status = ScanStatus::Completed;
                entry.files_found = Some(totals.file_count);
                entry.result = Some(totals);
            },
            Outcome::Failed(message) => {
                entry.status = ScanStatus::Failed;
                entry.error = Some(message);
            },
            Outcome::Stopped { files_found } => {
                entry.status = ScanStatus::Stopped;
                entry.files_found = Some(files_found);
            },
        }
        entry.ended_at = Some(OffsetDateTime::now_utc());
        true
    }

    /// Drop terminal entries that ended more than `max_age` ago.
    ///
    /// Running scans are never pruned. A `max_age` reaching back past the
    /// earliest representable date prunes nothing. Returns the number of
    /// entries removed.
    pub async fn prune(&self, max_age: Duration) -> usize {
        let cutoff = time::Duration::try_from(max_age)
            .ok()
            .and_then(|max_age| OffsetDateTime::now_utc().checked_sub(max_age));
        let Some(cutoff) = cutoff else {
            return 0;
        };
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.ended_at.is_none_or(|ended| ended > cutoff));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn registered(kind: BackendKind) -> (Registry, ScanId, CancellationToken) {
        let registry = Registry::new();
        let id = ScanId::new();
        let cancel = CancellationToken::new();
        registry.insert(id, kind, "Scan", cancel.clone(), OffsetDateTime::now_utc()).await.unwrap();
        (registry, id, cancel)
    }

    #[tokio::test]
    async fn test_insert_is_visible_immediately() {
        let (registry, id, _) = registered(BackendKind::Local).await;
        let status = registry.status(&id).await.unwrap();
        assert_eq!(status.status, ScanStatus::Scanning);
        assert_eq!(status.kind, BackendKind::Local);
        assert!(status.result.is_none() && status.ended_at.is_none());
        assert!(registry.status(&ScanId::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate() {
        let (registry, id, _) = registered(BackendKind::Local).await;
        let err = registry
            .insert(id, BackendKind::Local, "again", CancellationToken::new(), OffsetDateTime::now_utc())
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (registry, id, cancel) = registered(BackendKind::ObjectStore).await;
        assert!(registry.stop(BackendKind::ObjectStore, &id).await.unwrap());
        assert!(registry.stop(BackendKind::ObjectStore, &id).await.unwrap());
        assert!(cancel.is_cancelled());
        assert!(registry.finish(&id, Outcome::Stopped { files_found: 10 }).await);
        // Stopping a finished scan is a no-op, not an error.
        assert!(!registry.stop(BackendKind::ObjectStore, &id).await.unwrap());
        let status = registry.status(&id).await.unwrap();
        assert_eq!(status.status, ScanStatus::Stopped);
        assert_eq!(status.files_found, Some(10));
    }

    #[tokio::test]
    async fn test_stop_wrong_kind_is_not_found() {
        let (registry, id, cancel) = registered(BackendKind::NetworkShare).await;
        let err = registry.stop(BackendKind::Local, &id).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(!cancel.is_cancelled());
        let err = registry.stop(BackendKind::NetworkShare, &ScanId::new()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_finish_only_once() {
        let (registry, id, _) = registered(BackendKind::Local).await;
        let totals = ScanTotals { file_count: 2, byte_count: 3, ..ScanTotals::default() };
        assert!(registry.finish(&id, Outcome::Completed(totals.clone())).await);
        assert!(!registry.finish(&id, Outcome::Failed("late".to_string())).await);
        let status = registry.status(&id).await.unwrap();
        assert_eq!(status.status, ScanStatus::Completed);
        assert_eq!(status.result, Some(totals));
        assert_eq!(status.files_found, Some(2));
        assert!(status.error.is_none());
        assert!(status.duration_seconds.is_some());
        assert!(!registry.finish(&ScanId::new(), Outcome::Failed("unknown".to_string())).await);
    }

    #[tokio::test]
    async fn test_status_serializes_result_only_when_present() {
        let (registry, id, _) = registered(BackendKind::Local).await;
        registry.finish(&id, Outcome::Failed("enumeration failed: not found: /x".to_string())).await;
        let json = serde_json::to_value(registry.status(&id).await.unwrap()).unwrap();
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["backend_kind"], "local");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "enumeration failed: not found: /x");
        assert!(json.get("result").is_none());
    }

    #[tokio::test]
    async fn test_prune_keeps_running_and_recent() {
        let registry = Registry::new();
        let running = ScanId::new();
        let finished = ScanId::new();
        for id in [running, finished] {
            registry.insert(id, BackendKind::Local, "Scan", CancellationToken::new(), OffsetDateTime::now_utc()).await.unwrap();
        }
        registry.finish(&finished, Outcome::Stopped { files_found: 0 }).await;
        assert_eq!(registry.prune(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.prune(Duration::ZERO).await, 1);
        assert!(registry.status(&finished).await.is_none());
        assert!(registry.status(&running).await.is_some());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_prune_with_unbounded_age_keeps_everything() {
        let (registry, id, _) = registered(BackendKind::Local).await;
        registry.finish(&id, Outcome::Stopped { files_found: 0 }).await;
        assert_eq!(registry.prune(Duration::from_secs(u64::MAX)).await, 0);
        assert_eq!(registry.prune(Duration::MAX).await, 0);
        assert!(registry.status(&id).await.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_never_see_torn_state() {
        let registry = Arc::new(Registry::new());
        let id = ScanId::new();
        registry.insert(id, BackendKind::Local, "Scan", CancellationToken::new(), OffsetDateTime::now_utc()).await.unwrap();
        let reader = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                loop {
                    let status = registry.status(&id).await.unwrap();
                    assert_eq!(status.status == ScanStatus::Completed, status.result.is_some());
                    if status.status.is_terminal() {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
            })
        };
        tokio::task::yield_now().await;
        registry.finish(&id, Outcome::Completed(ScanTotals::default())).await;
        reader.await.unwrap();
    }
}
