//! Repository for scans and the files they discovered.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{FileRow, ScanJob, ScanRow, ScanStatus, ScanTotals, TotalsRow};
use exn::ResultExt;
use sqlx::SqlitePool;
use tally_storage::{BackendKind, FileRecord};
use time::OffsetDateTime;

fn to_i64(value: usize, field: &'static str) -> Result<i64> {
    i64::try_from(value).or_raise(|| ErrorKind::InvalidData(field))
}

/// Repository for scan and file records in the result store.
///
/// Every operation is keyed by scan id and runs on the shared pool, so
/// unrelated scans never wait on each other beyond SQLite's own write lock.
///
/// # Lifecycle
///
/// - [`create()`](Self::create) inserts the scan in the `scanning` state.
/// - [`append_files()`](Self::append_files) stores the discovered files as
///   one atomic batch.
/// - Exactly one of [`complete()`](Self::complete), [`fail()`](Self::fail)
///   or [`stop()`](Self::stop) moves the scan to a terminal state.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    // =========================================================================
    // Write
    // =========================================================================

    /// Insert a newly submitted scan.
    ///
    /// Returns [`ErrorKind::Duplicate`] if a scan with the same id exists.
    pub async fn create(&self, job: &ScanJob) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/insert_scan.sql"))
            .bind(&job.id)
            .bind(job.kind.as_str())
            .bind(&job.name)
            .bind(&job.target)
            .bind(job.location.as_deref())
            .bind(job.status.as_str())
            .bind(job.started_at.unix_timestamp())
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if err.as_database_error().is_some_and(|e| e.is_unique_violation()) => {
                exn::bail!(ErrorKind::Duplicate(job.id.clone()))
            },
            Err(err) => Err(err).or_raise(|| ErrorKind::Database),
        }
    }

    /// Store a batch of files for a scan, all or nothing.
    ///
    /// The scan id is not checked: files for an unknown scan are stored as
    /// orphans.
    pub async fn append_files(&self, scan_id: &str, files: &[FileRecord]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        let rows = files.iter().map(FileRow::try_from).collect::<Result<Vec<_>>>()?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for row in rows {
            sqlx::query(include_str!("../queries/insert_file.sql"))
                .bind(scan_id)
                .bind(row.name)
                .bind(row.identifier)
                .bind(row.size)
                .bind(row.category)
                .bind(row.mime_type)
                .bind(row.modified)
                .bind(row.ocr_eligible)
                .bind(row.kind)
                .bind(row.location)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(scan_id, files = files.len(), "Stored file batch");
        Ok(())
    }

    /// Mark a scan as completed and record its totals.
    ///
    /// Returns [`ErrorKind::ScanNotFound`] if no such scan is still scanning.
    pub async fn complete(&self, scan_id: &str, totals: &ScanTotals) -> Result<()> {
        let row = TotalsRow::try_from(totals)?;
        let result = sqlx::query(include_str!("../queries/complete_scan.sql"))
            .bind(row.file_count)
            .bind(row.byte_count)
            .bind(row.ocr_eligible_count)
            .bind(row.type_histogram)
            .bind(OffsetDateTime::now_utc().unix_timestamp())
            .bind(scan_id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::ScanNotFound(scan_id.to_string()));
        }
        Ok(())
    }

    /// Mark a scan as failed with a human-readable reason.
    pub async fn fail(&self, scan_id: &str, message: &str) -> Result<()> {
        self.finish(scan_id, ScanStatus::Failed, Some(message)).await
    }

    /// Mark a scan as stopped on request.
    pub async fn stop(&self, scan_id: &str) -> Result<()> {
        self.finish(scan_id, ScanStatus::Stopped, None).await
    }

    async fn finish(&self, scan_id: &str, status: ScanStatus, error: Option<&str>) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/finish_scan.sql"))
            .bind(status.as_str())
            .bind(error)
            .bind(OffsetDateTime::now_utc().unix_timestamp())
            .bind(scan_id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::ScanNotFound(scan_id.to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Read
    // =========================================================================

    pub async fn get_scan(&self, scan_id: &str) -> Result<Option<ScanJob>> {
        let row: Option<ScanRow> = sqlx::query_as(include_str!("../queries/get_scan.sql"))
            .bind(scan_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(ScanJob::try_from).transpose()
    }

    /// The most recently started completed scans, newest first, optionally
    /// only those of one backend kind.
    pub async fn list_recent(&self, limit: usize, kind: Option<BackendKind>) -> Result<Vec<ScanJob>> {
        let rows: Vec<ScanRow> = sqlx::query_as(include_str!("../queries/list_recent_scans.sql"))
            .bind(kind.as_ref().map(BackendKind::as_str))
            .bind(to_i64(limit, "limit")?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ScanJob::try_from).collect()
    }

    /// A page of a scan's files, sorted by name.
    ///
    /// An offset past the end yields an empty page.
    pub async fn get_files(&self, scan_id: &str, limit: usize, offset: usize) -> Result<Vec<FileRecord>> {
        let rows: Vec<FileRow> = sqlx::query_as(include_str!("../queries/get_files.sql"))
            .bind(scan_id)
            .bind(to_i64(limit, "limit")?)
            .bind(to_i64(offset, "offset")?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(FileRecord::try_from).collect()
    }

    pub async fn count_files(&self, scan_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_files.sql"))
            .bind(scan_id)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("file count"))
    }
}
