use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use tally_classify::Category;
use tally_storage::BackendKind;
use time::OffsetDateTime;

/// Lifecycle state of a scan.
///
/// `Scanning` is the only non-terminal state; nothing ever leaves a
/// terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Scanning,
    Completed,
    Failed,
    /// Cancelled on request (or by timeout), distinct from `Failed`.
    Stopped,
}
impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Scanning => "scanning",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
            ScanStatus::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanStatus::Scanning)
    }
}
impl Display for ScanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
impl FromStr for ScanStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scanning" => Ok(ScanStatus::Scanning),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            "stopped" => Ok(ScanStatus::Stopped),
            _ => exn::bail!(ErrorKind::InvalidData("scan status")),
        }
    }
}

/// Aggregate statistics of a completed scan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScanTotals {
    pub file_count: u64,
    pub byte_count: u64,
    pub type_histogram: BTreeMap<Category, u64>,
    pub ocr_eligible_count: u64,
}

/// One scan attempt, as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanJob {
    pub id: String,
    #[serde(rename = "backend_kind")]
    pub kind: BackendKind,
    pub name: String,
    /// Credential-free description of the scanned root.
    pub target: String,
    /// Bucket or share name, for backends that have one.
    pub location: Option<String>,
    pub status: ScanStatus,
    /// Only present once the scan has completed.
    pub totals: Option<ScanTotals>,
    /// Only present once the scan has failed.
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
}
impl ScanJob {
    /// A freshly submitted scan.
    pub fn new(
        id: impl Into<String>,
        kind: BackendKind,
        name: impl Into<String>,
        target: impl Into<String>,
        location: Option<String>,
        started_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            target: target.into(),
            location,
            status: ScanStatus::Scanning,
            totals: None,
            error: None,
            started_at,
            ended_at: None,
        }
    }

    /// Wall-clock duration, once the scan has ended.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.ended_at.map(|ended| (ended - self.started_at).as_seconds_f64())
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ScanRow {
    pub(crate) id: String,
    pub(crate) kind: String,
    pub(crate) name: String,
    pub(crate) target: String,
    pub(crate) location: Option<String>,
    pub(crate) status: String,
    pub(crate) file_count: Option<i64>,
    pub(crate) byte_count: Option<i64>,
    pub(crate) ocr_eligible_count: Option<i64>,
    pub(crate) type_histogram: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) started_at: i64,
    pub(crate) ended_at: Option<i64>,
}

/// Column values for the totals of a completed scan.
pub(crate) struct TotalsRow {
    pub(crate) file_count: i64,
    pub(crate) byte_count: i64,
    pub(crate) ocr_eligible_count: i64,
    pub(crate) type_histogram: String,
}
impl TryFrom<&ScanTotals> for TotalsRow {
    type Error = Error;
    fn try_from(totals: &ScanTotals) -> Result<Self, Self::Error> {
        Ok(Self {
            file_count: i64::try_from(totals.file_count).or_raise(|| ErrorKind::InvalidData("file count"))?,
            byte_count: i64::try_from(totals.byte_count).or_raise(|| ErrorKind::InvalidData("byte count"))?,
            ocr_eligible_count: i64::try_from(totals.ocr_eligible_count)
                .or_raise(|| ErrorKind::InvalidData("ocr eligible count"))?,
            type_histogram: serde_json::to_string(&totals.type_histogram)
                .or_raise(|| ErrorKind::InvalidData("type histogram"))?,
        })
    }
}

fn count(value: i64, field: &'static str) -> Result<u64, Error> {
    u64::try_from(value).or_raise(|| ErrorKind::InvalidData(field))
}

fn timestamp(value: i64, field: &'static str) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::from_unix_timestamp(value).or_raise(|| ErrorKind::InvalidData(field))
}

impl TryFrom<ScanRow> for ScanJob {
    type Error = Error;
    fn try_from(row: ScanRow) -> Result<Self, Self::Error> {
        let totals = match (row.file_count, row.byte_count, row.ocr_eligible_count, row.type_histogram) {
            (Some(files), Some(bytes), Some(ocr), Some(histogram)) => Some(ScanTotals {
                file_count: count(files, "file count")?,
                byte_count: count(bytes, "byte count")?,
                ocr_eligible_count: count(ocr, "ocr eligible count")?,
                type_histogram: serde_json::from_str(&histogram).or_raise(|| ErrorKind::InvalidData("type histogram"))?,
            }),
            _ => None,
        };
        Ok(Self {
            id: row.id,
            kind: row.kind.parse::<BackendKind>().or_raise(|| ErrorKind::InvalidData("backend kind"))?,
            name: row.name,
            target: row.target,
            location: row.location,
            status: row.status.parse()?,
            totals,
            error: row.error,
            started_at: timestamp(row.started_at, "start time")?,
            ended_at: row.ended_at.map(|t| timestamp(t, "end time")).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn row() -> ScanRow {
        ScanRow {
            id: "a5c0b6de-7d0e-4c8e-9d0b-6f0c1d6f0a11".to_string(),
            kind: "network_share".to_string(),
            name: "Shared Scan 03/01/2026, 09:15:00 AM".to_string(),
            target: "/mnt/finance".to_string(),
            location: Some("Finance".to_string()),
            status: "completed".to_string(),
            file_count: Some(3),
            byte_count: Some(5_000_000_000_000),
            ocr_eligible_count: Some(2),
            type_histogram: Some(r#"{"pdf":2,"other":1}"#.to_string()),
            error: None,
            started_at: 1_772_356_500,
            ended_at: Some(1_772_356_512),
        }
    }

    #[test]
    fn test_row_to_model() {
        let job = ScanJob::try_from(row()).unwrap();
        assert_eq!(job.kind, BackendKind::NetworkShare);
        assert_eq!(job.status, ScanStatus::Completed);
        let totals = job.totals.as_ref().unwrap();
        assert_eq!(totals.byte_count, 5_000_000_000_000);
        assert_eq!(totals.type_histogram.get(&Category::Pdf), Some(&2));
        assert_eq!(job.duration_seconds(), Some(12.0));
    }

    #[test]
    fn test_row_without_totals() {
        let mut row = row();
        row.status = "stopped".to_string();
        row.file_count = None;
        row.byte_count = None;
        row.ocr_eligible_count = None;
        row.type_histogram = None;
        let job = ScanJob::try_from(row).unwrap();
        assert_eq!(job.status, ScanStatus::Stopped);
        assert!(job.totals.is_none());
    }

    #[test]
    fn test_row_with_bad_status() {
        let mut row = row();
        row.status = "paused".to_string();
        let err = ScanJob::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("scan status")));
    }

    #[test]
    fn test_totals_to_row() {
        let totals = ScanTotals {
            file_count: 4,
            byte_count: 60,
            type_histogram: BTreeMap::from([(Category::Text, 3), (Category::Other, 1)]),
            ocr_eligible_count: 0,
        };
        let row = TotalsRow::try_from(&totals).unwrap();
        assert_eq!(row.byte_count, 60);
        assert_eq!(row.type_histogram, r#"{"text":3,"other":1}"#);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!ScanStatus::Scanning.is_terminal());
        assert!(ScanStatus::Stopped.is_terminal());
        assert_eq!(serde_json::to_value(ScanStatus::Failed).unwrap(), "failed");
    }

    #[test]
    fn test_new_is_scanning() {
        let started = OffsetDateTime::now_utc();
        let job = ScanJob::new("id", BackendKind::Local, "Scan", "/srv", None, started);
        assert_eq!(job.status, ScanStatus::Scanning);
        assert_eq!(job.duration_seconds(), None);
        let ended = ScanJob { ended_at: Some(started + Duration::seconds(2)), ..job };
        assert_eq!(ended.duration_seconds(), Some(2.0));
    }
}
