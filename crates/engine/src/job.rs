use crate::error::{Error, ErrorKind};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use tally_storage::{BackendKind, Target};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use uuid::Uuid;

const NAME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month]/[day]/[year], [hour repr:12]:[minute]:[second] [period]");

/// Opaque, globally unique scan identifier.
///
/// One id space is shared by every backend kind; ids are random (UUIDv4)
/// and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScanId(Uuid);
impl ScanId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}
impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}
impl Display for ScanId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}
impl FromStr for ScanId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Uuid::parse_str(s) {
            Ok(uuid) => Ok(Self(uuid)),
            // A malformed id can't have been handed out, so it's simply unknown.
            Err(_) => exn::bail!(ErrorKind::NotFound(s.to_string())),
        }
    }
}

/// A scan submission: what to scan and what to call it.
#[derive(Clone, Debug)]
pub struct ScanRequest {
    pub target: Target,
    /// Display name; defaulted from the submission time when absent or blank.
    pub name: Option<String>,
}
impl ScanRequest {
    pub fn new(target: Target) -> Self {
        Self { target, name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn display_name(&self, submitted_at: OffsetDateTime) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_name(self.target.kind(), submitted_at),
        }
    }
}

/// The name given to a scan submitted without one, such as
/// `"Shared Scan 03/01/2026, 09:15:00 AM"`.
pub fn default_name(kind: BackendKind, submitted_at: OffsetDateTime) -> String {
    // Every component in the format is always available on an OffsetDateTime.
    let stamp = submitted_at.format(NAME_FORMAT).unwrap_or_else(|_| submitted_at.to_string());
    format!("{} {stamp}", kind.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    #[rstest]
    #[case(BackendKind::Local, datetime!(2026-03-01 09:15:00 UTC), "Scan 03/01/2026, 09:15:00 AM")]
    #[case(BackendKind::ObjectStore, datetime!(2026-11-30 23:05:09 UTC), "Object Store Scan 11/30/2026, 11:05:09 PM")]
    #[case(BackendKind::NetworkShare, datetime!(2026-07-04 00:00:00 UTC), "Shared Scan 07/04/2026, 12:00:00 AM")]
    fn test_default_name(#[case] kind: BackendKind, #[case] at: OffsetDateTime, #[case] expected: &str) {
        assert_eq!(default_name(kind, at), expected);
    }

    #[test]
    fn test_display_name() {
        let at = datetime!(2026-03-01 09:15:00 UTC);
        let request = ScanRequest::new(Target::Local { path: "/srv".into() });
        assert_eq!(request.display_name(at), "Scan 03/01/2026, 09:15:00 AM");
        assert_eq!(request.clone().with_name("  ").display_name(at), "Scan 03/01/2026, 09:15:00 AM");
        assert_eq!(request.with_name("Quarterly").display_name(at), "Quarterly");
    }

    #[test]
    fn test_scan_id() {
        let id = ScanId::new();
        assert_ne!(id, ScanId::new());
        assert_eq!(id.to_string().parse::<ScanId>().unwrap(), id);
        let err = "not-a-uuid".parse::<ScanId>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }
}
