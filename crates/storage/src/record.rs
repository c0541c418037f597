//! File metadata produced by source enumerators.

use crate::target::BackendKind;
use serde::Serialize;
use tally_classify::{Category, classify};
use time::OffsetDateTime;

/// One discovered file.
///
/// Records are created by an enumerator during a single scan and are never
/// modified afterwards; the classification fields are derived from `name` at
/// construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Leaf name of the file (last path or key segment)
    pub name: String,
    /// Full path, `s3://bucket/key` URL, or path below a share mount
    pub identifier: String,
    /// File size in bytes
    pub size: u64,
    pub category: Category,
    pub mime_type: String,
    /// Last modified timestamp, if the backend reports one
    #[serde(with = "time::serde::rfc3339::option")]
    pub modified: Option<OffsetDateTime>,
    pub ocr_eligible: bool,
    pub kind: BackendKind,
    /// Bucket name or share name, depending on the backend
    pub location: Option<String>,
}
impl FileRecord {
    /// Create a new record, classifying it by name.
    pub fn new(
        kind: BackendKind,
        name: impl Into<String>,
        identifier: impl Into<String>,
        size: u64,
        modified: Option<OffsetDateTime>,
    ) -> Self {
        let name = name.into();
        let classification = classify(&name);
        Self {
            name,
            identifier: identifier.into(),
            size,
            category: classification.category,
            mime_type: classification.mime_type.to_string(),
            modified,
            ocr_eligible: classification.ocr_eligible,
            kind,
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_classifies() {
        let record = FileRecord::new(BackendKind::Local, "Scan 001.TIFF", "/srv/scans/Scan 001.TIFF", 2048, None);
        assert_eq!(record.category, Category::Image);
        assert_eq!(record.mime_type, "image/tiff");
        assert!(record.ocr_eligible);
        assert_eq!(record.location, None);
    }

    #[test]
    fn test_with_location() {
        let record =
            FileRecord::new(BackendKind::ObjectStore, "notes.txt", "s3://archive/notes.txt", 1, None).with_location("archive");
        assert_eq!(record.location.as_deref(), Some("archive"));
        assert!(!record.ocr_eligible);
    }

    #[test]
    fn test_serialize() {
        let record = FileRecord::new(BackendKind::NetworkShare, "a.pdf", "/mnt/share/a.pdf", 3, None);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["category"], "pdf");
        assert_eq!(json["kind"], "network_share");
        assert!(json["modified"].is_null());
    }
}
