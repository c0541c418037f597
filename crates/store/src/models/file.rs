use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use tally_classify::Category;
use tally_storage::{BackendKind, FileRecord};
use time::OffsetDateTime;

#[derive(sqlx::FromRow)]
pub(crate) struct FileRow {
    pub(crate) name: String,
    pub(crate) identifier: String,
    pub(crate) size: i64,
    pub(crate) category: String,
    pub(crate) mime_type: String,
    pub(crate) modified: Option<i64>,
    pub(crate) ocr_eligible: bool,
    pub(crate) kind: String,
    pub(crate) location: Option<String>,
}
impl TryFrom<&FileRecord> for FileRow {
    type Error = Error;
    fn try_from(file: &FileRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            name: file.name.clone(),
            identifier: file.identifier.clone(),
            size: i64::try_from(file.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            category: file.category.to_string(),
            mime_type: file.mime_type.clone(),
            modified: file.modified.map(OffsetDateTime::unix_timestamp),
            ocr_eligible: file.ocr_eligible,
            kind: file.kind.to_string(),
            location: file.location.clone(),
        })
    }
}
impl TryFrom<FileRow> for FileRecord {
    type Error = Error;
    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            name: row.name,
            identifier: row.identifier,
            size: u64::try_from(row.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            category: row.category.parse::<Category>().or_raise(|| ErrorKind::InvalidData("category"))?,
            mime_type: row.mime_type,
            modified: row
                .modified
                .map(OffsetDateTime::from_unix_timestamp)
                .transpose()
                .or_raise(|| ErrorKind::InvalidData("modified date"))?,
            ocr_eligible: row.ocr_eligible,
            kind: row.kind.parse::<BackendKind>().or_raise(|| ErrorKind::InvalidData("backend kind"))?,
            location: row.location,
        })
    }
}
