//! File classification from file names.
//!
//! Every discovered file is tagged with a coarse [`Category`], a best-effort
//! MIME type and whether it's worth sending through OCR. Classification only
//! ever looks at the name (never the content), so it is deterministic, total
//! and cheap enough to run on every record an enumerator produces:
//!
//! - **Category** from the extension ([`Category::from_name`]), falling back
//!   to [`Category::Other`] for unknown or missing extensions.
//! - **MIME type** from the extension ([`mime_type`]), falling back to
//!   [`DEFAULT_MIME`].
//! - **OCR eligibility** from the category ([`Category::is_ocr_eligible`]).

mod construct;
pub mod error;
mod mime;
mod util;

pub use crate::mime::{DEFAULT_MIME, mime_type};

/// Coarse file type category.
///
/// Defaults to [`Other`](Self::Other), which is also the category for files
/// without an extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Category {
    /// Portable Document Format (.pdf)
    Pdf,
    /// Word processor, spreadsheet and presentation documents
    Office,
    /// Raster images
    Image,
    /// Plain text, logs and CSV
    Text,
    /// Archives and compressed bundles
    Archive,
    /// Source code and markup
    Code,
    /// Structured data (JSON, XML, YAML)
    Data,
    /// Anything else
    #[default]
    Other,
}

/// Everything known about a file from its name alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub mime_type: &'static str,
    pub ocr_eligible: bool,
}

/// Classify a file by its name.
///
/// ```
/// use tally_classify::{Category, classify};
///
/// let report = classify("Q3 Report.PDF");
/// assert_eq!(report.category, Category::Pdf);
/// assert_eq!(report.mime_type, "application/pdf");
/// assert!(report.ocr_eligible);
///
/// let readme = classify("README");
/// assert_eq!(readme.category, Category::Other);
/// assert_eq!(readme.mime_type, "application/octet-stream");
/// assert!(!readme.ocr_eligible);
/// ```
#[must_use]
pub fn classify(name: &str) -> Classification {
    let category = Category::from_name(name);
    Classification {
        category,
        mime_type: mime_type(name),
        ocr_eligible: category.is_ocr_eligible(),
    }
}

/// The substring after the last `.` in a file name, lowercased.
///
/// Unlike [`Path::extension`](std::path::Path::extension), `.pdf` yields
/// `pdf`.
pub(crate) fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn category_default() {
        assert_eq!(Category::default(), Category::Other);
    }

    #[rstest]
    #[case("report.pdf", Some("pdf"))]
    #[case("archive.tar.GZ", Some("gz"))]
    #[case(".pdf", Some("pdf"))]
    #[case("trailing.", Some(""))]
    #[case("Makefile", None)]
    fn test_extension(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(extension(name).as_deref(), expected);
    }

    #[test]
    fn test_ocr_follows_category() {
        for name in ["a.pdf", "b.docx", "c.png", "d.txt", "e.zip", "f.py", "g.json", "h"] {
            let classification = classify(name);
            assert_eq!(classification.ocr_eligible, classification.category.is_ocr_eligible(), "{name}");
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Category::Office).unwrap(), "\"office\"");
        assert_eq!(serde_json::from_str::<Category>("\"image\"").unwrap(), Category::Image);
    }
}
