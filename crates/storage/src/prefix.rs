//! Object key prefix normalization.
//!
//! Prefixes arrive straight from a submission's query string. Empty and `.`
//! segments are dropped, `..` folds into the segment before it, and a prefix
//! that climbs above the bucket root is rejected.

use crate::error::{ErrorKind, Result};
use std::path::PathBuf;

/// Normalize an object key prefix to the `segment/segment/` form used for
/// listing.
///
/// Returns `None` if the prefix selects the whole bucket.
///
/// ```
/// use tally_storage::normalize_prefix;
///
/// assert_eq!(normalize_prefix("//invoices/./2024").unwrap().as_deref(), Some("invoices/2024/"));
/// assert_eq!(normalize_prefix("scans/../invoices").unwrap().as_deref(), Some("invoices/"));
/// assert_eq!(normalize_prefix("/").unwrap(), None);
/// assert!(normalize_prefix("../other-bucket").is_err());
/// ```
pub fn normalize_prefix(prefix: &str) -> Result<Option<String>> {
    let invalid = || ErrorKind::InvalidPath(PathBuf::from(prefix));
    // Keys may hold almost anything, but a NUL never comes from a real prefix.
    if prefix.contains('\0') {
        exn::bail!(invalid());
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in prefix.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
            segment => segments.push(segment),
        }
    }
    if segments.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("{}/", segments.join("/"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", None)]
    #[case("/", None)]
    #[case("./", None)]
    #[case("invoices/2024/..", Some("invoices/"))]
    #[case("invoices", Some("invoices/"))]
    #[case("invoices/2024/", Some("invoices/2024/"))]
    #[case("//invoices/./2024", Some("invoices/2024/"))]
    #[case("a//b//c", Some("a/b/c/"))]
    #[case("Q1 Reports/scans", Some("Q1 Reports/scans/"))]
    fn test_normalize_prefix(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_prefix(input).unwrap().as_deref(), expected);
    }

    #[rstest]
    #[case("..")]
    #[case("../other-bucket")]
    #[case("a/../../b")]
    #[case("a\0b")]
    fn test_normalize_prefix_rejected(#[case] input: &str) {
        let err = normalize_prefix(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
