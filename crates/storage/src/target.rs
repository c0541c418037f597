//! What to scan, and with which kind of backend.

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;

/// The family of storage a scan runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// A directory on the local filesystem.
    Local,
    /// An S3-compatible bucket.
    ObjectStore,
    /// A mounted SMB/CIFS share.
    NetworkShare,
}
impl BackendKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::ObjectStore => "object_store",
            BackendKind::NetworkShare => "network_share",
        }
    }

    /// Human label used to build default scan names.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Local => "Scan",
            BackendKind::ObjectStore => "Object Store Scan",
            BackendKind::NetworkShare => "Shared Scan",
        }
    }
}
impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
impl FromStr for BackendKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(BackendKind::Local),
            "object_store" => Ok(BackendKind::ObjectStore),
            "network_share" => Ok(BackendKind::NetworkShare),
            _ => exn::bail!(ErrorKind::BackendError(format!("unknown backend kind `{s}`"))),
        }
    }
}

/// Connection details for an S3-compatible bucket.
#[derive(Clone, PartialEq, Eq)]
pub struct ObjectStoreTarget {
    pub bucket: String,
    /// Optional key prefix (acts as a virtual directory).
    pub prefix: Option<String>,
    pub region: String,
    /// Custom endpoint URL for S3-compatible services.
    pub endpoint: Option<String>,
    pub key_id: String,
    pub key_secret: String,
}
// Never print credentials, not even in debug logs.
impl Debug for ObjectStoreTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ObjectStoreTarget")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .finish()
    }
}

/// Backend-specific root descriptor of a scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Local { path: PathBuf },
    ObjectStore(ObjectStoreTarget),
    Share { path: PathBuf, share_name: String },
}
impl Target {
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            Target::Local { .. } => BackendKind::Local,
            Target::ObjectStore(_) => BackendKind::ObjectStore,
            Target::Share { .. } => BackendKind::NetworkShare,
        }
    }

    /// Printable, credential-free description of the root (what gets
    /// persisted and shown to users).
    #[must_use]
    pub fn descriptor(&self) -> String {
        match self {
            Target::Local { path } | Target::Share { path, .. } => path.display().to_string(),
            Target::ObjectStore(store) => match &store.prefix {
                Some(prefix) => format!("s3://{}/{}", store.bucket, prefix.trim_matches('/')),
                None => format!("s3://{}", store.bucket),
            },
        }
    }

    /// The backend-specific extra field recorded on each file (bucket or
    /// share name), if this kind of target has one.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Target::Local { .. } => None,
            Target::ObjectStore(store) => Some(&store.bucket),
            Target::Share { share_name, .. } => Some(share_name),
        }
    }

    /// Whether the required part of the descriptor is missing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Target::Local { path } => path.as_os_str().is_empty(),
            Target::ObjectStore(store) => store.bucket.trim().is_empty(),
            Target::Share { path, share_name } => path.as_os_str().is_empty() || share_name.trim().is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn store(prefix: Option<&str>) -> ObjectStoreTarget {
        ObjectStoreTarget {
            bucket: "archive".to_string(),
            prefix: prefix.map(str::to_string),
            region: "us-west-004".to_string(),
            endpoint: None,
            key_id: "id".to_string(),
            key_secret: "hunter2".to_string(),
        }
    }

    #[rstest]
    #[case("local", BackendKind::Local)]
    #[case("object_store", BackendKind::ObjectStore)]
    #[case("network_share", BackendKind::NetworkShare)]
    fn test_kind_from_str(#[case] input: &str, #[case] expected: BackendKind) {
        assert_eq!(input.parse::<BackendKind>().unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }

    #[test]
    fn test_kind_from_str_unknown() {
        assert!("azure".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_descriptor() {
        assert_eq!(Target::Local { path: "/srv/docs".into() }.descriptor(), "/srv/docs");
        assert_eq!(Target::ObjectStore(store(None)).descriptor(), "s3://archive");
        assert_eq!(Target::ObjectStore(store(Some("invoices/"))).descriptor(), "s3://archive/invoices");
    }

    #[test]
    fn test_location() {
        let share = Target::Share { path: "/mnt/finance".into(), share_name: "Finance".to_string() };
        assert_eq!(share.location(), Some("Finance"));
        assert_eq!(share.kind(), BackendKind::NetworkShare);
        assert_eq!(Target::ObjectStore(store(None)).location(), Some("archive"));
        assert_eq!(Target::Local { path: "/".into() }.location(), None);
    }

    #[test]
    fn test_is_empty() {
        assert!(Target::Local { path: PathBuf::new() }.is_empty());
        assert!(Target::Share { path: "/mnt/x".into(), share_name: " ".to_string() }.is_empty());
        assert!(!Target::ObjectStore(store(None)).is_empty());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", store(None));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
