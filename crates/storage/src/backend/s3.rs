//! S3-compatible object store enumerator.
//!
//! Lists every object in a bucket (optionally below a key prefix) for
//! S3-compatible services including AWS S3, Backblaze B2, MinIO, and others.
//!
//! # Credentials
//!
//! Credentials arrive with each submission: every target carries its own
//! `key_id` and `key_secret`. They are handed to the SDK client and never
//! persisted or logged.

use crate::backend::{Checkpoint, FileRecordStream};
use crate::error::{ErrorKind, Result};
use crate::{BackendKind, FileRecord, ObjectStoreTarget, SourceEnumerator, normalize_prefix};
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::DateTime,
    types::Object,
};
use std::fmt::Debug;
use std::path::PathBuf;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

/// S3-compatible object store enumerator.
///
/// # Examples
///
/// ```no_run
/// use tally_storage::{ObjectStoreTarget, backend::S3Backend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let target = ObjectStoreTarget {
///     bucket: "archive".to_string(),
///     prefix: Some("invoices/".to_string()),
///     region: "us-west-004".to_string(),
///     endpoint: Some("https://s3.us-west-004.backblazeb2.com".to_string()),
///     key_id: "access_key_id".to_string(),
///     key_secret: "secret_access_key".to_string(),
/// };
/// let backend = S3Backend::from_target("archive", &target).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    /// Normalized prefix, always ending in `/`.
    prefix: Option<String>,
}

impl S3Backend {
    /// Create a new object store enumerator.
    ///
    /// No request is made here; an unknown bucket or bad credentials surface
    /// as the first item of the enumeration.
    pub async fn from_target(name: impl Into<String>, target: &ObjectStoreTarget) -> Result<Self> {
        if target.bucket.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidPath(PathBuf::from(&target.bucket)));
        }
        let prefix = target.prefix.as_deref().map(normalize_prefix).transpose()?.flatten();
        let credentials = Credentials::new(&target.key_id, &target.key_secret, None, None, "tally-submission");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(target.region.clone()))
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = &target.endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        let client = Client::from_conf(config_builder.build());
        Ok(Self {
            name: name.into(),
            client,
            bucket: target.bucket.clone(),
            prefix,
        })
    }

    fn record(&self, key: &str, object: &Object) -> FileRecord {
        // Negative sizes never come from a real service.
        let size = object.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0);
        let modified = object.last_modified().and_then(parse_datetime);
        FileRecord::new(BackendKind::ObjectStore, object_name(key), object_identifier(&self.bucket, key), size, modified)
            .with_location(&self.bucket)
    }
}

#[async_trait]
impl SourceEnumerator for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    fn enumerate<'a>(&'a self, cancel: &'a CancellationToken) -> FileRecordStream<'a> {
        Box::pin(stream! {
            let mut checkpoint = Checkpoint::new(cancel);
            let mut continuation: Option<String> = None;

            'pages: loop {
                if checkpoint.at_boundary() {
                    tracing::info!(bucket = %self.bucket, produced = checkpoint.produced(), "Listing cancelled");
                    break 'pages;
                }
                let response = match self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .set_prefix(self.prefix.clone())
                    .set_continuation_token(continuation.take())
                    .send()
                    .await
                {
                    Ok(response) => response,
                    Err(err) => {
                        yield Err(exn::Exn::from(map_sdk_error(&self.bucket, err)));
                        return;
                    },
                };

                for object in response.contents() {
                    let Some(key) = object.key() else { continue };
                    if is_prefix_marker(key) {
                        continue;
                    }
                    if checkpoint.before_record() {
                        tracing::info!(bucket = %self.bucket, produced = checkpoint.produced(), "Listing cancelled");
                        break 'pages;
                    }
                    yield Ok(self.record(key, object));
                    checkpoint.record();
                }

                match response.next_continuation_token() {
                    Some(token) if response.is_truncated().unwrap_or(false) => continuation = Some(token.to_string()),
                    _ => break 'pages,
                }
            }
        })
    }
}

/// Zero-byte "folder" placeholders created by web consoles.
fn is_prefix_marker(key: &str) -> bool {
    key.ends_with('/')
}

fn object_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

fn object_identifier(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

fn parse_datetime(dt: &DateTime) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos()).ok()
}

/// Map a service error code onto the categories callers act upon.
fn error_kind_for_code(code: Option<&str>, bucket: &str, detail: String) -> ErrorKind {
    match code {
        Some("NoSuchBucket") => ErrorKind::NotFound(PathBuf::from(bucket)),
        Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "AllAccessDisabled") => {
            ErrorKind::PermissionDenied(PathBuf::from(bucket))
        },
        _ => ErrorKind::BackendError(detail),
    }
}

fn map_sdk_error<E, R>(bucket: &str, err: SdkError<E, R>) -> ErrorKind
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            ErrorKind::Network(DisplayErrorContext(&err).to_string())
        },
        SdkError::ServiceError(context) => {
            error_kind_for_code(context.err().code(), bucket, DisplayErrorContext(&err).to_string())
        },
        _ => ErrorKind::BackendError(DisplayErrorContext(&err).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("report.pdf", "report.pdf")]
    #[case("invoices/2024/march.xlsx", "march.xlsx")]
    #[case("invoices/README", "README")]
    fn test_object_name(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(object_name(key), expected);
    }

    #[test]
    fn test_object_identifier() {
        assert_eq!(object_identifier("archive", "invoices/march.pdf"), "s3://archive/invoices/march.pdf");
    }

    #[test]
    fn test_prefix_marker() {
        assert!(is_prefix_marker("invoices/"));
        assert!(!is_prefix_marker("invoices/march.pdf"));
    }

    #[test]
    fn test_parse_datetime() {
        let dt = DateTime::from_secs(1_700_000_000);
        assert_eq!(parse_datetime(&dt).unwrap().unix_timestamp(), 1_700_000_000);
    }

    #[rstest]
    #[case(Some("NoSuchBucket"), "not found: archive")]
    #[case(Some("AccessDenied"), "permission denied: archive")]
    #[case(Some("InvalidAccessKeyId"), "permission denied: archive")]
    #[case(Some("SlowDown"), "backend error: boom")]
    #[case(None, "backend error: boom")]
    fn test_error_kind_for_code(#[case] code: Option<&str>, #[case] expected: &str) {
        assert_eq!(error_kind_for_code(code, "archive", "boom".to_string()).to_string(), expected);
    }

    #[tokio::test]
    async fn test_from_target_rejects_empty_bucket() {
        let target = ObjectStoreTarget {
            bucket: " ".to_string(),
            prefix: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            key_id: "id".to_string(),
            key_secret: "secret".to_string(),
        };
        assert!(S3Backend::from_target("s3", &target).await.is_err());
    }
}
