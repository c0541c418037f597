//! Network share source enumerator.
//!
//! Shares (SMB/CIFS, NFS) are expected to be mounted by the host; this
//! enumerator walks the mount point and tags every record with the share
//! name so results from different shares can be told apart.

use crate::backend::FileRecordStream;
use crate::backend::walk::Walk;
use crate::error::{ErrorKind, Result};
use crate::{BackendKind, SourceEnumerator};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct ShareBackend {
    name: String,
    mount: PathBuf,
    share_name: String,
}
impl ShareBackend {
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if either the mount
    /// point or the share name is empty.
    pub fn new(name: impl Into<String>, mount: impl AsRef<Path>, share_name: impl Into<String>) -> Result<Self> {
        let mount = mount.as_ref().to_path_buf();
        let share_name = share_name.into();
        if mount.as_os_str().is_empty() || share_name.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidPath(mount));
        }
        Ok(Self { name: name.into(), mount, share_name })
    }
}

#[async_trait]
impl SourceEnumerator for ShareBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::NetworkShare
    }

    fn enumerate<'a>(&'a self, cancel: &'a CancellationToken) -> FileRecordStream<'a> {
        Walk { root: &self.mount, kind: BackendKind::NetworkShare, location: Some(&self.share_name) }.stream(cancel)
    }
}
