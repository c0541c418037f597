//! Directory-tree walking shared by the filesystem-backed enumerators.

use crate::backend::{Checkpoint, FileRecordStream};
use crate::error::{ErrorKind, Result};
use crate::record::FileRecord;
use crate::target::BackendKind;
use async_stream::stream;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};
use tokio_util::sync::CancellationToken;

enum WalkEntry {
    File(PathBuf, Metadata),
    Descend(PathBuf),
    Skip,
}

/// Root of a walk plus what each produced record should be tagged with.
pub(crate) struct Walk<'a> {
    pub(crate) root: &'a Path,
    pub(crate) kind: BackendKind,
    pub(crate) location: Option<&'a str>,
}

impl<'a> Walk<'a> {
    /// The root has to exist, be a directory, and be listable before a single
    /// record is produced.
    async fn check_root(&self) -> Result<()> {
        let metadata = fs::metadata(self.root).await.map_err(|e| ErrorKind::from_io(e, self.root))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::NotADirectory(self.root.to_path_buf()));
        }
        fs::read_dir(self.root).await.map_err(|e| ErrorKind::from_io(e, self.root))?;
        Ok(())
    }

    async fn process_entry(entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        // Does not traverse symlinks.
        let metadata = entry.metadata().await.map_err(|e| ErrorKind::from_io(e, &path))?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(path, metadata));
        }
        // Note: silently drop symlinks, sockets, FIFOs and friends.
        Ok(WalkEntry::Skip)
    }

    fn record(&self, path: &Path, metadata: &Metadata) -> FileRecord {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let modified = metadata.modified().ok().map(OffsetDateTime::from);
        let record = FileRecord::new(self.kind, name, path.display().to_string(), metadata.len(), modified);
        match self.location {
            Some(location) => record.with_location(location),
            None => record,
        }
    }

    /// Depth-first walk below the root.
    ///
    /// Unreadable directories and entries are counted and skipped; only a
    /// failing root is yielded as an error.
    pub(crate) fn stream(self, cancel: &'a CancellationToken) -> FileRecordStream<'a> {
        Box::pin(stream! {
            if let Err(e) = self.check_root().await {
                yield Err(e);
                return;
            }
            let mut checkpoint = Checkpoint::new(cancel);
            let mut skipped = 0usize;
            let mut stack = vec![self.root.to_path_buf()];

            'dirs: while let Some(current) = stack.pop() {
                if checkpoint.at_boundary() {
                    tracing::info!(root = %self.root.display(), produced = checkpoint.produced(), "Walk cancelled");
                    break 'dirs;
                }
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) => {
                        skipped += 1;
                        tracing::debug!(path = %current.display(), error = %err, "Skipping unreadable directory");
                        continue 'dirs;
                    },
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(err) => {
                            skipped += 1;
                            tracing::debug!(path = %current.display(), error = %err, "Skipping rest of directory");
                            break 'entries;
                        },
                    };
                    match Self::process_entry(entry).await {
                        Ok(WalkEntry::File(path, metadata)) => {
                            if checkpoint.before_record() {
                                tracing::info!(root = %self.root.display(), produced = checkpoint.produced(), "Walk cancelled");
                                break 'dirs;
                            }
                            yield Ok(self.record(&path, &metadata));
                            checkpoint.record();
                        },
                        Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                        Ok(WalkEntry::Skip) => {},
                        Err(err) => {
                            skipped += 1;
                            tracing::debug!(error = %*err, "Skipping unreadable entry");
                        },
                    }
                }
            }

            if skipped > 0 {
                tracing::warn!(root = %self.root.display(), skipped, "Skipped unreadable entries during walk");
            }
        })
    }
}
