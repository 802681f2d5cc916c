//! Local scratch directory for staged media.
//!
//! The directory is shared by every in-flight upload. Files are named after
//! a unique media identifier and created with `create_new`, so two uploads
//! can never clobber each other's file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// Number and total size of files currently in the scratch directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScratchUsage {
    pub files: usize,
    pub bytes: u64,
}

/// Scratch directory handle.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist.
    pub async fn ensure(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Path for a scratch file. Path separators and other unsafe characters
    /// in `name` are replaced so the file always lands directly in the root.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(sanitize_file_name(name))
    }

    /// Write `data` to a new scratch file.
    ///
    /// Fails with [`StorageError::AlreadyExists`] if the name is taken.
    pub async fn write(&self, name: &str, data: &[u8]) -> StorageResult<PathBuf> {
        self.ensure().await?;
        let path = self.path_for(name);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = write_all(&mut file, data).await {
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        debug!(path = %path.display(), bytes = data.len(), "Wrote scratch file");
        Ok(path)
    }

    /// Remove a scratch file. Returns `false` if it was already gone.
    pub async fn remove(&self, path: &Path) -> StorageResult<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Count files and bytes in the directory (non-recursive).
    pub async fn usage(&self) -> StorageResult<ScratchUsage> {
        let mut usage = ScratchUsage::default();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(usage),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                usage.files += 1;
                usage.bytes += metadata.len();
            }
        }
        Ok(usage)
    }

    /// Delete files last modified more than `age` ago.
    ///
    /// Returns the number of files removed. Files that vanish or cannot be
    /// removed mid-scan are skipped.
    pub async fn purge_older_than(&self, age: Duration) -> StorageResult<usize> {
        let cutoff = SystemTime::now().checked_sub(age).unwrap_or(SystemTime::UNIX_EPOCH);
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::now());
            if modified > cutoff {
                continue;
            }

            match self.remove(&entry.path()).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %entry.path().display(), "Failed to purge scratch file: {}", e)
                }
            }
        }

        if removed > 0 {
            info!(removed, root = %self.root.display(), "Purged stale scratch files");
        }
        Ok(removed)
    }
}

async fn write_all(file: &mut fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}
