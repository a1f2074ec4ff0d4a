//! Resumable export checkpoints
//!
//! After every flushed batch the coordinator records where the scan stands
//! and how long the dump file was at that point. A later run with `--resume`
//! cuts the file back to that length and continues from the saved cursor, so
//! a batch interrupted halfway is written again in full rather than twice.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DumpError, Result};
use crate::store::ScanCursor;

/// Checkpoint file name inside the data directory
pub const CHECKPOINT_FILE: &str = ".redisdump-checkpoint.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub pattern: String,
    /// Cursor for the next SCAN request
    pub cursor: String,
    pub keys_visited: u64,
    /// Dump file being written
    pub output: PathBuf,
    /// Length of the dump file at the batch boundary
    pub output_len: u64,
    /// RFC 3339 timestamp
    pub updated_at: String,
}

impl Checkpoint {
    pub fn new(
        pattern: impl Into<String>,
        cursor: &ScanCursor,
        keys_visited: u64,
        output: impl Into<PathBuf>,
        output_len: u64,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            cursor: cursor.as_str().to_string(),
            keys_visited,
            output: output.into(),
            output_len,
            updated_at: chrono::Local::now().to_rfc3339(),
        }
    }

    pub fn cursor(&self) -> ScanCursor {
        ScanCursor::new(self.cursor.clone())
    }

    /// Refuse to resume a run that was started with another pattern.
    pub fn ensure_matches(&self, pattern: &str) -> Result<()> {
        if self.pattern != pattern {
            return Err(DumpError::Checkpoint(format!(
                "checkpoint was written for pattern '{}', not '{}'",
                self.pattern, pattern
            )));
        }
        Ok(())
    }
}

/// Location of a checkpoint on disk.
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    /// The checkpoint kept in `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(CHECKPOINT_FILE),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the checkpoint. A missing file is `Ok(None)`.
    pub async fn load(&self) -> Result<Option<Checkpoint>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let checkpoint = serde_json::from_str(&text)?;
        Ok(Some(checkpoint))
    }

    /// Write the checkpoint through a temporary file and a rename, so a crash
    /// never leaves a half-written checkpoint behind.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let json = serde_json::to_string_pretty(checkpoint)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(
            "Checkpoint saved at cursor {} ({} keys)",
            checkpoint.cursor, checkpoint.keys_visited
        );
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let file = CheckpointFile::in_dir(dir.path());
        assert_eq!(assert_ok!(file.load().await), None);

        let checkpoint = Checkpoint::new(
            "user:*",
            &ScanCursor::new("1536"),
            2000,
            dir.path().join("dump.redis"),
            48_213,
        );
        assert_ok!(file.save(&checkpoint).await);
        assert!(file.path().exists());
        assert_eq!(file.load().await.unwrap(), Some(checkpoint.clone()));
        assert_eq!(checkpoint.cursor(), ScanCursor::new("1536"));

        assert_ok!(file.clear().await);
        assert!(!file.path().exists());
        assert_ok!(file.clear().await);
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = CheckpointFile::in_dir(dir.path());
        std::fs::write(file.path(), "{not json").unwrap();

        let err = file.load().await.unwrap_err();
        assert!(matches!(err, DumpError::Checkpoint(_)));
    }

    #[test]
    fn test_pattern_must_match() {
        let checkpoint = Checkpoint::new("a:*", &ScanCursor::new("7"), 1, "dump.redis", 0);
        assert!(checkpoint.ensure_matches("a:*").is_ok());
        assert!(checkpoint.ensure_matches("*").is_err());
    }
}
