//! Output sink for serialized records
//!
//! A [`RecordSink`] accepts whole records. [`CommandWriter`] renders each
//! record into one buffer and hands it to the underlying writer with a
//! single `write_all`, so the engine never emits half a record. After the
//! first failed write the sink refuses everything else.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::{Result, SinkError};

use super::serializer::SerializedRecord;

/// Write buffer size for file output
const WRITE_BUFFER: usize = 8 * 1024 * 1024;

/// How an existing output file is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Truncate the file.
    #[default]
    Overwrite,
    /// Keep existing content and write after it.
    Append,
}

/// Destination for serialized records.
#[async_trait]
pub trait RecordSink: Send {
    /// Write one record.
    ///
    /// # Returns
    /// * `Result<usize>` - Bytes written for this record
    async fn write_record(&mut self, record: &SerializedRecord) -> Result<usize>;

    /// Push buffered bytes to the destination.
    async fn flush(&mut self) -> Result<()>;

    /// Flush and close. Safe to call more than once.
    async fn finalize(&mut self) -> Result<()>;

    /// Bytes written by this sink.
    fn bytes_written(&self) -> u64;

    /// Lines written by this sink.
    fn lines_written(&self) -> u64;

    /// Length of the destination after everything written so far, including
    /// content that was there before the sink was opened.
    fn position(&self) -> u64;
}

/// Line-oriented command writer over any async byte writer.
pub struct CommandWriter<W: AsyncWrite + Unpin + Send> {
    writer: BufWriter<W>,
    /// Destination length when the writer was opened
    start_offset: u64,
    bytes: u64,
    lines: u64,
    records: u64,
    failed: bool,
}

/// Command writer over a file opened by [`open_output`].
pub type FileSink = CommandWriter<File>;

impl<W: AsyncWrite + Unpin + Send> CommandWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_capacity(WRITE_BUFFER, inner, 0)
    }

    /// Create a writer with an explicit buffer size. `start_offset` is the
    /// length the destination already has.
    pub fn with_capacity(capacity: usize, inner: W, start_offset: u64) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, inner),
            start_offset,
            bytes: 0,
            lines: 0,
            records: 0,
            failed: false,
        }
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Unwrap the underlying writer, dropping anything still buffered.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> RecordSink for CommandWriter<W> {
    async fn write_record(&mut self, record: &SerializedRecord) -> Result<usize> {
        if self.failed {
            return Err(SinkError::Poisoned.into());
        }

        let text = record.render();
        if let Err(e) = self.writer.write_all(text.as_bytes()).await {
            self.failed = true;
            return Err(SinkError::Write(e).into());
        }

        self.bytes += text.len() as u64;
        self.lines += record.lines().len() as u64;
        self.records += 1;
        Ok(text.len())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.failed {
            return Err(SinkError::Poisoned.into());
        }
        if let Err(e) = self.writer.flush().await {
            self.failed = true;
            return Err(SinkError::Flush(e).into());
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        // Whatever is left in the buffer after a failed write is not trusted.
        if self.failed {
            return Ok(());
        }
        self.flush().await?;
        debug!(
            "Output finalized: {} records, {} lines, {} bytes",
            self.records, self.lines, self.bytes
        );
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }

    fn lines_written(&self) -> u64 {
        self.lines
    }

    fn position(&self) -> u64 {
        self.start_offset + self.bytes
    }
}

/// Fail when the parent directory of `path` does not exist.
pub(crate) fn validate_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.is_dir()
    {
        return Err(SinkError::MissingDirectory(parent.to_path_buf()).into());
    }
    Ok(())
}

/// Open the dump file. The parent directory must already exist.
///
/// # Arguments
/// * `path` - Output file path
/// * `mode` - Truncate or append to an existing file
///
/// # Returns
/// * `Result<FileSink>` - Buffered writer or error
pub async fn open_output(path: &Path, mode: OutputMode) -> Result<FileSink> {
    validate_path(path)?;

    let mut options = OpenOptions::new();
    match mode {
        OutputMode::Overwrite => options.write(true).create(true).truncate(true),
        OutputMode::Append => options.append(true).create(true),
    };

    let open_err = |source| SinkError::Open {
        path: path.to_path_buf(),
        source,
    };
    let file = options.open(path).await.map_err(open_err)?;
    let start_offset = match mode {
        OutputMode::Overwrite => 0,
        OutputMode::Append => file.metadata().await.map_err(open_err)?.len(),
    };

    debug!("Opened {} ({:?}, offset {})", path.display(), mode, start_offset);
    Ok(CommandWriter::with_capacity(WRITE_BUFFER, file, start_offset))
}

/// Cut an existing dump back to `len` bytes, dropping a torn tail.
pub async fn truncate_output(path: &Path, len: u64) -> Result<()> {
    let open_err = |source| SinkError::Open {
        path: path.to_path_buf(),
        source,
    };
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(open_err)?;
    let current = file.metadata().await.map_err(open_err)?.len();
    if current < len {
        return Err(crate::error::DumpError::Checkpoint(format!(
            "{} is {} bytes, expected at least {}",
            path.display(),
            current,
            len
        )));
    }
    if current > len {
        debug!("Truncating {} from {} to {} bytes", path.display(), current, len);
        file.set_len(len).await.map_err(SinkError::Write)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::error::DumpError;
    use crate::export::serializer::{SkipReason, serialize};
    use crate::store::TypedValue;

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn record(key: &str, value: &str) -> SerializedRecord {
        serialize(key.as_bytes(), &TypedValue::String(value.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_writes_whole_records() {
        let mut sink = CommandWriter::new(Vec::new());
        assert_eq!(sink.write_record(&record("a", "1")).await.unwrap(), 12);
        sink.write_record(&SerializedRecord::skipped(b"b", SkipReason::Vanished))
            .await
            .unwrap();
        assert_ok!(sink.finalize().await);

        assert_eq!(sink.lines_written(), 2);
        assert_eq!(sink.records_written(), 2);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "SET \"a\" \"1\"\n# Skipped \"b\": key no longer exists\n");
    }

    #[tokio::test]
    async fn test_refuses_writes_after_failure() {
        let mut sink = CommandWriter::with_capacity(0, BrokenPipe, 0);

        let err = sink.write_record(&record("a", "1")).await.unwrap_err();
        assert!(matches!(err, DumpError::Sink(SinkError::Write(_))));
        assert!(sink.has_failed());

        let err = sink.write_record(&record("b", "2")).await.unwrap_err();
        assert!(matches!(err, DumpError::Sink(SinkError::Poisoned)));
        assert_eq!(sink.bytes_written(), 0);
        assert_ok!(sink.finalize().await);
    }

    #[tokio::test]
    async fn test_open_requires_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("dump.redis");

        let Err(err) = open_output(&path, OutputMode::Overwrite).await else {
            panic!("opened a file in a missing directory");
        };
        assert!(matches!(err, DumpError::Sink(SinkError::MissingDirectory(_))));
        assert!(!dir.path().join("missing").exists());
    }

    #[tokio::test]
    async fn test_overwrite_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.redis");
        std::fs::write(&path, "OLD\n").unwrap();

        let mut sink = open_output(&path, OutputMode::Append).await.unwrap();
        assert_eq!(sink.position(), 4);
        sink.write_record(&record("k", "v")).await.unwrap();
        sink.finalize().await.unwrap();
        assert_eq!(sink.position(), 16);
        drop(sink);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "OLD\nSET \"k\" \"v\"\n");

        let mut sink = open_output(&path, OutputMode::Overwrite).await.unwrap();
        sink.finalize().await.unwrap();
        drop(sink);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn test_truncate_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.redis");
        std::fs::write(&path, "SET \"a\" \"1\"\nSET \"b\"").unwrap();

        assert_ok!(truncate_output(&path, 12).await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SET \"a\" \"1\"\n");

        let err = assert_err!(truncate_output(&path, 100).await);
        assert!(matches!(err, DumpError::Checkpoint(_)));
    }
}
