//! Export coordinator
//!
//! Drives one export run: pages through the keyspace with [`KeyScanner`],
//! asks the store for each key's type, reads and serializes the value and
//! hands the record to the sink. The sink is finalized on every exit path.

use std::path::PathBuf;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, DumpError, Result, TransportError, extract_error_info};
use crate::store::{KeyspaceStore, ScanCursor, TypeTag};

use super::checkpoint::{Checkpoint, CheckpointFile};
use super::progress::ProgressTracker;
use super::scan::KeyScanner;
use super::serializer::{SerializedRecord, SkipReason, expiry_line, serialize};
use super::sink::RecordSink;

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Glob pattern for `SCAN ... MATCH`
    pub pattern: String,
    /// `COUNT` hint per scan round-trip
    pub batch_size: usize,
    /// Append `PEXPIRE` lines for keys with a time to live
    pub with_ttl: bool,
    /// Log a progress line every this many keys (0 disables)
    pub progress_interval: u64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pattern: "*".to_string(),
            batch_size: 1000,
            with_ttl: false,
            progress_interval: 1000,
        }
    }
}

impl ExportOptions {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Result of an export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResult {
    /// Keys visited, including skipped ones and keys counted by a resumed run
    pub keys_visited: u64,
    /// Keys that produced a comment instead of commands
    pub keys_skipped: u64,
    pub lines_written: u64,
    pub bytes_written: u64,
    /// Scan round-trips made by this run
    pub batches: u64,
    pub elapsed_ms: u64,
    /// Whether the run was stopped before the scan finished
    pub cancelled: bool,
}

/// State at the last completed batch, which is what a checkpoint records.
#[derive(Debug, Clone)]
struct Boundary {
    cursor: ScanCursor,
    keys_visited: u64,
    output_len: u64,
}

/// Coordinator for one export run
///
/// Owns the sink for the duration of the run. The store handle is borrowed;
/// one request is in flight at a time.
pub struct ExportCoordinator<'a> {
    store: &'a mut dyn KeyspaceStore,
    scanner: KeyScanner,
    tracker: ProgressTracker,
    sink: Box<dyn RecordSink>,
    options: ExportOptions,
    cancel_token: Option<CancellationToken>,
    /// Checkpoint location and the dump file it refers to
    checkpoint: Option<(CheckpointFile, PathBuf)>,
    visited: u64,
    skipped: u64,
}

impl<'a> ExportCoordinator<'a> {
    /// Create a new export coordinator
    ///
    /// # Arguments
    /// * `store` - Store to read from
    /// * `options` - Pattern, batch size and output options
    /// * `tracker` - Progress tracker for user feedback
    /// * `sink` - Destination for serialized records
    pub fn new(
        store: &'a mut dyn KeyspaceStore,
        options: ExportOptions,
        tracker: ProgressTracker,
        sink: Box<dyn RecordSink>,
    ) -> Self {
        Self {
            store,
            scanner: KeyScanner::new(options.pattern.clone(), options.batch_size),
            tracker,
            sink,
            options,
            cancel_token: None,
            checkpoint: None,
            visited: 0,
            skipped: 0,
        }
    }

    /// Set cancellation token for this export run
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Save a checkpoint for `output` after every completed batch.
    pub fn with_checkpoint(mut self, file: CheckpointFile, output: impl Into<PathBuf>) -> Self {
        self.checkpoint = Some((file, output.into()));
        self
    }

    /// Continue a run from a saved checkpoint. The sink must already be
    /// positioned at the checkpoint's output length.
    pub fn resume_from(mut self, checkpoint: &Checkpoint) -> Self {
        let scanner = KeyScanner::new(self.options.pattern.clone(), self.options.batch_size);
        self.scanner = scanner.resume_from(checkpoint.cursor());
        self.visited = checkpoint.keys_visited;
        self.tracker.update(self.visited);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Execute the export run
    ///
    /// # Returns
    /// * `Result<ExportResult>` - Run statistics or the error that ended it
    pub async fn execute(&mut self) -> Result<ExportResult> {
        self.options.validate()?;
        let start_time = Instant::now();
        info!(
            "Starting export of keys matching '{}' (batch size {})",
            self.options.pattern, self.options.batch_size
        );

        let outcome = self.run().await;

        let finalized = self.sink.finalize().await;
        self.tracker.finish();

        let cancelled = match outcome {
            Ok(cancelled) => cancelled,
            Err(e) => {
                if let Err(flush_err) = finalized {
                    warn!("Output could not be flushed after failure: {}", flush_err);
                }
                log_abort(&e);
                return Err(e);
            }
        };
        finalized?;

        if !cancelled && let Some((file, _)) = &self.checkpoint {
            file.clear().await?;
        }

        let result = ExportResult {
            keys_visited: self.visited,
            keys_skipped: self.skipped,
            lines_written: self.sink.lines_written(),
            bytes_written: self.sink.bytes_written(),
            batches: self.scanner.round_trips(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            cancelled,
        };

        if cancelled {
            info!(
                "Export cancelled after {} keys at cursor {}",
                result.keys_visited,
                self.scanner.cursor()
            );
        } else {
            info!(
                "Export completed: {} keys ({} skipped), {} lines, {} bytes, {} ms",
                result.keys_visited,
                result.keys_skipped,
                result.lines_written,
                result.bytes_written,
                result.elapsed_ms
            );
        }

        Ok(result)
    }

    /// The scan loop. Returns whether the run was cancelled.
    ///
    /// Store requests race the cancellation token, so a stalled server cannot
    /// hold a cancelled run. A key whose reads were interrupted is dropped
    /// and the checkpoint stays at the last completed batch.
    async fn run(&mut self) -> Result<bool> {
        let token = self.cancel_token.clone();
        let mut boundary = Boundary {
            cursor: self.scanner.cursor().clone(),
            keys_visited: self.visited,
            output_len: self.sink.position(),
        };

        loop {
            if self.is_cancelled() {
                self.save_checkpoint(&boundary).await;
                return Ok(true);
            }

            let batch =
                until_cancelled(token.as_ref(), self.scanner.next_batch(&mut *self.store)).await?;
            let keys = match batch {
                Some(Some(keys)) => keys,
                Some(None) => {
                    debug!("Scan finished after {} round-trips", self.scanner.round_trips());
                    return Ok(false);
                }
                None => {
                    self.save_checkpoint(&boundary).await;
                    return Ok(true);
                }
            };
            debug!("Received batch of {} keys", keys.len());

            for key in &keys {
                let record = if self.is_cancelled() {
                    None
                } else {
                    until_cancelled(token.as_ref(), self.read_record(key)).await?
                };
                let Some(record) = record else {
                    self.sink.flush().await?;
                    self.save_checkpoint(&boundary).await;
                    return Ok(true);
                };
                self.write_record(record).await?;
            }

            self.sink.flush().await?;
            self.tracker.update(self.visited);

            boundary = Boundary {
                cursor: self.scanner.cursor().clone(),
                keys_visited: self.visited,
                output_len: self.sink.position(),
            };
            self.save_checkpoint(&boundary).await;
        }
    }

    /// TYPE, then the per-type read, then PTTL when expiries are kept.
    ///
    /// A container that vanished after TYPE reads back empty and is reported
    /// as an empty container; `GET` and `JSON.GET` can tell it apart.
    async fn read_record(&mut self, key: &[u8]) -> Result<SerializedRecord> {
        let tag = self.store.type_of(key).await?;

        let mut record = match &tag {
            TypeTag::Unsupported(name) => {
                SerializedRecord::skipped(key, SkipReason::UnsupportedType(name.clone()))
            }
            TypeTag::Missing => SerializedRecord::skipped(key, SkipReason::Vanished),
            _ => match self.store.fetch(key, &tag).await? {
                Some(value) => serialize(key, &value),
                None => SerializedRecord::skipped(key, SkipReason::Vanished),
            },
        };

        if self.options.with_ttl && !record.is_skipped() {
            let ttl = self.store.pttl(key).await?;
            if let Some(line) = expiry_line(key, ttl) {
                record.push_line(line);
            }
        }
        Ok(record)
    }

    /// One sink write, then the counters.
    async fn write_record(&mut self, record: SerializedRecord) -> Result<()> {
        if record.is_skipped() {
            self.skipped += 1;
            debug!("{}", record.lines().join(" "));
        }
        self.sink.write_record(&record).await?;

        self.visited += 1;
        if self.options.progress_interval > 0 && self.visited % self.options.progress_interval == 0
        {
            info!(
                "Progress: {} keys exported ({} batches)",
                self.visited,
                self.scanner.round_trips()
            );
        }
        Ok(())
    }

    async fn save_checkpoint(&self, boundary: &Boundary) {
        let Some((file, output)) = &self.checkpoint else {
            return;
        };
        // Nothing to resume before the first batch completes.
        if boundary.cursor.is_terminal() {
            return;
        }
        let checkpoint = Checkpoint::new(
            self.options.pattern.clone(),
            &boundary.cursor,
            boundary.keys_visited,
            output.clone(),
            boundary.output_len,
        );
        if let Err(e) = file.save(&checkpoint).await {
            warn!("Could not save checkpoint: {}", e);
        }
    }
}

/// Race `operation` against `token`; `None` when the token fired first.
async fn until_cancelled<T>(
    token: Option<&CancellationToken>,
    operation: impl Future<Output = Result<T>>,
) -> Result<Option<T>> {
    let Some(token) = token else {
        return operation.await.map(Some);
    };
    tokio::select! {
        result = operation => result.map(Some),
        _ = token.cancelled() => Ok(None),
    }
}

fn log_abort(error: &DumpError) {
    match error {
        DumpError::Transport(TransportError::Redis { command, source }) => {
            let info = extract_error_info(source);
            let detail = info.to_json_compact().unwrap_or_default();
            warn!("Export aborted on {}: {}", command, detail);
        }
        other => warn!("Export aborted: {}", other),
    }
}

/// Export every key matching `pattern` into `sink`.
///
/// # Arguments
/// * `store` - Store to read from
/// * `pattern` - Glob pattern for `SCAN ... MATCH`
/// * `batch_size` - `COUNT` hint, at least 1
/// * `sink` - Destination; finalized before this returns
///
/// # Returns
/// * `Result<u64>` - Number of keys visited
pub async fn run_export(
    store: &mut dyn KeyspaceStore,
    pattern: &str,
    batch_size: usize,
    sink: Box<dyn RecordSink>,
) -> Result<u64> {
    let options = ExportOptions {
        pattern: pattern.to_string(),
        batch_size,
        ..ExportOptions::default()
    };
    let mut coordinator = ExportCoordinator::new(store, options, ProgressTracker::new(false), sink);
    let result = coordinator.execute().await?;
    Ok(result.keys_visited)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio_test::assert_ok;

    use super::*;
    use crate::error::SinkError;
    use crate::store::{MemoryStore, MemoryValue};

    // Mock sink collecting lines in memory
    #[derive(Clone, Default)]
    struct MockSink {
        lines: Arc<Mutex<Vec<String>>>,
        finalized: Arc<Mutex<u32>>,
        bytes: u64,
        fail_on_record: Option<u64>,
        records: u64,
    }

    #[async_trait]
    impl RecordSink for MockSink {
        async fn write_record(&mut self, record: &SerializedRecord) -> Result<usize> {
            self.records += 1;
            if self.fail_on_record == Some(self.records) {
                return Err(SinkError::Write(std::io::Error::other("disk full")).into());
            }
            let text = record.render();
            self.bytes += text.len() as u64;
            self.lines.lock().unwrap().extend(record.lines().iter().cloned());
            Ok(text.len())
        }

        async fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        async fn finalize(&mut self) -> Result<()> {
            *self.finalized.lock().unwrap() += 1;
            Ok(())
        }

        fn bytes_written(&self) -> u64 {
            self.bytes
        }

        fn lines_written(&self) -> u64 {
            self.lines.lock().unwrap().len() as u64
        }

        fn position(&self) -> u64 {
            self.bytes
        }
    }

    fn abc_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .insert("a", MemoryValue::String(b"1".to_vec()))
            .insert("b", MemoryValue::list(["x", "y"]))
            .insert("c", MemoryValue::hash([("f1", "v1")]));
        store
    }

    // Answers SCAN from `inner`; every other request either stalls forever
    // or sees the key as already deleted, depending on `stall`.
    struct RacingStore {
        inner: MemoryStore,
        stall: bool,
    }

    impl RacingStore {
        async fn gone<T>(&self, value: T) -> Result<T> {
            if self.stall {
                std::future::pending::<()>().await;
            }
            Ok(value)
        }
    }

    #[async_trait]
    impl KeyspaceStore for RacingStore {
        async fn scan(
            &mut self,
            cursor: &ScanCursor,
            pattern: &str,
            count: usize,
        ) -> Result<crate::store::ScanPage> {
            self.inner.scan(cursor, pattern, count).await
        }

        async fn type_of(&mut self, key: &[u8]) -> Result<TypeTag> {
            let tag = self.inner.type_of(key).await?;
            self.gone(tag).await
        }

        async fn get(&mut self, _key: &[u8]) -> Result<Option<Vec<u8>>> {
            self.gone(None).await
        }

        async fn list_range(&mut self, _key: &[u8]) -> Result<Vec<Vec<u8>>> {
            self.gone(Vec::new()).await
        }

        async fn set_members(&mut self, _key: &[u8]) -> Result<Vec<Vec<u8>>> {
            self.gone(Vec::new()).await
        }

        async fn sorted_set_with_scores(
            &mut self,
            _key: &[u8],
        ) -> Result<Vec<crate::store::ScoredMember>> {
            self.gone(Vec::new()).await
        }

        async fn hash_get_all(&mut self, _key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
            self.gone(Vec::new()).await
        }

        async fn json_get(&mut self, _key: &[u8]) -> Result<Option<String>> {
            self.gone(None).await
        }

        async fn pttl(&mut self, _key: &[u8]) -> Result<i64> {
            self.gone(-2).await
        }
    }

    #[tokio::test]
    async fn test_coordinator_basic() {
        let mut store = abc_store();
        let sink = MockSink::default();
        let lines = Arc::clone(&sink.lines);

        let options = ExportOptions {
            batch_size: 2,
            ..ExportOptions::default()
        };
        let mut coordinator =
            ExportCoordinator::new(&mut store, options, ProgressTracker::new(false), Box::new(sink));
        let result = assert_ok!(coordinator.execute().await);

        assert_eq!(result.keys_visited, 3);
        assert_eq!(result.keys_skipped, 0);
        assert_eq!(result.lines_written, 4);
        assert_eq!(result.batches, 2);
        assert!(!result.cancelled);
        assert_eq!(
            *lines.lock().unwrap(),
            vec![
                "SET \"a\" \"1\"",
                "RPUSH \"b\" \"x\"",
                "RPUSH \"b\" \"y\"",
                "HSET \"c\" \"f1\" \"v1\"",
            ]
        );
    }

    #[tokio::test]
    async fn test_unsupported_type_skipped() {
        let mut store = abc_store();
        store.insert("d", MemoryValue::Opaque("stream".to_string()));
        let sink = MockSink::default();
        let lines = Arc::clone(&sink.lines);

        let mut coordinator = ExportCoordinator::new(
            &mut store,
            ExportOptions::default(),
            ProgressTracker::new(false),
            Box::new(sink),
        );
        let result = assert_ok!(coordinator.execute().await);

        assert_eq!(result.keys_visited, 4);
        assert_eq!(result.keys_skipped, 1);
        assert_eq!(
            lines.lock().unwrap().last().map(String::as_str),
            Some("# Skipped \"d\": unsupported type \"stream\"")
        );
    }

    #[tokio::test]
    async fn test_cancel_interrupts_stalled_request() {
        let mut store = RacingStore {
            inner: abc_store(),
            stall: true,
        };
        let dir = tempfile::tempdir().unwrap();
        let file = CheckpointFile::in_dir(dir.path());
        let token = CancellationToken::new();
        let sink = MockSink::default();
        let lines = Arc::clone(&sink.lines);
        let finalized = Arc::clone(&sink.finalized);

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let options = ExportOptions {
            batch_size: 1,
            ..ExportOptions::default()
        };
        let mut coordinator =
            ExportCoordinator::new(&mut store, options, ProgressTracker::new(false), Box::new(sink))
                .with_cancellation(token)
                .with_checkpoint(file.clone(), dir.path().join("dump.redis"));
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), coordinator.execute())
            .await
            .expect("cancellation did not interrupt the stalled request");
        let result = assert_ok!(result);

        assert!(result.cancelled);
        assert_eq!(result.keys_visited, 0);
        assert!(lines.lock().unwrap().is_empty());
        assert_eq!(*finalized.lock().unwrap(), 1);
        // The interrupted key was never part of a completed batch.
        assert!(file.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_key_deleted_after_type() {
        let mut inner = MemoryStore::new();
        inner
            .insert("s", MemoryValue::String(b"v".to_vec()))
            .insert("l", MemoryValue::list(["x"]))
            .insert("j", MemoryValue::Json("{}".to_string()));
        let mut store = RacingStore {
            inner,
            stall: false,
        };
        let sink = MockSink::default();
        let lines = Arc::clone(&sink.lines);

        let count = assert_ok!(run_export(&mut store, "*", 10, Box::new(sink)).await);

        assert_eq!(count, 3);
        // LRANGE cannot tell a deleted list from an empty one.
        assert_eq!(
            *lines.lock().unwrap(),
            vec![
                "# Skipped \"j\": key no longer exists",
                "# Skipped \"l\": empty list",
                "# Skipped \"s\": key no longer exists",
            ]
        );
    }

    #[tokio::test]
    async fn test_coordinator_empty_store() {
        let mut store = MemoryStore::new();
        let sink = MockSink::default();
        let finalized = Arc::clone(&sink.finalized);

        let count = assert_ok!(run_export(&mut store, "*", 10, Box::new(sink)).await);
        assert_eq!(count, 0);
        assert_eq!(*finalized.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let mut store = abc_store();
        let err = run_export(&mut store, "*", 0, Box::new(MockSink::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, DumpError::Config(_)));
    }

    #[tokio::test]
    async fn test_transport_error_still_finalizes() {
        let mut store = abc_store();
        // SCAN, TYPE a, GET a, then the TYPE for b fails.
        store.fail_after(3);
        let sink = MockSink::default();
        let finalized = Arc::clone(&sink.finalized);
        let lines = Arc::clone(&sink.lines);

        let err = run_export(&mut store, "*", 10, Box::new(sink))
            .await
            .unwrap_err();
        assert!(matches!(err, DumpError::Transport(_)));
        assert_eq!(*finalized.lock().unwrap(), 1);
        assert_eq!(*lines.lock().unwrap(), vec!["SET \"a\" \"1\""]);
    }

    #[tokio::test]
    async fn test_sink_error_aborts() {
        let mut store = abc_store();
        let sink = MockSink {
            fail_on_record: Some(2),
            ..MockSink::default()
        };
        let finalized = Arc::clone(&sink.finalized);

        let err = run_export(&mut store, "*", 10, Box::new(sink))
            .await
            .unwrap_err();
        assert!(matches!(err, DumpError::Sink(_)));
        assert_eq!(*finalized.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_pattern_writes_nothing() {
        let mut store = abc_store();
        store.reject_patterns("ERR bad pattern");
        let sink = MockSink::default();
        let lines = Arc::clone(&sink.lines);

        let err = run_export(&mut store, "[", 10, Box::new(sink))
            .await
            .unwrap_err();
        assert!(matches!(err, DumpError::MalformedPattern { .. }));
        assert!(lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_with_ttl_appends_pexpire() {
        let mut store = abc_store();
        store.set_expiry(b"a", 60_000);
        let sink = MockSink::default();
        let lines = Arc::clone(&sink.lines);

        let options = ExportOptions {
            with_ttl: true,
            ..ExportOptions::default()
        };
        let mut coordinator =
            ExportCoordinator::new(&mut store, options, ProgressTracker::new(false), Box::new(sink));
        assert_ok!(coordinator.execute().await);

        let lines = lines.lock().unwrap();
        assert_eq!(lines[0], "SET \"a\" \"1\"");
        assert_eq!(lines[1], "PEXPIRE \"a\" 60000");
        assert!(!lines.iter().any(|l| l.contains("PEXPIRE \"b\"")));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut store = abc_store();
        let token = CancellationToken::new();
        token.cancel();
        let sink = MockSink::default();
        let finalized = Arc::clone(&sink.finalized);

        let mut coordinator = ExportCoordinator::new(
            &mut store,
            ExportOptions::default(),
            ProgressTracker::new(false),
            Box::new(sink),
        )
        .with_cancellation(token);
        let result = assert_ok!(coordinator.execute().await);

        assert!(result.cancelled);
        assert_eq!(result.keys_visited, 0);
        assert_eq!(*finalized.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_checkpoint_cleared_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let file = CheckpointFile::in_dir(dir.path());
        let mut store = abc_store();

        let options = ExportOptions {
            batch_size: 1,
            ..ExportOptions::default()
        };
        let mut coordinator = ExportCoordinator::new(
            &mut store,
            options,
            ProgressTracker::new(false),
            Box::new(MockSink::default()),
        )
        .with_checkpoint(file.clone(), dir.path().join("dump.redis"));
        assert_ok!(coordinator.execute().await);

        assert!(!file.path().exists());
    }

    #[tokio::test]
    async fn test_checkpoint_kept_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file = CheckpointFile::in_dir(dir.path());
        let mut store = abc_store();
        // Batch 1: SCAN, TYPE a, GET a. Batch 2: SCAN, TYPE b, LRANGE b. Then SCAN fails.
        store.fail_after(6);

        let options = ExportOptions {
            batch_size: 1,
            ..ExportOptions::default()
        };
        let mut coordinator = ExportCoordinator::new(
            &mut store,
            options,
            ProgressTracker::new(false),
            Box::new(MockSink::default()),
        )
        .with_checkpoint(file.clone(), dir.path().join("dump.redis"));
        assert!(coordinator.execute().await.is_err());

        let checkpoint = file.load().await.unwrap().unwrap();
        assert_eq!(checkpoint.cursor, "2");
        assert_eq!(checkpoint.keys_visited, 2);
        assert_eq!(checkpoint.output_len, 40);
    }

    #[tokio::test]
    async fn test_resume_continues_count() {
        let mut store = abc_store();
        let sink = MockSink::default();
        let lines = Arc::clone(&sink.lines);
        let checkpoint = Checkpoint::new("*", &ScanCursor::new("2"), 2, "dump.redis", 0);

        let options = ExportOptions {
            batch_size: 1,
            ..ExportOptions::default()
        };
        let mut coordinator =
            ExportCoordinator::new(&mut store, options, ProgressTracker::new(false), Box::new(sink))
                .resume_from(&checkpoint);
        let result = assert_ok!(coordinator.execute().await);

        assert_eq!(result.keys_visited, 3);
        assert_eq!(*lines.lock().unwrap(), vec!["HSET \"c\" \"f1\" \"v1\""]);
    }
}
