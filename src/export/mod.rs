//! Keyspace export
//!
//! Walks every key matching a pattern and writes one replayable record per
//! key. The pieces, leaves first:
//!
//! 1. **quote / serializer**: pure functions turning a fetched value into
//!    `redis-cli` command lines
//! 2. **KeyScanner**: owns the SCAN cursor and yields batches of keys
//! 3. **RecordSink**: buffered, whole-record output
//! 4. **ProgressTracker** and **Checkpoint**: feedback and resumability
//!
//! These are orchestrated by the **ExportCoordinator**.
//!
//! # Example
//!
//! ```no_run
//! use redisdump::export::{OutputMode, open_output, run_export};
//! use redisdump::store::{MemoryStore, MemoryValue};
//!
//! # async fn demo() -> redisdump::Result<()> {
//! let mut store = MemoryStore::new();
//! store.insert("greeting", MemoryValue::String(b"hello".to_vec()));
//!
//! let sink = open_output("data/dump.redis".as_ref(), OutputMode::Overwrite).await?;
//! let keys = run_export(&mut store, "*", 1000, Box::new(sink)).await?;
//! assert_eq!(keys, 1);
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod coordinator;
pub mod progress;
pub mod quote;
pub mod scan;
pub mod serializer;
pub mod sink;

pub use checkpoint::{Checkpoint, CheckpointFile};
pub use coordinator::{ExportCoordinator, ExportOptions, ExportResult, run_export};
pub use progress::ProgressTracker;
pub use quote::{quote, split_args};
pub use scan::KeyScanner;
pub use serializer::{RecordKind, SerializedRecord, SkipReason, expiry_line, serialize};
pub use sink::{CommandWriter, FileSink, OutputMode, RecordSink, open_output, truncate_output};
