//! Cursor-driven key iteration
//!
//! [`KeyScanner`] owns the SCAN cursor and hands out one batch of keys per
//! round-trip. Batches may be empty while the cursor is still live; only a
//! returned `"0"` ends the iteration.

use tracing::debug;

use crate::error::{DumpError, Result, TransportError};
use crate::store::{KeyspaceStore, ScanCursor};

pub struct KeyScanner {
    pattern: String,
    count: usize,
    cursor: ScanCursor,
    round_trips: u64,
    exhausted: bool,
}

impl KeyScanner {
    /// Create a scanner starting at the initial cursor.
    ///
    /// # Arguments
    /// * `pattern` - Glob pattern passed to `MATCH`
    /// * `count` - `COUNT` hint per round-trip
    pub fn new(pattern: impl Into<String>, count: usize) -> Self {
        Self {
            pattern: pattern.into(),
            count,
            cursor: ScanCursor::initial(),
            round_trips: 0,
            exhausted: false,
        }
    }

    /// Continue from a cursor saved by an earlier run. The initial cursor
    /// starts over.
    pub fn resume_from(mut self, cursor: ScanCursor) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Cursor the next request will send.
    pub fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    pub fn round_trips(&self) -> u64 {
        self.round_trips
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch the next batch of keys.
    ///
    /// # Returns
    /// * `Result<Option<Vec<Vec<u8>>>>` - Keys of the next page (possibly
    ///   empty), or `None` once the server returned the terminal cursor
    pub async fn next_batch(
        &mut self,
        store: &mut dyn KeyspaceStore,
    ) -> Result<Option<Vec<Vec<u8>>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = match store.scan(&self.cursor, &self.pattern, self.count).await {
            Ok(page) => page,
            Err(err) if self.round_trips == 0 && err.is_server_reply() => {
                // A resumed scan's first request carries a saved cursor, which
                // the server may reject on its own.
                if !self.cursor.is_terminal() {
                    return Err(DumpError::Checkpoint(format!(
                        "Store rejected saved cursor '{}': {}",
                        self.cursor,
                        reply_message(&err)
                    )));
                }
                return Err(DumpError::MalformedPattern {
                    pattern: self.pattern.clone(),
                    message: reply_message(&err),
                });
            }
            Err(err) => return Err(err),
        };

        self.round_trips += 1;
        debug!(
            "SCAN {} -> {} ({} keys)",
            self.cursor,
            page.cursor,
            page.keys.len()
        );

        self.exhausted = page.cursor.is_terminal();
        self.cursor = page.cursor;
        Ok(Some(page.keys))
    }
}

/// The server's own words for an error reply.
fn reply_message(err: &DumpError) -> String {
    match err {
        DumpError::Transport(TransportError::Redis { source, .. }) => match source.detail() {
            Some(detail) => detail.to_string(),
            None => source.to_string(),
        },
        other => other.to_string(),
    }
}
