//! Error handling for redisdump.
//!
//! The taxonomy follows how a dump run can end:
//! - [`TransportError`]: the store could not be reached or a request failed (fatal)
//! - [`SinkError`]: the dump file could not be opened, written or flushed (fatal)
//! - [`DumpError::MalformedPattern`]: the store rejected the match pattern (fatal, before output)
//! - [`ConfigError`]: configuration problems found at startup
//!
//! Keys of an unsupported type are not errors at all; see
//! [`crate::export::SkipReason`].
//!
//! # Example
//!
//! ```rust,no_run
//! use redisdump::error::{DumpError, Result, SinkError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SinkError::Poisoned.into())
//! }
//!
//! if let Err(DumpError::Sink(e)) = example_operation() {
//!     eprintln!("{e}");
//! }
//! ```

pub mod kinds;
pub mod driver;

// Re-export commonly used types
pub use kinds::{ConfigError, DumpError, Result, SinkError, TransportError};
pub use driver::{ErrorInfo, extract_error_info};
