//! Redis keyspace dump library
//!
//! Walks the keyspace of a Redis-compatible server with `SCAN`, classifies
//! each key with `TYPE` and writes its contents as `redis-cli` commands
//! that rebuild it when replayed.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: Redis connection management
//! - `error`: Error types and handling
//! - `export`: Scan loop, serialization and output
//! - `store`: Store boundary with Redis and in-memory implementations
//!
//! # Example
//!
//! ```no_run
//! use redisdump::{config::Config, connection::ConnectionManager};
//! use redisdump::export::{OutputMode, open_output, run_export};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut manager = ConnectionManager::new(config.connection.clone(), config.request_timeout());
//!     let mut store = manager.connect().await?;
//!
//!     let sink = open_output(&config.output_path("2024-01-01"), OutputMode::Overwrite).await?;
//!     let keys = run_export(&mut store, "*", 1000, Box::new(sink)).await?;
//!     println!("Exported {keys} keys");
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{DumpError, Result};
pub use export::{ExportCoordinator, ExportResult, run_export};
pub use store::{KeyspaceStore, MemoryStore, RedisStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
