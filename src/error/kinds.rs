use std::path::PathBuf;
use std::{fmt, io};

use crate::error::driver::format_redis_error;

/// Crate-wide `Result` type using [`DumpError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DumpError>;

/// Top-level error type for redisdump operations.
///
/// Only transport, sink and pattern errors can end an export run. Keys of an
/// unsupported type are not errors; they become comment lines.
#[derive(Debug)]
pub enum DumpError {
    /// Talking to the store failed.
    Transport(TransportError),

    /// Writing the dump file failed.
    Sink(SinkError),

    /// The store rejected the key-match pattern on the first scan.
    MalformedPattern { pattern: String, message: String },

    /// Configuration errors.
    Config(ConfigError),

    /// Checkpoint file could not be read, written or used.
    Checkpoint(String),

    /// I/O errors outside the dump file (config, checkpoint).
    Io(io::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Store transport errors.
#[derive(Debug)]
pub enum TransportError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URL.
    InvalidUrl(String),

    /// A command was sent but the driver reported an error.
    Redis {
        command: &'static str,
        source: redis::RedisError,
    },

    /// A command did not answer within the request deadline.
    Timeout { command: &'static str, after_ms: u64 },

    /// The reply did not have the expected shape.
    UnexpectedReply { command: &'static str, detail: String },
}

/// Output sink errors.
#[derive(Debug)]
pub enum SinkError {
    /// The output directory does not exist. It is never created for the caller.
    MissingDirectory(PathBuf),

    /// The output file could not be opened.
    Open { path: PathBuf, source: io::Error },

    /// Writing a record failed.
    Write(io::Error),

    /// Flushing buffered output failed.
    Flush(io::Error),

    /// A previous write failed; no further writes are attempted.
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Anything else.
    Generic(String),
}

impl DumpError {
    /// Whether the store answered the request with an error reply, as opposed
    /// to the request never completing.
    pub fn is_server_reply(&self) -> bool {
        match self {
            DumpError::Transport(TransportError::Redis { source, .. }) => {
                crate::error::driver::is_server_reply(source)
            }
            _ => false,
        }
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Transport(e) => write!(f, "Transport error: {e}"),
            DumpError::Sink(e) => write!(f, "Output error: {e}"),
            DumpError::MalformedPattern { pattern, message } => {
                write!(f, "Store rejected match pattern '{pattern}': {message}")
            }
            DumpError::Config(e) => write!(f, "Configuration error: {e}"),
            DumpError::Checkpoint(msg) => write!(f, "Checkpoint error: {msg}"),
            DumpError::Io(e) => write!(f, "I/O error: {e}"),
            DumpError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            TransportError::InvalidUrl(url) => write!(f, "Invalid connection URL: {url}"),
            TransportError::Redis { command, source } => {
                write!(f, "{command} failed: ")?;
                format_redis_error(f, source)
            }
            TransportError::Timeout { command, after_ms } => {
                write!(f, "{command} timed out after {after_ms} ms")
            }
            TransportError::UnexpectedReply { command, detail } => {
                write!(f, "Unexpected reply to {command}: {detail}")
            }
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::MissingDirectory(dir) => {
                write!(f, "Directory does not exist: {}", dir.display())
            }
            SinkError::Open { path, source } => {
                write!(f, "Failed to open {}: {source}", path.display())
            }
            SinkError::Write(e) => write!(f, "Failed to write record: {e}"),
            SinkError::Flush(e) => write!(f, "Failed to flush output: {e}"),
            SinkError::Poisoned => write!(f, "Output is unusable after an earlier write failure"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DumpError::Transport(e) => Some(e),
            DumpError::Sink(e) => Some(e),
            DumpError::Config(e) => Some(e),
            DumpError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Redis { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Open { source, .. } => Some(source),
            SinkError::Write(e) | SinkError::Flush(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}

/* ========================= Conversions to DumpError ========================= */

impl From<io::Error> for DumpError {
    fn from(err: io::Error) -> Self {
        DumpError::Io(err)
    }
}

impl From<TransportError> for DumpError {
    fn from(err: TransportError) -> Self {
        DumpError::Transport(err)
    }
}

impl From<SinkError> for DumpError {
    fn from(err: SinkError) -> Self {
        DumpError::Sink(err)
    }
}

impl From<ConfigError> for DumpError {
    fn from(err: ConfigError) -> Self {
        DumpError::Config(err)
    }
}

impl From<toml::de::Error> for DumpError {
    fn from(err: toml::de::Error) -> Self {
        DumpError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<serde_json::Error> for DumpError {
    fn from(err: serde_json::Error) -> Self {
        DumpError::Checkpoint(err.to_string())
    }
}
