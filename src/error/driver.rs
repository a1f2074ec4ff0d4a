use std::fmt;

use serde::Serialize;

/// Structured error information extracted from a Redis driver error.
///
/// Serializable so it can be attached to log lines as JSON.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub(crate) error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) detail: Option<String>,
    pub(crate) retryable: bool,
}

impl ErrorInfo {
    /// Convert error info to compact JSON string (single line).
    pub fn to_json_compact(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Format a driver error as `CODE detail` for server replies, or the
/// driver's own message for everything else.
pub fn format_redis_error(f: &mut fmt::Formatter<'_>, error: &redis::RedisError) -> fmt::Result {
    let info = extract_error_info(error);
    match (info.code, info.detail) {
        (Some(code), Some(detail)) => write!(f, "{code} {detail}"),
        (Some(code), None) => write!(f, "{code}"),
        _ => write!(f, "{error}"),
    }
}

/// Extract structured information from a driver error using its typed API.
pub fn extract_error_info(error: &redis::RedisError) -> ErrorInfo {
    let error_type = if error.is_timeout() {
        "redis.timeout"
    } else if error.is_connection_refusal() {
        "redis.connection_refused"
    } else if error.is_connection_dropped() {
        "redis.connection_dropped"
    } else if error.is_io_error() {
        "redis.io_error"
    } else if error.code().is_some() {
        "redis.server_error"
    } else {
        "redis.client_error"
    };

    ErrorInfo {
        error_type: error_type.to_string(),
        code: error.code().map(str::to_string),
        detail: error.detail().map(str::to_string),
        retryable: error.is_timeout() || error.is_connection_dropped(),
    }
}

/// True when the server received the request and answered with an error.
pub fn is_server_reply(error: &redis::RedisError) -> bool {
    !error.is_io_error() && !error.is_timeout() && error.code().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_server_error() {
        let err = redis::RedisError::from((
            redis::ErrorKind::ResponseError,
            "An error was signalled by the server",
            "invalid cursor".to_string(),
        ));
        let info = extract_error_info(&err);
        assert_eq!(info.error_type, "redis.server_error");
        assert_eq!(info.detail.as_deref(), Some("invalid cursor"));
        assert!(!info.retryable);
    }

    #[test]
    fn test_extract_io_error() {
        let err = redis::RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        let info = extract_error_info(&err);
        assert!(info.code.is_none());
        assert!(!is_server_reply(&err));
        let json = info.to_json_compact().unwrap();
        assert!(json.contains("\"type\""));
    }
}
