//! Key-value store boundary used by the export engine
//!
//! The engine never opens sockets itself. Everything it needs from the store
//! goes through [`KeyspaceStore`]: cursor-based key iteration, type
//! introspection and one bulk read per data type. Two implementations live
//! here:
//!
//! - [`RedisStore`]: a Redis (or compatible) server over a multiplexed async connection
//! - [`MemoryStore`]: an in-process keyspace that can also replay dump lines

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

pub mod glob;
pub mod memory;
pub mod redis_store;

pub use memory::{MemoryStore, MemoryValue};
pub use redis_store::RedisStore;

/// Cursor value that starts a scan and marks its end.
pub const INITIAL_CURSOR: &str = "0";

/// Opaque SCAN continuation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanCursor(String);

impl ScanCursor {
    /// The sentinel cursor `"0"`.
    pub fn initial() -> Self {
        Self(INITIAL_CURSOR.to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// True once the server hands the sentinel back.
    pub fn is_terminal(&self) -> bool {
        self.0 == INITIAL_CURSOR
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ScanCursor {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for ScanCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One SCAN reply: the next cursor and zero or more keys.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub cursor: ScanCursor,
    pub keys: Vec<Vec<u8>>,
}

/// Structure a key currently holds, as reported by `TYPE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    String,
    List,
    Set,
    SortedSet,
    Hash,
    /// RedisJSON document (`ReJSON-RL`).
    Json,
    /// `none`: the key expired or was deleted after SCAN returned it.
    Missing,
    /// Anything without a serialization rule (streams, modules, ...).
    Unsupported(String),
}

impl TypeTag {
    /// Classify a `TYPE` reply.
    pub fn from_reply(name: &str) -> Self {
        match name {
            "string" => TypeTag::String,
            "list" => TypeTag::List,
            "set" => TypeTag::Set,
            "zset" => TypeTag::SortedSet,
            "hash" => TypeTag::Hash,
            "ReJSON-RL" => TypeTag::Json,
            "none" => TypeTag::Missing,
            other => TypeTag::Unsupported(other.to_string()),
        }
    }

    /// The name the server uses for this type.
    pub fn as_str(&self) -> &str {
        match self {
            TypeTag::String => "string",
            TypeTag::List => "list",
            TypeTag::Set => "set",
            TypeTag::SortedSet => "zset",
            TypeTag::Hash => "hash",
            TypeTag::Json => "ReJSON-RL",
            TypeTag::Missing => "none",
            TypeTag::Unsupported(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, TypeTag::Missing | TypeTag::Unsupported(_))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sorted-set member with its score exactly as the server printed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredMember {
    pub member: Vec<u8>,
    pub score: String,
}

/// A fetched value, one variant per supported [`TypeTag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    String(Vec<u8>),
    List(Vec<Vec<u8>>),
    Set(Vec<Vec<u8>>),
    SortedSet(Vec<ScoredMember>),
    Hash(Vec<(Vec<u8>, Vec<u8>)>),
    Json(String),
}

impl TypedValue {
    pub fn tag(&self) -> TypeTag {
        match self {
            TypedValue::String(_) => TypeTag::String,
            TypedValue::List(_) => TypeTag::List,
            TypedValue::Set(_) => TypeTag::Set,
            TypedValue::SortedSet(_) => TypeTag::SortedSet,
            TypedValue::Hash(_) => TypeTag::Hash,
            TypedValue::Json(_) => TypeTag::Json,
        }
    }
}

/// Read-only view of a key-value store used by the export engine.
///
/// Every method is one round-trip. Implementations report failures as
/// [`crate::error::TransportError`]s; a server error reply must stay
/// distinguishable (see [`crate::error::DumpError::is_server_reply`]) so a
/// rejected match pattern can be reported as such.
#[async_trait]
pub trait KeyspaceStore: Send {
    /// `SCAN cursor MATCH pattern COUNT count`
    async fn scan(&mut self, cursor: &ScanCursor, pattern: &str, count: usize)
    -> Result<ScanPage>;

    /// `TYPE key`
    async fn type_of(&mut self, key: &[u8]) -> Result<TypeTag>;

    /// `GET key`
    async fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// `LRANGE key 0 -1`
    async fn list_range(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// `SMEMBERS key`
    async fn set_members(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// `ZRANGE key 0 -1 WITHSCORES`
    async fn sorted_set_with_scores(&mut self, key: &[u8]) -> Result<Vec<ScoredMember>>;

    /// `HGETALL key`
    async fn hash_get_all(&mut self, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// `JSON.GET key`, sent as a raw command.
    async fn json_get(&mut self, key: &[u8]) -> Result<Option<String>>;

    /// `PTTL key`: remaining milliseconds, `-1` without expiry, `-2` when missing.
    async fn pttl(&mut self, key: &[u8]) -> Result<i64>;

    /// Read a key whose type is already known.
    ///
    /// Returns `None` for types without a read rule and for keys that
    /// disappeared before the read.
    async fn fetch(&mut self, key: &[u8], tag: &TypeTag) -> Result<Option<TypedValue>> {
        let value = match tag {
            TypeTag::String => self.get(key).await?.map(TypedValue::String),
            TypeTag::List => Some(TypedValue::List(self.list_range(key).await?)),
            TypeTag::Set => Some(TypedValue::Set(self.set_members(key).await?)),
            TypeTag::SortedSet => Some(TypedValue::SortedSet(
                self.sorted_set_with_scores(key).await?,
            )),
            TypeTag::Hash => Some(TypedValue::Hash(self.hash_get_all(key).await?)),
            TypeTag::Json => self.json_get(key).await?.map(TypedValue::Json),
            TypeTag::Missing | TypeTag::Unsupported(_) => None,
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_from_reply() {
        assert_eq!(TypeTag::from_reply("zset"), TypeTag::SortedSet);
        assert_eq!(TypeTag::from_reply("ReJSON-RL"), TypeTag::Json);
        assert_eq!(TypeTag::from_reply("none"), TypeTag::Missing);
        assert_eq!(
            TypeTag::from_reply("stream"),
            TypeTag::Unsupported("stream".to_string())
        );
        assert!(!TypeTag::from_reply("stream").is_supported());
        assert_eq!(TypeTag::from_reply("stream").as_str(), "stream");
    }

    #[test]
    fn test_cursor_sentinel() {
        assert!(ScanCursor::initial().is_terminal());
        assert!(ScanCursor::default().is_terminal());
        assert!(!ScanCursor::new("17").is_terminal());
        assert_eq!(ScanCursor::new("17").to_string(), "17");
    }

    #[test]
    fn test_typed_value_tag() {
        assert_eq!(TypedValue::Json("{}".into()).tag(), TypeTag::Json);
        assert_eq!(TypedValue::List(vec![]).tag(), TypeTag::List);
    }
}
