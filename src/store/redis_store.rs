//! [`KeyspaceStore`] backed by a Redis server

use std::time::Duration;

use async_trait::async_trait;
use redis::FromRedisValue;
use redis::aio::MultiplexedConnection;
use tracing::trace;

use crate::error::{Result, TransportError};

use super::{KeyspaceStore, ScanCursor, ScanPage, ScoredMember, TypeTag};

/// Redis-backed keyspace.
///
/// Replies are read in RESP2 shape: `ZRANGE ... WITHSCORES` and `HGETALL`
/// arrive as flat arrays and are paired up here.
pub struct RedisStore {
    conn: MultiplexedConnection,
    /// Deadline applied to every request, if any
    request_timeout: Option<Duration>,
}

impl RedisStore {
    pub fn new(conn: MultiplexedConnection, request_timeout: Option<Duration>) -> Self {
        Self {
            conn,
            request_timeout,
        }
    }

    /// Send one command and wait for its reply, honoring the request deadline.
    async fn query<T: FromRedisValue + Send>(
        &mut self,
        command: &'static str,
        cmd: &redis::Cmd,
    ) -> Result<T> {
        trace!("-> {}", command);
        let pending = cmd.query_async(&mut self.conn);

        let reply = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| {
                TransportError::Timeout {
                    command,
                    after_ms: limit.as_millis() as u64,
                }
            })?,
            None => pending.await,
        };

        reply.map_err(|source| TransportError::Redis { command, source }.into())
    }

    /// Split a flat `[a1, b1, a2, b2, ...]` reply into pairs.
    fn pair_up(command: &'static str, flat: Vec<Vec<u8>>) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if flat.len() % 2 != 0 {
            return Err(TransportError::UnexpectedReply {
                command,
                detail: format!("odd number of elements ({})", flat.len()),
            }
            .into());
        }

        let mut pairs = Vec::with_capacity(flat.len() / 2);
        let mut items = flat.into_iter();
        while let (Some(a), Some(b)) = (items.next(), items.next()) {
            pairs.push((a, b));
        }
        Ok(pairs)
    }
}

#[async_trait]
impl KeyspaceStore for RedisStore {
    async fn scan(
        &mut self,
        cursor: &ScanCursor,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage> {
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor.as_str())
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count);

        let (next, keys): (String, Vec<Vec<u8>>) = self.query("SCAN", &cmd).await?;
        Ok(ScanPage {
            cursor: ScanCursor::new(next),
            keys,
        })
    }

    async fn type_of(&mut self, key: &[u8]) -> Result<TypeTag> {
        let mut cmd = redis::cmd("TYPE");
        cmd.arg(key);
        let name: String = self.query("TYPE", &cmd).await?;
        Ok(TypeTag::from_reply(&name))
    }

    async fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query("GET", &cmd).await
    }

    async fn list_range(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("LRANGE");
        cmd.arg(key).arg(0).arg(-1);
        self.query("LRANGE", &cmd).await
    }

    async fn set_members(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("SMEMBERS");
        cmd.arg(key);
        self.query("SMEMBERS", &cmd).await
    }

    async fn sorted_set_with_scores(&mut self, key: &[u8]) -> Result<Vec<ScoredMember>> {
        let mut cmd = redis::cmd("ZRANGE");
        cmd.arg(key).arg(0).arg(-1).arg("WITHSCORES");
        let flat: Vec<Vec<u8>> = self.query("ZRANGE", &cmd).await?;

        Self::pair_up("ZRANGE", flat)?
            .into_iter()
            .map(|(member, score)| {
                let score = String::from_utf8(score).map_err(|_| TransportError::UnexpectedReply {
                    command: "ZRANGE",
                    detail: "score is not valid UTF-8".to_string(),
                })?;
                Ok(ScoredMember { member, score })
            })
            .collect()
    }

    async fn hash_get_all(&mut self, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut cmd = redis::cmd("HGETALL");
        cmd.arg(key);
        let flat: Vec<Vec<u8>> = self.query("HGETALL", &cmd).await?;
        Self::pair_up("HGETALL", flat)
    }

    async fn json_get(&mut self, key: &[u8]) -> Result<Option<String>> {
        let mut cmd = redis::cmd("JSON.GET");
        cmd.arg(key);
        self.query("JSON.GET", &cmd).await
    }

    async fn pttl(&mut self, key: &[u8]) -> Result<i64> {
        let mut cmd = redis::cmd("PTTL");
        cmd.arg(key);
        self.query("PTTL", &cmd).await
    }
}
