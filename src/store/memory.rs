//! In-process keyspace
//!
//! [`MemoryStore`] answers the same read requests as a server, including
//! paged SCAN with a numeric cursor, so the export engine can be exercised
//! without a network. It can also replay dump lines (`SET`, `RPUSH`, `SADD`,
//! `ZADD`, `HSET`, `JSON.SET`, `PEXPIRE`, `DEL`), which is how dumps are
//! checked for round-trip fidelity.
//!
//! Failures can be injected: [`MemoryStore::fail_after`] breaks the
//! "connection" after a number of requests and
//! [`MemoryStore::reject_patterns`] makes every SCAN answer with an error
//! reply.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;

use async_trait::async_trait;

use crate::error::{DumpError, Result, TransportError};
use crate::export::quote::split_args;

use super::glob::glob_match;
use super::{KeyspaceStore, ScanCursor, ScanPage, ScoredMember, TypeTag};

/// A stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    String(Vec<u8>),
    List(Vec<Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
    /// Kept ordered by score, then member, like the server.
    SortedSet(Vec<(Vec<u8>, f64)>),
    /// Field order is insertion order; fields are unique.
    Hash(Vec<(Vec<u8>, Vec<u8>)>),
    Json(String),
    /// A value of some other type, reported by `TYPE` under this name.
    Opaque(String),
}

impl MemoryValue {
    fn type_name(&self) -> &str {
        match self {
            MemoryValue::String(_) => "string",
            MemoryValue::List(_) => "list",
            MemoryValue::Set(_) => "set",
            MemoryValue::SortedSet(_) => "zset",
            MemoryValue::Hash(_) => "hash",
            MemoryValue::Json(_) => "ReJSON-RL",
            MemoryValue::Opaque(name) => name,
        }
    }

    /// Build a sorted set from `(member, score)` pairs.
    pub fn sorted_set<M: Into<Vec<u8>>>(pairs: impl IntoIterator<Item = (M, f64)>) -> Self {
        let mut entries = Vec::new();
        for (member, score) in pairs {
            zadd(&mut entries, member.into(), score);
        }
        MemoryValue::SortedSet(entries)
    }

    pub fn list<M: Into<Vec<u8>>>(items: impl IntoIterator<Item = M>) -> Self {
        MemoryValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn set<M: Into<Vec<u8>>>(members: impl IntoIterator<Item = M>) -> Self {
        MemoryValue::Set(members.into_iter().map(Into::into).collect())
    }

    pub fn hash<F: Into<Vec<u8>>, V: Into<Vec<u8>>>(pairs: impl IntoIterator<Item = (F, V)>) -> Self {
        let mut fields = Vec::new();
        for (field, value) in pairs {
            hset(&mut fields, field.into(), value.into());
        }
        MemoryValue::Hash(fields)
    }
}

fn zadd(entries: &mut Vec<(Vec<u8>, f64)>, member: Vec<u8>, score: f64) {
    entries.retain(|(m, _)| *m != member);
    entries.push((member, score));
    entries.sort_by(|a, b| match a.1.total_cmp(&b.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
}

fn hset(fields: &mut Vec<(Vec<u8>, Vec<u8>)>, field: Vec<u8>, value: Vec<u8>) {
    match fields.iter_mut().find(|(f, _)| *f == field) {
        Some(slot) => slot.1 = value,
        None => fields.push((field, value)),
    }
}

/// Score text the way the server prints it (`1`, `2.5`, `inf`, `-inf`).
fn format_score(score: f64) -> String {
    format!("{score}")
}

fn server_error(command: &'static str, message: &str) -> DumpError {
    TransportError::Redis {
        command,
        source: redis::RedisError::from((
            redis::ErrorKind::ResponseError,
            "An error was signalled by the server",
            message.to_string(),
        )),
    }
    .into()
}

fn wrong_type(command: &'static str) -> DumpError {
    server_error(
        command,
        "WRONGTYPE Operation against a key holding the wrong kind of value",
    )
}

fn replay_error(message: impl Into<String>) -> DumpError {
    DumpError::Generic(format!("Replay failed: {}", message.into()))
}

/// In-memory keyspace implementing [`KeyspaceStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, MemoryValue>,
    /// Remaining time to live per key, in milliseconds
    expiries: HashMap<Vec<u8>, i64>,
    requests: u64,
    fail_after: Option<u64>,
    rejected_pattern: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: MemoryValue) -> &mut Self {
        let key = key.into();
        self.expiries.remove(&key);
        self.entries.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<MemoryValue> {
        self.expiries.remove(key);
        self.entries.remove(key)
    }

    pub fn value(&self, key: &[u8]) -> Option<&MemoryValue> {
        self.entries.get(key)
    }

    /// Give an existing key a time to live. Ignored for missing keys.
    pub fn set_expiry(&mut self, key: &[u8], millis: i64) -> &mut Self {
        if self.entries.contains_key(key) {
            self.expiries.insert(key.to_vec(), millis);
        }
        self
    }

    pub fn expiry(&self, key: &[u8]) -> Option<i64> {
        self.expiries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.keys().map(Vec::as_slice)
    }

    /// Number of requests served so far.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Fail every request after the first `requests` with a dropped connection.
    pub fn fail_after(&mut self, requests: u64) -> &mut Self {
        self.fail_after = Some(requests);
        self
    }

    /// Answer every SCAN with an error reply carrying `message`.
    pub fn reject_patterns(&mut self, message: impl Into<String>) -> &mut Self {
        self.rejected_pattern = Some(message.into());
        self
    }

    fn round_trip(&mut self, command: &'static str) -> Result<()> {
        self.requests += 1;
        if let Some(limit) = self.fail_after
            && self.requests > limit
        {
            return Err(TransportError::Redis {
                command,
                source: redis::RedisError::from(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )),
            }
            .into());
        }
        Ok(())
    }

    /// Replay a whole dump. Returns the number of commands applied.
    pub fn replay(&mut self, dump: &str) -> Result<usize> {
        let mut applied = 0;
        for line in dump.lines() {
            if self.replay_line(line)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Replay one line. Blank lines and `#` comments are skipped and return
    /// `false`.
    pub fn replay_line(&mut self, line: &str) -> Result<bool> {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(false);
        }

        let args = split_args(line).ok_or_else(|| replay_error(format!("unbalanced quotes in {line}")))?;
        self.apply(args)?;
        Ok(true)
    }

    fn apply(&mut self, args: Vec<Vec<u8>>) -> Result<()> {
        let mut args = args.into_iter();
        let command = args
            .next()
            .map(|c| String::from_utf8_lossy(&c).to_ascii_uppercase())
            .ok_or_else(|| replay_error("empty command"))?;
        let key = args
            .next()
            .ok_or_else(|| replay_error(format!("{command} without a key")))?;
        let rest: Vec<Vec<u8>> = args.collect();

        match command.as_str() {
            "SET" => {
                let [value] = <[Vec<u8>; 1]>::try_from(rest)
                    .map_err(|_| replay_error("SET takes exactly one value"))?;
                self.insert(key, MemoryValue::String(value));
            }
            "RPUSH" => {
                if rest.is_empty() {
                    return Err(replay_error("RPUSH without elements"));
                }
                let entry = self
                    .entries
                    .entry(key)
                    .or_insert_with(|| MemoryValue::List(Vec::new()));
                let MemoryValue::List(items) = entry else {
                    return Err(wrong_type("RPUSH"));
                };
                items.extend(rest);
            }
            "SADD" => {
                if rest.is_empty() {
                    return Err(replay_error("SADD without members"));
                }
                let entry = self
                    .entries
                    .entry(key)
                    .or_insert_with(|| MemoryValue::Set(BTreeSet::new()));
                let MemoryValue::Set(members) = entry else {
                    return Err(wrong_type("SADD"));
                };
                members.extend(rest);
            }
            "ZADD" => {
                if rest.is_empty() || rest.len() % 2 != 0 {
                    return Err(replay_error("ZADD needs score/member pairs"));
                }
                let mut pairs = Vec::with_capacity(rest.len() / 2);
                for chunk in rest.chunks(2) {
                    let score = std::str::from_utf8(&chunk[0])
                        .ok()
                        .and_then(|s| s.parse::<f64>().ok())
                        .filter(|s| !s.is_nan())
                        .ok_or_else(|| replay_error("ZADD score is not a valid float"))?;
                    pairs.push((chunk[1].clone(), score));
                }
                let entry = self
                    .entries
                    .entry(key)
                    .or_insert_with(|| MemoryValue::SortedSet(Vec::new()));
                let MemoryValue::SortedSet(entries) = entry else {
                    return Err(wrong_type("ZADD"));
                };
                for (member, score) in pairs {
                    zadd(entries, member, score);
                }
            }
            "HSET" => {
                if rest.is_empty() || rest.len() % 2 != 0 {
                    return Err(replay_error("HSET needs field/value pairs"));
                }
                let entry = self
                    .entries
                    .entry(key)
                    .or_insert_with(|| MemoryValue::Hash(Vec::new()));
                let MemoryValue::Hash(fields) = entry else {
                    return Err(wrong_type("HSET"));
                };
                for chunk in rest.chunks(2) {
                    hset(fields, chunk[0].clone(), chunk[1].clone());
                }
            }
            "JSON.SET" => {
                let [path, json] = <[Vec<u8>; 2]>::try_from(rest)
                    .map_err(|_| replay_error("JSON.SET takes a path and a document"))?;
                if path != b"." && path != b"$" {
                    return Err(replay_error("JSON.SET is only replayed at the root path"));
                }
                let json = String::from_utf8(json)
                    .map_err(|_| replay_error("JSON document is not valid UTF-8"))?;
                self.insert(key, MemoryValue::Json(json));
            }
            "PEXPIRE" => {
                let [millis] = <[Vec<u8>; 1]>::try_from(rest)
                    .map_err(|_| replay_error("PEXPIRE takes exactly one value"))?;
                let millis = std::str::from_utf8(&millis)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or_else(|| replay_error("PEXPIRE value is not an integer"))?;
                self.set_expiry(&key, millis);
            }
            "DEL" => {
                self.remove(&key);
                for other in rest {
                    self.remove(&other);
                }
            }
            other => return Err(replay_error(format!("unsupported command {other}"))),
        }

        Ok(())
    }
}

#[async_trait]
impl KeyspaceStore for MemoryStore {
    async fn scan(
        &mut self,
        cursor: &ScanCursor,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage> {
        self.round_trip("SCAN")?;
        if let Some(message) = &self.rejected_pattern {
            return Err(server_error("SCAN", message));
        }

        let start: usize = cursor
            .as_str()
            .parse()
            .map_err(|_| server_error("SCAN", "ERR invalid cursor"))?;
        let total = self.entries.len();
        let end = start.saturating_add(count.max(1)).min(total);

        // The server skips matching entirely for a lone `*`, which is what
        // lets it return the empty key.
        let match_all = pattern == "*";
        let keys = self
            .entries
            .keys()
            .skip(start)
            .take(end.saturating_sub(start))
            .filter(|k| match_all || glob_match(pattern.as_bytes(), k))
            .cloned()
            .collect();

        let cursor = if end >= total {
            ScanCursor::initial()
        } else {
            ScanCursor::new(end.to_string())
        };

        Ok(ScanPage { cursor, keys })
    }

    async fn type_of(&mut self, key: &[u8]) -> Result<TypeTag> {
        self.round_trip("TYPE")?;
        let name = self.entries.get(key).map_or("none", MemoryValue::type_name);
        Ok(TypeTag::from_reply(name))
    }

    async fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.round_trip("GET")?;
        match self.entries.get(key) {
            None => Ok(None),
            Some(MemoryValue::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type("GET")),
        }
    }

    async fn list_range(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.round_trip("LRANGE")?;
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(MemoryValue::List(items)) => Ok(items.clone()),
            Some(_) => Err(wrong_type("LRANGE")),
        }
    }

    async fn set_members(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.round_trip("SMEMBERS")?;
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(MemoryValue::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(wrong_type("SMEMBERS")),
        }
    }

    async fn sorted_set_with_scores(&mut self, key: &[u8]) -> Result<Vec<ScoredMember>> {
        self.round_trip("ZRANGE")?;
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(MemoryValue::SortedSet(entries)) => Ok(entries
                .iter()
                .map(|(member, score)| ScoredMember {
                    member: member.clone(),
                    score: format_score(*score),
                })
                .collect()),
            Some(_) => Err(wrong_type("ZRANGE")),
        }
    }

    async fn hash_get_all(&mut self, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.round_trip("HGETALL")?;
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(MemoryValue::Hash(fields)) => Ok(fields.clone()),
            Some(_) => Err(wrong_type("HGETALL")),
        }
    }

    async fn json_get(&mut self, key: &[u8]) -> Result<Option<String>> {
        self.round_trip("JSON.GET")?;
        match self.entries.get(key) {
            None => Ok(None),
            Some(MemoryValue::Json(doc)) => Ok(Some(doc.clone())),
            Some(_) => Err(wrong_type("JSON.GET")),
        }
    }

    async fn pttl(&mut self, key: &[u8]) -> Result<i64> {
        self.round_trip("PTTL")?;
        if !self.entries.contains_key(key) {
            return Ok(-2);
        }
        Ok(self.expiries.get(key).copied().unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scan_all(store: &mut MemoryStore, pattern: &str, count: usize) -> (Vec<Vec<u8>>, u64) {
        let mut cursor = ScanCursor::initial();
        let mut keys = Vec::new();
        let mut round_trips = 0;
        loop {
            let page = store.scan(&cursor, pattern, count).await.unwrap();
            round_trips += 1;
            keys.extend(page.keys);
            cursor = page.cursor;
            if cursor.is_terminal() {
                return (keys, round_trips);
            }
        }
    }

    #[tokio::test]
    async fn test_scan_pages_until_sentinel() {
        let mut store = MemoryStore::new();
        for i in 0..10 {
            store.insert(format!("k{i}"), MemoryValue::String(b"v".to_vec()));
        }

        let (keys, round_trips) = scan_all(&mut store, "*", 3).await;
        assert_eq!(keys.len(), 10);
        assert_eq!(round_trips, 4);
    }

    #[tokio::test]
    async fn test_scan_pattern_filters_after_paging() {
        let mut store = MemoryStore::new();
        store
            .insert("a:1", MemoryValue::String(b"1".to_vec()))
            .insert("b:1", MemoryValue::String(b"1".to_vec()))
            .insert("b:2", MemoryValue::String(b"1".to_vec()));

        // First page holds only "a:1", which does not match: empty batch, live cursor.
        let page = store.scan(&ScanCursor::initial(), "b:*", 1).await.unwrap();
        assert!(page.keys.is_empty());
        assert!(!page.cursor.is_terminal());

        let (keys, _) = scan_all(&mut store, "b:*", 1).await;
        assert_eq!(keys, vec![b"b:1".to_vec(), b"b:2".to_vec()]);
    }

    #[tokio::test]
    async fn test_type_and_pttl() {
        let mut store = MemoryStore::new();
        store
            .insert("s", MemoryValue::Opaque("stream".into()))
            .insert("z", MemoryValue::sorted_set([("m", 1.5)]));
        store.set_expiry(b"z", 5000);

        assert_eq!(
            store.type_of(b"s").await.unwrap(),
            TypeTag::Unsupported("stream".into())
        );
        assert_eq!(store.type_of(b"nope").await.unwrap(), TypeTag::Missing);
        assert_eq!(store.pttl(b"z").await.unwrap(), 5000);
        assert_eq!(store.pttl(b"s").await.unwrap(), -1);
        assert_eq!(store.pttl(b"nope").await.unwrap(), -2);
    }

    #[tokio::test]
    async fn test_sorted_set_scores_render_like_server() {
        let mut store = MemoryStore::new();
        store.insert(
            "z",
            MemoryValue::sorted_set([("b", 2.0), ("a", 0.25), ("c", f64::INFINITY)]),
        );
        let members = store.sorted_set_with_scores(b"z").await.unwrap();
        let scores: Vec<&str> = members.iter().map(|m| m.score.as_str()).collect();
        assert_eq!(scores, vec!["0.25", "2", "inf"]);
    }

    #[tokio::test]
    async fn test_wrong_type_is_server_error() {
        let mut store = MemoryStore::new();
        store.insert("l", MemoryValue::list(["x"]));
        let err = store.get(b"l").await.unwrap_err();
        assert!(err.is_server_reply());
    }

    #[tokio::test]
    async fn test_fail_after_injects_transport_error() {
        let mut store = MemoryStore::new();
        store.insert("k", MemoryValue::String(b"v".to_vec()));
        store.fail_after(1);

        assert!(store.type_of(b"k").await.is_ok());
        let err = store.get(b"k").await.unwrap_err();
        assert!(matches!(err, DumpError::Transport(_)));
        assert!(!err.is_server_reply());
    }

    #[test]
    fn test_replay_commands() {
        let mut store = MemoryStore::new();
        let dump = "\
SET \"a\" \"1\"
RPUSH \"b\" \"x\"
RPUSH \"b\" \"y\"
# Skipped \"s\": unsupported type \"stream\"
SADD \"c\" \"m1\" \"m2\"
ZADD \"d\" 2 \"two\"
ZADD \"d\" 1 \"one\"
HSET \"e\" \"f1\" \"v1\" \"f2\" \"v2\"
JSON.SET \"f\" \".\" \"{\\\"n\\\":1}\"
PEXPIRE \"a\" 1000
";
        let applied = store.replay(dump).unwrap();
        assert_eq!(applied, 9);
        assert_eq!(store.len(), 6);
        assert_eq!(store.value(b"b"), Some(&MemoryValue::list(["x", "y"])));
        assert_eq!(
            store.value(b"d"),
            Some(&MemoryValue::sorted_set([("one", 1.0), ("two", 2.0)]))
        );
        assert_eq!(store.value(b"f"), Some(&MemoryValue::Json("{\"n\":1}".into())));
        assert_eq!(store.expiry(b"a"), Some(1000));
    }

    #[test]
    fn test_replay_rejects_garbage() {
        let mut store = MemoryStore::new();
        assert!(store.replay_line("SET \"unterminated").is_err());
        assert!(store.replay_line("FLUSHALL").is_err());
        assert!(store.replay_line("ZADD \"z\" notanumber \"m\"").is_err());
        assert!(!store.replay_line("   ").unwrap());
    }
}
