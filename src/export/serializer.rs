//! Value serialization into replayable command lines
//!
//! Pure functions: the same key and value always give the same lines. Every
//! key and every string argument goes through [`quote`]; sorted-set scores
//! are the only bare arguments.

use std::fmt;

use crate::store::{ScoredMember, TypeTag, TypedValue};

use super::quote::quote;

/// Why a key produced a comment instead of commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The key holds a type without a serialization rule.
    UnsupportedType(String),
    /// The key holds a container with no elements, which cannot be recreated.
    EmptyContainer(TypeTag),
    /// The key expired or was deleted after the scan returned it.
    Vanished,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedType(name) => {
                write!(f, "unsupported type {}", quote(name.as_bytes()))
            }
            SkipReason::EmptyContainer(tag) => write!(f, "empty {tag}"),
            SkipReason::Vanished => f.write_str("key no longer exists"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    Data,
    Skipped(SkipReason),
}

/// All lines emitted for one key, without trailing newlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedRecord {
    lines: Vec<String>,
    kind: RecordKind,
}

impl SerializedRecord {
    fn data(lines: Vec<String>) -> Self {
        Self {
            lines,
            kind: RecordKind::Data,
        }
    }

    /// A single `# Skipped "key": <reason>` comment line.
    pub fn skipped(key: &[u8], reason: SkipReason) -> Self {
        Self {
            lines: vec![format!("# Skipped {}: {}", quote(key), reason)],
            kind: RecordKind::Skipped(reason),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.kind, RecordKind::Skipped(_))
    }

    /// Append a line to a data record (used for `PEXPIRE`).
    pub fn push_line(&mut self, line: String) {
        self.lines.push(line);
    }

    /// Render the record as newline-terminated text.
    pub fn render(&self) -> String {
        let size = self.lines.iter().map(|l| l.len() + 1).sum();
        let mut out = String::with_capacity(size);
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Serialize one key and its fetched value.
pub fn serialize(key: &[u8], value: &TypedValue) -> SerializedRecord {
    let k = quote(key);

    let empty = match value {
        TypedValue::List(items) | TypedValue::Set(items) => items.is_empty(),
        TypedValue::SortedSet(members) => members.is_empty(),
        TypedValue::Hash(fields) => fields.is_empty(),
        TypedValue::String(_) | TypedValue::Json(_) => false,
    };
    if empty {
        return SerializedRecord::skipped(key, SkipReason::EmptyContainer(value.tag()));
    }

    let lines = match value {
        TypedValue::String(v) => vec![format!("SET {k} {}", quote(v))],
        TypedValue::List(items) => items
            .iter()
            .map(|item| format!("RPUSH {k} {}", quote(item)))
            .collect(),
        TypedValue::Set(members) => {
            let mut line = format!("SADD {k}");
            for member in members {
                line.push(' ');
                line.push_str(&quote(member));
            }
            vec![line]
        }
        TypedValue::SortedSet(members) => members
            .iter()
            .map(|m| format!("ZADD {k} {} {}", score_arg(m), quote(&m.member)))
            .collect(),
        TypedValue::Hash(fields) => {
            let mut line = format!("HSET {k}");
            for (field, value) in fields {
                line.push(' ');
                line.push_str(&quote(field));
                line.push(' ');
                line.push_str(&quote(value));
            }
            vec![line]
        }
        TypedValue::Json(doc) => vec![format!("JSON.SET {k} \".\" {}", quote(doc.as_bytes()))],
    };

    SerializedRecord::data(lines)
}

/// Scores go out verbatim so precision survives; anything that is not a
/// float is quoted instead of being spliced into the line.
fn score_arg(member: &ScoredMember) -> String {
    if member.score.parse::<f64>().is_ok() {
        member.score.clone()
    } else {
        quote(member.score.as_bytes())
    }
}

/// `PEXPIRE "key" <ms>` for a key with a positive remaining time to live.
pub fn expiry_line(key: &[u8], pttl: i64) -> Option<String> {
    (pttl > 0).then(|| format!("PEXPIRE {} {pttl}", quote(key)))
}
