//! Argument quoting for replayable command lines
//!
//! Every key and every string-valued argument in a dump goes through
//! [`quote`]. The output follows the grammar `redis-cli` uses to split a
//! command line into arguments, so feeding a line back reproduces the
//! original bytes exactly:
//!
//! | byte(s)                         | written as     |
//! |---------------------------------|----------------|
//! | `"` `\`                         | `\"` `\\`      |
//! | newline, CR, tab, BEL, BS       | `\n \r \t \a \b` |
//! | other control characters        | `\xHH` per byte |
//! | bytes that are not valid UTF-8  | `\xHH`         |
//! | anything else                   | unchanged      |
//!
//! Valid non-ASCII UTF-8 is left alone so the dump stays readable UTF-8
//! text. [`split_args`] is the inverse and is what the in-memory store uses
//! to replay a dump.

use std::fmt::Write;

/// Wrap `bytes` in double quotes, escaping as described in the module docs.
pub fn quote(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');

    for chunk in bytes.utf8_chunks() {
        for ch in chunk.valid().chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{7}' => out.push_str("\\a"),
                '\u{8}' => out.push_str("\\b"),
                c if c.is_control() => {
                    let mut buf = [0u8; 4];
                    for b in c.encode_utf8(&mut buf).bytes() {
                        push_hex(&mut out, b);
                    }
                }
                c => out.push(c),
            }
        }
        for &b in chunk.invalid() {
            push_hex(&mut out, b);
        }
    }

    out.push('"');
    out
}

fn push_hex(out: &mut String, byte: u8) {
    // Writing into a String cannot fail.
    let _ = write!(out, "\\x{byte:02x}");
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Split a command line into arguments the way `redis-cli` does.
///
/// Supports bare words, double-quoted strings with the escapes produced by
/// [`quote`], and single-quoted strings where only `\'` is special. Returns
/// `None` for unbalanced quotes or a closing quote not followed by
/// whitespace.
pub fn split_args(line: &str) -> Option<Vec<Vec<u8>>> {
    let bytes = line.as_bytes();
    let mut args = Vec::new();
    let mut i = 0usize;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return Some(args);
        }

        let mut current = Vec::new();
        let mut in_double = false;
        let mut in_single = false;

        loop {
            if in_double {
                let c = *bytes.get(i)?;
                if c == b'\\' && i + 3 < bytes.len() && bytes[i + 1] == b'x' {
                    if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 2]), hex_value(bytes[i + 3])) {
                        current.push(hi * 16 + lo);
                        i += 4;
                        continue;
                    }
                }
                if c == b'\\' && i + 1 < bytes.len() {
                    i += 1;
                    current.push(match bytes[i] {
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'b' => 0x08,
                        b'a' => 0x07,
                        other => other,
                    });
                } else if c == b'"' {
                    // The closing quote must end the argument.
                    if i + 1 < bytes.len() && !bytes[i + 1].is_ascii_whitespace() {
                        return None;
                    }
                    i += 1;
                    break;
                } else {
                    current.push(c);
                }
                i += 1;
            } else if in_single {
                let c = *bytes.get(i)?;
                if c == b'\\' && i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                    i += 1;
                    current.push(b'\'');
                } else if c == b'\'' {
                    if i + 1 < bytes.len() && !bytes[i + 1].is_ascii_whitespace() {
                        return None;
                    }
                    i += 1;
                    break;
                } else {
                    current.push(c);
                }
                i += 1;
            } else {
                match bytes.get(i) {
                    None => break,
                    Some(c) if c.is_ascii_whitespace() => break,
                    Some(b'"') => in_double = true,
                    Some(b'\'') => in_single = true,
                    Some(&c) => current.push(c),
                }
                i += 1;
            }
        }

        args.push(current);
    }
}
