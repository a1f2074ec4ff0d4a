//! Glob matching with the semantics of Redis `MATCH` / `KEYS` patterns
//!
//! - `*` any run of bytes (including none)
//! - `?` exactly one byte
//! - `[abc]`, `[^abc]`, `[a-z]` byte classes; reversed ranges are accepted
//! - `\x` matches `x` literally, inside or outside a class
//!
//! Matching is byte-wise and case-sensitive. Like the server, an empty
//! subject never matches a non-empty pattern, so callers that want `*` to
//! include the empty key must special-case it (the server's SCAN does).

/// True when `string` matches `pattern`.
pub fn glob_match(pattern: &[u8], string: &[u8]) -> bool {
    let mut p = 0usize;
    let mut s = 0usize;

    while p < pattern.len() && s < string.len() {
        match pattern[p] {
            b'*' => {
                while p + 1 < pattern.len() && pattern[p + 1] == b'*' {
                    p += 1;
                }
                if p + 1 == pattern.len() {
                    return true;
                }
                while s < string.len() {
                    if glob_match(&pattern[p + 1..], &string[s..]) {
                        return true;
                    }
                    s += 1;
                }
                return false;
            }
            b'?' => s += 1,
            b'[' => {
                p += 1;
                let negate = p < pattern.len() && pattern[p] == b'^';
                if negate {
                    p += 1;
                }

                let mut matched = false;
                loop {
                    if p >= pattern.len() {
                        // Unterminated class: step back so the outer advance
                        // lands exactly on the end of the pattern.
                        p -= 1;
                        break;
                    }
                    let c = pattern[p];
                    if c == b'\\' && pattern.len() - p >= 2 {
                        p += 1;
                        if pattern[p] == string[s] {
                            matched = true;
                        }
                    } else if c == b']' {
                        break;
                    } else if pattern.len() - p >= 3 && pattern[p + 1] == b'-' {
                        let (mut lo, mut hi) = (c, pattern[p + 2]);
                        if lo > hi {
                            std::mem::swap(&mut lo, &mut hi);
                        }
                        if (lo..=hi).contains(&string[s]) {
                            matched = true;
                        }
                        p += 2;
                    } else if c == string[s] {
                        matched = true;
                    }
                    p += 1;
                }

                if negate {
                    matched = !matched;
                }
                if !matched {
                    return false;
                }
                s += 1;
            }
            b'\\' => {
                if pattern.len() - p >= 2 {
                    p += 1;
                }
                if pattern[p] != string[s] {
                    return false;
                }
                s += 1;
            }
            c => {
                if c != string[s] {
                    return false;
                }
                s += 1;
            }
        }

        p += 1;
        if s == string.len() {
            while p < pattern.len() && pattern[p] == b'*' {
                p += 1;
            }
            break;
        }
    }

    p == pattern.len() && s == string.len()
}
