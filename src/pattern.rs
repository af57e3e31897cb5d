//! Glob-style key pattern matching.
//!
//! The in-memory backend uses this to emulate the `MATCH` semantics of a
//! Redis key scan: `*` matches any run of characters (including the empty
//! run), `?` matches exactly one character, everything else is literal.
//! No character classes, no escaping.

/// Check whether `key` matches the glob `pattern`.
///
/// Matching is byte-oriented, like the scan it emulates; multi-byte
/// characters count one `?` per byte.
pub fn matches(key: &str, pattern: &str) -> bool {
    match_recursive(key.as_bytes(), pattern.as_bytes())
}

fn match_recursive(key: &[u8], pattern: &[u8]) -> bool {
    let Some((&head, rest)) = pattern.split_first() else {
        // Empty pattern matches only the empty remaining key.
        return key.is_empty();
    };

    match head {
        // `*` consumes zero or more bytes: try the rest of the pattern at
        // every suffix of the key, shortest consumption first.
        b'*' => {
            let mut key = key;
            loop {
                if match_recursive(key, rest) {
                    return true;
                }
                match key.split_first() {
                    Some((_, tail)) => key = tail,
                    None => return false,
                }
            }
        }
        // `?` consumes exactly one byte.
        b'?' => !key.is_empty() && match_recursive(&key[1..], rest),
        literal => key.first() == Some(&literal) && match_recursive(&key[1..], rest),
    }
}
