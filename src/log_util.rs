//! Smol utilities for logging

use std::ascii;

/// How much of a body we're willing to spray into a log line
const PREVIEW_LEN: usize = 64;

/// Make an Ascii-safe string
pub fn ascii_escape(s: &[u8]) -> String {
    s.iter()
        .flat_map(|&b| ascii::escape_default(b))
        .map(char::from)
        .collect()
}

/// Like `ascii_escape`, but only the first few bytes
pub fn preview(s: &[u8]) -> String {
    if s.len() <= PREVIEW_LEN {
        return ascii_escape(s);
    }

    format!("{}... ({} bytes)", ascii_escape(&s[.. PREVIEW_LEN]), s.len())
}
