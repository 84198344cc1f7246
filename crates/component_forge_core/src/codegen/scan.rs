//! Balanced-brace scanning for JSON objects embedded in free-form text.
//!
//! Stage one lazily yields candidate spans; stage two tries to parse each
//! candidate in order and stops at the first one that is a JSON object.

use serde_json::{Map, Value};
use std::ops::Range;

/// Yields the byte range of every balanced `{ ... }` region, ordered by the
/// position of its opening brace. Each region is only scanned when requested.
///
/// Braces inside double-quoted strings are ignored once a region has been
/// opened, so JSX such as `"<p>{count}</p>"` inside a JSON string does not
/// unbalance the scan. Regions that never close are skipped.
pub fn candidate_spans(text: &str) -> impl Iterator<Item = Range<usize>> + '_ {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'{')
        .filter_map(move |(start, _)| matching_close(bytes, start).map(|end| start..end + 1))
}

fn matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// The first candidate span that parses as a JSON object, with its range.
pub fn first_json_object(text: &str) -> Option<(Range<usize>, Map<String, Value>)> {
    candidate_spans(text).find_map(|span| {
        match serde_json::from_str::<Value>(&text[span.clone()]) {
            Ok(Value::Object(map)) => Some((span, map)),
            _ => None,
        }
    })
}
