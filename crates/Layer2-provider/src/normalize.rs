//! Output normalizer
//!
//! Turns raw process output into a single answer string. In JSON mode the
//! output is searched for the first meaningful text; otherwise, or when the
//! search finds nothing, trimmed stdout wins, then trimmed stderr.

use parley_task::ParseMode;
use serde_json::Value;

/// Keys searched, in priority order, at every object level
pub const TEXT_KEYS: [&str; 7] = [
    "text",
    "message",
    "output",
    "response",
    "result",
    "completion",
    "content",
];

/// Nesting depth beyond which the search gives up
pub const MAX_DEPTH: usize = 32;

/// Collapse process output into one answer
pub fn normalize_output(stdout: &str, stderr: &str, parse: ParseMode) -> String {
    if parse == ParseMode::Json && !stdout.trim().is_empty() {
        let extracted = match serde_json::from_str::<Value>(stdout) {
            Ok(document) => extract_text(&document),
            Err(_) => extract_ndjson(stdout),
        };
        if let Some(text) = extracted {
            let text = text.trim();
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }

    let out = stdout.trim();
    if out.is_empty() {
        stderr.trim().to_string()
    } else {
        out.to_string()
    }
}

/// First meaningful text inside a JSON document
pub fn extract_text(value: &Value) -> Option<String> {
    walk(value, 0, true)
}

/// Newline-delimited JSON: every parseable line contributes, joined by `\n`
pub fn extract_ndjson(raw: &str) -> Option<String> {
    let parts: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|document| extract_text(&document))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

/// Strings only count at the root, under a text key, or inside arrays reached
/// that way; an arbitrary string property (ids, types) never does.
fn walk(value: &Value, depth: usize, accept_string: bool) -> Option<String> {
    if depth > MAX_DEPTH {
        return None;
    }

    match value {
        Value::String(s) if accept_string && !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| walk(item, depth + 1, accept_string))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
        Value::Object(map) => {
            for key in TEXT_KEYS {
                if let Some(found) = map.get(key).and_then(|v| walk(v, depth + 1, true)) {
                    return Some(found);
                }
            }
            map.iter()
                .filter(|(key, _)| !TEXT_KEYS.contains(&key.as_str()))
                .find_map(|(_, v)| walk(v, depth + 1, false))
        }
        _ => None,
    }
}

/// Split an answer into line tokens
///
/// A single-line answer is one token, verbatim. Otherwise each non-blank line
/// becomes a token, with `\n` kept on every line but the last.
pub fn line_tokens(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').filter(|l| !l.trim().is_empty()).collect();

    match lines.len() {
        0 => Vec::new(),
        1 => vec![text.to_string()],
        n => lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                if i + 1 < n {
                    format!("{}\n", line)
                } else {
                    line.to_string()
                }
            })
            .collect(),
    }
}
