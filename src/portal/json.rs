//! JSON decoding for portal responses.
//!
//! The portal is a PHP application that emits loosely-typed JSON. When a body
//! fails to decode, the error names the serde path and shows the text around
//! the failing column so a changed field is easy to spot in the logs.

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;

/// Characters of context shown on each side of the failing column.
const SNIPPET_RADIUS: usize = 24;

/// Decode `body` as `T`, attaching the serde path and a snippet on failure.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        let (line, column) = (inner.line(), inner.column());
        let text = String::from_utf8_lossy(body);

        let mut msg = String::new();
        if !path.is_empty() && path != "." {
            msg.push_str(&format!("at '{path}': "));
        }
        msg.push_str(&format!(
            "{} (line {line} col {column})\n{}",
            describe(&inner),
            snippet(&text, line, column)
        ));
        anyhow!(msg)
    })
}

/// Short human description of a serde_json error, without the location suffix.
fn describe(err: &serde_json::Error) -> String {
    let full = err.to_string();
    let loc = format!(" at line {} column {}", err.line(), err.column());
    let msg = full.strip_suffix(&loc).unwrap_or(&full);

    // "invalid type: null, expected a string" reads better inverted
    if let Some(rest) = msg.strip_prefix("invalid type: ")
        && let Some((got, expected)) = rest.split_once(", expected ")
    {
        return format!("expected {expected}, got {got}");
    }
    msg.to_string()
}

fn snippet(text: &str, line: usize, column: usize) -> String {
    let target: Vec<char> = text
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or("")
        .chars()
        .collect();
    if target.is_empty() {
        return "(empty body)".to_string();
    }

    let at = column.saturating_sub(1).min(target.len());
    let start = at.saturating_sub(SNIPPET_RADIUS);
    let end = (at + SNIPPET_RADIUS).min(target.len());
    let slice: String = target[start..end].iter().collect();
    let marker = " ".repeat(at - start) + "^";

    format!("...{slice}...\n   {marker}")
}
