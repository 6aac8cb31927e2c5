//! Structured-output recovery from worker stdout.
//!
//! Workers are asked for bare JSON but routinely wrap it in prose or a
//! fenced code block. Three strategies run in order: parse the whole
//! response, extract the first fenced `json` block, extract the first
//! balanced `{...}` substring.

use planlift_core::constants::MALFORMED_SNIPPET_BYTES;
use planlift_core::errors::WorkerError;

/// Parse a worker response into JSON, tolerating surrounding prose.
pub fn parse_structured(worker: &str, response: &str) -> Result<serde_json::Value, WorkerError> {
    let trimmed = response.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(block) = fenced_json_block(trimmed) {
        if let Ok(value) = serde_json::from_str(block) {
            return Ok(value);
        }
    }

    if let Some(candidate) = first_balanced_object(trimmed) {
        if let Ok(value) = serde_json::from_str(candidate) {
            return Ok(value);
        }
    }

    Err(WorkerError::Malformed {
        worker: worker.to_string(),
        snippet: snippet(response),
    })
}

/// The contents of the first ```json fence, if any.
fn fenced_json_block(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// The first balanced `{...}` substring, honouring JSON string escapes.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn snippet(response: &str) -> String {
    let mut end = response.len().min(MALFORMED_SNIPPET_BYTES);
    while end > 0 && !response.is_char_boundary(end) {
        end -= 1;
    }
    response[..end].to_string()
}
