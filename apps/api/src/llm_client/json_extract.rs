//! Pulls a JSON payload out of free-form model text.
//!
//! Search-grounded calls cannot carry a response schema, so the model may wrap its JSON
//! in fences or prose. Extraction order:
//! 1. interior of a ```` ```json ```` fenced block
//! 2. first `{` through last `}` inclusive
//! 3. the text with stray fence markers removed, trimmed
//!
//! `parse_model_json` gives a second chance with a string-aware bracket scanner before
//! surfacing the original `serde_json::Error`.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use tracing::debug;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Returns the most likely JSON substring of `text`. Does not validate it.
pub fn extract_json(text: &str) -> Cow<'_, str> {
    if let Some(inner) = fenced_json_block(text) {
        return Cow::Borrowed(inner);
    }

    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if first < last {
            return Cow::Borrowed(&text[first..=last]);
        }
    }

    Cow::Owned(text.replace(JSON_FENCE, "").replace(FENCE, "").trim().to_string())
}

/// Extracts and deserializes a model answer.
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let candidate = extract_json(text);
    let err = match serde_json::from_str::<T>(&candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(object) = first_balanced_object(text) {
        if object != candidate.as_ref() {
            if let Ok(value) = serde_json::from_str::<T>(object) {
                debug!("Recovered model JSON with bracket scanner after: {err}");
                return Ok(value);
            }
        }
    }

    Err(err)
}

fn fenced_json_block(text: &str) -> Option<&str> {
    let start = text.find(JSON_FENCE)? + JSON_FENCE.len();
    let rest = &text[start..];
    let end = rest.find(FENCE)?;
    Some(rest[..end].trim())
}

/// First `{ ... }` whose braces balance, ignoring braces inside string literals.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
