//! Pull a JSON document out of model output.
//!
//! Models asked for JSON sometimes wrap it in a fenced ```` ```json ```` block
//! or add a sentence before it. Accepted forms, in order: a `json`-tagged
//! fence, an untagged fence, the outermost `{ ... }` span, the trimmed text.

use serde::de::DeserializeOwned;

use crate::error::JudgeError;

/// Returns the slice of `content` most likely to be the JSON document.
#[must_use]
pub fn extract_json_block(content: &str) -> &str {
    if let Some(inner) = fenced(content, "```json") {
        return inner;
    }
    if let Some(inner) = fenced(content, "```") {
        return inner;
    }
    match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => content.trim(),
    }
}

fn fenced<'a>(content: &'a str, opener: &str) -> Option<&'a str> {
    let start = content.find(opener)? + opener.len();
    let rest = &content[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// Extract and deserialize a JSON document from model output.
///
/// # Errors
///
/// Returns [`JudgeError::Malformed`] if the extracted text is not valid JSON
/// for `T`.
pub fn parse_json_content<T: DeserializeOwned>(
    content: &str,
    context: &str,
) -> Result<T, JudgeError> {
    serde_json::from_str(extract_json_block(content)).map_err(|e| JudgeError::Malformed {
        context: context.to_string(),
        source: e,
    })
}
