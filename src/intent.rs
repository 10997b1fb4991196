use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const RESET_PHRASES: [&str; 5] = [
    "start over",
    "reset",
    "clear conversation",
    "new conversation",
    "begin again",
];

// `[^{}]` also matches newlines, so a flat block may span several lines.
static JSON_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^{}]*\}").unwrap());

/// Plain substring match, so "reset my password" also counts.
pub fn should_reset(input: &str) -> bool {
    let lowered = input.to_lowercase();
    RESET_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Returns the block opened by the first `{` in the text, if that block has no
/// inner braces and parses as JSON. A nested object yields nothing rather than
/// its innermost member.
pub fn extract_json(text: &str) -> Option<Value> {
    let block = JSON_BLOCK.find(text)?;
    if block.start() != text.find('{')? {
        return None;
    }
    serde_json::from_str(block.as_str()).ok()
}

/// Structured user input: the whole message is a JSON object or array.
pub fn parse_structured_input(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

pub fn format_response(text: &str) -> String {
    match extract_json(text) {
        Some(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.to_string()),
        None => text.to_string(),
    }
}
