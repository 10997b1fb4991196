use crate::session::Turn;

const PREVIEW_CHARS: usize = 50;

/// History label for a stored chat: the start of its first message.
pub fn chat_preview(turns: &[Turn]) -> String {
    match turns.first() {
        Some(first) => {
            let head: String = first.content.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", head)
        }
        None => "Empty chat".to_string(),
    }
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with an
/// ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
