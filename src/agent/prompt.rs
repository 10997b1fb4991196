use crate::session::{Session, Turn};

/// Everything sent to the model for one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub turns: Vec<Turn>,
}

impl CompletionRequest {
    /// Splits off the newest turn, which providers send as the prompt.
    pub fn split_prompt(&self) -> Option<(&Turn, &[Turn])> {
        self.turns.split_last()
    }
}

// The full history is resent on every call. Nothing is trimmed or summarized.
pub fn assemble(system: &str, session: &Session) -> CompletionRequest {
    CompletionRequest {
        system: system.to_string(),
        turns: session.turns().to_vec(),
    }
}
