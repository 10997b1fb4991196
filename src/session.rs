use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The active conversation: turns in chronological order plus the id of the
/// stored chat record they are being written to, if any.
#[derive(Debug, Clone, Default)]
pub struct Session {
    turns: Vec<Turn>,
    record_id: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_turn(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn {
            role,
            content: content.into(),
        });
    }

    /// Clears every turn and forgets the stored record, so the next save
    /// starts a fresh one.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.record_id = None;
    }

    /// Replaces the whole session with a previously stored chat.
    pub fn restore(&mut self, record_id: String, turns: Vec<Turn>) {
        self.turns = turns;
        self.record_id = Some(record_id);
    }

    pub fn link_record(&mut self, record_id: String) {
        self.record_id = Some(record_id);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
