//! Conversation transcript and audit log.

use std::collections::VecDeque;

use chrono::Local;

/// Greeting that opens every conversation and replaces it on reset.
pub const GREETING: &str = "Hello! I'm your SQL assistant. Ask me anything about your database!";

/// Default number of audit entries kept per session.
pub const DEFAULT_MAX_AUDIT_ENTRIES: usize = 50;

/// Timestamp format for audit entries (local time).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Number of audit entries shown in previews.
pub const AUDIT_PREVIEW_ENTRIES: usize = 10;

/// Questions longer than this are cut in audit previews.
const QUERY_PREVIEW_CHARS: usize = 100;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "SQLChat",
        }
    }
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
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

/// Ordered, append-only transcript for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Creates a conversation holding only the greeting.
    pub fn new() -> Self {
        Self {
            turns: vec![Turn::assistant(GREETING)],
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Drops every turn and reseeds the greeting.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.turns.push(Turn::assistant(GREETING));
    }
}

/// A recorded question and its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// Local time the answer was recorded, formatted with [`TIMESTAMP_FORMAT`].
    pub timestamp: String,
    pub query: String,
    pub response: String,
}

impl AuditEntry {
    /// Creates an entry stamped with the current local time.
    pub fn now(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            query: query.into(),
            response: response.into(),
        }
    }

    /// The question as shown in previews: at most 100 characters, then `...`.
    pub fn query_preview(&self) -> String {
        if self.query.chars().count() <= QUERY_PREVIEW_CHARS {
            return self.query.clone();
        }
        let cut: String = self.query.chars().take(QUERY_PREVIEW_CHARS).collect();
        format!("{cut}...")
    }
}

/// FIFO log of answered questions with a fixed capacity.
#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
    capacity: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AUDIT_ENTRIES)
    }
}

impl AuditLog {
    /// Creates an empty log holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an entry, evicting the oldest when full.
    pub fn push(&mut self, entry: AuditEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &AuditEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Up to `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<&AuditEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
