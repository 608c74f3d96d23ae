//! Memory record model shared by the store and its backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier assigned to a record at insertion.
pub type RecordId = Uuid;

/// Author of a conversational turn.
///
/// The set is open: unknown tags round-trip through [`Role::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    System,
    Other(String),
}

impl Role {
    /// Parse a role tag. Returns `None` for blank tags.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        if tag.is_empty() {
            return None;
        }
        Some(Self::from(tag.to_string()))
    }

    /// Lowercase tag used for storage.
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "user" | "human" => Self::User,
            "assistant" | "ai" => Self::Assistant,
            "system" => Self::System,
            _ => Self::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Record identifier.
    pub id: RecordId,
    /// Conversation the record belongs to.
    pub session_id: Uuid,
    /// Author of the turn.
    pub role: Role,
    /// Record content.
    pub content: String,
    /// Insertion timestamp, non-decreasing within a session.
    pub created_at: DateTime<Utc>,
    /// Insertion sequence number, strictly increasing within a session.
    pub seq: u64,
}

impl MemoryRecord {
    /// Recency key: timestamp first, insertion order second.
    pub(crate) fn recency(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.seq)
    }
}
