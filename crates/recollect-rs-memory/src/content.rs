//! Normalization of model response content into plain text.

use serde::{Deserialize, Serialize};

/// A single part of a structured response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text block.
    Text { text: String },
    /// Any non-text block (tool use, image, ...); ignored when normalizing.
    #[serde(other)]
    Other,
}

/// Response content as returned by chat models: plain text or a list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(Vec<ContentPart>),
}

impl MessageContent {
    /// Collapse the content into the text stored in memory.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Structured(parts) => parts
                .into_iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text),
                    ContentPart::Other => None,
                })
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string(),
        }
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
