//! Retrieval candidate documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document returned by a retriever.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Stable document id (without namespace prefix).
    pub id: String,
    /// Document title.
    pub title: String,
    /// Document body.
    pub content: String,
    /// Retriever-specific metadata.
    #[serde(default)]
    pub metadata: Value,
}

impl Document {
    /// Build a document with empty metadata.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            metadata: Value::Null,
        }
    }
}
