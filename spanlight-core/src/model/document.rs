use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Node;

/// A text document that can be annotated as a single field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(title: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            filename: None,
            filepath: None,
            created_at: Utc::now(),
        }
    }

    /// Document loaded from disk, remembering where it came from
    pub fn with_file_info(title: String, content: String, filepath: String, filename: String) -> Self {
        let mut doc = Self::new(title, content);
        doc.filepath = Some(filepath);
        doc.filename = Some(filename);
        doc
    }

    /// The field node for this document's content
    pub fn node(&self) -> Node {
        Node::new(self.id.to_string(), self.content.as_str())
    }
}
