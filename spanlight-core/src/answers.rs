//! Conversion between stored spans and persisted span answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Document, Entity, OverlappedSpan, SpanSeed};

/// One selectable label of a span question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelOption {
    pub id: String,
    /// Value written to persisted answers
    pub value: String,
    /// Caption shown on chips
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LabelOption {
    pub fn new(id: impl Into<String>, value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            text: text.into(),
            color: None,
        }
    }

    pub fn entity(&self) -> Entity {
        Entity {
            id: self.id.clone(),
            text: self.text.clone(),
            color: self.color.clone(),
        }
    }
}

/// A persisted span
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpanAnswer {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Persisted answers for spans whose entity is still a known option
pub fn to_answers(spans: &[OverlappedSpan], options: &[LabelOption]) -> Vec<SpanAnswer> {
    spans
        .iter()
        .filter_map(|stored| {
            let option = options.iter().find(|o| o.id == stored.span.entity.id)?;
            Some(SpanAnswer {
                start: stored.span.from,
                end: stored.span.to,
                label: option.value.clone(),
            })
        })
        .collect()
}

/// Seeds for mounting a field from persisted answers; unknown labels are skipped
pub fn to_seeds(answers: &[SpanAnswer], options: &[LabelOption]) -> Vec<SpanSeed> {
    answers
        .iter()
        .filter_map(|answer| {
            let Some(option) = options.iter().find(|o| o.value == answer.label) else {
                debug!(label = %answer.label, "skipping answer with unknown label");
                return None;
            };
            Some(SpanSeed {
                from: answer.start,
                to: answer.end,
                entity: option.entity(),
            })
        })
        .collect()
}

/// Export format for an annotated document
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDocument {
    pub document_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    pub exported_at: DateTime<Utc>,
    pub spans: Vec<SpanAnswer>,
}

impl AnswerDocument {
    pub fn new(doc: &Document, spans: &[OverlappedSpan], options: &[LabelOption]) -> Self {
        Self {
            document_id: doc.id,
            title: doc.title.clone(),
            filepath: doc.filepath.clone(),
            exported_at: Utc::now(),
            spans: to_answers(spans, options),
        }
    }
}

/// Serialize an export document to pretty JSON
pub fn to_json(export: &AnswerDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(export)?)
}

/// Read the spans of a previously exported document
pub fn from_json(json: &str) -> Result<AnswerDocument> {
    Ok(serde_json::from_str(json)?)
}
