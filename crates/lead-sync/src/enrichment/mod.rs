//! Inference of industry, department, role and owner for a lead.
//!
//! The sync driver only sees [`LeadInference`]; the chat-completion client is
//! one implementation and tests inject their own.

mod chat;

pub use chat::ChatCompletionInference;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::Debug;

use crate::workflows::leads::IncomingRecord;

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("enrichment request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("enrichment api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("enrichment response was not usable: {0}")]
    Malformed(String),
    #[error("enrichment runtime unavailable: {0}")]
    Runtime(String),
}

/// Classifier output. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inference {
    #[serde(rename = "業種", default, deserialize_with = "loose_string")]
    pub industry: String,
    #[serde(rename = "部署", default, deserialize_with = "loose_string")]
    pub department: String,
    #[serde(rename = "役職", default, deserialize_with = "loose_string")]
    pub role: String,
    #[serde(rename = "担当", default, deserialize_with = "loose_string")]
    pub owner: String,
}

pub trait LeadInference: Debug {
    fn infer(&self, record: &IncomingRecord) -> Result<Inference, EnrichmentError>;
}

/// Used when no classifier is configured: every inferred field stays empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInference;

impl LeadInference for NoInference {
    fn infer(&self, _record: &IncomingRecord) -> Result<Inference, EnrichmentError> {
        Ok(Inference::default())
    }
}

/// Parse a model reply into an [`Inference`], tolerating a fenced code block.
pub fn parse_inference(content: &str) -> Result<Inference, EnrichmentError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim())
        .map_err(|err| EnrichmentError::Malformed(format!("{err}: {body}")))
}

fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .next()
            .unwrap_or_default()
            .to_string(),
        other => other.to_string(),
    })
}
