//! Patient name extraction from structured model output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompts::UNKNOWN_NAME;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("API credential not configured")]
    MissingCredentials,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Outcome of one extraction call.
///
/// Failures are folded into [`NameExtraction::Failed`] rather than returned
/// as errors: the caller always falls back to asking the user for a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NameExtraction {
    /// The model read a patient name from the document.
    Found(String),
    /// The model answered but found no name.
    NotFound,
    /// The call itself failed (credentials, network, malformed reply).
    Failed(String),
}

impl NameExtraction {
    /// Interpret a raw name as returned by the model.
    ///
    /// Empty names and the "Unknown" placeholder become `NotFound`.
    pub fn from_name(raw: &str) -> Self {
        let name = raw.trim();
        if name.is_empty() || name.eq_ignore_ascii_case(UNKNOWN_NAME) {
            NameExtraction::NotFound
        } else {
            NameExtraction::Found(name.to_string())
        }
    }

    /// The extracted name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            NameExtraction::Found(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, NameExtraction::Failed(_))
    }
}

impl From<ExtractionError> for NameExtraction {
    fn from(e: ExtractionError) -> Self {
        NameExtraction::Failed(e.to_string())
    }
}

/// Structured reply requested through the response schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameReply {
    #[serde(default)]
    pub name: Option<String>,
}

/// Parse the model's JSON reply into an extraction outcome.
pub fn parse_name_reply(text: &str) -> ExtractionResult<NameExtraction> {
    // Models occasionally wrap the object in prose or code fences
    let json_start = text.find('{').ok_or_else(|| {
        ExtractionError::InvalidFormat("No JSON object found in response".into())
    })?;
    let json_end = text.rfind('}').ok_or_else(|| {
        ExtractionError::InvalidFormat("No closing brace found in response".into())
    })?;
    if json_end < json_start {
        return Err(ExtractionError::InvalidFormat(
            "Closing brace precedes opening brace".into(),
        ));
    }

    let reply: NameReply = serde_json::from_str(&text[json_start..=json_end])?;
    Ok(NameExtraction::from_name(reply.name.as_deref().unwrap_or("")))
}

/// `generateContent` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    pub(crate) fn text(&self) -> ExtractionResult<String> {
        let content = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .ok_or_else(|| ExtractionError::InvalidFormat("Response has no candidates".into()))?;

        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            return Err(ExtractionError::InvalidFormat(
                "Response contains no text".into(),
            ));
        }
        Ok(text)
    }
}

/// Extract the name from a raw `generateContent` response body.
pub fn parse_generate_content(body: &str) -> ExtractionResult<NameExtraction> {
    let response: GenerateContentResponse = serde_json::from_str(body)?;
    parse_name_reply(&response.text()?)
}
