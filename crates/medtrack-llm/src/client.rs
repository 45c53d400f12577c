//! Gemini `generateContent` client for patient name extraction.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::extraction::{parse_generate_content, ExtractionError, ExtractionResult, NameExtraction};
use crate::prompts::{build_request_body, DEFAULT_MODEL};

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const MAX_ERROR_BODY_CHARS: usize = 2048;

/// Connection settings for the extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_BASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// The API key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Client for the hosted multimodal model.
///
/// One request per document. No retries and no request timeout: the call
/// runs until the server answers or the connection fails.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl GeminiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a credential is available for the call.
    pub fn has_credentials(&self) -> bool {
        self.config.api_key().is_some()
    }

    /// Extract the patient name from a document.
    ///
    /// Never fails: errors are logged and returned as [`NameExtraction::Failed`].
    pub async fn extract_name(&self, mime_type: &str, content: &[u8]) -> NameExtraction {
        match self.request_name(mime_type, content).await {
            Ok(outcome) => {
                tracing::debug!(?outcome, "name extraction finished");
                outcome
            }
            Err(e) => {
                tracing::warn!("Error extracting patient name: {e}");
                e.into()
            }
        }
    }

    /// Perform the extraction call, surfacing every failure as an error.
    pub async fn request_name(
        &self,
        mime_type: &str,
        content: &[u8],
    ) -> ExtractionResult<NameExtraction> {
        let api_key = self
            .config
            .api_key()
            .ok_or(ExtractionError::MissingCredentials)?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let body = build_request_body(mime_type, &STANDARD.encode(content));

        tracing::debug!(
            model = %self.config.model,
            mime_type,
            bytes = content.len(),
            "sending name extraction request"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let mut body: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            if text.chars().count() > MAX_ERROR_BODY_CHARS {
                body.push_str("...(truncated)");
            }
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_generate_content(&text)
    }
}
