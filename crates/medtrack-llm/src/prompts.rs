//! Prompt and structured-output schema for patient name extraction.
//!
//! The model is asked for a JSON object with a single `name` field. The
//! schema is sent alongside the prompt so the reply is constrained server-side.

use serde_json::{json, Value};

/// Default hosted model used for extraction.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Fixed instruction sent with every uploaded document.
pub const EXTRACTION_INSTRUCTION: &str =
    "Extract the patient's full name from this medical document.";

/// Name the model uses when it cannot read a patient from the document.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Response schema constraining the reply to `{"name": string}`.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": {
                "type": "STRING",
                "description": "The full name of the patient."
            }
        },
        "required": ["name"]
    })
}

/// Build the `generateContent` request body for one document.
///
/// `data_base64` is the document content already base64-encoded.
pub fn build_request_body(mime_type: &str, data_base64: &str) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "inlineData": { "mimeType": mime_type, "data": data_base64 } },
                { "text": EXTRACTION_INSTRUCTION }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_requires_name() {
        let schema = response_schema();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["name"]["type"], "STRING");
        assert_eq!(schema["required"][0], "name");
    }

    #[test]
    fn test_request_body_layout() {
        let body = build_request_body("image/png", "aGVsbG8=");
        let parts = &body["contents"][0]["parts"];

        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(parts[1]["text"], EXTRACTION_INSTRUCTION);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"], response_schema());
    }
}
