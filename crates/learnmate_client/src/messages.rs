//! Gemini v1beta wire types. Request/response JSON for `generateContent`
//! and `streamGenerateContent` (SSE).

use serde::{Deserialize, Serialize};

/// One conversational turn sent to the API. Roles are `"user"` and `"model"`.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<TextPart>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            parts: vec![TextPart { text: text.into() }],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".into(),
            parts: vec![TextPart { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

/// Request body for both the one-shot and the streaming endpoint.
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

impl SystemInstruction {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            parts: vec![TextPart { text: text.into() }],
        }
    }
}

/// Generation config; used here to constrain output to a JSON schema.
#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    pub response_mime_type: String,
    #[serde(rename = "responseSchema")]
    pub response_schema: Schema,
}

/// Declared response schema (OpenAPI subset the API accepts). Only the
/// fields this application needs: arrays of objects with string properties.
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<&'static str>>,
}

impl Schema {
    pub fn string(description: &str) -> Self {
        Self {
            schema_type: "STRING",
            description: Some(description.to_string()),
            items: None,
            properties: None,
            required: None,
        }
    }

    pub fn object(fields: Vec<(&'static str, Schema)>, required: Vec<&'static str>) -> Self {
        let mut properties = serde_json::Map::new();
        for (name, schema) in fields {
            // Schema only holds serializable leaves, so this cannot fail.
            let value = serde_json::to_value(schema).unwrap_or(serde_json::Value::Null);
            properties.insert(name.to_string(), value);
        }
        Self {
            schema_type: "OBJECT",
            description: None,
            items: None,
            properties: Some(properties),
            required: Some(required),
        }
    }

    pub fn array_of(items: Schema) -> Self {
        Self {
            schema_type: "ARRAY",
            description: None,
            items: Some(Box::new(items)),
            properties: None,
            required: None,
        }
    }
}

/// Response body shared by the one-shot endpoint and each SSE `data:` event.
/// Every field is optional so partial stream chunks deserialize cleanly.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    pub parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

/// Top-level error payload returned with a non-2xx or error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of every part of the first candidate.
    pub fn text(&self) -> String {
        let mut out = String::new();
        if let Some(candidates) = &self.candidates {
            if let Some(candidate) = candidates.first() {
                if let Some(content) = &candidate.content {
                    if let Some(parts) = &content.parts {
                        for part in parts {
                            if let Some(text) = &part.text {
                                out.push_str(text);
                            }
                        }
                    }
                }
            }
        }
        out
    }
}
