mod gemini;

pub use gemini::GeminiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::models::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Text,
    Image,
}

/// Base64 image as sent by the browser.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image(InlineImage),
}

#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub model: ModelKind,
    pub parts: Vec<Part>,
    /// Ask for JSON output matching this schema
    pub response_schema: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub history: Vec<ChatMessage>,
    pub message: String,
    pub system_instruction: Option<String>,
}

// first candidate only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub text: Option<String>,
    /// Raw base64 of the first inline image
    pub image: Option<String>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, request: ContentRequest) -> Result<Candidate, ProviderError>;

    async fn chat(&self, request: ChatRequest) -> Result<Candidate, ProviderError>;
}
