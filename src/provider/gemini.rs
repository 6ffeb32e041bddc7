use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Candidate, ChatRequest, ContentRequest, ModelKind, Part, Provider};
use crate::error::ProviderError;
use crate::models::ChatMessage;

// Gemini generateContent request format
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireBlob>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct WireBlob {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

// Gemini generateContent response format
#[derive(Deserialize, Debug, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Deserialize, Debug, Default)]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContent>,
}

impl WirePart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

impl From<Part> for WirePart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text(text) => WirePart::text(text),
            Part::Image(image) => WirePart {
                text: None,
                inline_data: Some(WireBlob {
                    mime_type: image.mime_type,
                    data: image.data,
                }),
            },
        }
    }
}

impl From<GenerateContentResponse> for Candidate {
    fn from(response: GenerateContentResponse) -> Self {
        let parts = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        let image = parts
            .into_iter()
            .find_map(|p| p.inline_data)
            .map(|blob| blob.data)
            .filter(|data| !data.is_empty());

        Candidate {
            text: (!text.is_empty()).then_some(text),
            image,
        }
    }
}

// "assistant" from the browser is "model" to Gemini
fn wire_role(role: &str) -> &str {
    match role {
        "assistant" | "model" => "model",
        _ => "user",
    }
}

fn chat_content(message: ChatMessage) -> WireContent {
    WireContent {
        role: Some(wire_role(&message.role).to_string()),
        parts: vec![WirePart::text(message.text)],
    }
}

fn content_body(request: ContentRequest) -> GenerateContentBody {
    let generation_config = match (request.model, request.response_schema) {
        (_, Some(schema)) => Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
            ..Default::default()
        }),
        (ModelKind::Image, None) => Some(GenerationConfig {
            response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
            ..Default::default()
        }),
        (ModelKind::Text, None) => None,
    };

    GenerateContentBody {
        contents: vec![WireContent {
            role: Some("user".to_string()),
            parts: request.parts.into_iter().map(WirePart::from).collect(),
        }],
        system_instruction: None,
        generation_config,
    }
}

fn chat_body(request: ChatRequest) -> GenerateContentBody {
    let mut contents: Vec<WireContent> = request.history.into_iter().map(chat_content).collect();
    contents.push(WireContent {
        role: Some("user".to_string()),
        parts: vec![WirePart::text(request.message)],
    });

    GenerateContentBody {
        contents,
        system_instruction: request.system_instruction.map(|text| WireContent {
            role: None,
            parts: vec![WirePart::text(text)],
        }),
        generation_config: None,
    }
}

// Gemini's own `error.message`; anything else (proxy pages, stack dumps) stays out of the reply
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Provider returned status {}", status.as_u16()))
}

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    text_model: String,
    image_model: String,
}

impl GeminiProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            text_model: text_model.into(),
            image_model: image_model.into(),
        }
    }

    fn model(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Text => &self.text_model,
            ModelKind::Image => &self.image_model,
        }
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentBody,
    ) -> Result<Candidate, ProviderError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        debug!(%model, "Calling provider");

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            debug!(%model, status = status.as_u16(), body = %text, "Provider returned an error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        let parsed: GenerateContentResponse = res.json().await?;
        Ok(Candidate::from(parsed))
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn generate(&self, request: ContentRequest) -> Result<Candidate, ProviderError> {
        let model = self.model(request.model).to_string();
        self.generate_content(&model, &content_body(request)).await
    }

    async fn chat(&self, request: ChatRequest) -> Result<Candidate, ProviderError> {
        let model = self.model(ModelKind::Text).to_string();
        self.generate_content(&model, &chat_body(request)).await
    }
}
