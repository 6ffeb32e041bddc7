use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;
use crate::provider::InlineImage;

/// The operations the gateway knows how to perform.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    AnalyzeHair,
    VirtualTryOn,
    EditImage,
    Chat,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::AnalyzeHair => "analyzeHair",
            Action::VirtualTryOn => "virtualTryOn",
            Action::EditImage => "editImage",
            Action::Chat => "chat",
        }
    }
}

// Incoming request body: `{ "action": ..., "payload": ... }`
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum GatewayRequest {
    AnalyzeHair(AnalyzeHairPayload),
    VirtualTryOn(ImagePromptPayload),
    EditImage(ImagePromptPayload),
    Chat(ChatPayload),
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeHairPayload {
    pub image: InlineImage,
    pub prompt: String,
    /// Output schema for the provider; the hair analysis schema when absent
    #[serde(default)]
    pub schema: Option<Value>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImagePromptPayload {
    pub image: InlineImage,
    pub prompt: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub text: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub system_instruction: Option<String>,
}

impl GatewayRequest {
    pub fn parse(body: &[u8]) -> Result<Self, GatewayError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| GatewayError::MissingBody)?;

        let Value::Object(fields) = &value else {
            return Err(GatewayError::MissingBody);
        };

        let action = match fields.get("action") {
            None | Some(Value::Null) => return Err(GatewayError::MissingAction),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(GatewayError::MissingAction);
            }
            Some(action) => action,
        };

        if serde_json::from_value::<Action>(action.clone()).is_err() {
            return Err(GatewayError::UnknownAction(action.to_string()));
        }

        let request: GatewayRequest = serde_json::from_value(value)
            .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn action(&self) -> Action {
        match self {
            GatewayRequest::AnalyzeHair(_) => Action::AnalyzeHair,
            GatewayRequest::VirtualTryOn(_) => Action::VirtualTryOn,
            GatewayRequest::EditImage(_) => Action::EditImage,
            GatewayRequest::Chat(_) => Action::Chat,
        }
    }

    // presence only, the provider owns the schema
    fn validate(&self) -> Result<(), GatewayError> {
        let image = match self {
            GatewayRequest::AnalyzeHair(p) => &p.image,
            GatewayRequest::VirtualTryOn(p) | GatewayRequest::EditImage(p) => &p.image,
            GatewayRequest::Chat(p) => {
                if p.messages.is_empty() {
                    return Err(GatewayError::InvalidPayload(
                        "messages must not be empty".into(),
                    ));
                }
                return Ok(());
            }
        };

        if image.data.is_empty() {
            return Err(GatewayError::InvalidPayload("image data is empty".into()));
        }
        Ok(())
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TryOnResponse {
    pub image_url: String,
}

#[derive(Serialize, Debug)]
pub struct EditImageResponse {
    pub data: String,
}

#[derive(Serialize, Debug)]
pub struct ChatResponse {
    pub text: String,
}

/// Schema the provider fills in for a hair analysis.
pub fn hair_analysis_schema() -> Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "faceShape": { "type": "STRING" },
            "hairType": { "type": "STRING" },
            "hairLength": { "type": "STRING" },
            "hairColor": { "type": "STRING" },
            "condition": { "type": "STRING" },
            "recommendations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "description": { "type": "STRING" }
                    },
                    "required": ["name", "description"]
                }
            }
        },
        "required": ["faceShape", "hairType", "recommendations"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<GatewayRequest, GatewayError> {
        GatewayRequest::parse(body.as_bytes())
    }

    #[test]
    fn parses_chat_request() {
        let req = parse(
            r#"{"action":"chat","payload":{"messages":[{"role":"user","text":"hi"}],"systemInstruction":"be terse"}}"#,
        )
        .unwrap();

        match req {
            GatewayRequest::Chat(p) => {
                assert_eq!(p.messages.len(), 1);
                assert_eq!(p.system_instruction.as_deref(), Some("be terse"));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn parses_image_actions() {
        let body = |action: &str| {
            format!(
                r#"{{"action":"{action}","payload":{{"image":{{"mimeType":"image/png","data":"AAAA"}},"prompt":"bob cut"}}}}"#
            )
        };

        assert_eq!(parse(&body("virtualTryOn")).unwrap().action(), Action::VirtualTryOn);
        assert_eq!(parse(&body("editImage")).unwrap().action(), Action::EditImage);
        assert_eq!(parse(&body("analyzeHair")).unwrap().action(), Action::AnalyzeHair);
    }

    #[test]
    fn non_json_is_missing_body() {
        assert!(matches!(parse("not json"), Err(GatewayError::MissingBody)));
        assert!(matches!(parse(""), Err(GatewayError::MissingBody)));
        assert!(matches!(parse("[1,2]"), Err(GatewayError::MissingBody)));
    }

    #[test]
    fn absent_action_is_missing_action() {
        assert!(matches!(parse(r#"{"payload":{}}"#), Err(GatewayError::MissingAction)));
        assert!(matches!(parse(r#"{"action":null}"#), Err(GatewayError::MissingAction)));
        assert!(matches!(parse(r#"{"action":""}"#), Err(GatewayError::MissingAction)));
    }

    #[test]
    fn unrecognized_action_is_unknown() {
        let err = parse(r#"{"action":"dance","payload":{}}"#).unwrap_err();
        // kept for the debug log, not the reply
        assert!(matches!(&err, GatewayError::UnknownAction(a) if a.contains("dance")));
        assert!(!err.client_message().contains("dance"));

        assert!(matches!(parse(r#"{"action":42}"#), Err(GatewayError::UnknownAction(_))));
    }

    #[test]
    fn wrong_payload_shape_is_invalid() {
        assert!(matches!(
            parse(r#"{"action":"chat","payload":{"messages":[]}}"#),
            Err(GatewayError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse(r#"{"action":"virtualTryOn","payload":{"prompt":"x"}}"#),
            Err(GatewayError::InvalidPayload(_))
        ));
        assert!(matches!(parse(r#"{"action":"chat"}"#), Err(GatewayError::InvalidPayload(_))));
    }

    #[test]
    fn action_names_match_wire_tags() {
        for action in [Action::AnalyzeHair, Action::VirtualTryOn, Action::EditImage, Action::Chat] {
            let tag = serde_json::to_value(action).unwrap();
            assert_eq!(tag, Value::String(action.as_str().to_string()));
        }
    }
}
