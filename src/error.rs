use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{message}")]
    Api { status: u16, message: String },

    // reqwest's message carries the upstream url, keep it for logs only
    #[error("Provider request failed")]
    Transport(#[from] reqwest::Error),

    // answered, but without the content the action needs
    #[error("{0}")]
    Empty(&'static str),

    #[error("{0}")]
    Other(String),
}

// every variant renders as { "error": <string> }
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Missing JSON body")]
    MissingBody,

    #[error("Missing action")]
    MissingAction,

    // value is logged at debug, never echoed back
    #[error("Unknown action")]
    UnknownAction(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Rate limit exceeded. Try again later.")]
    RateLimited,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Malformed completion: {0}")]
    MalformedCompletion(#[source] serde_json::Error),

    // startup only
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MissingBody
            | Self::MissingAction
            | Self::UnknownAction(_)
            | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Provider(_)
            | Self::MalformedCompletion(_)
            | Self::Config(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn client_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "Internal error".to_string()
        } else {
            message
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::MalformedCompletion(_))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.client_message() });
        (self.status_code(), Json(body)).into_response()
    }
}
