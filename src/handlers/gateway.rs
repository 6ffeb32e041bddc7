use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::{GatewayError, ProviderError, Result};
use crate::headers::{client_key, preflight_response};
use crate::metrics::{PROVIDER_FAILURES, PROVIDER_LATENCY, RATE_LIMITED, REQUEST_TOTAL};
use crate::models::{
    ChatResponse, EditImageResponse, GatewayRequest, TryOnResponse, hair_analysis_schema,
};
use crate::provider::{ChatRequest, ContentRequest, InlineImage, ModelKind, Part, Provider};
use crate::state::AppState;

// validate, rate limit, call the provider once, answer in JSON
pub async fn gateway_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    if request.method() == Method::OPTIONS {
        return preflight_response();
    }

    match handle(&state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handle(state: &AppState, request: Request) -> Result<Response> {
    if request.method() != Method::POST {
        return Err(GatewayError::MethodNotAllowed);
    }

    let (parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|_| GatewayError::MissingBody)?;
    let request = GatewayRequest::parse(&bytes).inspect_err(|err| {
        if let GatewayError::UnknownAction(action) = err {
            debug!(%action, "Rejected unknown action");
        }
    })?;
    let action = request.action();

    let remote = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(&parts.headers, remote);

    REQUEST_TOTAL.with_label_values(&[action.as_str()]).inc();

    if !state.limiter.check(&key).is_allowed() {
        RATE_LIMITED.inc();
        info!(client = %key, action = action.as_str(), "Rate limit exceeded");
        return Err(GatewayError::RateLimited);
    }

    let start_time = Instant::now();
    let result = dispatch(state.provider.as_ref(), request).await;
    PROVIDER_LATENCY
        .with_label_values(&[action.as_str()])
        .observe(start_time.elapsed().as_secs_f64());

    result.inspect_err(|err| {
        if err.is_upstream() {
            PROVIDER_FAILURES.with_label_values(&[action.as_str()]).inc();
            error!(
                client = %key,
                action = action.as_str(),
                error = %err,
                source = ?std::error::Error::source(err),
                "Provider call failed"
            );
        }
    })
}

async fn dispatch(provider: &dyn Provider, request: GatewayRequest) -> Result<Response> {
    match request {
        GatewayRequest::AnalyzeHair(payload) => {
            let candidate = provider
                .generate(ContentRequest {
                    model: ModelKind::Text,
                    parts: vec![Part::Image(payload.image), Part::Text(payload.prompt)],
                    response_schema: Some(payload.schema.unwrap_or_else(hair_analysis_schema)),
                })
                .await?;

            let text = candidate
                .text
                .ok_or(ProviderError::Empty("No analysis returned by provider"))?;
            let analysis: Value =
                serde_json::from_str(&text).map_err(GatewayError::MalformedCompletion)?;
            Ok(Json(analysis).into_response())
        }
        GatewayRequest::VirtualTryOn(payload) => {
            let data = generate_image(provider, payload.image, payload.prompt).await?;
            Ok(Json(TryOnResponse {
                image_url: format!("data:image/png;base64,{data}"),
            })
            .into_response())
        }
        GatewayRequest::EditImage(payload) => {
            let data = generate_image(provider, payload.image, payload.prompt).await?;
            Ok(Json(EditImageResponse { data }).into_response())
        }
        GatewayRequest::Chat(payload) => {
            let mut history = payload.messages;
            let last = history
                .pop()
                .ok_or_else(|| GatewayError::InvalidPayload("messages must not be empty".into()))?;

            let candidate = provider
                .chat(ChatRequest {
                    history,
                    message: last.text,
                    system_instruction: payload.system_instruction,
                })
                .await?;

            let text = candidate
                .text
                .ok_or(ProviderError::Empty("No reply returned by provider"))?;
            Ok(Json(ChatResponse { text }).into_response())
        }
    }
}

async fn generate_image(
    provider: &dyn Provider,
    image: InlineImage,
    prompt: String,
) -> Result<String> {
    let candidate = provider
        .generate(ContentRequest {
            model: ModelKind::Image,
            parts: vec![Part::Image(image), Part::Text(prompt)],
            response_schema: None,
        })
        .await?;

    candidate
        .image
        .ok_or_else(|| ProviderError::Empty("No image data returned by provider").into())
}
