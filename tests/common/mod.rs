// stub provider that counts calls, router on a hand-driven clock, request helpers

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use salon_gateway::ProviderError;
use salon_gateway::build_router;
use salon_gateway::provider::{Candidate, ChatRequest, ContentRequest, Provider};
use salon_gateway::rate_limit::{Clock, FixedWindowLimiter};
use salon_gateway::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

pub const ENDPOINT: &str = "/api/gemini";
pub const LIMIT: u32 = 30;
pub const WINDOW: Duration = Duration::from_millis(60_000);

// only moves when a test calls advance
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

/// What the stub provider answers every call with.
#[derive(Debug, Clone)]
pub enum StubReply {
    Candidate(Candidate),
    Fail(String),
}

impl StubReply {
    pub fn text(text: &str) -> Self {
        StubReply::Candidate(Candidate {
            text: Some(text.to_string()),
            image: None,
        })
    }

    pub fn image(data: &str) -> Self {
        StubReply::Candidate(Candidate {
            text: None,
            image: Some(data.to_string()),
        })
    }
}

pub struct StubProvider {
    reply: StubReply,
    calls: AtomicUsize,
    pub generations: Mutex<Vec<ContentRequest>>,
    pub chats: Mutex<Vec<ChatRequest>>,
}

impl StubProvider {
    pub fn new(reply: StubReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            generations: Mutex::new(Vec::new()),
            chats: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self) -> Result<Candidate, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            StubReply::Candidate(candidate) => Ok(candidate.clone()),
            StubReply::Fail(message) => Err(ProviderError::Other(message.clone())),
        }
    }
}

#[async_trait]
impl Provider for StubProvider {
    async fn generate(&self, request: ContentRequest) -> Result<Candidate, ProviderError> {
        self.generations.lock().unwrap().push(request);
        self.answer()
    }

    async fn chat(&self, request: ChatRequest) -> Result<Candidate, ProviderError> {
        self.chats.lock().unwrap().push(request);
        self.answer()
    }
}

pub struct Harness {
    pub app: Router,
    pub provider: Arc<StubProvider>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(reply: StubReply) -> Self {
        Self::with_limit(reply, LIMIT)
    }

    pub fn with_limit(reply: StubReply, limit: u32) -> Self {
        let provider = Arc::new(StubProvider::new(reply));
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(FixedWindowLimiter::new(limit, WINDOW, clock.clone()));

        let state = Arc::new(AppState {
            provider: provider.clone(),
            limiter: limiter.clone(),
            max_body_bytes: 1024 * 1024,
        });

        Self {
            app: build_router(state, ENDPOINT),
            provider,
            limiter,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send(&self.app, request).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let raw = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    let body = if raw.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&raw).unwrap()
    };

    TestResponse {
        status,
        headers,
        body,
        raw,
    }
}

/// JSON `POST` to the gateway from the given client address.
pub fn post(body: impl Into<String>, client: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(ENDPOINT)
        .header("content-type", "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(body.into()))
        .unwrap()
}

pub fn request(method: Method, client: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(ENDPOINT)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

pub fn chat_body(text: &str) -> String {
    serde_json::json!({
        "action": "chat",
        "payload": {
            "messages": [{ "role": "user", "text": text }],
            "systemInstruction": "be terse"
        }
    })
    .to_string()
}

pub fn image_body(action: &str) -> String {
    serde_json::json!({
        "action": action,
        "payload": {
            "image": { "mimeType": "image/jpeg", "data": "c2VsZmll" },
            "prompt": "shoulder-length curtain bangs"
        }
    })
    .to_string()
}
