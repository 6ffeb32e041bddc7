use std::sync::Arc;

use crate::provider::Provider;
use crate::rate_limit::RateLimiter;

// app's shared state

pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub limiter: Arc<dyn RateLimiter>, // lives as long as the process
    pub max_body_bytes: usize,
}
