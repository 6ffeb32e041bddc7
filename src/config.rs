use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::{GatewayError, Result};
use crate::rate_limit::LimiterKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "salon-gateway")]
#[command(about = "Rate-limited gateway in front of the hair try-on AI provider")]
pub struct Args {
    // Address to bind
    #[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "GATEWAY_PORT", default_value_t = 8080)]
    pub port: u16,

    // Path the gateway answers on
    #[arg(long, env = "GATEWAY_ENDPOINT", default_value = "/api/gemini")]
    pub endpoint: String,

    // Provider API key, required
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(
        long,
        env = "GEMINI_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    pub provider_url: String,

    // Model for analyzeHair and chat
    #[arg(long, env = "GEMINI_TEXT_MODEL", default_value = "gemini-2.5-flash")]
    pub text_model: String,

    // Model for virtualTryOn and editImage
    #[arg(
        long,
        env = "GEMINI_IMAGE_MODEL",
        default_value = "gemini-2.5-flash-image-preview"
    )]
    pub image_model: String,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 30)]
    pub rate_limit: u32,

    // Rate limit window in milliseconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_MS", default_value_t = 60_000)]
    pub rate_window_ms: u64,

    // fixed-window unless sliding-window is asked for explicitly
    #[arg(long, env = "RATE_LIMITER", value_enum, default_value_t = LimiterKind::FixedWindow)]
    pub limiter: LimiterKind,

    // Seconds between sweeps of expired rate limit entries, 0 disables
    #[arg(long, env = "RATE_LIMIT_SWEEP_SECS", default_value_t = 60)]
    pub sweep_interval: u64,

    // Largest request body read, base64 photos are big
    #[arg(long, env = "GATEWAY_MAX_BODY_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_body_bytes: usize,

    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "GATEWAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if !self.endpoint.starts_with('/') {
            return Err(GatewayError::Config(format!(
                "endpoint must start with '/': {}",
                self.endpoint
            )));
        }
        if self.rate_limit == 0 {
            return Err(GatewayError::Config("rate limit must be at least 1".into()));
        }
        if self.rate_window_ms == 0 {
            return Err(GatewayError::Config("rate window must be at least 1ms".into()));
        }
        self.require_api_key()?;
        Ok(())
    }

    /// The provider key; missing or blank is fatal.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GatewayError::Config("GEMINI_API_KEY is not set".into()))
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }

    /// `None` when sweeping is disabled.
    pub fn sweep_every(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }
}
