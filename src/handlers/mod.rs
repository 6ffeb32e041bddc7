mod gateway;
mod health;
mod metrics;

pub use gateway::gateway_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
