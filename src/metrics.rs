use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, HistogramVec, register_counter, register_counter_vec,
    register_gauge, register_histogram_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: CounterVec = register_counter_vec!(
        "gateway_requests_total",
        "Total number of well-formed gateway requests by action",
        &["action"]
    )
    .unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("gateway_rate_limited_total", "Requests rejected by the rate limiter")
            .unwrap();
    pub static ref PROVIDER_FAILURES: CounterVec = register_counter_vec!(
        "gateway_provider_failures_total",
        "Provider calls that ended in an upstream failure",
        &["action"]
    )
    .unwrap();
    pub static ref PROVIDER_LATENCY: HistogramVec = register_histogram_vec!(
        "gateway_provider_latency_seconds",
        "Provider call latency in seconds",
        &["action"]
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("gateway_tracked_clients", "Client keys currently held by the rate limiter")
            .unwrap();
}
