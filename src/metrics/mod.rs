//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Chain RPC health
//! - Quote and order placement
//! - Secret disclosure
//! - Settlement outcomes and monitoring duration

use crate::error::{SwapError, SwapResult};
use crate::monitor::MonitorState;

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge_vec, register_histogram_vec, Counter,
    CounterVec, Encoder, GaugeVec, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Chain metrics
    pub static ref CHAIN_CONNECTED: GaugeVec = register_gauge_vec!(
        "fusion_swap_chain_connected",
        "Chain RPC status (1=reachable, 0=unreachable)",
        &["chain"]
    ).unwrap();

    // Quote metrics
    pub static ref QUOTES_REQUESTED: CounterVec = register_counter_vec!(
        "fusion_swap_quotes_requested_total",
        "Total quotes requested by source chain",
        &["chain"]
    ).unwrap();

    pub static ref QUOTES_FAILED: CounterVec = register_counter_vec!(
        "fusion_swap_quotes_failed_total",
        "Total quotes that could not be obtained",
        &["chain"]
    ).unwrap();

    // Order metrics
    pub static ref ORDERS_SUBMITTED: CounterVec = register_counter_vec!(
        "fusion_swap_orders_submitted_total",
        "Total orders accepted by the relayer",
        &["chain"]
    ).unwrap();

    pub static ref ORDERS_FAILED: CounterVec = register_counter_vec!(
        "fusion_swap_orders_failed_total",
        "Total order placements rejected",
        &["chain"]
    ).unwrap();

    // Secret metrics
    pub static ref SECRETS_SUBMITTED: Counter = register_counter!(
        "fusion_swap_secrets_submitted_total",
        "Total fill secrets disclosed"
    ).unwrap();

    pub static ref SECRETS_FAILED: Counter = register_counter!(
        "fusion_swap_secrets_failed_total",
        "Total secret submissions that failed and await retry"
    ).unwrap();

    // Monitoring metrics
    pub static ref QUERY_ERRORS: CounterVec = register_counter_vec!(
        "fusion_swap_query_errors_total",
        "Total failed status/fill queries by operation",
        &["operation"]
    ).unwrap();

    pub static ref SWAP_OUTCOMES: CounterVec = register_counter_vec!(
        "fusion_swap_outcomes_total",
        "Total monitoring sessions by terminal state",
        &["state"]
    ).unwrap();

    pub static ref MONITOR_DURATION: HistogramVec = register_histogram_vec!(
        "fusion_swap_monitor_duration_seconds",
        "Time from order placement to terminal state",
        &["state"],
        vec![5.0, 10.0, 30.0, 60.0, 120.0, 180.0, 300.0, 600.0]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> SwapResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SwapError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| SwapError::Internal(format!("Metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    render().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Text exposition of the default registry
pub fn render() -> SwapResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| SwapError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| SwapError::Internal(e.to_string()))
}

// Helper functions to record metrics

pub fn record_chain_health(chain: &str, healthy: bool) {
    CHAIN_CONNECTED
        .with_label_values(&[chain])
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_quote_requested(chain: &str) {
    QUOTES_REQUESTED.with_label_values(&[chain]).inc();
}

pub fn record_quote_failed(chain: &str) {
    QUOTES_FAILED.with_label_values(&[chain]).inc();
}

pub fn record_order_submitted(chain: &str) {
    ORDERS_SUBMITTED.with_label_values(&[chain]).inc();
}

pub fn record_order_failed(chain: &str) {
    ORDERS_FAILED.with_label_values(&[chain]).inc();
}

pub fn record_secret_submitted() {
    SECRETS_SUBMITTED.inc();
}

pub fn record_secret_failed() {
    SECRETS_FAILED.inc();
}

pub fn record_query_error(error: &SwapError) {
    let operation = match error {
        SwapError::Api { operation, .. } | SwapError::Timeout { operation } => operation.as_str(),
        _ => "other",
    };
    QUERY_ERRORS.with_label_values(&[operation]).inc();
}

pub fn record_monitor_outcome(state: MonitorState, duration_secs: f64) {
    SWAP_OUTCOMES.with_label_values(&[state.as_str()]).inc();
    MONITOR_DURATION
        .with_label_values(&[state.as_str()])
        .observe(duration_secs);
}
