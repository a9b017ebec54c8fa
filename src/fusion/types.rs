//! Wire types of the Fusion+ auction network API

use crate::types::OrderStatus;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Quote request parameters (sent as a query string)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub src_chain: u64,
    pub dst_chain: u64,
    pub src_token_address: String,
    pub dst_token_address: String,
    pub amount: String,
    pub wallet_address: String,
    pub enable_estimate: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(default)]
    pub quote_id: Option<String>,
    #[serde(default)]
    pub src_token_amount: Option<String>,
    pub dst_token_amount: String,
    pub recommended_preset: String,
    pub presets: HashMap<String, PresetResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetResponse {
    pub auction_duration: u64,
    pub secrets_count: usize,
}

/// Order placement payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub quote_id: Option<String>,
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    pub preset: String,
    pub wallet_address: String,
    pub hash_lock: String,
    pub secret_hashes: Vec<String>,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub status: OrderStatus,
    #[serde(default)]
    pub fills: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyFill {
    pub idx: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadyFillsResponse {
    #[serde(default)]
    pub fills: Vec<ReadyFill>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSecretRequest<'a> {
    pub order_hash: &'a str,
    pub secret: &'a str,
}

/// Error body shapes returned by the API
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    description: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

/// Best human-readable message from a non-success response body
pub fn error_message(status: u16, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let detail = parsed
        .description
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| body.trim().to_string());

    if detail.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, detail)
    }
}
