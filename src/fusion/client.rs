//! HTTP client for the Fusion+ API

use super::types::{
    error_message, OrderStatusResponse, PlaceOrderRequest, PlaceOrderResponse, QuoteRequest,
    QuoteResponse, ReadyFill, ReadyFillsResponse, SubmitSecretRequest,
};
use super::FusionApi;
use crate::config::FusionConfig;
use crate::error::{SwapError, SwapResult};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const QUOTE_PATH: &str = "/quoter/v1.0/quote/receive";
const SUBMIT_ORDER_PATH: &str = "/relayer/v1.0/submit";
const SUBMIT_SECRET_PATH: &str = "/relayer/v1.0/submit/secret";
const ORDER_STATUS_PATH: &str = "/orders/v1.0/order/status";
const READY_FILLS_PATH: &str = "/orders/v1.0/order/ready-to-accept-secret-fills";

/// reqwest-backed `FusionApi`
#[derive(Debug, Clone)]
pub struct HttpFusionApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpFusionApi {
    /// Create a client with its own connection pool
    pub fn new(config: &FusionConfig) -> SwapResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SwapError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config))
    }

    /// Create a client sharing an existing connection pool
    pub fn with_client(client: reqwest::Client, config: &FusionConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// Create a request builder with authentication
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.request(method, url);

        if self.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_key)
        }
    }

    /// Send a request and check the status code
    async fn send(&self, operation: &str, request: RequestBuilder) -> SwapResult<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SwapError::Timeout {
                    operation: operation.to_string(),
                }
            } else {
                SwapError::api(operation, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SwapError::api(operation, error_message(status.as_u16(), &body)));
        }

        debug!("Fusion API {} -> {}", operation, status);
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> SwapResult<T> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| SwapError::api(operation, format!("Invalid response body: {}", e)))
    }
}

#[async_trait]
impl FusionApi for HttpFusionApi {
    async fn get_quote(&self, request: &QuoteRequest) -> SwapResult<QuoteResponse> {
        let builder = self.request(Method::GET, QUOTE_PATH).query(request);
        self.send_json("get_quote", builder).await
    }

    async fn place_order(&self, request: &PlaceOrderRequest) -> SwapResult<String> {
        let builder = self.request(Method::POST, SUBMIT_ORDER_PATH).json(request);
        let response: PlaceOrderResponse = self.send_json("place_order", builder).await?;
        Ok(response.order_hash)
    }

    async fn get_order_status(&self, order_hash: &str) -> SwapResult<OrderStatusResponse> {
        let path = order_path(ORDER_STATUS_PATH, order_hash)?;
        let builder = self.request(Method::GET, &path);
        self.send_json("get_order_status", builder).await
    }

    async fn get_ready_to_accept_secret_fills(
        &self,
        order_hash: &str,
    ) -> SwapResult<Vec<ReadyFill>> {
        let path = order_path(READY_FILLS_PATH, order_hash)?;
        let builder = self.request(Method::GET, &path);
        let response: ReadyFillsResponse = self
            .send_json("get_ready_to_accept_secret_fills", builder)
            .await?;
        Ok(response.fills)
    }

    async fn submit_secret(&self, order_hash: &str, secret: &str) -> SwapResult<()> {
        let body = SubmitSecretRequest { order_hash, secret };
        let builder = self.request(Method::POST, SUBMIT_SECRET_PATH).json(&body);
        self.send("submit_secret", builder).await?;
        Ok(())
    }
}

/// `prefix/order_hash`, refusing anything but a `0x`-prefixed hex hash
fn order_path(prefix: &str, order_hash: &str) -> SwapResult<String> {
    let digits = order_hash
        .strip_prefix("0x")
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()));
    match digits {
        Some(_) => Ok(format!("{}/{}", prefix, order_hash)),
        None => Err(SwapError::Configuration(format!(
            "invalid order hash {:?}",
            order_hash
        ))),
    }
}
