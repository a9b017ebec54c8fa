//! Boundary to the Fusion+ auction network
//!
//! `FusionApi` mirrors the five calls the swap pipeline makes against the
//! network. `HttpFusionApi` is the production implementation; tests swap in
//! the generated mock.

pub mod client;
pub mod types;

pub use client::HttpFusionApi;
pub use types::{
    OrderStatusResponse, PlaceOrderRequest, QuoteRequest, QuoteResponse, ReadyFill,
};

use crate::error::SwapResult;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait FusionApi: Send + Sync {
    /// Price and preset discovery for a swap intent
    async fn get_quote(&self, request: &QuoteRequest) -> SwapResult<QuoteResponse>;

    /// Place a cross-chain order, returning its order hash
    async fn place_order(&self, request: &PlaceOrderRequest) -> SwapResult<String>;

    async fn get_order_status(&self, order_hash: &str) -> SwapResult<OrderStatusResponse>;

    /// Fills whose escrows are waiting for secret disclosure
    async fn get_ready_to_accept_secret_fills(
        &self,
        order_hash: &str,
    ) -> SwapResult<Vec<ReadyFill>>;

    async fn submit_secret(&self, order_hash: &str, secret: &str) -> SwapResult<()>;
}
