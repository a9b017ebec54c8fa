//! Quote client: price and preset discovery for a swap intent
//!
//! Read-only: quoting needs no signing credential, so a quote can be fetched
//! for any wallet address. Failures are surfaced as-is and never retried here.

use crate::chain::ChainRegistry;
use crate::error::{SwapError, SwapResult};
use crate::fusion::{FusionApi, QuoteRequest};
use crate::types::{is_base_units, Preset, Quote, SwapIntent};

use std::sync::Arc;
use tracing::{info, warn};

pub struct QuoteClient {
    api: Arc<dyn FusionApi>,
    registry: Arc<ChainRegistry>,
}

impl QuoteClient {
    pub fn new(api: Arc<dyn FusionApi>, registry: Arc<ChainRegistry>) -> Self {
        Self { api, registry }
    }

    /// Fetch a fresh quote for `intent`
    pub async fn get_quote(&self, intent: &SwapIntent) -> SwapResult<Quote> {
        let source = self.registry.resolve(&intent.source_chain)?;
        let destination = self.registry.resolve(&intent.destination_chain)?;

        info!(
            "Requesting quote: {} -> {} amount {}",
            source.name, destination.name, intent.amount
        );

        let request = QuoteRequest {
            src_chain: source.network_id,
            dst_chain: destination.network_id,
            src_token_address: intent.source_token.clone(),
            dst_token_address: intent.destination_token.clone(),
            amount: intent.amount.clone(),
            wallet_address: intent.wallet_address.clone(),
            enable_estimate: true,
        };

        crate::metrics::record_quote_requested(&source.name);
        let response = self.api.get_quote(&request).await.map_err(|e| {
            warn!("Quote request failed: {}", e);
            crate::metrics::record_quote_failed(&source.name);
            SwapError::QuoteUnavailable(e.upstream_message())
        })?;

        if !is_base_units(&response.dst_token_amount) {
            crate::metrics::record_quote_failed(&source.name);
            return Err(SwapError::QuoteUnavailable(format!(
                "destination amount {:?} is not a base-unit integer",
                response.dst_token_amount
            )));
        }

        let presets = response
            .presets
            .into_iter()
            .map(|(id, p)| {
                (
                    id,
                    Preset {
                        auction_duration_secs: p.auction_duration,
                        secrets_count: p.secrets_count,
                    },
                )
            })
            .collect();

        let quote = Quote {
            quote_id: response.quote_id,
            source_chain: source.name.clone(),
            destination_chain: destination.name.clone(),
            source_network_id: source.network_id,
            destination_network_id: destination.network_id,
            source_amount: response
                .src_token_amount
                .unwrap_or_else(|| intent.amount.clone()),
            destination_amount: response.dst_token_amount,
            recommended_preset: response.recommended_preset,
            presets,
        };

        let preset = quote.preset().inspect_err(|_| {
            crate::metrics::record_quote_failed(&source.name);
        })?;
        if preset.secrets_count == 0 {
            crate::metrics::record_quote_failed(&source.name);
            return Err(SwapError::QuoteUnavailable(format!(
                "preset {} requires zero secrets",
                quote.recommended_preset
            )));
        }

        info!(
            "Quote received: {} destination units, preset {} ({}s auction, {} secrets)",
            quote.destination_amount,
            quote.recommended_preset,
            preset.auction_duration_secs,
            preset.secrets_count
        );

        Ok(quote)
    }
}
