//! Shared fixtures for unit tests

use crate::chain::{ChainInfo, ChainRegistry};
use crate::fusion::types::{OrderStatusResponse, PresetResponse, QuoteResponse};
use crate::types::{OrderStatus, Preset, Quote, SwapIntent};

use std::collections::HashMap;
use std::sync::Arc;

/// Well-known development key (anvil/hardhat account #0)
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

pub const USDC_ETHEREUM: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const USDC_ARBITRUM: &str = "0xaf88d065e77c8cC2239327C5EDb3A432268e5831";

pub fn registry() -> Arc<ChainRegistry> {
    let chains = [("ethereum", 1), ("arbitrum", 42161), ("solana", 501)]
        .into_iter()
        .map(|(name, network_id)| ChainInfo {
            name: name.to_string(),
            network_id,
            rpc_url: format!("https://{}.llamarpc.com", name),
            fallback_rpc_urls: Vec::new(),
            evm: name != "solana",
        });
    Arc::new(ChainRegistry::from_chains(chains).expect("fixture registry"))
}

pub fn intent() -> SwapIntent {
    SwapIntent {
        source_chain: "ethereum".to_string(),
        destination_chain: "arbitrum".to_string(),
        source_token: USDC_ETHEREUM.to_string(),
        destination_token: USDC_ARBITRUM.to_string(),
        amount: "1000000000".to_string(),
        wallet_address: DEV_ADDRESS.to_string(),
    }
}

pub fn quote(secrets_count: usize) -> Quote {
    let mut presets = HashMap::new();
    presets.insert(
        "fast".to_string(),
        Preset {
            auction_duration_secs: 180,
            secrets_count,
        },
    );
    Quote {
        quote_id: Some("quote-1".to_string()),
        source_chain: "ethereum".to_string(),
        destination_chain: "arbitrum".to_string(),
        source_network_id: 1,
        destination_network_id: 42161,
        source_amount: "1000000000".to_string(),
        destination_amount: "998877665".to_string(),
        recommended_preset: "fast".to_string(),
        presets,
    }
}

pub fn quote_response(secrets_count: usize) -> QuoteResponse {
    let mut presets = HashMap::new();
    presets.insert(
        "fast".to_string(),
        PresetResponse {
            auction_duration: 180,
            secrets_count,
        },
    );
    QuoteResponse {
        quote_id: Some("quote-1".to_string()),
        src_token_amount: Some("1000000000".to_string()),
        dst_token_amount: "998877665".to_string(),
        recommended_preset: "fast".to_string(),
        presets,
    }
}

pub fn status(status: OrderStatus) -> OrderStatusResponse {
    OrderStatusResponse {
        status,
        fills: Vec::new(),
    }
}
