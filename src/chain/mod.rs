//! Chain module - logical chain names to network identifiers and RPC endpoints
//!
//! The registry is built once from configuration and shared read-only by
//! every swap task. EVM chains additionally get a `ChainProvider` used for
//! readiness checks.

pub mod provider;

pub use provider::ChainProvider;

use crate::config::Settings;
use crate::error::{SwapError, SwapResult};

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Resolved chain connectivity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub name: String,
    pub network_id: u64,
    pub rpc_url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallback_rpc_urls: Vec<String>,
    pub evm: bool,
}

/// Static chain name registry
#[derive(Default)]
pub struct ChainRegistry {
    chains: BTreeMap<String, ChainInfo>,
    providers: BTreeMap<String, Arc<ChainProvider>>,
}

impl ChainRegistry {
    /// Build the registry from all enabled chains in the settings
    pub fn from_settings(settings: &Settings) -> SwapResult<Self> {
        let chains = settings.enabled_chains().into_iter().map(|(name, c)| ChainInfo {
            name: name.to_lowercase(),
            network_id: c.network_id,
            rpc_url: c.rpc_url.clone(),
            fallback_rpc_urls: c.fallback_rpc_urls.clone(),
            evm: c.evm,
        });
        Self::from_chains(chains)
    }

    /// Build the registry from explicit chain entries
    pub fn from_chains(chains: impl IntoIterator<Item = ChainInfo>) -> SwapResult<Self> {
        let mut registry = Self::default();

        for chain in chains {
            if chain.evm {
                match ChainProvider::new(&chain) {
                    Ok(provider) => {
                        registry
                            .providers
                            .insert(chain.name.clone(), Arc::new(provider));
                    }
                    Err(e) => warn!("Chain {} has no usable RPC provider: {}", chain.name, e),
                }
            }

            info!("Registered chain {} (network {})", chain.name, chain.network_id);
            if let Some(existing) = registry.chains.insert(chain.name.clone(), chain) {
                return Err(SwapError::Configuration(format!(
                    "chain {} registered twice",
                    existing.name
                )));
            }
        }

        Ok(registry)
    }

    /// Resolve a logical chain name
    pub fn resolve(&self, chain: &str) -> SwapResult<&ChainInfo> {
        self.chains
            .get(&chain.to_lowercase())
            .ok_or_else(|| SwapError::UnsupportedChain {
                chain: chain.to_string(),
            })
    }

    /// Get provider for a specific chain
    pub fn provider(&self, chain: &str) -> SwapResult<Arc<ChainProvider>> {
        self.providers
            .get(&chain.to_lowercase())
            .cloned()
            .ok_or_else(|| SwapError::UnsupportedChain {
                chain: chain.to_string(),
            })
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainInfo> {
        self.chains.values()
    }

    /// Health check for all EVM chains
    pub async fn health_check(&self) -> Vec<(String, bool)> {
        let checks = self.providers.iter().map(|(name, provider)| {
            let name = name.clone();
            let provider = provider.clone();
            async move {
                let healthy = provider.health_check().await;
                crate::metrics::record_chain_health(&name, healthy);
                (name, healthy)
            }
        });

        futures::future::join_all(checks).await
    }
}
