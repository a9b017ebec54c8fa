//! Swap pipeline: quote, commit, place, settle
//!
//! A `SwapClient` is built fresh for every attempt by `SwapClientFactory`,
//! bound to one source chain and an optional signing credential. Without a
//! credential the client is read-only: quotes work, and
//! execution fails with an authentication error before placing anything.

use crate::chain::ChainRegistry;
use crate::config::MonitorConfig;
use crate::error::{SwapError, SwapResult};
use crate::fusion::{FusionApi, OrderStatusResponse};
use crate::monitor::{MonitorPolicy, SettlementMonitor};
use crate::order::OrderSubmitter;
use crate::quote::QuoteClient;
use crate::secrets::generate_secrets;
use crate::types::{Quote, SwapIntent, SwapOutcome};
use crate::wallet::Credential;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Outcome status for intents rejected before quoting
pub const STATUS_INVALID_INTENT: &str = "invalid_intent";
/// Outcome status when no usable quote was obtained
pub const STATUS_QUOTE_FAILED: &str = "quote_failed";
/// Outcome status when the order was never placed
pub const STATUS_SUBMISSION_FAILED: &str = "submission_failed";

/// Builds per-attempt swap clients from shared read-only collaborators
#[derive(Clone)]
pub struct SwapClientFactory {
    api: Arc<dyn FusionApi>,
    registry: Arc<ChainRegistry>,
    monitor_config: MonitorConfig,
    cancel: Option<Arc<RwLock<bool>>>,
}

impl SwapClientFactory {
    pub fn new(
        api: Arc<dyn FusionApi>,
        registry: Arc<ChainRegistry>,
        monitor_config: MonitorConfig,
    ) -> Self {
        Self {
            api,
            registry,
            monitor_config,
            cancel: None,
        }
    }

    /// Share a shutdown flag with every monitor this factory creates
    pub fn with_cancellation(mut self, flag: Arc<RwLock<bool>>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    /// New client for one attempt on `source_chain`
    pub fn make_client(
        &self,
        source_chain: &str,
        credential: Option<Credential>,
    ) -> SwapResult<SwapClient> {
        let chain = self.registry.resolve(source_chain)?;

        let mut monitor = SettlementMonitor::new(self.api.clone())
            .with_policy(MonitorPolicy::from(&self.monitor_config));
        if let Some(flag) = &self.cancel {
            monitor = monitor.with_cancellation(flag.clone());
        }

        Ok(SwapClient {
            source_chain: chain.name.clone(),
            quotes: QuoteClient::new(self.api.clone(), self.registry.clone()),
            orders: OrderSubmitter::new(self.api.clone()),
            monitor,
            credential,
            max_wait: self.monitor_config.max_wait(),
            poll_interval: self.monitor_config.poll_interval(),
        })
    }
}

pub struct SwapClient {
    source_chain: String,
    quotes: QuoteClient,
    orders: OrderSubmitter,
    monitor: SettlementMonitor,
    credential: Option<Credential>,
    max_wait: Duration,
    poll_interval: Duration,
}

impl SwapClient {
    pub fn source_chain(&self) -> &str {
        &self.source_chain
    }

    pub fn is_read_only(&self) -> bool {
        self.credential.is_none()
    }

    pub async fn quote(&self, intent: &SwapIntent) -> SwapResult<Quote> {
        intent.validate()?;
        self.ensure_source_chain(intent)?;
        self.quotes.get_quote(intent).await
    }

    /// Run the whole pipeline for `intent`
    pub async fn execute(&self, intent: &SwapIntent) -> SwapOutcome {
        if let Err(e) = intent
            .validate()
            .and_then(|_| self.ensure_source_chain(intent))
        {
            return SwapOutcome::failed_before_order(STATUS_INVALID_INTENT, &e);
        }

        let quote = match self.quotes.get_quote(intent).await {
            Ok(quote) => quote,
            Err(e) => {
                error!("Swap aborted, no quote: {}", e);
                return SwapOutcome::failed_before_order(STATUS_QUOTE_FAILED, &e);
            }
        };

        let secrets = match quote
            .preset()
            .and_then(|preset| generate_secrets(preset.secrets_count))
        {
            Ok(secrets) => secrets,
            Err(e) => return SwapOutcome::failed_before_order(STATUS_SUBMISSION_FAILED, &e),
        };

        let order_hash = match self
            .orders
            .submit_order(
                &quote,
                &secrets,
                &intent.wallet_address,
                self.credential.as_ref(),
            )
            .await
        {
            Ok(order_hash) => order_hash,
            Err(e) => {
                if e.should_alert() {
                    error!("Swap aborted before placement: {}", e);
                }
                return SwapOutcome::failed_before_order(STATUS_SUBMISSION_FAILED, &e);
            }
        };

        let outcome = self
            .monitor
            .monitor(&order_hash, secrets, self.max_wait, self.poll_interval)
            .await;

        info!(
            "Swap {} -> {} finished: order {} {}",
            quote.source_chain, quote.destination_chain, outcome.order_hash, outcome.state
        );

        SwapOutcome {
            success: outcome.executed,
            order_hash: Some(outcome.order_hash),
            status: outcome.state.as_str().to_string(),
            error: outcome.error,
        }
    }

    fn ensure_source_chain(&self, intent: &SwapIntent) -> SwapResult<()> {
        if !intent.source_chain.eq_ignore_ascii_case(&self.source_chain) {
            return Err(SwapError::Configuration(format!(
                "client is bound to {}, intent starts on {}",
                self.source_chain, intent.source_chain
            )));
        }
        Ok(())
    }
}

/// Synchronous entry point: one fresh client per call
#[derive(Clone)]
pub struct SwapOrchestrator {
    factory: SwapClientFactory,
}

impl SwapOrchestrator {
    pub fn new(factory: SwapClientFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &SwapClientFactory {
        &self.factory
    }

    pub async fn quote(&self, intent: &SwapIntent) -> SwapResult<Quote> {
        self.factory
            .make_client(&intent.source_chain, None)?
            .quote(intent)
            .await
    }

    /// Live status lookup, safe to repeat at any time
    pub async fn order_status(&self, order_hash: &str) -> SwapResult<OrderStatusResponse> {
        self.factory.api.get_order_status(order_hash).await
    }

    pub async fn execute(&self, intent: &SwapIntent, credential: Option<Credential>) -> SwapOutcome {
        match self.factory.make_client(&intent.source_chain, credential) {
            Ok(client) => client.execute(intent).await,
            Err(e) => SwapOutcome::failed_before_order(STATUS_INVALID_INTENT, &e),
        }
    }
}
