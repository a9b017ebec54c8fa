//! Core swap data model: intents, quotes, orders and outcomes

use crate::error::{SwapError, SwapResult};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A caller's request to swap tokens across chains. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapIntent {
    pub source_chain: String,
    pub destination_chain: String,
    pub source_token: String,
    pub destination_token: String,
    /// Base-unit integer amount
    pub amount: String,
    pub wallet_address: String,
}

impl SwapIntent {
    /// Reject intents that can never be quoted
    pub fn validate(&self) -> SwapResult<()> {
        if !is_base_units(&self.amount) {
            return Err(SwapError::Configuration(format!(
                "amount must be a base-unit integer string, got {:?}",
                self.amount
            )));
        }
        if self.amount.bytes().all(|b| b == b'0') {
            return Err(SwapError::Configuration("amount must be non-zero".to_string()));
        }
        if self.wallet_address.is_empty() {
            return Err(SwapError::Configuration("wallet address is required".to_string()));
        }
        Ok(())
    }
}

/// Named execution profile returned with a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub auction_duration_secs: u64,
    /// Number of independent partial-fill secrets
    pub secrets_count: usize,
}

/// A priced quote for a swap intent. Ephemeral: re-derive before every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub quote_id: Option<String>,
    pub source_chain: String,
    pub destination_chain: String,
    pub source_network_id: u64,
    pub destination_network_id: u64,
    pub source_amount: String,
    pub destination_amount: String,
    pub recommended_preset: String,
    pub presets: HashMap<String, Preset>,
}

impl Quote {
    /// The recommended preset
    pub fn preset(&self) -> SwapResult<&Preset> {
        self.presets.get(&self.recommended_preset).ok_or_else(|| {
            SwapError::QuoteUnavailable(format!(
                "recommended preset {:?} missing from quote",
                self.recommended_preset
            ))
        })
    }
}

/// Order status as reported by the auction network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Executed,
    Expired,
    Refunded,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// No fill can complete once the order reached one of these
    pub fn is_dead(&self) -> bool {
        matches!(
            self,
            OrderStatus::Expired | OrderStatus::Refunded | OrderStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PartiallyFilled => "partially-filled",
            OrderStatus::Executed => "executed",
            OrderStatus::Expired => "expired",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolver's claim on part of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub index: usize,
    pub secret_submitted: bool,
}

/// Local view of an order owned by the auction network
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_hash: String,
    pub status: OrderStatus,
    /// Fills in discovery order
    pub fills: Vec<Fill>,
}

impl Order {
    pub fn new(order_hash: impl Into<String>) -> Self {
        Self {
            order_hash: order_hash.into(),
            status: OrderStatus::Pending,
            fills: Vec::new(),
        }
    }

    /// Record a fill the first time it is seen
    pub fn observe_fill(&mut self, index: usize) -> &Fill {
        let pos = match self.fills.iter().position(|f| f.index == index) {
            Some(pos) => pos,
            None => {
                self.fills.push(Fill {
                    index,
                    secret_submitted: false,
                });
                self.fills.len() - 1
            }
        };
        &self.fills[pos]
    }

    pub fn is_secret_submitted(&self, index: usize) -> bool {
        self.fills
            .iter()
            .any(|f| f.index == index && f.secret_submitted)
    }

    /// Mark a fill's secret as disclosed. Never reverts.
    pub fn mark_secret_submitted(&mut self, index: usize) {
        self.observe_fill(index);
        if let Some(fill) = self.fills.iter_mut().find(|f| f.index == index) {
            fill.secret_submitted = true;
        }
    }

    pub fn submitted_count(&self) -> usize {
        self.fills.iter().filter(|f| f.secret_submitted).count()
    }
}

/// Structured result returned to the calling CLI/API layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOutcome {
    pub success: bool,
    pub order_hash: Option<String>,
    /// Terminal status name
    pub status: String,
    pub error: Option<String>,
}

impl SwapOutcome {
    pub fn failed_before_order(status: &str, error: &SwapError) -> Self {
        Self {
            success: false,
            order_hash: None,
            status: status.to_string(),
            error: Some(error.to_string()),
        }
    }
}

/// Decimal digits only, no sign, no separators
pub fn is_base_units(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
