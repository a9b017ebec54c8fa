//! Error types for the Fusion swap relayer

use thiserror::Error;

/// Main error type for swap orchestration
#[derive(Error, Debug)]
pub enum SwapError {
    /// Caller-supplied invariant violated (bad secret count, mismatched preset)
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported chain: {chain}")]
    UnsupportedChain { chain: String },

    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Order submission failed: {0}")]
    Submission(String),

    /// Upstream auction network call failed
    #[error("Fusion API error during {operation}: {message}")]
    Api { operation: String, message: String },

    #[error("Chain connection error for chain {chain}: {message}")]
    ChainConnection { chain: String, message: String },

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SwapError {
    pub fn api(operation: &str, message: impl Into<String>) -> Self {
        SwapError::Api {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Check if error is transient (the next poll may succeed)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SwapError::Api { .. } | SwapError::ChainConnection { .. } | SwapError::Timeout { .. }
        )
    }

    /// Check if error should trigger an alert
    pub fn should_alert(&self) -> bool {
        matches!(
            self,
            SwapError::Authentication(_) | SwapError::Submission(_)
        )
    }

    /// Upstream detail without the variant prefix
    pub fn upstream_message(&self) -> String {
        match self {
            SwapError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type for swap operations
pub type SwapResult<T> = Result<T, SwapError>;
