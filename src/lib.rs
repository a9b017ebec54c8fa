//! Fusion swap relayer - cross-chain swap orchestration over a Fusion+ style
//! intents network
//!
//! Quotes a swap, commits to per-fill secrets behind a hashlock, places the
//! order and releases each secret as resolvers fill the order.

pub mod api;
pub mod chain;
pub mod config;
pub mod error;
pub mod fusion;
pub mod metrics;
pub mod monitor;
pub mod order;
pub mod quote;
pub mod secrets;
pub mod swap;
pub mod types;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{SwapError, SwapResult};
pub use swap::{SwapClient, SwapClientFactory, SwapOrchestrator};
pub use types::{SwapIntent, SwapOutcome};
