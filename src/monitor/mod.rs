//! Settlement monitor: drives a placed order to a terminal state
//!
//! Single cooperative loop per order:
//! 1. Query the order status; `executed` ends monitoring successfully
//! 2. Query fills that are ready to accept a secret
//! 3. Disclose the secret of every ready fill not yet disclosed locally
//! 4. Sleep for the poll interval
//!
//! The loop stops at the deadline, on cancellation, or when the network
//! reports the order dead (expired, refunded, cancelled). Local fill
//! bookkeeping is the only guard against double disclosure; the remote fill
//! list may lag behind submitted secrets.

pub mod clock;

pub use clock::{Clock, TokioClock};

use crate::config::MonitorConfig;
use crate::error::SwapResult;
use crate::fusion::FusionApi;
use crate::secrets::SecretSet;
use crate::types::{Order, OrderStatus};

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Monitoring state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Submitted,
    Polling,
    Filling,
    Executed,
    TimedOut,
    /// Network reported the order expired, refunded or cancelled
    Expired,
    Cancelled,
    /// Query failed and the transient-error policy is off
    Failed,
}

impl MonitorState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            MonitorState::Submitted | MonitorState::Polling | MonitorState::Filling
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorState::Submitted => "submitted",
            MonitorState::Polling => "polling",
            MonitorState::Filling => "filling",
            MonitorState::Executed => "executed",
            MonitorState::TimedOut => "timed_out",
            MonitorState::Expired => "expired",
            MonitorState::Cancelled => "cancelled",
            MonitorState::Failed => "failed",
        }
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error handling policy for the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorPolicy {
    /// A failed status/fill query means "no new information this tick"
    pub continue_on_transient_query_error: bool,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            continue_on_transient_query_error: true,
        }
    }
}

impl From<&MonitorConfig> for MonitorPolicy {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            continue_on_transient_query_error: config.continue_on_transient_query_error,
        }
    }
}

/// Result of one monitoring session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorOutcome {
    pub executed: bool,
    pub order_hash: String,
    pub state: MonitorState,
    pub error: Option<String>,
    pub polls: u32,
    pub secrets_submitted: usize,
    pub order: Order,
}

enum Tick {
    Executed,
    Dead(OrderStatus),
    Pending,
}

/// Mutable state of one monitoring session
struct Session {
    order: Order,
    state: MonitorState,
    polls: u32,
}

impl Session {
    fn transition(&mut self, next: MonitorState) {
        if self.state != next {
            debug!(
                "Order {} monitor {} -> {}",
                self.order.order_hash, self.state, next
            );
            self.state = next;
        }
    }

    fn finish(mut self, state: MonitorState, error: Option<String>) -> MonitorOutcome {
        self.transition(state);
        MonitorOutcome {
            executed: state == MonitorState::Executed,
            order_hash: self.order.order_hash.clone(),
            state,
            error,
            polls: self.polls,
            secrets_submitted: self.order.submitted_count(),
            order: self.order,
        }
    }
}

pub struct SettlementMonitor {
    api: Arc<dyn FusionApi>,
    clock: Arc<dyn Clock>,
    policy: MonitorPolicy,
    cancel: Option<Arc<RwLock<bool>>>,
}

impl SettlementMonitor {
    pub fn new(api: Arc<dyn FusionApi>) -> Self {
        Self {
            api,
            clock: Arc::new(TokioClock),
            policy: MonitorPolicy::default(),
            cancel: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: MonitorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop at the next iteration once the flag is set
    pub fn with_cancellation(mut self, flag: Arc<RwLock<bool>>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Poll `order_hash` until it executes, dies, is cancelled or `max_wait` elapses.
    ///
    /// Takes ownership of the secrets; they are wiped when this returns.
    pub async fn monitor(
        &self,
        order_hash: &str,
        secrets: SecretSet,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> MonitorOutcome {
        let started = self.clock.now();
        // None: the wait outlasts the clock's range, only execution or cancellation ends it
        let deadline = started.checked_add(max_wait);
        let mut session = Session {
            order: Order::new(order_hash),
            state: MonitorState::Submitted,
            polls: 0,
        };

        info!(
            "Monitoring order {} ({} secret(s), max wait {:?}, poll every {:?})",
            order_hash,
            secrets.len(),
            max_wait,
            poll_interval
        );

        let outcome = loop {
            if self.is_cancelled().await {
                break session.finish(
                    MonitorState::Cancelled,
                    Some("monitoring cancelled".to_string()),
                );
            }
            if deadline.is_some_and(|deadline| self.clock.now() >= deadline) {
                break session.finish(MonitorState::TimedOut, Some("timed out".to_string()));
            }

            session.polls += 1;
            match self.tick(order_hash, &mut session, &secrets).await {
                Ok(Tick::Executed) => break session.finish(MonitorState::Executed, None),
                Ok(Tick::Dead(status)) => {
                    break session.finish(MonitorState::Expired, Some(format!("order {}", status)))
                }
                Ok(Tick::Pending) => {}
                Err(e) => {
                    crate::metrics::record_query_error(&e);
                    if self.policy.continue_on_transient_query_error && e.is_transient() {
                        warn!(
                            "Poll {} for order {} failed, continuing: {}",
                            session.polls, order_hash, e
                        );
                    } else {
                        error!("Monitoring order {} aborted: {}", order_hash, e);
                        break session.finish(MonitorState::Failed, Some(e.to_string()));
                    }
                }
            }

            self.clock.sleep(poll_interval).await;
        };

        drop(secrets);

        let elapsed = self.clock.now() - started;
        crate::metrics::record_monitor_outcome(outcome.state, elapsed.as_secs_f64());
        match outcome.state {
            MonitorState::Executed => info!(
                "Order {} executed after {} poll(s), {} secret(s) disclosed",
                order_hash, outcome.polls, outcome.secrets_submitted
            ),
            state => warn!(
                "Order {} monitoring ended {} after {} poll(s); status can be re-checked later",
                order_hash, state, outcome.polls
            ),
        }

        outcome
    }

    async fn is_cancelled(&self) -> bool {
        match &self.cancel {
            Some(flag) => *flag.read().await,
            None => false,
        }
    }

    /// One poll: status, ready fills, secret disclosure
    async fn tick(
        &self,
        order_hash: &str,
        session: &mut Session,
        secrets: &SecretSet,
    ) -> SwapResult<Tick> {
        let status = self.api.get_order_status(order_hash).await?;
        session.order.status = status.status;

        if status.status == OrderStatus::Executed {
            return Ok(Tick::Executed);
        }
        if status.status.is_dead() {
            return Ok(Tick::Dead(status.status));
        }
        if session.state == MonitorState::Submitted {
            session.transition(MonitorState::Polling);
        }

        let ready = self.api.get_ready_to_accept_secret_fills(order_hash).await?;
        debug!(
            "Order {} status {}, {} fill(s) ready",
            order_hash,
            status.status,
            ready.len()
        );

        for fill in ready {
            self.release_secret(order_hash, session, secrets, fill.idx)
                .await;
        }

        Ok(Tick::Pending)
    }

    /// Disclose the secret for one ready fill, at most once
    async fn release_secret(
        &self,
        order_hash: &str,
        session: &mut Session,
        secrets: &SecretSet,
        index: usize,
    ) {
        if session.order.is_secret_submitted(index) {
            debug!("Secret for fill {} of {} already disclosed", index, order_hash);
            return;
        }

        let Some(entry) = secrets.get(index) else {
            warn!(
                "Order {} reported fill index {} outside its {} secret(s), skipping",
                order_hash,
                index,
                secrets.len()
            );
            return;
        };

        session.order.observe_fill(index);
        session.transition(MonitorState::Filling);

        let secret = entry.reveal();
        match self.api.submit_secret(order_hash, &secret).await {
            Ok(()) => {
                session.order.mark_secret_submitted(index);
                crate::metrics::record_secret_submitted();
                info!("Secret submitted for fill {} of order {}", index, order_hash);
            }
            Err(e) => {
                crate::metrics::record_secret_failed();
                warn!(
                    "Secret submission for fill {} of order {} failed, will retry next poll: {}",
                    index,
                    order_hash,
                    e.upstream_message()
                );
            }
        }
    }
}
