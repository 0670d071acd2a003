//! The agent session state machine.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use paygate_econ::PricingEngine;
use paygate_types::{
    Amount, EventBus, ExhaustionReason, GatewayEvent, PaymentIntent, PricingTier, SharedClock,
    SystemClock, UNLIMITED_CALLS,
};
use rand::RngCore;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::rate_limit::RateLimiter;
use crate::state::{SessionState, UsageSummary};
use crate::status::SessionStatus;

/// Generate a random session id (`sess_` + 32 hex chars).
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("sess_{}", hex::encode(bytes))
}

/// A metered relationship between one buyer and one seller.
///
/// Calls go through a two-step protocol: [`pre_call`](Self::pre_call)
/// validates and prices the call without charging, the wrapped operation
/// runs, then [`post_call`](Self::post_call) charges the returned cost.
/// Callers must not interleave several pre/post pairs on one session.
pub struct AgentSession {
    state: SessionState,
    config: SessionConfig,
    pricing: Option<Arc<PricingEngine>>,
    events: EventBus,
    clock: SharedClock,
    exhaustion: Option<ExhaustionReason>,
    warning_emitted: bool,
    summary: Option<UsageSummary>,
}

impl AgentSession {
    /// Create a pending session on the system clock.
    pub fn new(intent: &PaymentIntent, tier: PricingTier, config: SessionConfig) -> Self {
        Self::with_clock(intent, tier, config, SystemClock::shared())
    }

    /// Create a pending session reading time from `clock`.
    pub fn with_clock(
        intent: &PaymentIntent,
        tier: PricingTier,
        config: SessionConfig,
        clock: SharedClock,
    ) -> Self {
        let now = clock.now_ms();
        let max_per_window = config.rate_max_per_window.unwrap_or(tier.rate_limit);
        let calls_remaining = if tier.is_unlimited() {
            UNLIMITED_CALLS
        } else {
            tier.max_calls_per_session
        };

        let state = SessionState {
            id: generate_session_id(),
            status: SessionStatus::Pending,
            buyer: intent.buyer.clone(),
            seller: intent.seller.clone(),
            tier,
            intent_nonce: intent.nonce.clone(),
            budget_remaining: intent.max_budget,
            budget_total: intent.max_budget,
            calls_made: 0,
            calls_remaining,
            method_counts: BTreeMap::new(),
            rate_limiter: RateLimiter::new(config.rate_window_ms, max_per_window),
            metadata: HashMap::new(),
            created_at: now,
            last_activity_at: now,
            ttl: config.ttl_secs,
        };

        Self {
            state,
            config,
            pricing: None,
            events: EventBus::new(),
            clock,
            exhaustion: None,
            warning_emitted: false,
            summary: None,
        }
    }

    /// Price calls through a shared pricing engine.
    pub fn with_pricing(mut self, pricing: Arc<PricingEngine>) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// Publish events on `events` instead of a private bus.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn is_terminal(&self) -> bool {
        self.state.status.is_terminal()
    }

    pub fn tier(&self) -> &PricingTier {
        &self.state.tier
    }

    pub fn budget_remaining(&self) -> Amount {
        self.state.budget_remaining
    }

    pub fn budget_used(&self) -> Amount {
        self.state.budget_used()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Event bus this session publishes on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Read-only copy of the full state.
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    /// Attach host metadata.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.state.metadata.insert(key.into(), value);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Move `pending -> active` once payment has been verified.
    pub fn activate(&mut self) -> SessionResult<()> {
        if self.state.status != SessionStatus::Pending {
            return Err(self.invalid_state("activate"));
        }
        self.transition(SessionStatus::Active);
        self.events.emit(GatewayEvent::SessionActivated {
            session_id: self.state.id.clone(),
        });
        Ok(())
    }

    /// Suspend an active session. No-op in any other state.
    pub fn pause(&mut self) {
        if self.state.status == SessionStatus::Active {
            self.transition(SessionStatus::Paused);
            self.events.emit(GatewayEvent::SessionPaused {
                session_id: self.state.id.clone(),
            });
        }
    }

    /// Resume a paused session. No-op in any other state.
    pub fn resume(&mut self) {
        if self.state.status == SessionStatus::Paused {
            self.transition(SessionStatus::Active);
            self.events.emit(GatewayEvent::SessionResumed {
                session_id: self.state.id.clone(),
            });
        }
    }

    /// Finalize the session and summarize usage.
    ///
    /// Allowed from every state. Calling it again returns the first summary
    /// unchanged and emits nothing.
    pub fn settle(&mut self) -> UsageSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        self.transition(SessionStatus::Settled);
        let summary = UsageSummary {
            session_id: self.state.id.clone(),
            amount_charged: self.state.budget_used(),
            call_count: self.state.calls_made,
            method_counts: self.state.method_counts.clone(),
            settled_at: self.clock.now_ms(),
        };
        self.events.emit(GatewayEvent::SessionSettled {
            session_id: summary.session_id.clone(),
            amount_charged: summary.amount_charged,
            call_count: summary.call_count,
        });
        self.summary = Some(summary.clone());
        summary
    }

    // =========================================================================
    // Metering
    // =========================================================================

    /// Price of the next call to `method`.
    pub fn cost_for(&self, method: &str) -> Amount {
        match &self.pricing {
            Some(pricing) => {
                let tier = pricing
                    .get_tier(&self.state.tier.id, Some(method))
                    .unwrap_or_else(|| self.state.tier.clone());
                pricing.compute_call_price(&tier)
            }
            None => self.state.tier.price_per_call,
        }
    }

    /// Validate a call before running it and return its cost.
    ///
    /// Checks run in order: status, TTL, rate limit, call allowance, budget.
    /// Nothing is charged here; failures that end the session move it to its
    /// terminal state.
    pub fn pre_call(&mut self, method: &str) -> SessionResult<Amount> {
        if self.state.status != SessionStatus::Active {
            return Err(self.terminal_error(method));
        }

        let now = self.clock.now_ms();

        if self.state.ttl > 0
            && now.saturating_sub(self.state.created_at) >= self.state.ttl.saturating_mul(1_000)
        {
            self.transition(SessionStatus::Expired);
            self.events.emit(GatewayEvent::SessionExpired {
                session_id: self.state.id.clone(),
            });
            return Err(SessionError::Expired {
                session_id: self.state.id.clone(),
            });
        }

        if let Err(retry_after_ms) = self.state.rate_limiter.check(now) {
            debug!(session_id = %self.state.id, method, retry_after_ms, "Rate limit hit");
            self.events.emit(GatewayEvent::RateLimitExceeded {
                session_id: self.state.id.clone(),
                retry_after_ms,
            });
            return Err(SessionError::RateLimited {
                session_id: self.state.id.clone(),
                retry_after_ms,
            });
        }

        if self.state.calls_remaining != UNLIMITED_CALLS && self.state.calls_remaining <= 0 {
            self.exhaust(ExhaustionReason::Calls, 0);
            return Err(SessionError::CallLimitExceeded {
                session_id: self.state.id.clone(),
            });
        }

        let cost = self.cost_for(method);
        if self.state.budget_remaining < cost {
            self.exhaust(ExhaustionReason::Budget, cost);
            return Err(SessionError::BudgetExhausted {
                session_id: self.state.id.clone(),
                required: cost,
                remaining: self.state.budget_remaining,
            });
        }

        Ok(cost)
    }

    /// Charge a completed call.
    ///
    /// `cost` is the value returned by the matching [`pre_call`](Self::pre_call).
    pub fn post_call(&mut self, method: &str, cost: Amount) -> SessionResult<()> {
        if self.state.status.is_terminal() {
            return Err(self.invalid_state("charge"));
        }
        if cost > self.state.budget_remaining {
            return Err(SessionError::BudgetExhausted {
                session_id: self.state.id.clone(),
                required: cost,
                remaining: self.state.budget_remaining,
            });
        }

        let now = self.clock.now_ms();
        self.state.budget_remaining -= cost;
        self.state.calls_made += 1;
        *self.state.method_counts.entry(method.to_string()).or_insert(0) += 1;
        if self.state.calls_remaining != UNLIMITED_CALLS {
            self.state.calls_remaining = (self.state.calls_remaining - 1).max(0);
        }
        self.state.rate_limiter.record(now);
        self.state.last_activity_at = now;

        debug!(
            session_id = %self.state.id,
            method,
            cost,
            remaining = self.state.budget_remaining,
            "Call charged"
        );

        let remaining = self.state.budget_remaining;
        let total = self.state.budget_total;
        if remaining == 0 {
            self.exhaust(ExhaustionReason::Budget, cost);
        } else if !self.warning_emitted
            && total > 0
            && (remaining as f64) <= (total as f64) * self.config.budget_warning_fraction
        {
            self.warning_emitted = true;
            self.events.emit(GatewayEvent::BudgetWarning {
                session_id: self.state.id.clone(),
                budget_remaining: remaining,
                budget_total: total,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn transition(&mut self, to: SessionStatus) {
        let from = self.state.status;
        if from != to {
            self.state.status = to;
            info!(session_id = %self.state.id, %from, %to, "Session status changed");
        }
    }

    fn exhaust(&mut self, reason: ExhaustionReason, required: Amount) {
        self.transition(SessionStatus::Exhausted);
        self.exhaustion = Some(reason);
        if reason == ExhaustionReason::Budget {
            self.events.emit(GatewayEvent::BudgetExhausted {
                session_id: self.state.id.clone(),
                budget_remaining: self.state.budget_remaining,
                required,
            });
        }
        self.events.emit(GatewayEvent::SessionExhausted {
            session_id: self.state.id.clone(),
            reason,
        });
    }

    fn invalid_state(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            session_id: self.state.id.clone(),
            status: self.state.status,
            operation,
        }
    }

    /// Error for a call attempted outside the active state.
    ///
    /// Expired and exhausted sessions report their cause so repeated calls
    /// keep seeing the same error as the call that ended the session.
    fn terminal_error(&self, method: &str) -> SessionError {
        let session_id = self.state.id.clone();
        match (self.state.status, self.exhaustion) {
            (SessionStatus::Expired, _) => SessionError::Expired { session_id },
            (SessionStatus::Exhausted, Some(ExhaustionReason::Calls)) => {
                SessionError::CallLimitExceeded { session_id }
            }
            (SessionStatus::Exhausted, _) => SessionError::BudgetExhausted {
                session_id,
                required: self.cost_for(method),
                remaining: self.state.budget_remaining,
            },
            _ => self.invalid_state("call"),
        }
    }
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("id", &self.state.id)
            .field("status", &self.state.status)
            .field("budget_remaining", &self.state.budget_remaining)
            .field("calls_made", &self.state.calls_made)
            .finish_non_exhaustive()
    }
}
