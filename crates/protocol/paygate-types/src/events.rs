//! Typed gateway events and a synchronous event bus.
//!
//! Sessions, the paywall and the gateway publish [`GatewayEvent`]s on a shared
//! [`EventBus`]. Delivery is synchronous and fire-and-forget: a handler that
//! panics is logged and skipped, the emitting operation carries on.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Amount;

// =============================================================================
// Events
// =============================================================================

/// Why a session became exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionReason {
    /// Budget fell below the next call's cost.
    Budget,
    /// Call allowance used up.
    Calls,
}

/// An event published by the gateway core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GatewayEvent {
    #[serde(rename = "session:activated", rename_all = "camelCase")]
    SessionActivated { session_id: String },

    #[serde(rename = "session:paused", rename_all = "camelCase")]
    SessionPaused { session_id: String },

    #[serde(rename = "session:resumed", rename_all = "camelCase")]
    SessionResumed { session_id: String },

    #[serde(rename = "session:expired", rename_all = "camelCase")]
    SessionExpired { session_id: String },

    #[serde(rename = "session:exhausted", rename_all = "camelCase")]
    SessionExhausted {
        session_id: String,
        reason: ExhaustionReason,
    },

    #[serde(rename = "session:settled", rename_all = "camelCase")]
    SessionSettled {
        session_id: String,
        amount_charged: Amount,
        call_count: u64,
    },

    /// Remaining budget dropped to the warning fraction.
    #[serde(rename = "budget:warning", rename_all = "camelCase")]
    BudgetWarning {
        session_id: String,
        budget_remaining: Amount,
        budget_total: Amount,
    },

    #[serde(rename = "budget:exhausted", rename_all = "camelCase")]
    BudgetExhausted {
        session_id: String,
        budget_remaining: Amount,
        required: Amount,
    },

    #[serde(rename = "ratelimit:exceeded", rename_all = "camelCase")]
    RateLimitExceeded {
        session_id: String,
        retry_after_ms: u64,
    },

    /// The paywall answered a request with 402.
    #[serde(rename = "x402:payment-required", rename_all = "camelCase")]
    PaymentRequired {
        method: String,
        resource: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl GatewayEvent {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SessionActivated { .. } => EventKind::SessionActivated,
            Self::SessionPaused { .. } => EventKind::SessionPaused,
            Self::SessionResumed { .. } => EventKind::SessionResumed,
            Self::SessionExpired { .. } => EventKind::SessionExpired,
            Self::SessionExhausted { .. } => EventKind::SessionExhausted,
            Self::SessionSettled { .. } => EventKind::SessionSettled,
            Self::BudgetWarning { .. } => EventKind::BudgetWarning,
            Self::BudgetExhausted { .. } => EventKind::BudgetExhausted,
            Self::RateLimitExceeded { .. } => EventKind::RateLimitExceeded,
            Self::PaymentRequired { .. } => EventKind::PaymentRequired,
        }
    }

    /// Session the event belongs to, if any.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::SessionActivated { session_id }
            | Self::SessionPaused { session_id }
            | Self::SessionResumed { session_id }
            | Self::SessionExpired { session_id }
            | Self::SessionExhausted { session_id, .. }
            | Self::SessionSettled { session_id, .. }
            | Self::BudgetWarning { session_id, .. }
            | Self::BudgetExhausted { session_id, .. }
            | Self::RateLimitExceeded { session_id, .. } => Some(session_id),
            Self::PaymentRequired { .. } => None,
        }
    }
}

/// Event discriminant used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionActivated,
    SessionPaused,
    SessionResumed,
    SessionExpired,
    SessionExhausted,
    SessionSettled,
    BudgetWarning,
    BudgetExhausted,
    RateLimitExceeded,
    PaymentRequired,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [EventKind; 10] = [
        Self::SessionActivated,
        Self::SessionPaused,
        Self::SessionResumed,
        Self::SessionExpired,
        Self::SessionExhausted,
        Self::SessionSettled,
        Self::BudgetWarning,
        Self::BudgetExhausted,
        Self::RateLimitExceeded,
        Self::PaymentRequired,
    ];

    /// Wire name, e.g. `session:activated`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionActivated => "session:activated",
            Self::SessionPaused => "session:paused",
            Self::SessionResumed => "session:resumed",
            Self::SessionExpired => "session:expired",
            Self::SessionExhausted => "session:exhausted",
            Self::SessionSettled => "session:settled",
            Self::BudgetWarning => "budget:warning",
            Self::BudgetExhausted => "budget:exhausted",
            Self::RateLimitExceeded => "ratelimit:exceeded",
            Self::PaymentRequired => "x402:payment-required",
        }
    }

    /// Parse a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Event Bus
// =============================================================================

/// Subscriber callback.
pub type EventHandler = Arc<dyn Fn(&GatewayEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    /// `None` subscribes to every kind.
    filter: Option<EventKind>,
    handler: EventHandler,
}

/// Synchronous publish/subscribe hub.
///
/// Cloning is cheap and clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscriptions: RwLock<HashMap<u64, Subscription>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.insert(Some(kind), Arc::new(handler))
    }

    /// Register a handler for every event.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.insert(None, Arc::new(handler))
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.inner.subscriptions.write() {
            Ok(mut subs) => subs.remove(&id.0).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(&id.0).is_some(),
        }
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        match self.inner.subscriptions.read() {
            Ok(subs) => subs.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Deliver an event to every matching handler.
    ///
    /// Handlers run in subscription order on the caller's thread. The
    /// subscriber list is snapshotted first, so handlers may subscribe or
    /// unsubscribe without deadlocking.
    pub fn emit(&self, event: GatewayEvent) {
        let kind = event.kind();
        let handlers: Vec<(u64, EventHandler)> = {
            let subs = match self.inner.subscriptions.read() {
                Ok(subs) => subs,
                Err(poisoned) => poisoned.into_inner(),
            };
            let mut matching: Vec<(u64, EventHandler)> = subs
                .iter()
                .filter(|(_, s)| s.filter.map_or(true, |f| f == kind))
                .map(|(id, s)| (*id, Arc::clone(&s.handler)))
                .collect();
            matching.sort_by_key(|(id, _)| *id);
            matching
        };

        for (id, handler) in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                warn!(event = %kind, subscription = id, "Event handler panicked");
            }
        }
    }

    fn insert(&self, filter: Option<EventKind>, handler: EventHandler) -> SubscriptionId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let sub = Subscription { filter, handler };
        match self.inner.subscriptions.write() {
            Ok(mut subs) => subs.insert(id, sub),
            Err(poisoned) => poisoned.into_inner().insert(id, sub),
        };
        SubscriptionId(id)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
