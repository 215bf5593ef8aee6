//! Scan Event Bus implementation.
//!
//! Holds the current scan value, the feedback flag, and the table of
//! lifecycle-gated subscribers.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{PublishOutcome, ScanEvent};
use crate::data::ScanValue;

/// Subscription handle for toggling or removing a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Type alias for scan handler functions
type ScanHandler = Arc<dyn Fn(ScanEvent) + Send + Sync>;

/// Configuration for the scan bus
#[derive(Debug, Clone)]
pub struct ScanEventBusConfig {
    /// Capacity of the broadcast tap returned by [`ScanEventBus::receiver`].
    pub channel_capacity: usize,
    /// Hold values published while no subscriber is active.
    pub retain_when_inactive: bool,
}

impl Default for ScanEventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            retain_when_inactive: true,
        }
    }
}

struct Subscriber {
    handler: ScanHandler,
    active: bool,
}

#[derive(Default)]
struct HeldValue {
    current: Option<ScanEvent>,
    /// Current value has not reached any subscriber yet.
    pending: bool,
    feedback_issued: bool,
}

/// Single-value publish/subscribe channel for scan results
///
/// Lock order is `state` then `handlers`. Handlers run after both locks are
/// released, so they may call back into the bus.
pub struct ScanEventBus {
    /// Broadcast tap for diagnostics
    sender: broadcast::Sender<ScanEvent>,
    /// Registered handlers and their activity flag
    handlers: RwLock<HashMap<SubscriptionId, Subscriber>>,
    /// Held value and flags
    state: Mutex<HeldValue>,
    /// Configuration
    config: ScanEventBusConfig,
}

impl ScanEventBus {
    /// Create a new scan bus with default configuration
    pub fn new() -> Self {
        Self::with_config(ScanEventBusConfig::default())
    }

    /// Create a new scan bus with custom configuration
    pub fn with_config(config: ScanEventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
            state: Mutex::new(HeldValue::default()),
            config,
        }
    }

    /// Publish a scan value
    ///
    /// A value equal to the one already held is dropped. Otherwise it
    /// replaces the held value, resets the feedback flag, and is handed to
    /// every active subscriber exactly once.
    pub fn publish(&self, value: ScanValue) -> PublishOutcome {
        let (event, targets) = {
            let mut state = self.state.lock();
            if state
                .current
                .as_ref()
                .is_some_and(|held| held.value == value)
            {
                tracing::debug!("Duplicate scan '{}' ignored", value);
                return PublishOutcome::Duplicate;
            }

            let event = ScanEvent::new(value);
            let targets = self.active_handlers();
            state.current = Some(event.clone());
            state.feedback_issued = false;
            state.pending = targets.is_empty() && self.config.retain_when_inactive;
            (event, targets)
        };

        // A lagging or absent tap is not an error for the bus.
        let _ = self.sender.send(event.clone());

        if targets.is_empty() {
            tracing::debug!("Scan '{}' retained, no active subscriber", event.value);
            return PublishOutcome::Retained;
        }

        tracing::debug!(
            "Scan '{}' delivered to {} subscriber(s)",
            event.value,
            targets.len()
        );
        let count = targets.len();
        for handler in targets {
            handler(event.clone());
        }
        PublishOutcome::Delivered(count)
    }

    /// Forget the held value so the next publish is always delivered
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.current = None;
        state.pending = false;
        state.feedback_issued = false;
    }

    /// The held value, if any
    pub fn current(&self) -> Option<ScanEvent> {
        self.state.lock().current.clone()
    }

    /// Record that the confirmation cue has been played for the held value
    pub fn mark_feedback_issued(&self) {
        self.state.lock().feedback_issued = true;
    }

    /// Whether the confirmation cue has been played for the held value
    pub fn has_feedback_been_issued(&self) -> bool {
        self.state.lock().feedback_issued
    }

    /// Claim the right to play the cue for the held value
    ///
    /// Returns true exactly once per distinct value; the caller that gets
    /// true plays the cue.
    pub fn claim_feedback(&self) -> bool {
        let mut state = self.state.lock();
        if state.feedback_issued {
            false
        } else {
            state.feedback_issued = true;
            true
        }
    }

    /// Register an active subscriber
    ///
    /// If a value is being retained it is delivered to this subscriber
    /// before `subscribe` returns. The handler runs on the publishing
    /// thread and should return quickly.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(ScanEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let handler: ScanHandler = Arc::new(handler);
        let retained = {
            let mut state = self.state.lock();
            let mut handlers = self.handlers.write();
            handlers.insert(
                id,
                Subscriber {
                    handler: handler.clone(),
                    active: true,
                },
            );
            Self::take_pending(&mut state)
        };
        tracing::debug!("Subscription {} added", id);

        if let Some(event) = retained {
            tracing::debug!("Retained scan '{}' handed to {}", event.value, id);
            handler(event);
        }
        id
    }

    /// Register a subscriber that starts inactive
    pub fn subscribe_inactive<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(ScanEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers.write().insert(
            id,
            Subscriber {
                handler: Arc::new(handler),
                active: false,
            },
        );
        tracing::debug!("Subscription {} added (inactive)", id);
        id
    }

    /// Mark a subscriber active or inactive
    ///
    /// Activating delivers a retained value, if any. Returns false when the
    /// subscription is unknown.
    pub fn set_active(&self, id: SubscriptionId, active: bool) -> bool {
        let retained = {
            let mut state = self.state.lock();
            let mut handlers = self.handlers.write();
            let Some(subscriber) = handlers.get_mut(&id) else {
                return false;
            };
            let was_active = subscriber.active;
            subscriber.active = active;
            if active && !was_active {
                Self::take_pending(&mut state).map(|event| (event, subscriber.handler.clone()))
            } else {
                None
            }
        };
        tracing::debug!("Subscription {} active={}", id, active);

        if let Some((event, handler)) = retained {
            tracing::debug!("Retained scan '{}' handed to {}", event.value, id);
            handler(event);
        }
        true
    }

    /// Whether a subscription is registered and active
    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.handlers.read().get(&id).is_some_and(|s| s.active)
    }

    /// Get a receiver that sees every accepted value
    ///
    /// Independent of subscriber activity; meant for logging and tests.
    pub fn receiver(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    /// Remove a subscriber
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Get the number of registered subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Get the number of active subscriptions
    pub fn active_subscriber_count(&self) -> usize {
        self.handlers.read().values().filter(|s| s.active).count()
    }

    /// Get the current configuration
    pub fn config(&self) -> &ScanEventBusConfig {
        &self.config
    }

    fn active_handlers(&self) -> Vec<ScanHandler> {
        self.handlers
            .read()
            .values()
            .filter(|s| s.active)
            .map(|s| s.handler.clone())
            .collect()
    }

    fn take_pending(state: &mut HeldValue) -> Option<ScanEvent> {
        if state.pending {
            state.pending = false;
            state.current.clone()
        } else {
            None
        }
    }
}

impl Default for ScanEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScanEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEventBus")
            .field("subscribers", &self.subscriber_count())
            .field("active", &self.active_subscriber_count())
            .field("config", &self.config)
            .finish()
    }
}
