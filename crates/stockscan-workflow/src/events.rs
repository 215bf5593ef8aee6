//! Workflow events
//!
//! Provides:
//! - Event types for coordinator state changes and user-facing notices
//! - Event dispatcher broadcasting them to any number of listeners

use crate::state::{FieldId, Phase};
use stockscan_core::{LookupKey, LookupResult, ScanTarget};
use tokio::sync::broadcast;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Something the person holding the scanner should be told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
    /// A third-party lookup needs a credential that is not configured.
    CredentialRequired {
        /// Service the credential is for.
        service: String,
    },
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::Info(_) => NoticeLevel::Info,
            Notice::Success(_) => NoticeLevel::Success,
            Notice::Warning(_) | Notice::CredentialRequired { .. } => NoticeLevel::Warning,
            Notice::Error(_) => NoticeLevel::Error,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::Info(m) | Notice::Success(m) | Notice::Warning(m) | Notice::Error(m) => {
                m.clone()
            }
            Notice::CredentialRequired { service } => {
                format!("Enter an app code for the {} service", service)
            }
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Why a scan was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Arrived inside the processing guard window.
    Guarded,
    /// A submission is running.
    Busy,
}

/// Coordinator event types
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// Phase changed
    PhaseChanged {
        /// Previous phase.
        from: Phase,
        /// New phase.
        to: Phase,
    },
    /// Scan target changed
    TargetChanged(ScanTarget),
    /// A field's text changed; empty means cleared
    FieldChanged {
        /// The field.
        field: FieldId,
        /// Its new text.
        value: String,
    },
    /// An item is now shown
    ItemLoaded(LookupResult),
    /// The shown item was dropped
    ItemCleared,
    /// A scan was dropped without effect
    ScanIgnored {
        /// The scanned text.
        value: String,
        /// Why.
        reason: IgnoreReason,
    },
    /// A catalog lookup started
    LookupStarted(LookupKey),
    /// A submission started
    SubmitStarted(String),
    /// A submission succeeded
    Submitted(String),
    /// A submission failed
    SubmitFailed(String),
    /// Message for the user
    Notice(Notice),
}

impl std::fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowEvent::PhaseChanged { from, to } => write!(f, "Phase: {} -> {}", from, to),
            WorkflowEvent::TargetChanged(target) => write!(f, "Target: {}", target),
            WorkflowEvent::FieldChanged { field, value } if value.is_empty() => {
                write!(f, "{} cleared", field)
            }
            WorkflowEvent::FieldChanged { field, value } => write!(f, "{} = {}", field, value),
            WorkflowEvent::ItemLoaded(item) => write!(
                f,
                "Item {} '{}' qty {} at {}",
                item.code,
                item.name,
                item.quantity,
                item.known_location().unwrap_or("-")
            ),
            WorkflowEvent::ItemCleared => write!(f, "Item cleared"),
            WorkflowEvent::ScanIgnored { value, reason } => {
                write!(f, "Scan '{}' ignored ({:?})", value, reason)
            }
            WorkflowEvent::LookupStarted(key) => write!(f, "Looking up {}", key),
            WorkflowEvent::SubmitStarted(what) => write!(f, "Submitting: {}", what),
            WorkflowEvent::Submitted(msg) => write!(f, "Submitted: {}", msg),
            WorkflowEvent::SubmitFailed(msg) => write!(f, "Submit failed: {}", msg),
            WorkflowEvent::Notice(notice) => write!(f, "[{:?}] {}", notice.level(), notice),
        }
    }
}

/// Event dispatcher for publishing events to subscribers
#[derive(Clone)]
pub struct EventDispatcher {
    tx: broadcast::Sender<WorkflowEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Events kept for slow receivers before they lag
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size.max(1));
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; returns how many receivers saw it
    pub fn publish(&self, event: WorkflowEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(128)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_receivers() {
        let dispatcher = EventDispatcher::default();
        assert_eq!(dispatcher.publish(WorkflowEvent::ItemCleared), 0);
    }

    #[tokio::test]
    async fn test_receivers_see_events() {
        let dispatcher = EventDispatcher::new(8);
        let mut rx = dispatcher.subscribe();
        assert_eq!(dispatcher.subscriber_count(), 1);

        dispatcher.publish(WorkflowEvent::Notice(Notice::Success("Stock added".into())));
        match rx.recv().await.unwrap() {
            WorkflowEvent::Notice(n) => {
                assert_eq!(n.level(), NoticeLevel::Success);
                assert_eq!(n.to_string(), "Stock added");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_credential_notice_is_warning() {
        let notice = Notice::CredentialRequired {
            service: "barcode lookup".into(),
        };
        assert_eq!(notice.level(), NoticeLevel::Warning);
        assert!(notice.message().contains("barcode lookup"));
    }
}
