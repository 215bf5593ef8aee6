//! Screen registry
//!
//! Keeps one coordinator per screen and decides which of them hears the scan
//! event bus. Only the active screen's subscription is active, so a scan
//! never reaches a screen the user is not looking at. Switching to another
//! screen clears the bus; suspending and resuming the same screen (while the
//! scanner view is in front of it) keeps a value scanned in between, which
//! the bus hands over on resume.

use crate::coordinator::{CoordinatorHandle, WorkflowDeps};
use crate::error::WorkflowError;
use crate::rules::{AddItemRules, LookupRules, MoveItemRules, StockAdjustRules};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use stockscan_core::{ScanEventBus, SubscriptionId};
use stockscan_settings::SettingsProvider;

/// The application's screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenId {
    Lookup,
    AddItem,
    StockAdjust,
    MoveItem,
}

impl ScreenId {
    pub const ALL: [ScreenId; 4] = [
        ScreenId::Lookup,
        ScreenId::AddItem,
        ScreenId::StockAdjust,
        ScreenId::MoveItem,
    ];

    /// Start this screen's coordinator
    pub fn spawn(self, deps: WorkflowDeps, settings: Arc<dyn SettingsProvider>) -> CoordinatorHandle {
        match self {
            ScreenId::Lookup => CoordinatorHandle::spawn(LookupRules, deps),
            ScreenId::AddItem => CoordinatorHandle::spawn(AddItemRules::new(settings), deps),
            ScreenId::StockAdjust => CoordinatorHandle::spawn(StockAdjustRules, deps),
            ScreenId::MoveItem => CoordinatorHandle::spawn(MoveItemRules, deps),
        }
    }
}

impl std::fmt::Display for ScreenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScreenId::Lookup => "lookup",
            ScreenId::AddItem => "add",
            ScreenId::StockAdjust => "stock",
            ScreenId::MoveItem => "move",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ScreenId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lookup" | "info" => Ok(ScreenId::Lookup),
            "add" | "add-item" | "new" => Ok(ScreenId::AddItem),
            "stock" | "stock-adjust" | "adjust" => Ok(ScreenId::StockAdjust),
            "move" | "move-item" => Ok(ScreenId::MoveItem),
            other => Err(format!("unknown screen '{}'", other)),
        }
    }
}

/// What a key press maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Open the scanner for the given screen.
    OpenScanner(ScreenId),
}

struct Registered {
    handle: CoordinatorHandle,
    subscription: SubscriptionId,
}

/// Routes the scan bus to the active screen's coordinator.
pub struct ScreenRegistry {
    bus: Arc<ScanEventBus>,
    settings: Arc<dyn SettingsProvider>,
    screens: RwLock<HashMap<ScreenId, Registered>>,
    active: RwLock<Option<ScreenId>>,
}

impl ScreenRegistry {
    pub fn new(bus: Arc<ScanEventBus>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            bus,
            settings,
            screens: RwLock::new(HashMap::new()),
            active: RwLock::new(None),
        }
    }

    /// A registry with a coordinator for every screen, none active
    pub fn with_all_screens(
        bus: Arc<ScanEventBus>,
        settings: Arc<dyn SettingsProvider>,
        deps: WorkflowDeps,
    ) -> Self {
        let registry = Self::new(bus, settings.clone());
        for screen in ScreenId::ALL {
            registry.register(screen, screen.spawn(deps.clone(), settings.clone()));
        }
        registry
    }

    /// Register `handle` for `screen`, replacing and stopping any previous one
    pub fn register(&self, screen: ScreenId, handle: CoordinatorHandle) {
        let active = *self.active.read() == Some(screen);
        let subscription = self.bus.subscribe_inactive(handle.scan_handler());
        let previous = self.screens.write().insert(
            screen,
            Registered {
                handle,
                subscription,
            },
        );
        if let Some(previous) = previous {
            self.bus.unsubscribe(previous.subscription);
            previous.handle.shutdown();
        }
        if active {
            self.bus.set_active(subscription, true);
        }
        tracing::debug!("Screen {} registered", screen);
    }

    /// Make `screen` the one that receives scans
    pub fn activate(&self, screen: ScreenId) -> Result<CoordinatorHandle, WorkflowError> {
        let (handle, subscription) = {
            let screens = self.screens.read();
            let registered = screens
                .get(&screen)
                .ok_or(WorkflowError::UnknownScreen(screen))?;
            (registered.handle.clone(), registered.subscription)
        };

        let previous = self.active.write().replace(screen);
        if previous != Some(screen) {
            if let Some(previous) = previous {
                self.set_active(previous, false);
            }
            // A value scanned for the previous screen must not leak into this one
            self.bus.clear();
            tracing::info!("Switched to {} screen", screen);
        }
        self.bus.set_active(subscription, true);
        Ok(handle)
    }

    /// Stop delivering scans to the active screen without leaving it
    pub fn suspend(&self) {
        if let Some(screen) = *self.active.read() {
            self.set_active(screen, false);
            tracing::debug!("Screen {} suspended", screen);
        }
    }

    /// Resume delivery to the active screen, handing over a retained scan
    pub fn resume(&self) -> Result<(), WorkflowError> {
        let screen = self.active().ok_or(WorkflowError::NoActiveScreen)?;
        if !self.set_active(screen, true) {
            return Err(WorkflowError::UnknownScreen(screen));
        }
        Ok(())
    }

    /// The active screen
    pub fn active(&self) -> Option<ScreenId> {
        *self.active.read()
    }

    /// The active screen's coordinator
    pub fn active_handle(&self) -> Result<CoordinatorHandle, WorkflowError> {
        let screen = self.active().ok_or(WorkflowError::NoActiveScreen)?;
        self.handle(screen)
    }

    /// A screen's coordinator
    pub fn handle(&self, screen: ScreenId) -> Result<CoordinatorHandle, WorkflowError> {
        self.screens
            .read()
            .get(&screen)
            .map(|r| r.handle.clone())
            .ok_or(WorkflowError::UnknownScreen(screen))
    }

    /// Map a key press to an action
    ///
    /// Only the bound trigger key does anything, and only while a screen is
    /// active.
    pub fn on_key(&self, key_code: u32) -> Option<TriggerAction> {
        let binding = self.settings.trigger_key()?;
        if binding.code != key_code {
            return None;
        }
        let screen = self.active()?;
        tracing::debug!("Trigger key {} opens the scanner on {}", binding, screen);
        Some(TriggerAction::OpenScanner(screen))
    }

    /// Stop every coordinator and drop their subscriptions
    pub fn shutdown(&self) {
        for (screen, registered) in self.screens.write().drain() {
            self.bus.unsubscribe(registered.subscription);
            registered.handle.shutdown();
            tracing::debug!("Screen {} shut down", screen);
        }
        *self.active.write() = None;
    }

    fn set_active(&self, screen: ScreenId, active: bool) -> bool {
        let subscription = self.screens.read().get(&screen).map(|r| r.subscription);
        subscription.is_some_and(|id| self.bus.set_active(id, active))
    }
}

impl std::fmt::Debug for ScreenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenRegistry")
            .field("screens", &self.screens.read().len())
            .field("active", &self.active())
            .finish()
    }
}
