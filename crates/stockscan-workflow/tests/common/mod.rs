//! Shared fakes for coordinator tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use stockscan_catalog::{BarcodeInfoService, CatalogService};
use stockscan_core::{BarcodeInfo, CatalogError, LookupKey, LookupResult, NewItem};
use stockscan_workflow::{CoordinatorHandle, Phase, WorkflowDeps, WorkflowEvent, WorkflowState};
use tokio::sync::broadcast;

/// A call the fake catalog received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Lookup(LookupKey),
    Create(NewItem),
    Receive(LookupKey, u32, Option<String>),
    Issue(LookupKey, u32),
    Move(LookupKey, String),
    Register(String, String),
}

impl Call {
    pub fn is_lookup(&self) -> bool {
        matches!(self, Call::Lookup(_))
    }
}

/// In-memory catalog recording every call.
#[derive(Default)]
pub struct FakeCatalog {
    items: Mutex<HashMap<String, LookupResult>>,
    calls: Mutex<Vec<Call>>,
    lookup_delay: Mutex<Duration>,
    lookup_error: Mutex<Option<CatalogError>>,
    submit_error: Mutex<Option<CatalogError>>,
    submit_delay: Mutex<Duration>,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add an item reachable by its code and, if set, its barcode
    pub fn with_item(self: Arc<Self>, code: &str, quantity: i64, location: Option<&str>) -> Arc<Self> {
        self.put(LookupResult {
            found: true,
            code: code.to_string(),
            name: format!("Item {}", code),
            specs: "spec".to_string(),
            quantity,
            location: location.map(str::to_string),
            ..Default::default()
        });
        self
    }

    pub fn put(&self, item: LookupResult) {
        let mut items = self.items.lock();
        if let Some(barcode) = &item.barcode {
            items.insert(barcode.clone(), item.clone());
        }
        items.insert(item.code.clone(), item);
    }

    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock() = delay;
    }

    pub fn fail_lookups(&self, error: Option<CatalogError>) {
        *self.lookup_error.lock() = error;
    }

    pub fn fail_submits(&self, error: Option<CatalogError>) {
        *self.submit_error.lock() = error;
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn lookups(&self) -> usize {
        self.calls.lock().iter().filter(|c| c.is_lookup()).count()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|c| !c.is_lookup())
            .cloned()
            .collect()
    }

    async fn find(&self, key: LookupKey) -> Result<LookupResult, CatalogError> {
        self.calls.lock().push(Call::Lookup(key.clone()));
        let delay = *self.lookup_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.lookup_error.lock().clone() {
            return Err(error);
        }
        Ok(self
            .items
            .lock()
            .get(key.value())
            .cloned()
            .unwrap_or_else(LookupResult::not_found))
    }

    async fn write(&self, call: Call, message: &str) -> Result<String, CatalogError> {
        self.calls.lock().push(call);
        let delay = *self.submit_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.submit_error.lock().clone() {
            Some(error) => Err(error),
            None => Ok(message.to_string()),
        }
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn find_by_code(&self, code: &str) -> Result<LookupResult, CatalogError> {
        self.find(LookupKey::Code(code.to_string())).await
    }

    async fn find_by_barcode(&self, barcode: &str) -> Result<LookupResult, CatalogError> {
        self.find(LookupKey::Barcode(barcode.to_string())).await
    }

    async fn create(&self, item: &NewItem) -> Result<String, CatalogError> {
        self.write(Call::Create(item.clone()), "Item created").await
    }

    async fn receive_stock(
        &self,
        key: &LookupKey,
        quantity: u32,
        location: Option<&str>,
    ) -> Result<String, CatalogError> {
        self.write(
            Call::Receive(key.clone(), quantity, location.map(str::to_string)),
            "Stock received",
        )
        .await
    }

    async fn issue_stock(&self, key: &LookupKey, quantity: u32) -> Result<String, CatalogError> {
        self.write(Call::Issue(key.clone(), quantity), "Stock issued").await
    }

    async fn move_location(&self, key: &LookupKey, location: &str) -> Result<String, CatalogError> {
        self.write(Call::Move(key.clone(), location.to_string()), "Item moved")
            .await
    }

    async fn register_barcode(&self, code: &str, barcode: &str) -> Result<String, CatalogError> {
        self.write(
            Call::Register(code.to_string(), barcode.to_string()),
            "Barcode registered",
        )
        .await
    }

    async fn health(&self) -> Result<String, CatalogError> {
        Ok("healthy".to_string())
    }
}

/// Barcode details service answering from a fixed table.
#[derive(Default)]
pub struct FakeBarcodeInfo {
    pub answers: Mutex<HashMap<String, BarcodeInfo>>,
    pub requests: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl BarcodeInfoService for FakeBarcodeInfo {
    async fn fetch(&self, barcode: &str, app_code: &str) -> Result<BarcodeInfo, CatalogError> {
        self.requests
            .lock()
            .push((barcode.to_string(), app_code.to_string()));
        self.answers
            .lock()
            .get(barcode)
            .cloned()
            .ok_or_else(|| CatalogError::Rejected {
                message: "barcode not found".to_string(),
            })
    }
}

pub fn deps(catalog: &Arc<FakeCatalog>) -> WorkflowDeps {
    WorkflowDeps::new(catalog.clone())
}

/// Poll the coordinator until `check` holds, letting paused time run
pub async fn wait_until<F>(handle: &CoordinatorHandle, mut check: F) -> WorkflowState
where
    F: FnMut(&WorkflowState) -> bool,
{
    for _ in 0..5000 {
        let state = handle.snapshot().await.expect("coordinator running");
        if check(&state) {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    let state = handle.snapshot().await.expect("coordinator running");
    panic!("condition not reached, last state: {:?}", state);
}

pub async fn wait_for_phase(handle: &CoordinatorHandle, phase: Phase) -> WorkflowState {
    wait_until(handle, |s| s.phase == phase).await
}

/// Let spawned tasks and queued commands run without moving the clock much
pub async fn settle(handle: &CoordinatorHandle) -> WorkflowState {
    for _ in 0..10 {
        tokio::task::yield_now().await;
        handle.snapshot().await.expect("coordinator running");
    }
    handle.snapshot().await.expect("coordinator running")
}

/// Sleep past the scan guard window
pub async fn pass_guard() {
    tokio::time::sleep(Duration::from_millis(1001)).await;
}

/// Everything buffered on an event receiver
pub fn drain(rx: &mut broadcast::Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn scan_value(raw: &str) -> stockscan_core::ScanValue {
    stockscan_core::ScanValue::new(raw).expect("non-blank scan")
}
