//! Workflow Coordinator
//!
//! One coordinator runs per screen as a tokio task that owns its
//! [`WorkflowState`]. Everything reaches it as a [`Command`] on an unbounded
//! channel: scans forwarded by the bus handler, typed input from the UI, and
//! completions from the lookup, submit and auto-submit tasks it spawns.
//!
//! Scans are guarded: a scan arriving less than the guard interval after the
//! last accepted scan is dropped. Typed input is never guarded. At most one
//! lookup runs at a time; a newer lookup aborts the older task, and every
//! completion carries a sequence number so late results are discarded.

use crate::error::WorkflowError;
use crate::events::{EventDispatcher, IgnoreReason, Notice, WorkflowEvent};
use crate::rules::{Ctx, Step, Submission, WorkflowRules};
use crate::state::{FieldId, InputOrigin, Phase, StockMode, WorkflowState};
use std::sync::Arc;
use std::time::Duration;
use stockscan_catalog::{BarcodeInfoService, CatalogService};
use stockscan_core::constants::{DEFAULT_AUTO_SUBMIT_MS, DEFAULT_GUARD_MS};
use stockscan_core::{
    BarcodeInfo, CatalogError, LookupKey, LookupResult, ScanEvent, ScanEventBus, ScanTarget,
    ScanValue, SubscriptionId,
};
use stockscan_settings::ScannerSettings;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Coordinator timing
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Scans closer together than this are dropped.
    pub guard: Duration,
    /// Delay before a scan-completed form submits itself.
    pub auto_submit_delay: Duration,
    /// Events buffered per listener.
    pub event_capacity: usize,
}

impl CoordinatorConfig {
    pub fn from_settings(scanner: &ScannerSettings) -> Self {
        Self {
            guard: Duration::from_millis(scanner.guard_ms),
            auto_submit_delay: Duration::from_millis(scanner.auto_submit_delay_ms),
            ..Self::default()
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            guard: Duration::from_millis(DEFAULT_GUARD_MS),
            auto_submit_delay: Duration::from_millis(DEFAULT_AUTO_SUBMIT_MS),
            event_capacity: 128,
        }
    }
}

/// Collaborators shared by every coordinator.
#[derive(Clone)]
pub struct WorkflowDeps {
    pub catalog: Arc<dyn CatalogService>,
    pub barcode_info: Option<Arc<dyn BarcodeInfoService>>,
    pub config: CoordinatorConfig,
}

impl WorkflowDeps {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self {
            catalog,
            barcode_info: None,
            config: CoordinatorConfig::default(),
        }
    }

    pub fn with_barcode_info(mut self, service: Arc<dyn BarcodeInfoService>) -> Self {
        self.barcode_info = Some(service);
        self
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }
}

enum Command {
    Scan(ScanValue),
    Edit(FieldId, String),
    Enter(FieldId, String),
    SelectTarget(ScanTarget),
    Submit,
    SetMode(StockMode),
    Reset,
    LookupDone {
        seq: u64,
        key: LookupKey,
        result: Result<LookupResult, CatalogError>,
    },
    InfoDone {
        seq: u64,
        result: Result<BarcodeInfo, CatalogError>,
    },
    AutoSubmitFire {
        seq: u64,
    },
    SubmitDone {
        seq: u64,
        submission: Submission,
        result: Result<String, CatalogError>,
    },
    Snapshot(oneshot::Sender<WorkflowState>),
    Shutdown,
}

/// Cloneable handle to a running coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    name: &'static str,
    tx: mpsc::UnboundedSender<Command>,
    events: EventDispatcher,
}

impl CoordinatorHandle {
    /// Start a coordinator task running `rules`
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn<R: WorkflowRules>(rules: R, deps: WorkflowDeps) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventDispatcher::new(deps.config.event_capacity);
        let name = rules.name();

        let mut state = WorkflowState::default();
        rules.init(&mut state);

        let engine = Engine {
            rules,
            state,
            catalog: deps.catalog,
            barcode_info: deps.barcode_info,
            config: deps.config,
            events: events.clone(),
            tx: tx.downgrade(),
            outbox: Vec::new(),
            lookup: None,
            lookup_seq: 0,
            timer: None,
            timer_seq: 0,
            submit: None,
            submit_seq: 0,
        };
        tokio::spawn(engine.run(rx));
        tracing::debug!("Coordinator '{}' started", name);

        Self { name, tx, events }
    }

    /// Coordinator name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Deliver a scanned value, as the bus would
    pub fn scan(&self, value: ScanValue) -> bool {
        self.send(Command::Scan(value))
    }

    /// Set a field's text as the user types it
    pub fn edit(&self, field: FieldId, value: impl Into<String>) -> bool {
        self.send(Command::Edit(field, value.into()))
    }

    /// Set a field and confirm it, like pressing Enter
    pub fn enter(&self, field: FieldId, value: impl Into<String>) -> bool {
        self.send(Command::Enter(field, value.into()))
    }

    /// Point the next scan at `target`
    pub fn select_target(&self, target: ScanTarget) -> bool {
        self.send(Command::SelectTarget(target))
    }

    /// Submit the form now
    pub fn submit(&self) -> bool {
        self.send(Command::Submit)
    }

    /// Switch Stock-Adjust mode
    pub fn set_mode(&self, mode: StockMode) -> bool {
        self.send(Command::SetMode(mode))
    }

    /// Cancel pending work and clear the form
    pub fn reset(&self) -> bool {
        self.send(Command::Reset)
    }

    /// A copy of the current state
    pub async fn snapshot(&self) -> Result<WorkflowState, WorkflowError> {
        let (reply, rx) = oneshot::channel();
        if !self.send(Command::Snapshot(reply)) {
            return Err(self.stopped());
        }
        rx.await.map_err(|_| self.stopped())
    }

    /// Listen to this coordinator's events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// The event dispatcher
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Stop the coordinator, aborting any running requests
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// Whether the task is still running
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Bus handler forwarding scans to this coordinator
    pub fn scan_handler(&self) -> impl Fn(ScanEvent) + Send + Sync + 'static {
        let tx = self.tx.clone();
        move |event: ScanEvent| {
            let _ = tx.send(Command::Scan(event.value));
        }
    }

    /// Subscribe this coordinator to `bus` as an active listener
    pub fn attach(&self, bus: &ScanEventBus) -> SubscriptionId {
        bus.subscribe(self.scan_handler())
    }

    fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    fn stopped(&self) -> WorkflowError {
        WorkflowError::Stopped {
            screen: self.name.to_string(),
        }
    }
}

impl std::fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorHandle")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

struct Engine<R: WorkflowRules> {
    rules: R,
    state: WorkflowState,
    catalog: Arc<dyn CatalogService>,
    barcode_info: Option<Arc<dyn BarcodeInfoService>>,
    config: CoordinatorConfig,
    events: EventDispatcher,
    tx: mpsc::WeakUnboundedSender<Command>,
    outbox: Vec<WorkflowEvent>,
    lookup: Option<JoinHandle<()>>,
    lookup_seq: u64,
    timer: Option<JoinHandle<()>>,
    timer_seq: u64,
    submit: Option<JoinHandle<()>>,
    submit_seq: u64,
}

impl<R: WorkflowRules> Engine<R> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            if matches!(command, Command::Shutdown) {
                break;
            }
            let before = self.state.clone();
            let mut notices = Vec::new();
            self.handle(command, &mut notices);
            self.emit_changes(&before, notices);
        }

        self.cancel_lookup();
        self.cancel_auto_submit();
        if let Some(submit) = self.submit.take() {
            submit.abort();
        }
        tracing::debug!("Coordinator '{}' stopped", self.rules.name());
    }

    fn handle(&mut self, command: Command, notices: &mut Vec<Notice>) {
        match command {
            Command::Scan(value) => self.on_scan(value, notices),
            Command::Edit(field, text) => self.on_edit(field, text, notices),
            Command::Enter(field, text) => self.on_enter(field, text, notices),
            Command::SelectTarget(target) => self.on_select(target, notices),
            Command::Submit => self.on_submit_request(notices),
            Command::SetMode(_) | Command::Reset
                if self.state.phase == Phase::SubmitInFlight =>
            {
                tracing::debug!("{}: form change refused during submit", self.rules.name());
                notices.push(Notice::Warning(
                    "Wait for the current submission to finish".to_string(),
                ));
            }
            Command::SetMode(mode) => {
                self.cancel_lookup();
                self.cancel_auto_submit();
                self.rules
                    .set_mode(&mut Ctx::new(&mut self.state, notices), mode);
            }
            Command::Reset => {
                self.cancel_lookup();
                self.cancel_auto_submit();
                self.state.reset();
                self.rules.init(&mut self.state);
            }
            Command::LookupDone { seq, key, result } => {
                self.on_lookup_done(seq, key, result, notices)
            }
            Command::InfoDone { seq, result } => self.on_info_done(seq, result, notices),
            Command::AutoSubmitFire { seq } => self.on_auto_submit(seq, notices),
            Command::SubmitDone {
                seq,
                submission,
                result,
            } => self.on_submit_done(seq, submission, result, notices),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.clone());
            }
            Command::Shutdown => {}
        }
    }

    fn on_scan(&mut self, value: ScanValue, notices: &mut Vec<Notice>) {
        let now = Instant::now();
        if self.state.phase == Phase::SubmitInFlight {
            self.ignore(value, IgnoreReason::Busy);
            return;
        }
        if self.state.is_guarded(now) {
            self.ignore(value, IgnoreReason::Guarded);
            return;
        }
        self.state.processing_guard_until = Some(now + self.config.guard);

        let target = self.rules.route_scan(&self.state, &value);
        tracing::debug!(
            "{}: scan '{}' routed to {}",
            self.rules.name(),
            value,
            target
        );
        self.input(target, value, InputOrigin::Scan, notices);
    }

    fn on_edit(&mut self, field: FieldId, text: String, notices: &mut Vec<Notice>) {
        if self.state.field(field) == text {
            return;
        }
        self.cancel_auto_submit();
        self.state.set_field(field, text);

        if field == FieldId::Code {
            self.cancel_lookup();
            self.rules
                .on_primary_edited(&mut Ctx::new(&mut self.state, notices));
        }
        if matches!(
            self.state.phase,
            Phase::AwaitingSecondary | Phase::ReadyToSubmit
        ) {
            self.settle(InputOrigin::Typed, false, notices);
        }
    }

    fn on_enter(&mut self, field: FieldId, text: String, notices: &mut Vec<Notice>) {
        let value = match ScanValue::new(text) {
            Ok(value) => value,
            Err(e) => {
                notices.push(Notice::Warning(e.to_string()));
                return;
            }
        };
        if self.state.phase == Phase::SubmitInFlight {
            notices.push(Notice::Warning("A submission is in progress".to_string()));
            return;
        }

        if field == FieldId::Code {
            self.input(ScanTarget::Primary, value, InputOrigin::Typed, notices);
        } else if self.rules.secondary_field() == Some(field) {
            self.input(ScanTarget::Secondary, value, InputOrigin::Typed, notices);
        } else {
            self.on_edit(field, value.into_inner(), notices);
        }
    }

    fn on_select(&mut self, target: ScanTarget, notices: &mut Vec<Notice>) {
        if target == ScanTarget::Secondary && self.rules.secondary_field().is_none() {
            notices.push(Notice::Warning(
                "This screen has no secondary field".to_string(),
            ));
            return;
        }
        self.state.current_target = target;
        self.state.target_selected = true;
    }

    fn on_submit_request(&mut self, notices: &mut Vec<Notice>) {
        if self.state.phase.is_busy() {
            notices.push(Notice::Warning(format!(
                "Wait for the current request to finish ({})",
                self.state.phase
            )));
            return;
        }
        self.cancel_auto_submit();
        match self.rules.submission(&self.state) {
            Ok(submission) => self.start_submit(submission),
            Err(e) => {
                tracing::warn!("{}: submit refused: {}", self.rules.name(), e);
                notices.push(Notice::Error(e.to_string()));
            }
        }
    }

    fn input(
        &mut self,
        target: ScanTarget,
        value: ScanValue,
        origin: InputOrigin,
        notices: &mut Vec<Notice>,
    ) {
        self.cancel_auto_submit();
        let step = {
            let mut ctx = Ctx::new(&mut self.state, notices);
            match target {
                ScanTarget::Primary => self.rules.on_primary(&mut ctx, &value, origin),
                ScanTarget::Secondary => self.rules.on_secondary(&mut ctx, &value, origin),
            }
        };
        self.run_step(step, origin, notices);
    }

    fn run_step(&mut self, step: Step, origin: InputOrigin, notices: &mut Vec<Notice>) {
        match step {
            Step::Done => {}
            Step::Lookup(key) => self.start_lookup(key),
            Step::BarcodeInfo { barcode, app_code } => {
                self.start_barcode_info(barcode, app_code, notices)
            }
            Step::Filled => self.settle(origin, true, notices),
            Step::Settle => self.settle(origin, false, notices),
        }
    }

    /// Move between AwaitingSecondary and ReadyToSubmit based on validation
    fn settle(&mut self, origin: InputOrigin, report: bool, notices: &mut Vec<Notice>) {
        if self.state.phase.is_busy() {
            return;
        }
        match self.rules.validate(&self.state) {
            Ok(()) => {
                self.state.phase = Phase::ReadyToSubmit;
                if report && origin == InputOrigin::Scan && self.rules.auto_submits() {
                    self.schedule_auto_submit();
                }
            }
            Err(e) => {
                if self.state.phase == Phase::ReadyToSubmit {
                    self.state.phase = Phase::AwaitingSecondary;
                }
                if report {
                    notices.push(Notice::Warning(e.to_string()));
                }
            }
        }
    }

    fn start_lookup(&mut self, key: LookupKey) {
        self.cancel_lookup();
        let seq = self.lookup_seq;
        self.state.last_lookup_key = Some(key.value().to_string());
        self.state.phase = Phase::LookupInFlight;
        tracing::debug!("{}: looking up {}", self.rules.name(), key);
        self.outbox.push(WorkflowEvent::LookupStarted(key.clone()));

        let catalog = self.catalog.clone();
        let tx = self.tx.clone();
        self.lookup = Some(tokio::spawn(async move {
            let result = catalog.lookup(&key).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::LookupDone { seq, key, result });
            }
        }));
    }

    fn start_barcode_info(&mut self, barcode: String, app_code: String, notices: &mut Vec<Notice>) {
        let Some(service) = self.barcode_info.clone() else {
            notices.push(Notice::Warning(
                "Barcode details are not available".to_string(),
            ));
            self.settle(InputOrigin::Typed, false, notices);
            return;
        };

        self.cancel_lookup();
        let seq = self.lookup_seq;
        self.state.phase = Phase::LookupInFlight;
        tracing::debug!("{}: fetching details for {}", self.rules.name(), barcode);

        let tx = self.tx.clone();
        self.lookup = Some(tokio::spawn(async move {
            let result = service.fetch(&barcode, &app_code).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::InfoDone { seq, result });
            }
        }));
    }

    fn on_lookup_done(
        &mut self,
        seq: u64,
        key: LookupKey,
        result: Result<LookupResult, CatalogError>,
        notices: &mut Vec<Notice>,
    ) {
        if seq != self.lookup_seq || self.state.phase != Phase::LookupInFlight {
            tracing::debug!("{}: stale result for {} dropped", self.rules.name(), key);
            return;
        }
        self.lookup = None;

        match result {
            Ok(result) => {
                tracing::debug!(
                    "{}: {} found={} qty={}",
                    self.rules.name(),
                    key,
                    result.found,
                    result.quantity
                );
                self.rules
                    .on_lookup(&mut Ctx::new(&mut self.state, notices), &key, result);
            }
            Err(e) => {
                tracing::error!("{}: lookup of {} failed: {}", self.rules.name(), key, e);
                notices.push(Notice::Error(e.user_message()));
                self.state.reset_lookup();
                Ctx::new(&mut self.state, notices).go(Phase::AwaitingPrimary, ScanTarget::Primary);
            }
        }
    }

    fn on_info_done(
        &mut self,
        seq: u64,
        result: Result<BarcodeInfo, CatalogError>,
        notices: &mut Vec<Notice>,
    ) {
        if seq != self.lookup_seq || self.state.phase != Phase::LookupInFlight {
            tracing::debug!("{}: stale barcode details dropped", self.rules.name());
            return;
        }
        self.lookup = None;
        self.state.phase = Phase::AwaitingSecondary;

        let step = match result {
            Ok(info) => self
                .rules
                .on_barcode_info(&mut Ctx::new(&mut self.state, notices), info),
            Err(CatalogError::CredentialMissing { service }) => {
                notices.push(Notice::CredentialRequired { service });
                Step::Settle
            }
            Err(e) => {
                tracing::warn!("{}: barcode details failed: {}", self.rules.name(), e);
                notices.push(Notice::Warning(format!(
                    "Could not fetch barcode details: {}",
                    e.user_message()
                )));
                Step::Settle
            }
        };
        self.run_step(step, InputOrigin::Typed, notices);
    }

    fn schedule_auto_submit(&mut self) {
        self.cancel_auto_submit();
        let seq = self.timer_seq;
        let delay = self.config.auto_submit_delay;
        tracing::debug!("{}: auto-submit in {:?}", self.rules.name(), delay);

        let tx = self.tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::AutoSubmitFire { seq });
            }
        }));
    }

    fn on_auto_submit(&mut self, seq: u64, notices: &mut Vec<Notice>) {
        if seq != self.timer_seq {
            return;
        }
        self.timer = None;
        if self.state.phase != Phase::ReadyToSubmit {
            tracing::debug!(
                "{}: auto-submit skipped in phase {}",
                self.rules.name(),
                self.state.phase
            );
            return;
        }
        match self.rules.submission(&self.state) {
            Ok(submission) => self.start_submit(submission),
            Err(e) => {
                tracing::warn!("{}: auto-submit refused: {}", self.rules.name(), e);
                self.state.phase = Phase::AwaitingSecondary;
                notices.push(Notice::Warning(e.to_string()));
            }
        }
    }

    fn start_submit(&mut self, submission: Submission) {
        self.submit_seq += 1;
        let seq = self.submit_seq;
        self.state.phase = Phase::SubmitInFlight;
        tracing::info!("{}: {}", self.rules.name(), submission);
        self.outbox
            .push(WorkflowEvent::SubmitStarted(submission.to_string()));

        let catalog = self.catalog.clone();
        let tx = self.tx.clone();
        self.submit = Some(tokio::spawn(async move {
            let result = submission.execute(catalog.as_ref()).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::SubmitDone {
                    seq,
                    submission,
                    result,
                });
            }
        }));
    }

    fn on_submit_done(
        &mut self,
        seq: u64,
        submission: Submission,
        result: Result<String, CatalogError>,
        notices: &mut Vec<Notice>,
    ) {
        if seq != self.submit_seq || self.state.phase != Phase::SubmitInFlight {
            return;
        }
        self.submit = None;

        match result {
            Ok(message) => {
                tracing::info!("{}: {} succeeded: {}", self.rules.name(), submission, message);
                self.rules
                    .on_submitted(&mut Ctx::new(&mut self.state, notices), &submission);
                notices.push(Notice::Success(message.clone()));
                self.outbox.push(WorkflowEvent::Submitted(message));
            }
            Err(e) => {
                tracing::error!("{}: {} failed: {}", self.rules.name(), submission, e);
                self.state.phase = Phase::ReadyToSubmit;
                self.state.processing_guard_until = None;
                notices.push(Notice::Error(e.user_message()));
                self.outbox.push(WorkflowEvent::SubmitFailed(e.to_string()));
            }
        }
    }

    fn cancel_lookup(&mut self) {
        if let Some(task) = self.lookup.take() {
            task.abort();
            if self.state.phase == Phase::LookupInFlight {
                self.state.phase = Phase::AwaitingPrimary;
            }
        }
        self.lookup_seq += 1;
    }

    fn cancel_auto_submit(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.timer_seq += 1;
    }

    fn ignore(&mut self, value: ScanValue, reason: IgnoreReason) {
        tracing::debug!(
            "{}: scan '{}' ignored ({:?})",
            self.rules.name(),
            value,
            reason
        );
        self.outbox.push(WorkflowEvent::ScanIgnored {
            value: value.into_inner(),
            reason,
        });
    }

    fn emit_changes(&mut self, before: &WorkflowState, notices: Vec<Notice>) {
        let after = &self.state;
        if before.phase != after.phase {
            tracing::debug!(
                "{}: {} -> {}",
                self.rules.name(),
                before.phase,
                after.phase
            );
            self.events.publish(WorkflowEvent::PhaseChanged {
                from: before.phase,
                to: after.phase,
            });
        }
        if before.current_target != after.current_target {
            self.events
                .publish(WorkflowEvent::TargetChanged(after.current_target));
        }
        for field in FieldId::ALL {
            if before.field(field) != after.field(field) {
                self.events.publish(WorkflowEvent::FieldChanged {
                    field,
                    value: after.field(field).to_string(),
                });
            }
        }
        if before.item != after.item {
            self.events.publish(match &after.item {
                Some(item) => WorkflowEvent::ItemLoaded(item.clone()),
                None => WorkflowEvent::ItemCleared,
            });
        }
        for event in std::mem::take(&mut self.outbox) {
            self.events.publish(event);
        }
        for notice in notices {
            self.events.publish(WorkflowEvent::Notice(notice));
        }
    }
}
