//! Composition root
//!
//! Builds the scan bus, catalog client, capture pipeline and one coordinator
//! per screen from a settings store, and exposes the handful of actions the
//! front-end needs.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stockscan_capture::{
    CapturePipeline, FocusController, PayloadDecoder, PipelineConfig, ScanSession, VirtualCamera,
};
use stockscan_catalog::{CatalogService, HttpCatalogClient, ShowApiBarcodeInfo};
use stockscan_core::{
    CatalogError, FeedbackSink, PublishOutcome, ScanEventBus, ScanValue, ValidationError,
};
use stockscan_settings::{KeyBinding, SettingsManager, SettingsProvider, SettingsStore};
use stockscan_workflow::{
    CoordinatorConfig, CoordinatorHandle, ScreenId, ScreenRegistry, TriggerAction, WorkflowDeps,
    WorkflowError,
};

/// Viewport the virtual camera's focus taps are measured against.
const VIEWPORT: (f32, f32) = (1080.0, 1920.0);

/// Frames of nothing before the virtual camera shows its payload.
const LEAD_IN_FRAMES: usize = 3;

/// Frames after which a virtual camera session gives up.
const MAX_FRAMES: usize = 150;

/// The wired-up application.
pub struct App {
    settings: Arc<SettingsStore>,
    bus: Arc<ScanEventBus>,
    catalog: Arc<HttpCatalogClient>,
    pipeline: Arc<CapturePipeline>,
    feedback: Arc<dyn FeedbackSink>,
    registry: ScreenRegistry,
}

impl App {
    /// Load settings from `config_path` (or the default location) and build
    pub fn open(config_path: Option<PathBuf>, feedback: Arc<dyn FeedbackSink>) -> anyhow::Result<Self> {
        let path = SettingsManager::resolve(config_path)?;
        let settings = SettingsStore::open(&path)
            .with_context(|| format!("Failed to open settings at {}", path.display()))?;
        tracing::info!("Settings loaded from {}", path.display());
        Self::new(Arc::new(settings), feedback)
    }

    /// Build every component from `settings`
    ///
    /// Must be called inside a tokio runtime; the coordinators start here.
    pub fn new(settings: Arc<SettingsStore>, feedback: Arc<dyn FeedbackSink>) -> anyhow::Result<Self> {
        let config = settings.snapshot();
        let bus = Arc::new(ScanEventBus::new());

        let catalog = Arc::new(
            HttpCatalogClient::from_settings(&config.server)
                .context("Failed to create the catalog client")?,
        );
        let barcode_info = ShowApiBarcodeInfo::new(
            config.barcode_api.endpoint.clone(),
            Duration::from_millis(config.server.timeout_ms),
        )
        .context("Failed to create the barcode information client")?;

        let deps = WorkflowDeps::new(catalog.clone())
            .with_barcode_info(Arc::new(barcode_info))
            .with_config(CoordinatorConfig::from_settings(&config.scanner));
        let registry = ScreenRegistry::with_all_screens(bus.clone(), settings.clone(), deps);

        let pipeline = Arc::new(CapturePipeline::new(
            Arc::new(PayloadDecoder),
            bus.clone(),
            feedback.clone(),
            PipelineConfig {
                throttle: Duration::from_millis(config.scanner.throttle_ms),
            },
        ));

        tracing::info!("Catalog server: {}", catalog.base_url());
        Ok(Self {
            settings,
            bus,
            catalog,
            pipeline,
            feedback,
            registry,
        })
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn bus(&self) -> &Arc<ScanEventBus> {
        &self.bus
    }

    pub fn registry(&self) -> &ScreenRegistry {
        &self.registry
    }

    /// Switch to `screen`
    pub fn open_screen(&self, screen: ScreenId) -> Result<CoordinatorHandle, WorkflowError> {
        self.registry.activate(screen)
    }

    /// The coordinator of the screen in front
    pub fn active(&self) -> Result<CoordinatorHandle, WorkflowError> {
        self.registry.active_handle()
    }

    /// Publish a value from a keyboard-wedge scanner
    ///
    /// The confirmation cue plays once per distinct value, as for camera
    /// scans.
    pub fn wedge_scan(&self, raw: &str) -> Result<PublishOutcome, ValidationError> {
        let value = ScanValue::new(raw)?;
        let outcome = self.bus.publish(value);
        if outcome.is_new() && self.bus.claim_feedback() {
            self.feedback.play_confirmation();
        }
        Ok(outcome)
    }

    /// Run one scan session on a virtual camera showing `payload`
    ///
    /// Delivery to the active screen is suspended while the session runs,
    /// like a scanner view covering the screen, and resumed afterwards so the
    /// screen receives the decoded value.
    pub async fn camera_scan(&self, payload: &str) -> anyhow::Result<Option<ScanValue>> {
        let camera = Arc::new(VirtualCamera::new());
        let focus = Arc::new(FocusController::new(
            camera.clone(),
            self.settings.clone(),
            VIEWPORT.0,
            VIEWPORT.1,
        ));
        let source = camera.stream(Some(payload), LEAD_IN_FRAMES, MAX_FRAMES);

        self.registry.suspend();
        let result = async {
            let session =
                ScanSession::start(camera.clone(), self.pipeline.clone(), Some(focus), source)
                    .await?;
            session.finish().await
        }
        .await;
        if self.registry.active().is_some() {
            self.registry.resume()?;
        }

        let report = result?;
        tracing::debug!("Camera session read {} frame(s)", report.frames);
        Ok(report.value().cloned())
    }

    /// Map a hardware key press
    pub fn press_key(&self, key_code: u32) -> Option<TriggerAction> {
        self.registry.on_key(key_code)
    }

    /// Bind the hardware trigger key
    pub fn bind_trigger_key(&self, code: u32, name: &str) -> anyhow::Result<()> {
        self.settings.bind_trigger_key(KeyBinding::new(code, name))?;
        Ok(())
    }

    /// Change the catalog server, validating and persisting it first
    pub fn set_server_address(&self, address: &str) -> anyhow::Result<()> {
        self.settings.set_server_address(address)?;
        self.catalog.set_base_url(&self.settings.server_address())?;
        tracing::info!("Catalog server changed to {}", self.catalog.base_url());
        Ok(())
    }

    /// Store the barcode information service credential
    pub fn set_barcode_app_code(&self, app_code: &str) -> anyhow::Result<()> {
        self.settings.set_barcode_app_code(app_code)?;
        Ok(())
    }

    /// Ask the catalog server whether it is up
    pub async fn health(&self) -> Result<String, CatalogError> {
        self.catalog.health().await
    }

    /// Stop every coordinator
    pub fn shutdown(&self) {
        self.registry.shutdown();
        tracing::info!("StockScan stopped");
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("server", &self.catalog.base_url())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stockscan_settings::Config;
    use stockscan_workflow::FieldId;

    #[derive(Default)]
    struct CountingFeedback(AtomicUsize);

    impl FeedbackSink for CountingFeedback {
        fn play_confirmation(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn app() -> (App, Arc<CountingFeedback>) {
        let mut config = Config::default();
        config.server.address = "http://127.0.0.1:9/".to_string();
        let feedback = Arc::new(CountingFeedback::default());
        let app = App::new(Arc::new(SettingsStore::in_memory(config)), feedback.clone()).unwrap();
        (app, feedback)
    }

    async fn wait_for_code(handle: &CoordinatorHandle, code: &str) {
        for _ in 0..200 {
            let state = handle.snapshot().await.unwrap();
            if state.field(FieldId::Code) == code {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("code never became {}", code);
    }

    #[tokio::test]
    async fn test_wedge_scan_plays_cue_once_per_value() {
        let (app, feedback) = app();
        let handle = app.open_screen(ScreenId::StockAdjust).unwrap();

        assert_eq!(app.wedge_scan("P100").unwrap(), PublishOutcome::Delivered(1));
        assert_eq!(app.wedge_scan("P100").unwrap(), PublishOutcome::Duplicate);
        assert_eq!(feedback.0.load(Ordering::SeqCst), 1);
        assert!(app.wedge_scan("   ").is_err());

        wait_for_code(&handle, "P100").await;
        app.shutdown();
    }

    #[tokio::test]
    async fn test_camera_scan_reaches_active_screen() {
        let (app, feedback) = app();
        let handle = app.open_screen(ScreenId::MoveItem).unwrap();

        let value = app.camera_scan("P200").await.unwrap();
        assert_eq!(value.as_ref().map(ScanValue::as_str), Some("P200"));
        assert_eq!(feedback.0.load(Ordering::SeqCst), 1);

        wait_for_code(&handle, "P200").await;
        app.shutdown();
    }

    #[tokio::test]
    async fn test_rejected_server_address_keeps_old_one() {
        let (app, _) = app();
        assert!(app.set_server_address("not a url").is_err());
        assert_eq!(app.settings().server_address(), "http://127.0.0.1:9/");

        app.set_server_address("http://192.168.1.20:5000/").unwrap();
        assert_eq!(app.settings().server_address(), "http://192.168.1.20:5000/");
    }

    #[tokio::test]
    async fn test_trigger_key_binding() {
        let (app, _) = app();
        app.open_screen(ScreenId::Lookup).unwrap();
        assert_eq!(app.press_key(24), None);

        app.bind_trigger_key(24, "VolumeUp").unwrap();
        assert_eq!(
            app.press_key(24),
            Some(TriggerAction::OpenScanner(ScreenId::Lookup))
        );
    }
}
