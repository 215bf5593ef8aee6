//! Focus Controller
//!
//! Drives autofocus and auto exposure around the decode target. A single
//! request may be in flight; overlapping requests are dropped, not queued.
//! The last point that locked (or produced a decode) is saved so the next
//! session starts there.

use crate::camera::{CameraControl, MeteringPoint, MeteringRequest};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stockscan_core::{CaptureError, FocusSession};
use stockscan_settings::SettingsProvider;

/// Offset of the four outer pattern points from the centre.
const PATTERN_OFFSET: f32 = 0.15;

/// Result of a focus request.
#[derive(Debug, Clone, PartialEq)]
pub enum FocusOutcome {
    /// Focus locked at this point.
    Locked(MeteringPoint),
    /// The request ran but focus did not lock.
    NotLocked(MeteringPoint),
    /// Another request was already running; nothing was done.
    Busy,
    /// The camera rejected the request.
    Failed(CaptureError),
}

impl FocusOutcome {
    /// Whether focus locked
    pub fn is_locked(&self) -> bool {
        matches!(self, FocusOutcome::Locked(_))
    }
}

/// Clears the in-flight flag even if the focusing future is dropped.
struct FocusingGuard<'a>(&'a AtomicBool);

impl Drop for FocusingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Tap-to-focus and session focus seeding.
pub struct FocusController {
    camera: Arc<dyn CameraControl>,
    settings: Arc<dyn SettingsProvider>,
    /// Viewport size in pixels, for converting tap coordinates.
    viewport: (f32, f32),
    is_focusing: AtomicBool,
    /// Point of the most recent request that ran.
    current: Mutex<Option<MeteringPoint>>,
}

impl FocusController {
    /// Create a controller for a viewport of `width` x `height` pixels
    pub fn new(
        camera: Arc<dyn CameraControl>,
        settings: Arc<dyn SettingsProvider>,
        width: f32,
        height: f32,
    ) -> Self {
        Self {
            camera,
            settings,
            viewport: (width.max(1.0), height.max(1.0)),
            is_focusing: AtomicBool::new(false),
            current: Mutex::new(None),
        }
    }

    /// Focus around a viewport position given in pixels
    pub async fn focus_at(&self, x: f32, y: f32) -> FocusOutcome {
        let (width, height) = self.viewport;
        self.focus_point(MeteringPoint::new(x / width, y / height))
            .await
    }

    /// Focus on the viewport centre
    pub async fn focus_center(&self) -> FocusOutcome {
        self.focus_point(MeteringPoint::center()).await
    }

    /// Whether a focus request is running
    pub fn is_focusing(&self) -> bool {
        self.is_focusing.load(Ordering::Acquire)
    }

    /// Point of the most recent focus request
    pub fn current_point(&self) -> Option<MeteringPoint> {
        *self.current.lock()
    }

    /// Focus a new session
    ///
    /// Tries the saved point first, then walks the centre and four offset
    /// points until one locks. Returns the locked point, if any.
    pub async fn seed_session(&self) -> Option<MeteringPoint> {
        if let Some((x, y)) = self.settings.focus_session().point() {
            match self.focus_point(MeteringPoint::new(x, y)).await {
                FocusOutcome::Locked(point) => return Some(point),
                FocusOutcome::Busy => return None,
                _ => tracing::debug!("Saved focus point did not lock, trying pattern"),
            }
        }

        for point in Self::pattern() {
            match self.focus_point(point).await {
                FocusOutcome::Locked(point) => return Some(point),
                FocusOutcome::Busy => return None,
                _ => {}
            }
        }
        tracing::debug!("No pattern point locked focus");
        None
    }

    /// Save the point in use after a successful decode
    pub fn remember_point(&self) {
        if let Some(point) = self.current_point() {
            self.persist(point);
        }
    }

    /// Centre plus four points offset diagonally
    pub fn pattern() -> [MeteringPoint; 5] {
        let lo = 0.5 - PATTERN_OFFSET;
        let hi = 0.5 + PATTERN_OFFSET;
        [
            MeteringPoint::center(),
            MeteringPoint::new(lo, lo),
            MeteringPoint::new(hi, lo),
            MeteringPoint::new(lo, hi),
            MeteringPoint::new(hi, hi),
        ]
    }

    async fn focus_point(&self, point: MeteringPoint) -> FocusOutcome {
        if self
            .is_focusing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Focus request dropped, another is in flight");
            return FocusOutcome::Busy;
        }
        let _guard = FocusingGuard(&self.is_focusing);

        *self.current.lock() = Some(point);
        let request = MeteringRequest::focus_and_expose(point);
        match self.camera.start_focus_and_metering(request).await {
            Ok(true) => {
                tracing::debug!("Focus locked at ({:.2}, {:.2})", point.x, point.y);
                self.persist(point);
                FocusOutcome::Locked(point)
            }
            Ok(false) => FocusOutcome::NotLocked(point),
            Err(e) => {
                tracing::warn!("Focus request failed: {}", e);
                FocusOutcome::Failed(e)
            }
        }
    }

    fn persist(&self, point: MeteringPoint) {
        if let Err(e) = self
            .settings
            .save_focus_session(FocusSession::at(point.x, point.y))
        {
            tracing::warn!("Could not save focus point: {}", e);
        }
    }
}

impl std::fmt::Debug for FocusController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusController")
            .field("viewport", &self.viewport)
            .field("is_focusing", &self.is_focusing())
            .field("current", &self.current_point())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use stockscan_settings::SettingsStore;
    use tokio::sync::Notify;

    /// Camera whose focus requests block until `release` is notified.
    struct SlowCamera {
        release: Notify,
        lock_at: Option<MeteringPoint>,
        requests: Mutex<Vec<MeteringRequest>>,
        calls: AtomicUsize,
        blocking: bool,
    }

    impl SlowCamera {
        fn new(blocking: bool, lock_at: Option<MeteringPoint>) -> Arc<Self> {
            Arc::new(Self {
                release: Notify::new(),
                lock_at,
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                blocking,
            })
        }
    }

    #[async_trait]
    impl CameraControl for SlowCamera {
        fn has_permission(&self) -> bool {
            true
        }

        async fn bind(&self) -> Result<(), CaptureError> {
            Ok(())
        }

        async fn start_focus_and_metering(
            &self,
            request: MeteringRequest,
        ) -> Result<bool, CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(request);
            if self.blocking {
                self.release.notified().await;
            }
            Ok(match self.lock_at {
                None => true,
                Some(p) => p == request.point,
            })
        }
    }

    fn controller(camera: Arc<SlowCamera>, settings: Arc<SettingsStore>) -> FocusController {
        FocusController::new(camera, settings, 1000.0, 500.0)
    }

    #[tokio::test]
    async fn test_focus_at_normalises_and_saves() {
        let camera = SlowCamera::new(false, None);
        let settings = Arc::new(SettingsStore::default());
        let focus = controller(camera.clone(), settings.clone());

        let outcome = focus.focus_at(250.0, 400.0).await;
        assert_eq!(outcome, FocusOutcome::Locked(MeteringPoint::new(0.25, 0.8)));

        let request = camera.requests.lock()[0];
        assert!(request.modes.autofocus && request.modes.auto_exposure);
        assert_eq!(request.auto_cancel, None);

        let saved = settings.focus_session();
        assert!(saved.has_saved);
        assert!((saved.last_x - 0.25).abs() < 1e-6);
        assert!(!focus.is_focusing());
    }

    #[tokio::test]
    async fn test_overlapping_request_is_dropped() {
        let camera = SlowCamera::new(true, None);
        let settings = Arc::new(SettingsStore::default());
        let focus = Arc::new(controller(camera.clone(), settings.clone()));

        let first = {
            let focus = focus.clone();
            tokio::spawn(async move { focus.focus_center().await })
        };
        while !focus.is_focusing() {
            tokio::task::yield_now().await;
        }

        assert_eq!(focus.focus_at(10.0, 10.0).await, FocusOutcome::Busy);
        assert_eq!(camera.calls.load(Ordering::SeqCst), 1);
        assert!(!settings.focus_session().has_saved);

        camera.release.notify_one();
        assert!(first.await.unwrap().is_locked());
        assert!(!focus.is_focusing());
        assert_eq!(settings.focus_session().point(), Some((0.5, 0.5)));
    }

    #[tokio::test]
    async fn test_seed_walks_pattern_until_lock() {
        let target = FocusController::pattern()[3];
        let camera = SlowCamera::new(false, Some(target));
        let settings = Arc::new(SettingsStore::default());
        let focus = controller(camera.clone(), settings.clone());

        assert_eq!(focus.seed_session().await, Some(target));
        assert_eq!(camera.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_seed_prefers_saved_point() {
        let saved = MeteringPoint::new(0.2, 0.3);
        let camera = SlowCamera::new(false, Some(saved));
        let settings = Arc::new(SettingsStore::default());
        settings
            .save_focus_session(FocusSession::at(0.2, 0.3))
            .unwrap();
        let focus = controller(camera.clone(), settings);

        assert_eq!(focus.seed_session().await, Some(saved));
        assert_eq!(camera.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remember_point_saves_current() {
        let camera = SlowCamera::new(false, Some(MeteringPoint::new(0.0, 0.0)));
        let settings = Arc::new(SettingsStore::default());
        let focus = controller(camera, settings.clone());

        // Does not lock, so nothing is saved yet
        assert!(!focus.focus_at(600.0, 100.0).await.is_locked());
        assert!(!settings.focus_session().has_saved);

        focus.remember_point();
        let saved = settings.focus_session();
        assert!((saved.last_x - 0.6).abs() < 1e-6);
        assert!((saved.last_y - 0.2).abs() < 1e-6);
    }
}
