//! Scan sessions
//!
//! A session checks camera permission, binds the camera, seeds focus, and
//! runs the frame analyzer on a blocking thread until a value is emitted,
//! the frame source ends, or the session is cancelled.

use crate::camera::CameraControl;
use crate::focus::FocusController;
use crate::frame::FrameSource;
use crate::pipeline::{CapturePipeline, FrameOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stockscan_core::{CaptureError, ScanValue};
use tokio::task::JoinHandle;

/// Why the analyzer stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerEnd {
    /// A value was emitted.
    Emitted(ScanValue),
    /// The frame source ran dry.
    SourceExhausted,
    /// The session was cancelled.
    Cancelled,
}

/// Summary of one analyzer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerReport {
    /// Frames pulled from the source.
    pub frames: u64,
    /// Why the run ended.
    pub end: AnalyzerEnd,
}

impl AnalyzerReport {
    /// The emitted value, if the run produced one
    pub fn value(&self) -> Option<&ScanValue> {
        match &self.end {
            AnalyzerEnd::Emitted(value) => Some(value),
            _ => None,
        }
    }
}

/// A running scan session.
pub struct ScanSession {
    camera: Arc<dyn CameraControl>,
    stop: Arc<AtomicBool>,
    analyzer: JoinHandle<AnalyzerReport>,
    focus_seed: Option<JoinHandle<()>>,
}

impl ScanSession {
    /// Start a session
    ///
    /// Fails with [`CaptureError::PermissionDenied`] when camera access was
    /// not granted, or [`CaptureError::CameraBinding`] when the camera could
    /// not be bound; in both cases nothing is left running.
    pub async fn start<S>(
        camera: Arc<dyn CameraControl>,
        pipeline: Arc<CapturePipeline>,
        focus: Option<Arc<FocusController>>,
        source: S,
    ) -> Result<Self, CaptureError>
    where
        S: FrameSource + Send + 'static,
    {
        if !camera.has_permission() {
            tracing::warn!("Camera permission not granted, scan session not started");
            return Err(CaptureError::PermissionDenied);
        }

        camera.bind().await.map_err(|e| match e {
            CaptureError::CameraBinding { .. } | CaptureError::PermissionDenied => e,
            other => CaptureError::CameraBinding {
                reason: other.to_string(),
            },
        })?;

        pipeline.start_session();

        let focus_seed = focus.map(|focus| {
            pipeline.attach_focus(focus.clone());
            tokio::spawn(async move {
                if focus.seed_session().await.is_none() {
                    tracing::debug!("Session started without a focus lock");
                }
            })
        });

        let stop = Arc::new(AtomicBool::new(false));
        let analyzer = spawn_analyzer(pipeline, source, stop.clone());

        Ok(Self {
            camera,
            stop,
            analyzer,
            focus_seed,
        })
    }

    /// Ask the analyzer to stop after the current frame
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Wait for the analyzer to finish and release the camera
    pub async fn finish(self) -> Result<AnalyzerReport, CaptureError> {
        let report = self.analyzer.await;
        if let Some(seed) = self.focus_seed {
            seed.abort();
        }
        self.camera.unbind().await;
        report.map_err(|e| CaptureError::SessionAborted {
            reason: e.to_string(),
        })
    }

    /// Cancel and wait
    pub async fn stop(self) -> Result<AnalyzerReport, CaptureError> {
        self.cancel();
        self.finish().await
    }
}

/// Run `pipeline` over `source` on a blocking thread
///
/// The loop checks `stop` before pulling each frame.
pub fn spawn_analyzer<S>(
    pipeline: Arc<CapturePipeline>,
    mut source: S,
    stop: Arc<AtomicBool>,
) -> JoinHandle<AnalyzerReport>
where
    S: FrameSource + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut frames = 0u64;
        loop {
            if stop.load(Ordering::SeqCst) {
                return AnalyzerReport {
                    frames,
                    end: AnalyzerEnd::Cancelled,
                };
            }
            let Some(frame) = source.next_frame() else {
                return AnalyzerReport {
                    frames,
                    end: AnalyzerEnd::SourceExhausted,
                };
            };
            frames += 1;
            match pipeline.analyze(frame) {
                FrameOutcome::Emitted(value) => {
                    return AnalyzerReport {
                        frames,
                        end: AnalyzerEnd::Emitted(value),
                    }
                }
                FrameOutcome::Disarmed => {
                    return AnalyzerReport {
                        frames,
                        end: AnalyzerEnd::Cancelled,
                    }
                }
                _ => {}
            }
        }
    })
}
