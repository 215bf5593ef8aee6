//! Camera control interface
//!
//! The pieces of a camera stack a scan session needs: a permission check,
//! binding the preview/analysis use cases, and focus/metering requests.

use async_trait::async_trait;
use std::time::Duration;
use stockscan_core::CaptureError;

/// A point in the viewport, normalised to `0.0..=1.0` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeteringPoint {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

impl MeteringPoint {
    /// Build a point, clamping into the viewport
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    /// Viewport centre
    pub fn center() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

/// Which automatic controls a metering request drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeteringModes {
    /// Autofocus.
    pub autofocus: bool,
    /// Auto exposure.
    pub auto_exposure: bool,
}

/// A focus/metering request around one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeteringRequest {
    /// Where to meter.
    pub point: MeteringPoint,
    /// Controls to drive.
    pub modes: MeteringModes,
    /// When to give up on the lock; `None` keeps it until replaced.
    pub auto_cancel: Option<Duration>,
}

impl MeteringRequest {
    /// Autofocus plus auto exposure, held until the next request
    pub fn focus_and_expose(point: MeteringPoint) -> Self {
        Self {
            point,
            modes: MeteringModes {
                autofocus: true,
                auto_exposure: true,
            },
            auto_cancel: None,
        }
    }
}

/// Camera operations used by a scan session.
#[async_trait]
pub trait CameraControl: Send + Sync {
    /// Whether the user has granted camera access
    fn has_permission(&self) -> bool;

    /// Bind preview and frame analysis
    async fn bind(&self) -> Result<(), CaptureError>;

    /// Release the camera
    async fn unbind(&self) {}

    /// Run a focus/metering request; `Ok(true)` means focus locked
    async fn start_focus_and_metering(&self, request: MeteringRequest)
        -> Result<bool, CaptureError>;
}
