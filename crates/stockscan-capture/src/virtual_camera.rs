//! Software camera
//!
//! A camera that "sees" text payloads, for headless runs and tests. Frames
//! carry the payload bytes and [`PayloadDecoder`] reads them back, so the
//! full session path (permission, binding, focus, throttling, emission)
//! runs without camera hardware.

use crate::camera::{CameraControl, MeteringRequest};
use crate::decoder::BarcodeDecoder;
use crate::frame::{Frame, FramePool, FrameSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use stockscan_core::CaptureError;

const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;

/// Camera backed by a frame pool and a fixed frame rate.
#[derive(Debug)]
pub struct VirtualCamera {
    permission_granted: bool,
    bind_error: Option<String>,
    focus_locks: bool,
    frame_interval: Duration,
    pool: FramePool,
    bound: AtomicBool,
    metering: Mutex<Vec<MeteringRequest>>,
}

impl VirtualCamera {
    /// A permitted camera at roughly 30 frames per second
    pub fn new() -> Self {
        Self {
            permission_granted: true,
            bind_error: None,
            focus_locks: true,
            frame_interval: Duration::from_millis(33),
            pool: FramePool::new(2),
            bound: AtomicBool::new(false),
            metering: Mutex::new(Vec::new()),
        }
    }

    /// Set whether camera permission is granted
    pub fn with_permission(mut self, granted: bool) -> Self {
        self.permission_granted = granted;
        self
    }

    /// Make `bind` fail with this reason
    pub fn with_bind_error(mut self, reason: impl Into<String>) -> Self {
        self.bind_error = Some(reason.into());
        self
    }

    /// Set whether focus requests lock
    pub fn with_focus_locking(mut self, locks: bool) -> Self {
        self.focus_locks = locks;
        self
    }

    /// Set the gap between frames
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Whether the camera is currently bound
    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    /// Focus requests received so far
    pub fn metering_requests(&self) -> Vec<MeteringRequest> {
        self.metering.lock().clone()
    }

    /// The pool frames are drawn from
    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    /// Frames showing nothing for `lead_in` frames, then `payload` until
    /// `max_frames` frames have been produced
    pub fn stream(&self, payload: Option<&str>, lead_in: usize, max_frames: usize) -> VirtualStream {
        VirtualStream {
            pool: self.pool.clone(),
            payload: payload.map(|p| p.as_bytes().to_vec()),
            lead_in,
            remaining: max_frames,
            produced: 0,
            interval: self.frame_interval,
        }
    }
}

impl Default for VirtualCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraControl for VirtualCamera {
    fn has_permission(&self) -> bool {
        self.permission_granted
    }

    async fn bind(&self) -> Result<(), CaptureError> {
        if let Some(reason) = &self.bind_error {
            return Err(CaptureError::CameraBinding {
                reason: reason.clone(),
            });
        }
        self.bound.store(true, Ordering::Release);
        Ok(())
    }

    async fn unbind(&self) {
        self.bound.store(false, Ordering::Release);
    }

    async fn start_focus_and_metering(
        &self,
        request: MeteringRequest,
    ) -> Result<bool, CaptureError> {
        if !self.is_bound() {
            return Err(CaptureError::Focus {
                reason: "camera not bound".to_string(),
            });
        }
        self.metering.lock().push(request);
        Ok(self.focus_locks)
    }
}

/// Frame stream produced by [`VirtualCamera::stream`].
#[derive(Debug)]
pub struct VirtualStream {
    pool: FramePool,
    payload: Option<Vec<u8>>,
    lead_in: usize,
    remaining: usize,
    produced: usize,
    interval: Duration,
}

impl FrameSource for VirtualStream {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.remaining == 0 {
            return None;
        }
        if self.produced > 0 && !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        let bytes: &[u8] = match &self.payload {
            Some(payload) if self.produced >= self.lead_in => payload,
            _ => &[],
        };
        let frame = self.pool.acquire(bytes, FRAME_WIDTH, FRAME_HEIGHT)?;
        self.remaining -= 1;
        self.produced += 1;
        Some(frame)
    }
}

/// Decoder that reads a frame's bytes as the symbol text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PayloadDecoder;

impl BarcodeDecoder for PayloadDecoder {
    fn decode(&self, frame: &Frame) -> Result<Option<String>, CaptureError> {
        let text = std::str::from_utf8(frame.data()).map_err(|e| CaptureError::Decoder {
            reason: e.to_string(),
        })?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}
