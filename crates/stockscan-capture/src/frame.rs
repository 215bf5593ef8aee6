//! Camera frames and the buffer pool behind them.
//!
//! A [`Frame`] owns a buffer borrowed from a pool. The buffer goes back the
//! moment the frame is released or dropped, whichever happens first, and
//! never twice. A camera that runs out of pooled buffers stops producing
//! frames, so forgetting to release one stalls the whole session.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

type ReleaseHook = Box<dyn FnOnce(Vec<u8>) + Send>;

/// A single camera frame.
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    rotation: u16,
    captured_at: Instant,
    release: Option<ReleaseHook>,
}

impl Frame {
    /// A frame that is not tied to any pool
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            rotation: 0,
            captured_at: Instant::now(),
            release: None,
        }
    }

    /// Set the sensor rotation in degrees
    pub fn with_rotation(mut self, rotation: u16) -> Self {
        self.rotation = rotation % 360;
        self
    }

    /// Pixel data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rotation in degrees
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    /// When the frame was produced
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Hand the buffer back to its pool now.
    pub fn release(mut self) {
        self.give_back();
    }

    fn give_back(&mut self) {
        if let Some(hook) = self.release.take() {
            hook(std::mem::take(&mut self.data));
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.give_back();
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rotation", &self.rotation)
            .field("bytes", &self.data.len())
            .field("pooled", &self.release.is_some())
            .finish()
    }
}

/// Anything that yields frames one at a time.
///
/// `next_frame` may block until the camera delivers; `None` ends the stream.
pub trait FrameSource {
    /// Next frame, or `None` when the stream is over
    fn next_frame(&mut self) -> Option<Frame>;
}

impl<I> FrameSource for I
where
    I: Iterator<Item = Frame>,
{
    fn next_frame(&mut self) -> Option<Frame> {
        self.next()
    }
}

#[derive(Debug, Default)]
struct PoolState {
    free: Vec<Vec<u8>>,
    outstanding: usize,
    released: u64,
}

/// Fixed-size pool of frame buffers.
#[derive(Debug, Clone)]
pub struct FramePool {
    capacity: usize,
    state: Arc<Mutex<PoolState>>,
}

impl FramePool {
    /// Create a pool that allows `capacity` frames out at once
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Arc::new(Mutex::new(PoolState::default())),
        }
    }

    /// Take a buffer and fill it, or `None` if every buffer is in use
    pub fn acquire(&self, payload: &[u8], width: u32, height: u32) -> Option<Frame> {
        let mut buffer = {
            let mut state = self.state.lock();
            if state.outstanding >= self.capacity {
                return None;
            }
            state.outstanding += 1;
            state.free.pop().unwrap_or_default()
        };
        buffer.clear();
        buffer.extend_from_slice(payload);

        let pool = self.state.clone();
        let mut frame = Frame::new(buffer, width, height);
        frame.release = Some(Box::new(move |buffer| {
            let mut state = pool.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            state.released += 1;
            state.free.push(buffer);
        }));
        Some(frame)
    }

    /// Frames currently checked out
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// Total releases since the pool was created
    pub fn released(&self) -> u64 {
        self.state.lock().released
    }

    /// Maximum frames out at once
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
