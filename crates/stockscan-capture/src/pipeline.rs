//! Capture Pipeline
//!
//! Turns frames into at most one scan value per armed period.
//!
//! For each frame the pipeline either drops it (disarmed, or too soon after
//! the previous decode attempt) or runs the decoder on it. The first
//! non-empty result wins an atomic `armed: true -> false` swap and is
//! published; results that lose the swap are discarded. Every frame is
//! released before `analyze` returns.

use crate::decoder::BarcodeDecoder;
use crate::focus::FocusController;
use crate::frame::Frame;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stockscan_core::constants::DEFAULT_THROTTLE_MS;
use stockscan_core::{FeedbackSink, ScanEventBus, ScanValue};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum gap between decode attempts.
    pub throttle: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(DEFAULT_THROTTLE_MS),
        }
    }
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Dropped because the previous decode attempt was too recent.
    Throttled,
    /// Dropped because the session already emitted.
    Disarmed,
    /// Decoded, nothing found.
    NoDetection,
    /// The decoder failed; treated as nothing found.
    DecodeFailed,
    /// This frame's value was published.
    Emitted(ScanValue),
    /// Found a value but another frame emitted first.
    LostRace,
}

/// Counter snapshot for one pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames handed to `analyze`.
    pub frames_seen: u64,
    /// Frames dropped by the throttle.
    pub throttled: u64,
    /// Frames submitted to the decoder.
    pub decode_attempts: u64,
    /// Values published.
    pub emitted: u64,
    /// Frames released.
    pub released: u64,
}

#[derive(Debug, Default)]
struct Counters {
    frames_seen: AtomicU64,
    throttled: AtomicU64,
    decode_attempts: AtomicU64,
    emitted: AtomicU64,
    released: AtomicU64,
}

/// Single-winner frame analyzer.
pub struct CapturePipeline {
    decoder: Arc<dyn BarcodeDecoder>,
    bus: Arc<ScanEventBus>,
    feedback: Arc<dyn FeedbackSink>,
    focus: Mutex<Option<Arc<FocusController>>>,
    armed: AtomicBool,
    last_attempt: Mutex<Option<Instant>>,
    config: PipelineConfig,
    counters: Counters,
}

impl CapturePipeline {
    /// Create an armed pipeline publishing to `bus`
    pub fn new(
        decoder: Arc<dyn BarcodeDecoder>,
        bus: Arc<ScanEventBus>,
        feedback: Arc<dyn FeedbackSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            decoder,
            bus,
            feedback,
            focus: Mutex::new(None),
            armed: AtomicBool::new(true),
            last_attempt: Mutex::new(None),
            config,
            counters: Counters::default(),
        }
    }

    /// Save the focus point through this controller on every emission
    pub fn attach_focus(&self, focus: Arc<FocusController>) {
        *self.focus.lock() = Some(focus);
    }

    /// Begin a new scan session
    ///
    /// Re-arms the pipeline and clears the bus so this session's value is
    /// delivered even if it equals the previous session's.
    pub fn start_session(&self) {
        self.bus.clear();
        *self.last_attempt.lock() = None;
        self.arm();
        tracing::debug!("Scan session started");
    }

    /// Allow the next detected value to be emitted
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Stop emitting without starting a new session
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    /// Whether the next detected value would be emitted
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Analyze one frame
    pub fn analyze(&self, frame: Frame) -> FrameOutcome {
        self.counters.frames_seen.fetch_add(1, Ordering::Relaxed);

        if !self.is_armed() {
            self.release(frame);
            return FrameOutcome::Disarmed;
        }

        if !self.accept_attempt() {
            self.counters.throttled.fetch_add(1, Ordering::Relaxed);
            self.release(frame);
            return FrameOutcome::Throttled;
        }

        self.counters.decode_attempts.fetch_add(1, Ordering::Relaxed);
        let decoded = self.decoder.decode(&frame);
        self.release(frame);

        let raw = match decoded {
            Ok(Some(raw)) => raw,
            Ok(None) => return FrameOutcome::NoDetection,
            Err(e) => {
                tracing::warn!("Decoder failed, treating frame as empty: {}", e);
                return FrameOutcome::DecodeFailed;
            }
        };
        let Ok(value) = ScanValue::new(raw) else {
            return FrameOutcome::NoDetection;
        };

        if self
            .armed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Detection '{}' lost the race, discarded", value);
            return FrameOutcome::LostRace;
        }

        self.emit(value.clone());
        FrameOutcome::Emitted(value)
    }

    /// Counter snapshot
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            frames_seen: self.counters.frames_seen.load(Ordering::Relaxed),
            throttled: self.counters.throttled.load(Ordering::Relaxed),
            decode_attempts: self.counters.decode_attempts.load(Ordering::Relaxed),
            emitted: self.counters.emitted.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
        }
    }

    /// Get the current configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn accept_attempt(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_attempt.lock();
        if let Some(previous) = *last {
            if now.duration_since(previous) < self.config.throttle {
                return false;
            }
        }
        *last = Some(now);
        true
    }

    fn release(&self, frame: Frame) {
        frame.release();
        self.counters.released.fetch_add(1, Ordering::Relaxed);
    }

    fn emit(&self, value: ScanValue) {
        self.counters.emitted.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Scanned '{}'", value);

        let focus = self.focus.lock().clone();
        if let Some(focus) = focus {
            focus.remember_point();
        }

        self.bus.publish(value);
        if self.bus.claim_feedback() {
            self.feedback.play_confirmation();
        }
    }
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("armed", &self.is_armed())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
