//! # StockScan Capture
//!
//! Turns a live camera stream into at most one scan value per scan session.
//!
//! - [`frame`]: pooled frame buffers that are always handed back
//! - [`pipeline`]: throttling, decoding and the single-winner emission
//! - [`focus`]: tap/center focus with a saved focus point
//! - [`session`]: permission check, camera binding and the analyzer task
//! - [`virtual_camera`]: a software camera for headless runs

pub mod camera;
pub mod decoder;
pub mod focus;
pub mod frame;
pub mod pipeline;
pub mod session;
pub mod virtual_camera;

pub use camera::{CameraControl, MeteringModes, MeteringPoint, MeteringRequest};
pub use decoder::BarcodeDecoder;
pub use focus::{FocusController, FocusOutcome};
pub use frame::{Frame, FramePool, FrameSource};
pub use pipeline::{CapturePipeline, FrameOutcome, PipelineConfig, PipelineStats};
pub use session::{spawn_analyzer, AnalyzerEnd, AnalyzerReport, ScanSession};
pub use virtual_camera::{PayloadDecoder, VirtualCamera, VirtualStream};
