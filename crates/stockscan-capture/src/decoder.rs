//! Vision decoder interface.

use crate::frame::Frame;
use stockscan_core::CaptureError;

/// Finds a barcode or QR symbol in a frame.
///
/// Symbology support lives in the implementation; the pipeline only cares
/// whether a raw value came out.
pub trait BarcodeDecoder: Send + Sync {
    /// Raw value of the first symbol found, `None` if there is none
    fn decode(&self, frame: &Frame) -> Result<Option<String>, CaptureError>;
}
