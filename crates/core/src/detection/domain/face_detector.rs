use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::region::RelativeBox;

/// Domain interface for face detection.
///
/// Implementations receive frames in the channel order they declare via
/// [`FaceDetector::pixel_format`]; callers convert before calling. Results
/// are unordered relative boxes. `&mut self` because inference sessions
/// need mutable access, not because detections carry state between frames.
pub trait FaceDetector: Send {
    fn pixel_format(&self) -> PixelFormat;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RelativeBox>, Box<dyn std::error::Error>>;
}
