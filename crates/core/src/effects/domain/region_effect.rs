use crate::shared::frame::Frame;
use crate::shared::region::PixelRect;

/// An in-place transform of one rectangular region of a frame.
///
/// `rect` is already clipped to the frame. Implementations must treat a
/// degenerate rect as a no-op and must not touch pixels outside `rect`,
/// except for overlay effects that deliberately draw around it.
pub trait RegionEffect: Send {
    fn apply(&mut self, frame: &mut Frame, rect: &PixelRect) -> Result<(), Box<dyn std::error::Error>>;
}
