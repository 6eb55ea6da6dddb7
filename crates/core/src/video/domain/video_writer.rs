use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Encodes frames into an output container with the geometry and frame
/// rate of the given metadata.
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes buffered packets and finalizes the container. A writer that
    /// was never opened, or is already closed, returns `Ok`.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
