use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Pulls decoded frames from a video source.
///
/// Frames arrive in decode order, one at a time, in the reader's native
/// channel order. An `Err` item means the stream cannot be read further.
pub trait VideoReader: Send {
    /// Opens the source and returns its stream parameters.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Lazily decodes the opened stream.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases the source. Safe to call more than once.
    fn close(&mut self);
}
