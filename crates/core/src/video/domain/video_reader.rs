use std::error::Error;
use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Lazily decoded frames; an `Err` item ends the stream for the pipeline.
pub type FrameStream<'a> = Box<dyn Iterator<Item = Result<Frame, Box<dyn Error>>> + 'a>;

/// Source of BGR frames for recognition: a video file, or an image treated
/// as a one-frame clip.
///
/// `open` must succeed before `frames` yields anything but an error. A
/// reader is moved to a decode thread, hence `Send`.
pub trait VideoReader: Send {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn Error>>;

    fn frames(&mut self) -> FrameStream<'_>;

    /// Safe to call more than once.
    fn close(&mut self);
}
