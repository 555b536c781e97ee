use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Presentation time of a frame in milliseconds, or `None` for stills.
    pub fn timestamp_ms(&self, frame_index: usize) -> Option<f64> {
        if self.fps > 0.0 {
            Some(frame_index as f64 * 1000.0 / self.fps)
        } else {
            None
        }
    }
}
