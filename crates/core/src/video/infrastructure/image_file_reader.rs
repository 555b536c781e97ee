use std::path::Path;

use image::ImageFormat;

use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{FrameStream, VideoReader};

/// A still image seen as a one-frame clip (`fps = 0`, no timestamps).
///
/// Grayscale and alpha images are normalized to three channels, then
/// reordered to BGR so the pipeline sees the same layout a video decoder
/// would produce.
#[derive(Default)]
pub struct ImageFileReader {
    pending: Option<Frame>,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self::default()
    }
}

fn decode_bgr(path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
    let rgb = image::open(path)?.into_rgb8();
    let (width, height) = rgb.dimensions();
    let mut data = rgb.into_raw();
    data.chunks_exact_mut(3).for_each(|px| px.swap(0, 2));
    Ok(Frame::new(data, width, height, 3, PixelFormat::Bgr, 0))
}

fn format_name(path: &Path) -> String {
    ImageFormat::from_path(path)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("image")
        .to_string()
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let frame = decode_bgr(path)?;
        let metadata = VideoMetadata {
            width: frame.width(),
            height: frame.height(),
            fps: 0.0,
            total_frames: 1,
            codec: format_name(path),
            source_path: Some(path.to_path_buf()),
        };
        self.pending = Some(frame);
        Ok(metadata)
    }

    fn frames(&mut self) -> FrameStream<'_> {
        match self.pending.take() {
            Some(frame) => Box::new(std::iter::once(Ok(frame))),
            None => Box::new(std::iter::once(Err(
                "ImageFileReader: no image loaded".into()
            ))),
        }
    }

    fn close(&mut self) {
        self.pending = None;
    }
}
