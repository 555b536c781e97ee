use std::path::Path;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as AvFrame;

use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{FrameStream, VideoReader};

/// Video file reader backed by libavformat/libavcodec.
///
/// Frames come out as packed BGR24 at the source resolution. With a stride
/// above 1 only every n-th decoded frame is yielded; yielded frames keep
/// their source index so timestamps stay correct.
pub struct FfmpegReader {
    input: Option<Input>,
    stream_index: usize,
    stride: usize,
}

// The input context is moved to the reader thread and only touched there.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input: None,
            stream_index: 0,
            stride: 1,
        }
    }

    /// Yield every `stride`-th frame. Values below 1 are treated as 1.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride.max(1);
        self
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let input = ffmpeg_next::format::input(path)?;

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| format!("{}: no video stream", path.display()))?;
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let rate = stream.rate();
        let fps = match rate.denominator() {
            0 => 0.0,
            d => f64::from(rate.numerator()) / f64::from(d),
        };
        let source_frames = stream.frames().max(0) as usize;

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames: source_frames.div_ceil(self.stride),
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };
        log::debug!(
            "{}: {} {}x{}, {source_frames} frames at {fps:.2} fps, stride {}",
            path.display(),
            metadata.codec,
            metadata.width,
            metadata.height,
            self.stride
        );

        self.stream_index = stream.index();
        self.input = Some(input);
        Ok(metadata)
    }

    fn frames(&mut self) -> FrameStream<'_> {
        let (stream_index, stride) = (self.stream_index, self.stride);
        let Some(input) = self.input.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };
        match BgrDecoder::new(input, stream_index) {
            Ok(decoder) => Box::new(
                DecodeIter {
                    input,
                    decoder,
                    stream_index,
                    state: DecodeState::Reading,
                }
                .filter(move |item| match item {
                    Ok(frame) => frame.index() % stride == 0,
                    Err(_) => true,
                }),
            ),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input = None;
    }
}

/// Video decoder plus the scaler that turns its output into BGR24.
struct BgrDecoder {
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    next_index: usize,
}

impl BgrDecoder {
    fn new(input: &Input, stream_index: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = input
            .stream(stream_index)
            .ok_or("video stream disappeared after open")?;
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;
        let (w, h) = (decoder.width(), decoder.height());
        let scaler = scaling::Context::get(
            decoder.format(),
            w,
            h,
            ffmpeg_next::format::Pixel::BGR24,
            w,
            h,
            scaling::Flags::BILINEAR,
        )?;
        Ok(Self {
            decoder,
            scaler,
            next_index: 0,
        })
    }

    /// Pull one decoded frame if the codec has one ready.
    fn receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = AvFrame::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut bgr = AvFrame::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut bgr) {
            return Some(Err(e.into()));
        }
        let (w, h) = (bgr.width(), bgr.height());
        let index = self.next_index;
        self.next_index += 1;
        Some(Ok(Frame::new(
            packed_rows(&bgr, w, h),
            w,
            h,
            3,
            PixelFormat::Bgr,
            index,
        )))
    }
}

#[derive(Clone, Copy)]
enum DecodeState {
    Reading,
    /// EOF sent; emptying the codec's remaining frames.
    Draining,
    Done,
}

struct DecodeIter<'a> {
    input: &'a mut Input,
    decoder: BgrDecoder,
    stream_index: usize,
    state: DecodeState,
}

impl Iterator for DecodeIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                DecodeState::Done => return None,
                DecodeState::Draining => {
                    let frame = self.decoder.receive();
                    if frame.is_none() {
                        self.state = DecodeState::Done;
                    }
                    return frame;
                }
                DecodeState::Reading => {
                    if let Some(frame) = self.decoder.receive() {
                        return Some(frame);
                    }
                    match self.input.packets().next() {
                        Some((stream, packet)) if stream.index() == self.stream_index => {
                            if let Err(e) = self.decoder.decoder.send_packet(&packet) {
                                log::warn!("Skipping undecodable packet: {e}");
                            }
                        }
                        Some(_) => {}
                        None => {
                            if let Err(e) = self.decoder.decoder.send_eof() {
                                log::debug!("Decoder rejected EOF: {e}");
                            }
                            self.state = DecodeState::Draining;
                        }
                    }
                }
            }
        }
    }
}

/// Copy plane 0 into a tight `width * 3` byte-per-row buffer, dropping the
/// row padding ffmpeg adds for alignment.
fn packed_rows(frame: &AvFrame, width: u32, height: u32) -> Vec<u8> {
    let row_bytes = width as usize * 3;
    frame
        .data(0)
        .chunks(frame.stride(0))
        .take(height as usize)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ffmpeg_next::{codec, encoder, format, Packet, Rational};

    /// Encode an MPEG-4 clip where frame `i` is filled with `color(i)` (RGB).
    pub(crate) fn create_test_video(
        path: &Path,
        num_frames: usize,
        width: u32,
        height: u32,
        fps: i32,
        color: impl Fn(usize) -> [u8; 3],
    ) {
        ffmpeg_next::init().unwrap();
        let mut octx = format::output(path).unwrap();
        let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

        let mpeg4 = encoder::find(codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(mpeg4)).unwrap();
        let mut ctx = codec::context::Context::new_with_codec(mpeg4)
            .encoder()
            .video()
            .unwrap();
        ctx.set_width(width);
        ctx.set_height(height);
        ctx.set_format(format::Pixel::YUV420P);
        ctx.set_time_base(Rational(1, fps));
        ctx.set_frame_rate(Some(Rational(fps, 1)));
        if global_header {
            ctx.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let mut enc = ctx.open_with(ffmpeg_next::Dictionary::new()).unwrap();
        ost.set_parameters(&enc);
        octx.write_header().unwrap();
        let time_base = octx.stream(0).unwrap().time_base();

        let mut to_yuv = scaling::Context::get(
            format::Pixel::RGB24,
            width,
            height,
            format::Pixel::YUV420P,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .unwrap();

        let mut packet = Packet::empty();
        for i in 0..=num_frames {
            if i < num_frames {
                let mut rgb = AvFrame::new(format::Pixel::RGB24, width, height);
                let stride = rgb.stride(0);
                let fill = color(i);
                for row in rgb.data_mut(0).chunks_mut(stride).take(height as usize) {
                    for px in row[..width as usize * 3].chunks_exact_mut(3) {
                        px.copy_from_slice(&fill);
                    }
                }
                let mut yuv = AvFrame::empty();
                to_yuv.run(&rgb, &mut yuv).unwrap();
                yuv.set_pts(Some(i as i64));
                enc.send_frame(&yuv).unwrap();
            } else {
                enc.send_eof().unwrap();
            }
            while enc.receive_packet(&mut packet).is_ok() {
                packet.set_stream(0);
                packet.rescale_ts(Rational(1, fps), time_base);
                packet.write_interleaved(&mut octx).unwrap();
            }
        }
        octx.write_trailer().unwrap();
    }

    fn gray(_: usize) -> [u8; 3] {
        [128, 128, 128]
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 5, 160, 120, 30, gray);

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path).unwrap();
        assert_eq!((meta.width, meta.height), (160, 120));
        assert!(meta.fps > 0.0);
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_open_missing_file_is_error() {
        let mut reader = FfmpegReader::new();
        assert!(reader.open(Path::new("/nonexistent/clip.mp4")).is_err());
    }

    #[test]
    fn test_yields_every_frame_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 5, 160, 120, 30, gray);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        let indices: Vec<_> = reader.frames().map(|f| f.unwrap().index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_stride_keeps_source_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 7, 160, 120, 30, gray);

        let mut reader = FfmpegReader::new().with_stride(3);
        let meta = reader.open(&path).unwrap();
        if meta.total_frames > 0 {
            assert_eq!(meta.total_frames, 3);
        }
        let indices: Vec<_> = reader.frames().map(|f| f.unwrap().index()).collect();
        assert_eq!(indices, vec![0, 3, 6]);
    }

    #[test]
    fn test_frames_are_packed_bgr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 1, 160, 120, 30, |_| [0, 0, 255]);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        let frame = reader.frames().next().unwrap().unwrap();
        assert_eq!(frame.format(), PixelFormat::Bgr);
        assert_eq!(frame.data().len(), 160 * 120 * 3);
        let center = (60 * 160 + 80) * 3;
        let px = &frame.data()[center..center + 3];
        assert!(px[0] > 200, "blue should come first, got {px:?}");
        assert!(px[2] < 60, "red should come last, got {px:?}");
    }

    #[test]
    fn test_frames_before_open_is_error() {
        let mut reader = FfmpegReader::new();
        assert!(reader.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_close_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 1, 160, 120, 30, gray);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        reader.close();
        reader.close();
        assert!(reader.frames().next().unwrap().is_err());
    }
}
