use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::gesture::domain::air_canvas::AirCanvas;
use crate::gesture::domain::gesture::Gesture;
use crate::gesture::domain::prediction::GesturePrediction;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::predict_gesture_use_case::PredictGestureUseCase;
use crate::shared::frame::Frame;
use crate::video::domain::video_reader::{FrameStream, VideoReader};

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Receives one record per decoded frame, in frame order.
pub type GestureSink<'a> = dyn FnMut(&FrameGesture) -> Result<(), Box<dyn std::error::Error>> + 'a;

/// Recognition result for one decoded frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameGesture {
    pub frame_index: usize,
    /// `None` for still images.
    pub timestamp_ms: Option<f64>,
    #[serde(flatten)]
    pub prediction: GesturePrediction,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RecognitionSummary {
    pub frames: usize,
    pub frames_with_hand: usize,
    /// Frames per recognized gesture; `none` frames are not counted.
    pub counts: BTreeMap<Gesture, usize>,
}

impl RecognitionSummary {
    fn record(&mut self, prediction: &GesturePrediction) {
        self.frames += 1;
        if !prediction.is_none() {
            self.frames_with_hand += 1;
            *self.counts.entry(prediction.gesture).or_default() += 1;
        }
    }

    /// Most frequent gesture, lowest label first on ties.
    pub fn dominant(&self) -> Option<Gesture> {
        self.counts
            .iter()
            .fold(None, |best: Option<(Gesture, usize)>, (&g, &n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((g, n)),
            })
            .map(|(g, _)| g)
    }
}

/// Runs gesture recognition over every frame of a video or image.
///
/// Layout: `reader thread → bounded channel → caller [predict/canvas/sink]`
///
/// Decoding overlaps with inference; prediction stays on the calling thread
/// so frames are handled strictly in order.
pub struct RecognizeVideoUseCase {
    predictor: PredictGestureUseCase,
    logger: Box<dyn PipelineLogger>,
    canvas_mirror: Option<bool>,
    canvas: Option<AirCanvas>,
    channel_capacity: usize,
}

impl RecognizeVideoUseCase {
    pub fn new(predictor: PredictGestureUseCase) -> Self {
        Self {
            predictor,
            logger: Box::new(NullPipelineLogger),
            canvas_mirror: None,
            canvas: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Feed every frame's hand into an [`AirCanvas`] sized to the source.
    pub fn with_canvas(mut self, mirror: bool) -> Self {
        self.canvas_mirror = Some(mirror);
        self
    }

    /// Canvas from the most recent run, if drawing was enabled.
    pub fn canvas(&self) -> Option<&AirCanvas> {
        self.canvas.as_ref()
    }

    pub fn execute(
        &mut self,
        mut reader: Box<dyn VideoReader>,
        input_path: &Path,
        sink: &mut GestureSink<'_>,
    ) -> Result<RecognitionSummary, Box<dyn std::error::Error>> {
        let metadata = reader.open(input_path)?;
        log::info!(
            "Recognizing {} ({}x{}, {} frames, {:.2} fps)",
            input_path.display(),
            metadata.width,
            metadata.height,
            metadata.total_frames,
            metadata.fps
        );

        self.predictor.reset();
        self.canvas = self
            .canvas_mirror
            .map(|mirror| AirCanvas::new(metadata.width, metadata.height, mirror));

        let (frame_tx, frame_rx) =
            crossbeam_channel::bounded::<Result<Frame, SendError>>(self.channel_capacity);
        let reader_handle = spawn_reader(reader, frame_tx);

        let mut summary = RecognitionSummary::default();
        let mut main_error: Option<Box<dyn std::error::Error>> = None;

        for received in frame_rx.iter() {
            self.logger.gauge("reader_queue_depth", frame_rx.len() as f64);
            let frame = match received {
                Ok(frame) => frame,
                Err(e) => {
                    main_error = Some(e.to_string().into());
                    break;
                }
            };

            let start = Instant::now();
            let prediction = match self.predictor.execute(&frame) {
                Ok(p) => p,
                Err(e) => {
                    main_error = Some(e);
                    break;
                }
            };
            self.logger.stage_time("predict", start.elapsed());
            self.logger.gesture(frame.index(), prediction.gesture);

            if let Some(canvas) = self.canvas.as_mut() {
                canvas.update(self.predictor.last_hand());
            }

            summary.record(&prediction);
            let record = FrameGesture {
                frame_index: frame.index(),
                timestamp_ms: metadata.timestamp_ms(frame.index()),
                prediction,
            };
            if let Err(e) = sink(&record) {
                main_error = Some(e);
                break;
            }
            self.logger.progress(summary.frames, metadata.total_frames);
        }

        // Unblocks the reader if it is waiting on a full channel.
        drop(frame_rx);

        if reader_handle.join().is_err() && main_error.is_none() {
            main_error = Some("Reader thread panicked".into());
        }
        if let Some(e) = main_error {
            return Err(e);
        }

        self.logger.finish();
        Ok(summary)
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: crossbeam_channel::Sender<Result<Frame, SendError>>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for frame_result in reader.frames() {
            let failed = frame_result.is_err();
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            if frame_tx.send(mapped).is_err() || failed {
                break;
            }
        }
        reader.close();
    })
}
