//! Hand landmark detector using ONNX Runtime via `ort`.
//!
//! Runs a MediaPipe-style hand landmark model (224×224 RGB in, 21×3
//! landmarks plus a hand presence score out) on a rotated square region of
//! the frame. The first region comes from the palm detector when one is
//! attached, else from a letterboxed pass over the whole frame. In video
//! mode the region then follows the hand between frames; when the track is
//! lost, the hand is searched for again.
use std::path::Path;

use ndarray::{Array4, ArrayView3};

use crate::gesture::domain::gesture_error::GestureError;
use crate::gesture::domain::hand_landmark_detector::HandLandmarkDetector;
use crate::gesture::domain::hand_landmarks::{HandLandmarks, Landmark, FEATURE_LEN};
use crate::gesture::infrastructure::hand_roi::{crop_tensor, Roi, TensorLayout};
use crate::gesture::infrastructure::onnx_palm_detector::OnnxPalmDetector;
use crate::shared::constants::{DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_MIN_TRACKING_CONFIDENCE};
use crate::shared::frame::Frame;
use crate::shared::onnx_session::load_session;

/// Model input resolution.
const INPUT_SIZE: usize = 224;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandLandmarkerOptions {
    /// Treat every frame independently (no tracking).
    pub static_image_mode: bool,
    /// Presence score needed to accept a newly found hand.
    pub min_detection_confidence: f32,
    /// Presence score needed to keep following a tracked hand.
    pub min_tracking_confidence: f32,
}

impl Default for HandLandmarkerOptions {
    fn default() -> Self {
        Self {
            static_image_mode: false,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
        }
    }
}

/// The raw landmark model: one input tensor, landmarks and presence out.
pub(crate) trait LandmarkModel: Send {
    fn layout(&self) -> TensorLayout;

    /// Returns the landmark values in input pixels and the raw presence.
    fn run(&mut self, input: Array4<f32>) -> Result<(Vec<f32>, f32), Box<dyn std::error::Error>>;
}

struct OrtLandmarkModel {
    session: ort::session::Session,
    layout: TensorLayout,
}

impl LandmarkModel for OrtLandmarkModel {
    fn layout(&self) -> TensorLayout {
        self.layout
    }

    fn run(&mut self, input: Array4<f32>) -> Result<(Vec<f32>, f32), Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Outputs: landmarks [1, 63], presence [1, 1], handedness [1, 1] (unused)
        if outputs.len() < 2 {
            return Err(format!(
                "Hand landmark model expected at least 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }
        let landmarks = outputs[0].try_extract_array::<f32>()?;
        let presence = outputs[1].try_extract_array::<f32>()?;
        let presence = presence
            .iter()
            .next()
            .copied()
            .ok_or("Empty presence output")?;
        Ok((landmarks.iter().copied().collect(), presence))
    }
}

/// Hand landmark detector backed by an ONNX Runtime session. Single hand.
pub struct OnnxHandLandmarker {
    model: Box<dyn LandmarkModel>,
    palm_detector: Option<OnnxPalmDetector>,
    options: HandLandmarkerOptions,
    tracked: Option<Roi>,
}

impl OnnxHandLandmarker {
    /// Load a hand landmark ONNX model.
    ///
    /// The tensor layout is read from the model's input shape: a channel
    /// dimension of 3 in position 1 means NCHW, anything else NHWC.
    pub fn new(
        model_path: &Path,
        options: HandLandmarkerOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let layout = TensorLayout::of(&session);
        log::debug!("Hand landmark model input layout: {layout:?}");
        Ok(Self::with_model(
            Box::new(OrtLandmarkModel { session, layout }),
            options,
        ))
    }

    pub(crate) fn with_model(
        model: Box<dyn LandmarkModel>,
        options: HandLandmarkerOptions,
    ) -> Self {
        Self {
            model,
            palm_detector: None,
            options,
            tracked: None,
        }
    }

    /// Find new hands with a palm detector instead of the letterbox pass.
    pub fn with_palm_detector(mut self, palm_detector: OnnxPalmDetector) -> Self {
        self.palm_detector = Some(palm_detector);
        self
    }

    /// Run the model on one region; returns the landmarks and presence score.
    fn run_roi(
        &mut self,
        src: ArrayView3<'_, u8>,
        roi: Roi,
        width: u32,
        height: u32,
    ) -> Result<(HandLandmarks, f32), Box<dyn std::error::Error>> {
        let input = crop_tensor(src, roi, INPUT_SIZE, self.model.layout());
        let (raw, presence) = self.model.run(input)?;
        if raw.len() < FEATURE_LEN {
            return Err(GestureError::FeatureLength {
                expected: FEATURE_LEN,
                actual: raw.len(),
            }
            .into());
        }
        let hand = decode_landmarks(&raw[..FEATURE_LEN], roi, INPUT_SIZE, width, height);
        Ok((hand, as_probability(presence)))
    }

    /// Region a new hand is searched in: the best palm, else the letterbox.
    fn search_roi(
        &mut self,
        src: ArrayView3<'_, u8>,
        width: u32,
        height: u32,
    ) -> Result<Option<Roi>, Box<dyn std::error::Error>> {
        let Some(palm_detector) = self.palm_detector.as_mut() else {
            return Ok(Some(Roi::full_frame(width, height)));
        };
        Ok(palm_detector.detect(src)?.first().map(|palm| palm.hand_roi()))
    }
}

impl HandLandmarkDetector for OnnxHandLandmarker {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandLandmarks>, Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(GestureError::UnsupportedChannels(frame.channels()).into());
        }
        let (w, h) = (frame.width(), frame.height());
        if w == 0 || h == 0 {
            return Ok(Vec::new());
        }
        let src = frame
            .as_ndarray()
            .ok_or("Frame data length does not match its dimensions")?;

        if !self.options.static_image_mode {
            if let Some(roi) = self.tracked {
                let (hand, presence) = self.run_roi(src, roi, w, h)?;
                if presence >= self.options.min_tracking_confidence {
                    self.tracked = Roi::around(&hand, w, h);
                    return Ok(vec![hand]);
                }
                log::debug!(
                    "Frame {}: hand track lost (presence {presence:.2})",
                    frame.index()
                );
                self.tracked = None;
            }
        }

        let Some(roi) = self.search_roi(src, w, h)? else {
            return Ok(Vec::new());
        };
        let (hand, presence) = self.run_roi(src, roi, w, h)?;
        if presence < self.options.min_detection_confidence {
            return Ok(Vec::new());
        }
        if !self.options.static_image_mode {
            self.tracked = Roi::around(&hand, w, h);
        }
        Ok(vec![hand])
    }

    fn reset(&mut self) {
        self.tracked = None;
    }
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Map model-space landmarks (input pixels) back to frame-normalized coordinates.
fn decode_landmarks(raw: &[f32], roi: Roi, size: usize, width: u32, height: u32) -> HandLandmarks {
    let scale = roi.size / size as f64;
    let (w, h) = (width as f64, height as f64);
    let points = raw
        .chunks_exact(3)
        .map(|c| {
            let (x, y) = roi.to_frame(c[0] as f64, c[1] as f64, size);
            let z = c[2] as f64 * scale / w;
            Landmark::new((x / w) as f32, (y / h) as f32, z as f32)
        })
        .collect();
    HandLandmarks::new(points)
}

/// Some exports emit the presence logit, others the sigmoid output.
fn as_probability(v: f32) -> f32 {
    if (0.0..=1.0).contains(&v) {
        v
    } else {
        sigmoid(v)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
