use crate::gesture::domain::gesture::{Gesture, GESTURE_LABELS};
use crate::gesture::domain::gesture_classifier::{argmax, GestureClassifier};
use crate::gesture::domain::gesture_error::GestureError;
use crate::gesture::domain::hand_landmark_detector::HandLandmarkDetector;
use crate::gesture::domain::hand_landmarks::{HandLandmarks, LandmarkIdx, FEATURE_LEN};
use crate::gesture::domain::prediction::GesturePrediction;
use crate::shared::frame::Frame;

/// Per-frame gesture prediction: convert → detect → extract → classify → locate.
///
/// Owns the detector and classifier so both are loaded once and reused for
/// every frame.
pub struct PredictGestureUseCase {
    detector: Box<dyn HandLandmarkDetector>,
    classifier: Box<dyn GestureClassifier>,
    last_hand: Option<HandLandmarks>,
}

impl PredictGestureUseCase {
    pub fn new(
        detector: Box<dyn HandLandmarkDetector>,
        classifier: Box<dyn GestureClassifier>,
    ) -> Self {
        Self {
            detector,
            classifier,
            last_hand: None,
        }
    }

    /// Recognize the gesture in one BGR (or RGB) frame.
    ///
    /// Returns [`GesturePrediction::none`] when no hand was found or the
    /// landmark count is not 21. Detector and classifier failures propagate.
    pub fn execute(
        &mut self,
        frame: &Frame,
    ) -> Result<GesturePrediction, Box<dyn std::error::Error>> {
        self.last_hand = None;
        if frame.channels() != 3 {
            return Err(GestureError::UnsupportedChannels(frame.channels()).into());
        }

        let rgb = frame.to_rgb();
        let hands = self.detector.detect(&rgb)?;
        let Some(hand) = hands.into_iter().next() else {
            return Ok(GesturePrediction::none());
        };

        let features = hand.feature_vector();
        if features.len() != FEATURE_LEN {
            log::debug!(
                "Frame {}: ignoring hand with {} landmarks",
                frame.index(),
                hand.len()
            );
            return Ok(GesturePrediction::none());
        }

        let scores = self.classifier.predict(&features)?;
        let class_id = argmax(&scores).ok_or(GestureError::EmptyScores)?;
        let gesture = Gesture::from_class_index(class_id).ok_or(GestureError::UnknownClass {
            index: class_id,
            classes: GESTURE_LABELS.len(),
        })?;

        let fingertip =
            hand.pixel_position(LandmarkIdx::IndexFingerTip, frame.width(), frame.height());
        self.last_hand = Some(hand);

        Ok(GesturePrediction {
            gesture,
            fingertip,
            confidence: Some(scores[class_id]),
        })
    }

    /// Landmarks behind the most recent non-`none` prediction.
    pub fn last_hand(&self) -> Option<&HandLandmarks> {
        self.last_hand.as_ref()
    }

    /// Drop any tracking state, e.g. when switching to an unrelated source.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.last_hand = None;
    }
}
