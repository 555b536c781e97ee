use serde::Serialize;

use crate::gesture::domain::gesture::Gesture;

/// Result of recognizing one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GesturePrediction {
    pub gesture: Gesture,
    /// Index fingertip in frame pixels.
    pub fingertip: Option<(i32, i32)>,
    /// Score of the winning class, as reported by the classifier.
    pub confidence: Option<f32>,
}

impl GesturePrediction {
    /// No hand, or no usable landmarks.
    pub fn none() -> Self {
        Self {
            gesture: Gesture::None,
            fingertip: None,
            confidence: None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.gesture == Gesture::None
    }

    /// The `(label, coordinate)` pair handed to per-frame callers.
    pub fn as_pair(&self) -> (&'static str, Option<(i32, i32)>) {
        (self.gesture.label(), self.fingertip)
    }
}
