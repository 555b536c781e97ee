//! Gesture classifier using ONNX Runtime via `ort`.
//!
//! Wraps the landmark MLP exported from the trained gesture model:
//! `[1, 63]` features in, `[1, C]` class scores out.
use std::path::Path;

use ndarray::Array2;

use crate::gesture::domain::gesture_classifier::GestureClassifier;
use crate::gesture::domain::gesture_error::GestureError;
use crate::gesture::domain::hand_landmarks::FEATURE_LEN;
use crate::shared::onnx_session::load_session;

pub struct OnnxGestureClassifier {
    session: ort::session::Session,
}

impl OnnxGestureClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        Ok(Self { session })
    }
}

impl GestureClassifier for OnnxGestureClassifier {
    fn predict(&mut self, features: &[f32]) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let input_tensor = to_batch(features)?;
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Gesture model produced no outputs".into());
        }
        let scores = outputs[0].try_extract_array::<f32>()?;
        Ok(scores.iter().copied().collect())
    }
}

/// Wrap one feature vector as a batch of size 1.
fn to_batch(features: &[f32]) -> Result<Array2<f32>, GestureError> {
    if features.len() != FEATURE_LEN {
        return Err(GestureError::FeatureLength {
            expected: FEATURE_LEN,
            actual: features.len(),
        });
    }
    let mut batch = Array2::<f32>::zeros((1, FEATURE_LEN));
    for (dst, &src) in batch.iter_mut().zip(features) {
        *dst = src;
    }
    Ok(batch)
}
