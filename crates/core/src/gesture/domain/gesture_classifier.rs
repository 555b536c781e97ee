/// Domain interface for gesture classification.
///
/// Maps one flattened landmark feature vector to per-class scores, indexed
/// the same way as [`GESTURE_LABELS`](super::gesture::GESTURE_LABELS).
pub trait GestureClassifier: Send {
    fn predict(&mut self, features: &[f32]) -> Result<Vec<f32>, Box<dyn std::error::Error>>;
}

/// Index of the highest score. Ties resolve to the lowest index; NaN
/// scores never win. Returns `None` for an empty or all-NaN slice.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}
