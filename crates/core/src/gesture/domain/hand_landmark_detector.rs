use crate::gesture::domain::hand_landmarks::HandLandmarks;
use crate::shared::frame::Frame;

/// Domain interface for hand landmark detection.
///
/// Receives RGB frames. Implementations may track the hand between calls
/// (video mode), hence `&mut self`. An empty result means no hand.
pub trait HandLandmarkDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandLandmarks>, Box<dyn std::error::Error>>;

    /// Forget any state carried between frames. Default: no-op.
    fn reset(&mut self) {}
}
