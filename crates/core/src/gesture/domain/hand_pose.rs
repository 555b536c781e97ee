//! Geometric hand pose rules used to drive the air canvas.
//!
//! These work on raw landmarks without the classifier. Image y grows
//! downwards, so "above" means a smaller y.

use crate::gesture::domain::hand_landmarks::{HandLandmarks, LandmarkIdx};

/// A fingertip must sit this far below the wrist (normalized y) to count as curled.
pub const FIST_WRIST_MARGIN: f32 = 0.1;

const FINGERTIPS: [LandmarkIdx; 4] = [
    LandmarkIdx::IndexFingerTip,
    LandmarkIdx::MiddleFingerTip,
    LandmarkIdx::RingFingerTip,
    LandmarkIdx::PinkyTip,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandPose {
    Fist,
    Pointing,
    Other,
}

impl HandPose {
    /// Fist takes precedence over pointing. Incomplete hands have no pose.
    pub fn classify(hand: &HandLandmarks) -> Option<HandPose> {
        if !hand.is_complete() {
            return None;
        }
        let y = |idx: LandmarkIdx| hand.get(idx).map(|p| p.y);
        let wrist = y(LandmarkIdx::Wrist)?;
        let [index, middle, ring, pinky] = FINGERTIPS.map(|idx| y(idx).unwrap_or(f32::NAN));

        let is_fist = [index, middle, ring, pinky]
            .iter()
            .all(|&tip| tip > wrist + FIST_WRIST_MARGIN);
        if is_fist {
            return Some(HandPose::Fist);
        }

        let is_pointing = index < middle && index < ring && index < pinky;
        if is_pointing {
            Some(HandPose::Pointing)
        } else {
            Some(HandPose::Other)
        }
    }
}
