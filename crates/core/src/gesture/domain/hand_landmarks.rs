//! 21-point hand landmarks and feature extraction.
//!
//! Coordinates are normalized to the frame: x by width, y by height, and z
//! (depth relative to the wrist) on roughly the same scale as x.

use serde::Serialize;

/// Number of landmarks in a well-formed hand.
pub const NUM_LANDMARKS: usize = 21;

/// Length of the flattened feature vector for a well-formed hand.
pub const FEATURE_LEN: usize = NUM_LANDMARKS * 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Landmark indices in the order produced by the hand landmark model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Landmarks of one detected hand.
///
/// Any number of points is representable; consumers that need a complete
/// hand check [`HandLandmarks::is_complete`] or the feature length.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HandLandmarks {
    points: Vec<Landmark>,
}

impl HandLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() == NUM_LANDMARKS
    }

    pub fn get(&self, idx: LandmarkIdx) -> Option<&Landmark> {
        self.points.get(idx as usize)
    }

    /// Flatten into `[x0, y0, z0, x1, y1, z1, ...]`.
    pub fn feature_vector(&self) -> Vec<f32> {
        self.points.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
    }

    /// Pixel position of a landmark in a `width × height` frame, rounded to
    /// the nearest pixel.
    pub fn pixel_position(&self, idx: LandmarkIdx, width: u32, height: u32) -> Option<(i32, i32)> {
        self.get(idx).map(|p| {
            (
                (p.x as f64 * width as f64).round() as i32,
                (p.y as f64 * height as f64).round() as i32,
            )
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    /// A synthetic hand whose point `i` is `(i/100, i/50, -i/1000)`.
    pub(crate) fn ramp_hand() -> HandLandmarks {
        HandLandmarks::new(
            (0..NUM_LANDMARKS)
                .map(|i| Landmark::new(i as f32 / 100.0, i as f32 / 50.0, -(i as f32) / 1000.0))
                .collect(),
        )
    }

    #[test]
    fn test_feature_vector_has_63_values() {
        let hand = ramp_hand();
        assert!(hand.is_complete());
        assert_eq!(hand.feature_vector().len(), FEATURE_LEN);
        assert_eq!(FEATURE_LEN, 63);
    }

    #[test]
    fn test_feature_vector_preserves_point_then_axis_order() {
        let hand = ramp_hand();
        let features = hand.feature_vector();
        for (i, p) in hand.points().iter().enumerate() {
            assert_eq!(features[i * 3], p.x);
            assert_eq!(features[i * 3 + 1], p.y);
            assert_eq!(features[i * 3 + 2], p.z);
        }
    }

    #[test]
    fn test_feature_vector_of_short_hand_is_short() {
        let hand = HandLandmarks::new(vec![Landmark::new(0.1, 0.2, 0.3); 20]);
        assert!(!hand.is_complete());
        assert_eq!(hand.feature_vector().len(), 60);
    }

    #[test]
    fn test_get_by_named_index() {
        let hand = ramp_hand();
        let tip = hand.get(LandmarkIdx::IndexFingerTip).unwrap();
        assert_relative_eq!(tip.x, 0.08);
        assert_relative_eq!(tip.y, 0.16);
        assert_eq!(LandmarkIdx::PinkyTip as usize, 20);
    }

    #[rstest]
    #[case(0.5, 0.5, 640, 480, (320, 240))]
    #[case(0.3337, 0.251, 640, 480, (214, 120))]
    #[case(0.0, 1.0, 1920, 1080, (0, 1080))]
    #[case(0.9999, 0.0001, 100, 100, (100, 0))]
    fn test_pixel_position_rounds(
        #[case] x: f32,
        #[case] y: f32,
        #[case] width: u32,
        #[case] height: u32,
        #[case] expected: (i32, i32),
    ) {
        let mut points = vec![Landmark::default(); NUM_LANDMARKS];
        points[LandmarkIdx::IndexFingerTip as usize] = Landmark::new(x, y, 0.0);
        let hand = HandLandmarks::new(points);
        assert_eq!(
            hand.pixel_position(LandmarkIdx::IndexFingerTip, width, height),
            Some(expected)
        );
    }

    #[test]
    fn test_pixel_position_missing_landmark() {
        let hand = HandLandmarks::new(vec![Landmark::default(); 5]);
        assert_eq!(
            hand.pixel_position(LandmarkIdx::IndexFingerTip, 640, 480),
            None
        );
    }
}
