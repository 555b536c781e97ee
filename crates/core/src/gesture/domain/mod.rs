pub mod air_canvas;
pub mod gesture;
pub mod gesture_classifier;
pub mod gesture_error;
pub mod hand_landmark_detector;
pub mod hand_landmarks;
pub mod hand_pose;
pub mod prediction;
