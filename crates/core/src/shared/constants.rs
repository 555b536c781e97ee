pub const CLASSIFIER_MODEL_NAME: &str = "gesture_model.onnx";
pub const LANDMARK_MODEL_NAME: &str = "hand_landmark.onnx";
pub const PALM_MODEL_NAME: &str = "palm_detection.onnx";

/// Directory searched for models shipped alongside the binary.
pub const BUNDLED_MODEL_DIR: &str = "model";

/// Application directory name under the platform cache/config roots.
pub const APP_DIR_NAME: &str = "gesturecam";

pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.7;
pub const DEFAULT_MIN_TRACKING_CONFIDENCE: f32 = 0.5;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
