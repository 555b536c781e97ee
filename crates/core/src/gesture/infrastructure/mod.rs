pub mod canvas_image_writer;
pub(crate) mod hand_roi;
pub mod onnx_gesture_classifier;
pub mod onnx_hand_landmarker;
pub mod onnx_palm_detector;
