pub mod pipeline_logger;
pub mod predict_gesture_use_case;
pub mod recognize_video_use_case;
