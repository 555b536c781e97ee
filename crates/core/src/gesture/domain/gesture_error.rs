use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GestureError {
    #[error("expected a 3-channel frame, got {0} channels")]
    UnsupportedChannels(u8),
    #[error("classifier returned no usable scores")]
    EmptyScores,
    #[error("classifier predicted class {index}, but only {classes} labels are known")]
    UnknownClass { index: usize, classes: usize },
    #[error("expected {expected} features, got {actual}")]
    FeatureLength { expected: usize, actual: usize },
}
