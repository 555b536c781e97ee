use std::fmt;

use serde::{Deserialize, Serialize};

/// Gesture labels, plus `None` for "no hand / nothing recognized".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    None,
    Fist,
    Palm,
    Peace,
    Point,
    #[serde(rename = "thumbsup")]
    ThumbsUp,
    Undo,
}

/// Classifier class index → gesture. The order is fixed by the trained model.
pub const GESTURE_LABELS: [Gesture; 6] = [
    Gesture::Fist,
    Gesture::Palm,
    Gesture::Peace,
    Gesture::Point,
    Gesture::ThumbsUp,
    Gesture::Undo,
];

impl Gesture {
    pub fn from_class_index(index: usize) -> Option<Gesture> {
        GESTURE_LABELS.get(index).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gesture::None => "none",
            Gesture::Fist => "fist",
            Gesture::Palm => "palm",
            Gesture::Peace => "peace",
            Gesture::Point => "point",
            Gesture::ThumbsUp => "thumbsup",
            Gesture::Undo => "undo",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Gesture::Fist)]
    #[case(1, Gesture::Palm)]
    #[case(2, Gesture::Peace)]
    #[case(3, Gesture::Point)]
    #[case(4, Gesture::ThumbsUp)]
    #[case(5, Gesture::Undo)]
    fn test_class_index_table(#[case] index: usize, #[case] expected: Gesture) {
        assert_eq!(Gesture::from_class_index(index), Some(expected));
    }

    #[test]
    fn test_class_index_out_of_range() {
        assert_eq!(Gesture::from_class_index(6), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Gesture::Fist.to_string(), "fist");
        assert_eq!(Gesture::ThumbsUp.to_string(), "thumbsup");
        assert_eq!(Gesture::None.to_string(), "none");
    }

    #[test]
    fn test_serde_name_matches_label() {
        for g in std::iter::once(Gesture::None).chain(GESTURE_LABELS) {
            let json = serde_json::to_string(&g).unwrap();
            assert_eq!(json, format!("\"{}\"", g.label()));
        }
    }

    #[test]
    fn test_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&Gesture::ThumbsUp).unwrap(),
            "\"thumbsup\""
        );
        assert_eq!(serde_json::to_string(&Gesture::None).unwrap(), "\"none\"");
        let g: Gesture = serde_json::from_str("\"peace\"").unwrap();
        assert_eq!(g, Gesture::Peace);
    }
}
