//! Fingertip drawing surface driven by hand poses.
//!
//! Pointing draws from the last pen position to the current fingertip; a
//! fist wipes the canvas; any other pose lifts the pen. Frames without a
//! hand leave the pen where it was.

use crate::gesture::domain::hand_landmarks::{HandLandmarks, LandmarkIdx};
use crate::gesture::domain::hand_pose::HandPose;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: (f64, f64),
    pub to: (f64, f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CanvasEvent {
    /// No hand in the frame.
    Idle,
    Cleared,
    /// First pointing frame after the pen was lifted.
    PenDown((f64, f64)),
    Drew(Segment),
    PenUp,
}

pub struct AirCanvas {
    width: u32,
    height: u32,
    mirror: bool,
    pen: Option<(f64, f64)>,
    segments: Vec<Segment>,
}

impl AirCanvas {
    /// `mirror` flips the fingertip horizontally, matching a selfie-view display.
    pub fn new(width: u32, height: u32, mirror: bool) -> Self {
        Self {
            width,
            height,
            mirror,
            pen: None,
            segments: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn pen(&self) -> Option<(f64, f64)> {
        self.pen
    }

    pub fn update(&mut self, hand: Option<&HandLandmarks>) -> CanvasEvent {
        let Some(hand) = hand else {
            return CanvasEvent::Idle;
        };
        let (Some(pose), Some(tip)) = (HandPose::classify(hand), self.fingertip(hand)) else {
            return CanvasEvent::Idle;
        };

        match pose {
            HandPose::Fist => {
                self.segments.clear();
                self.pen = None;
                CanvasEvent::Cleared
            }
            HandPose::Pointing => {
                let event = match self.pen {
                    Some(from) => {
                        let segment = Segment { from, to: tip };
                        self.segments.push(segment);
                        CanvasEvent::Drew(segment)
                    }
                    None => CanvasEvent::PenDown(tip),
                };
                self.pen = Some(tip);
                event
            }
            HandPose::Other => {
                self.pen = None;
                CanvasEvent::PenUp
            }
        }
    }

    fn fingertip(&self, hand: &HandLandmarks) -> Option<(f64, f64)> {
        let tip = hand.get(LandmarkIdx::IndexFingerTip)?;
        let w = self.width as f64;
        let x = tip.x as f64 * w;
        let x = if self.mirror { w - x } else { x };
        Some((x, tip.y as f64 * self.height as f64))
    }
}
