//! SSD palm detector using ONNX Runtime via `ort`.
//!
//! Runs a MediaPipe-style palm detection model on the letterboxed frame
//! (192×192 RGB in; 2016 anchors out, each with a box, seven palm keypoints
//! and a score). A detected palm gives the first, upright-rotated region for
//! the hand landmark model.
use std::path::Path;

use ndarray::{Array4, ArrayView3};

use crate::gesture::infrastructure::hand_roi::{crop_tensor, upright_rotation, Roi, TensorLayout};
use crate::shared::onnx_session::load_session;

/// Model input resolution.
const INPUT_SIZE: usize = 192;

/// Values per anchor: box center and size, then seven (x, y) keypoints.
const BOX_LEN: usize = 18;

/// Anchor grid: (feature map side, anchors per cell).
const ANCHOR_LAYERS: [(usize, usize); 2] = [(24, 2), (12, 6)];

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// A palm box is grown by this much on every side to cover the whole hand.
const PALM_TO_HAND_GROW: f64 = 1.5;

/// Keypoint slots in the model output.
const WRIST_KEYPOINT: usize = 0;
const MIDDLE_MCP_KEYPOINT: usize = 2;

/// The raw palm model: one input tensor, box and score outputs.
pub(crate) trait PalmModel: Send {
    fn layout(&self) -> TensorLayout;

    /// Returns `(boxes, scores)`, flattened `[anchors, 18]` and `[anchors]`.
    fn run(
        &mut self,
        input: Array4<f32>,
    ) -> Result<(Vec<f32>, Vec<f32>), Box<dyn std::error::Error>>;
}

struct OrtPalmModel {
    session: ort::session::Session,
    layout: TensorLayout,
}

impl PalmModel for OrtPalmModel {
    fn layout(&self) -> TensorLayout {
        self.layout
    }

    fn run(
        &mut self,
        input: Array4<f32>,
    ) -> Result<(Vec<f32>, Vec<f32>), Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Outputs: regressors [1, 2016, 18], classificators [1, 2016, 1]
        if outputs.len() < 2 {
            return Err(format!(
                "Palm detection model expected 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }
        let boxes = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        Ok((boxes.iter().copied().collect(), scores.iter().copied().collect()))
    }
}

/// One palm in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PalmDetection {
    pub score: f32,
    pub cx: f64,
    pub cy: f64,
    pub width: f64,
    pub height: f64,
    pub wrist: (f64, f64),
    pub middle_mcp: (f64, f64),
}

impl PalmDetection {
    /// Clockwise palm rotation; 0 when the fingers point up.
    pub fn rotation(&self) -> f64 {
        upright_rotation(self.wrist, self.middle_mcp)
    }

    /// Square region expected to contain the whole hand, rotated upright.
    pub(crate) fn hand_roi(&self) -> Roi {
        Roi {
            cx: self.cx,
            cy: self.cy,
            size: self.width.max(self.height) * (1.0 + 2.0 * PALM_TO_HAND_GROW),
            rotation: self.rotation(),
        }
    }

    fn iou(&self, other: &Self) -> f64 {
        let (ax1, ay1) = (self.cx - self.width / 2.0, self.cy - self.height / 2.0);
        let (ax2, ay2) = (self.cx + self.width / 2.0, self.cy + self.height / 2.0);
        let (bx1, by1) = (other.cx - other.width / 2.0, other.cy - other.height / 2.0);
        let (bx2, by2) = (other.cx + other.width / 2.0, other.cy + other.height / 2.0);

        let inter_w = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
        let inter_h = (ay2.min(by2) - ay1.max(by1)).max(0.0);
        let inter = inter_w * inter_h;
        if inter == 0.0 {
            return 0.0;
        }
        let union = self.width * self.height + other.width * other.height - inter;
        inter / union
    }
}

/// Palm detector backed by an ONNX Runtime session.
pub struct OnnxPalmDetector {
    model: Box<dyn PalmModel>,
    anchors: Vec<[f32; 2]>,
    min_score: f32,
}

impl OnnxPalmDetector {
    /// Load a palm detection ONNX model. Palms scoring below `min_score`
    /// are dropped.
    pub fn new(model_path: &Path, min_score: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let layout = TensorLayout::of(&session);
        log::debug!("Palm detection model input layout: {layout:?}");
        Ok(Self::with_model(
            Box::new(OrtPalmModel { session, layout }),
            min_score,
        ))
    }

    pub(crate) fn with_model(model: Box<dyn PalmModel>, min_score: f32) -> Self {
        Self {
            model,
            anchors: generate_anchors(),
            min_score,
        }
    }

    /// Palms in an RGB `(h, w, 3)` image, best first.
    pub fn detect(
        &mut self,
        src: ArrayView3<'_, u8>,
    ) -> Result<Vec<PalmDetection>, Box<dyn std::error::Error>> {
        let (h, w, _) = src.dim();
        let letterbox = Roi::full_frame(w as u32, h as u32);
        let input = crop_tensor(src, letterbox, INPUT_SIZE, self.model.layout());
        let (boxes, scores) = self.model.run(input)?;

        let mut palms = Vec::new();
        for (i, (&raw_score, anchor)) in scores.iter().zip(&self.anchors).enumerate() {
            let score = sigmoid(raw_score);
            if score < self.min_score {
                continue;
            }
            let Some(params) = boxes.get(i * BOX_LEN..(i + 1) * BOX_LEN) else {
                break;
            };
            palms.push(decode_palm(params, anchor, score, letterbox));
        }

        Ok(nms(palms, NMS_IOU_THRESH))
    }
}

/// Box and keypoints are offsets in input pixels from the anchor center.
fn decode_palm(params: &[f32], anchor: &[f32; 2], score: f32, letterbox: Roi) -> PalmDetection {
    let size = INPUT_SIZE as f64;
    let (ax, ay) = (anchor[0] as f64 * size, anchor[1] as f64 * size);
    let scale = letterbox.size / size;
    let point = |slot: usize| {
        letterbox.to_frame(
            ax + params[slot] as f64,
            ay + params[slot + 1] as f64,
            INPUT_SIZE,
        )
    };

    let (cx, cy) = point(0);
    PalmDetection {
        score,
        cx,
        cy,
        width: params[2] as f64 * scale,
        height: params[3] as f64 * scale,
        wrist: point(4 + 2 * WRIST_KEYPOINT),
        middle_mcp: point(4 + 2 * MIDDLE_MCP_KEYPOINT),
    }
}

/// Anchor centers in [0,1], one per (cell, anchor) in output order.
fn generate_anchors() -> Vec<[f32; 2]> {
    let mut anchors = Vec::new();
    for &(grid, per_cell) in &ANCHOR_LAYERS {
        for y in 0..grid {
            for x in 0..grid {
                let cx = (x as f32 + 0.5) / grid as f32;
                let cy = (y as f32 + 0.5) / grid as f32;
                for _ in 0..per_cell {
                    anchors.push([cx, cy]);
                }
            }
        }
    }
    anchors
}

fn nms(mut palms: Vec<PalmDetection>, iou_thresh: f64) -> Vec<PalmDetection> {
    palms.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut keep: Vec<PalmDetection> = Vec::new();
    for palm in palms {
        if keep.iter().all(|k| k.iou(&palm) <= iou_thresh) {
            keep.push(palm);
        }
    }
    keep
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
