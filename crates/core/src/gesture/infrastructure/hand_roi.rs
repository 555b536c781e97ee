//! Rotated square frame regions and the crops fed to the hand models.
use ndarray::{Array4, ArrayView3};

use crate::gesture::domain::hand_landmarks::{HandLandmarks, LandmarkIdx};
use crate::shared::onnx_session::first_input_shape;

/// Tracking region side relative to the landmarks' bounding box.
const ROI_SCALE: f64 = 1.5;

/// Regions smaller than this (in pixels) are not worth tracking.
const MIN_ROI_SIZE: f64 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum TensorLayout {
    Nhwc,
    Nchw,
}

impl TensorLayout {
    /// A channel dimension of 3 in position 1 means NCHW, anything else NHWC.
    pub(crate) fn of(session: &ort::session::Session) -> Self {
        match first_input_shape(session) {
            Some(shape) if shape.len() == 4 && shape[1] == 3 => Self::Nchw,
            _ => Self::Nhwc,
        }
    }
}

/// Square frame region in pixels, rotated clockwise by `rotation` radians
/// around its center. A rotation of 0 means the fingers point up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Roi {
    pub cx: f64,
    pub cy: f64,
    pub size: f64,
    pub rotation: f64,
}

impl Roi {
    /// Letterbox square covering the whole frame.
    pub(crate) fn full_frame(width: u32, height: u32) -> Self {
        Self {
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
            size: width.max(height) as f64,
            rotation: 0.0,
        }
    }

    /// Region for the next frame: the hand's bounding box in its own upright
    /// frame, grown by [`ROI_SCALE`].
    pub(crate) fn around(hand: &HandLandmarks, width: u32, height: u32) -> Option<Self> {
        if hand.is_empty() {
            return None;
        }
        let (w, h) = (width as f64, height as f64);
        let pixel = |i: usize| {
            let p = hand.points()[i];
            (p.x as f64 * w, p.y as f64 * h)
        };
        let rotation = if hand.is_complete() {
            upright_rotation(
                pixel(LandmarkIdx::Wrist as usize),
                pixel(LandmarkIdx::MiddleFingerMcp as usize),
            )
        } else {
            0.0
        };
        let (sin, cos) = rotation.sin_cos();

        let mut min = (f64::INFINITY, f64::INFINITY);
        let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for i in 0..hand.len() {
            let (x, y) = pixel(i);
            let (u, v) = (x * cos + y * sin, -x * sin + y * cos);
            min = (min.0.min(u), min.1.min(v));
            max = (max.0.max(u), max.1.max(v));
        }

        let size = (max.0 - min.0).max(max.1 - min.1) * ROI_SCALE;
        if !size.is_finite() || size < MIN_ROI_SIZE {
            return None;
        }
        let (u, v) = ((min.0 + max.0) / 2.0, (min.1 + max.1) / 2.0);
        Some(Self {
            cx: u * cos - v * sin,
            cy: u * sin + v * cos,
            size,
            rotation,
        })
    }

    /// Frame pixel for a point given in `input_size` model pixels.
    pub(crate) fn to_frame(&self, x: f64, y: f64, input_size: usize) -> (f64, f64) {
        let scale = self.size / input_size as f64;
        let (u, v) = (x * scale - self.size / 2.0, y * scale - self.size / 2.0);
        let (sin, cos) = self.rotation.sin_cos();
        (self.cx + u * cos - v * sin, self.cy + u * sin + v * cos)
    }
}

/// Clockwise angle that turns the wrist→middle-MCP direction upright.
pub(crate) fn upright_rotation(wrist: (f64, f64), middle_mcp: (f64, f64)) -> f64 {
    let (dx, dy) = (wrist.0 - middle_mcp.0, wrist.1 - middle_mcp.1);
    (-dx).atan2(dy)
}

/// Sample `roi` into a `size × size` float tensor in [0,1], rotated so the
/// region's up direction is the tensor's first row.
///
/// Nearest-neighbour sampling; pixels outside the frame are zero.
pub(crate) fn crop_tensor(
    src: ArrayView3<'_, u8>,
    roi: Roi,
    size: usize,
    layout: TensorLayout,
) -> Array4<f32> {
    let (src_h, src_w, _) = src.dim();
    let mut tensor = match layout {
        TensorLayout::Nhwc => Array4::<f32>::zeros((1, size, size, 3)),
        TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, size, size)),
    };

    for y in 0..size {
        for x in 0..size {
            let (fx, fy) = roi.to_frame(x as f64 + 0.5, y as f64 + 0.5, size);
            let (sx, sy) = (fx.floor(), fy.floor());
            if sx < 0.0 || sy < 0.0 || sx >= src_w as f64 || sy >= src_h as f64 {
                continue;
            }
            let (sx, sy) = (sx as usize, sy as usize);
            for c in 0..3 {
                let v = src[[sy, sx, c]] as f32 / 255.0;
                match layout {
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = v,
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = v,
                }
            }
        }
    }

    tensor
}
