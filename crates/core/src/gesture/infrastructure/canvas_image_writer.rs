use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::gesture::domain::air_canvas::{AirCanvas, Segment};

/// Stroke color and width, matching the on-screen pen.
const STROKE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const STROKE_WIDTH: f64 = 5.0;

/// Saves an [`AirCanvas`] as a transparent PNG (or any format the `image`
/// crate infers from the extension).
pub struct CanvasImageWriter;

impl CanvasImageWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write(&self, path: &Path, canvas: &AirCanvas) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        render(canvas).save(path)?;
        log::info!(
            "Saved {} stroke segments to {}",
            canvas.segments().len(),
            path.display()
        );
        Ok(())
    }
}

impl Default for CanvasImageWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rasterize every segment onto a transparent image of the canvas size.
pub fn render(canvas: &AirCanvas) -> RgbaImage {
    let mut img = RgbaImage::new(canvas.width(), canvas.height());
    for segment in canvas.segments() {
        draw_segment(&mut img, segment);
    }
    img
}

/// Stamp round brush dabs every half pixel along the segment.
fn draw_segment(img: &mut RgbaImage, segment: &Segment) {
    let (x0, y0) = segment.from;
    let (x1, y1) = segment.to;
    let length = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
    let steps = (length * 2.0).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        stamp(img, x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
    }
}

fn stamp(img: &mut RgbaImage, cx: f64, cy: f64) {
    let r = STROKE_WIDTH / 2.0;
    let (w, h) = (img.width() as i64, img.height() as i64);
    let x_min = ((cx - r).floor() as i64).max(0);
    let x_max = ((cx + r).ceil() as i64).min(w - 1);
    let y_min = ((cy - r).floor() as i64).max(0);
    let y_max = ((cy + r).ceil() as i64).min(h - 1);
    for y in y_min..=y_max {
        for x in x_min..=x_max {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                img.put_pixel(x as u32, y as u32, STROKE_COLOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::domain::hand_pose::tests::hand_with_tips;

    fn canvas_with_stroke() -> AirCanvas {
        let mut canvas = AirCanvas::new(100, 50, false);
        // Horizontal stroke at y=25 from x=10 to x=90
        canvas.update(Some(&hand_with_tips(0.1, [0.5, 0.7, 0.75, 0.78])));
        canvas.update(Some(&hand_with_tips(0.9, [0.5, 0.7, 0.75, 0.78])));
        canvas
    }

    #[test]
    fn test_render_size_matches_canvas() {
        let img = render(&AirCanvas::new(64, 32, false));
        assert_eq!(img.dimensions(), (64, 32));
    }

    #[test]
    fn test_empty_canvas_is_transparent() {
        let img = render(&AirCanvas::new(8, 8, false));
        assert!(img.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_stroke_is_drawn_in_red() {
        let canvas = canvas_with_stroke();
        assert_eq!(canvas.segments().len(), 1);
        let img = render(&canvas);
        assert_eq!(*img.get_pixel(50, 25), STROKE_COLOR);
        assert_eq!(*img.get_pixel(50, 5), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_stroke_near_edge_is_clipped() {
        let mut img = RgbaImage::new(10, 10);
        draw_segment(
            &mut img,
            &Segment {
                from: (-5.0, 0.0),
                to: (0.0, 0.0),
            },
        );
        assert_eq!(*img.get_pixel(0, 0), STROKE_COLOR);
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("canvas.png");
        CanvasImageWriter::new()
            .write(&path, &canvas_with_stroke())
            .unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (100, 50));
        assert_eq!(*loaded.get_pixel(50, 25), STROKE_COLOR);
    }
}
