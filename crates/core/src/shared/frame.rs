use ndarray::ArrayView3;

/// Channel order of a frame's pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Bgr,
    Rgb,
}

/// A single video/image frame: contiguous 8-bit pixels in row-major order.
///
/// Readers produce BGR frames; the gesture pipeline converts to RGB before
/// handing the frame to a landmark detector.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    format: PixelFormat,
    index: usize,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        format: PixelFormat,
        index: usize,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            format,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns a copy of this frame with RGB channel order.
    ///
    /// Frames that are already RGB are cloned as-is. Channel swapping only
    /// applies to 3-channel data; callers reject other layouts first.
    pub fn to_rgb(&self) -> Frame {
        let mut data = self.data.clone();
        if self.format == PixelFormat::Bgr && self.channels == 3 {
            for px in data.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }
        Frame {
            data,
            width: self.width,
            height: self.height,
            channels: self.channels,
            format: PixelFormat::Rgb,
            index: self.index,
        }
    }

    /// Borrow as a `(height, width, channels)` array, or `None` if the
    /// buffer does not match the declared dimensions.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(self.shape(), &self.data).ok()
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, PixelFormat::Bgr, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.format(), PixelFormat::Bgr);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, PixelFormat::Bgr, 0);
    }

    #[test]
    fn test_to_rgb_swaps_channels() {
        // 1x2 BGR: blue pixel then red pixel
        let data = vec![255, 0, 0, 0, 0, 255];
        let frame = Frame::new(data, 2, 1, 3, PixelFormat::Bgr, 7);
        let rgb = frame.to_rgb();
        assert_eq!(rgb.format(), PixelFormat::Rgb);
        assert_eq!(rgb.data(), &[0, 0, 255, 255, 0, 0]);
        assert_eq!(rgb.index(), 7);
        // Source is untouched
        assert_eq!(frame.data()[0], 255);
    }

    #[test]
    fn test_to_rgb_on_rgb_is_identity() {
        let data = vec![1, 2, 3, 4, 5, 6];
        let frame = Frame::new(data.clone(), 2, 1, 3, PixelFormat::Rgb, 0);
        assert_eq!(frame.to_rgb().data(), &data[..]);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let data = vec![0u8; 24]; // 2x4x3
        let frame = Frame::new(data, 4, 2, 3, PixelFormat::Rgb, 0);
        let arr = frame.as_ndarray().unwrap();
        assert_eq!(arr.shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, channel 0
        let frame = Frame::new(data, 2, 2, 3, PixelFormat::Rgb, 0);
        let arr = frame.as_ndarray().unwrap();
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }
}
