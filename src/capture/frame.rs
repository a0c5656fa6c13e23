//! Frame type representing an acquired image with metadata.

use crate::acquisition::Dimensions;
use chrono::{DateTime, Utc};

/// A single acquired frame, owned by the caller.
///
/// Pixels are copied out of driver memory, so a frame stays valid after
/// the driver buffer has been released and after the session closes.
#[derive(Clone)]
pub struct Frame {
    /// Intensity values, row-major.
    pixels: Vec<f32>,
    /// Frame width in output pixels.
    width: u32,
    /// Frame height in output pixels.
    height: u32,
    /// Acquisition sequence number within the session.
    sequence: u64,
    /// Wall-clock time the readout completed.
    captured_at: DateTime<Utc>,
    /// Exposure in seconds.
    exposure: f64,
    /// Binning factor used.
    binning: u32,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(
        pixels: Vec<f32>,
        width: u32,
        height: u32,
        sequence: u64,
        exposure: f64,
        binning: u32,
    ) -> Self {
        Self {
            pixels,
            width,
            height,
            sequence,
            captured_at: Utc::now(),
            exposure,
            binning,
        }
    }

    /// Returns a reference to the pixel data.
    #[inline]
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Consumes the frame, returning its pixels.
    pub fn into_pixels(self) -> Vec<f32> {
        self.pixels
    }

    /// Returns the frame width in output pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height in output pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns width and height together.
    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Returns the pixel at column `x`, row `y`.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Returns the acquisition sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns when the frame was read out.
    #[inline]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Returns the exposure time in seconds.
    #[inline]
    pub fn exposure(&self) -> f64 {
        self.exposure
    }

    /// Returns the binning factor.
    #[inline]
    pub fn binning(&self) -> u32 {
        self.binning
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count()
    }

    /// Returns `(min, max, mean)` of the pixel values.
    pub fn statistics(&self) -> Option<(f32, f32, f64)> {
        if self.pixels.is_empty() {
            return None;
        }
        let (mut min, mut max, mut sum) = (f32::INFINITY, f32::NEG_INFINITY, 0f64);
        for &p in &self.pixels {
            min = min.min(p);
            max = max.max(p);
            sum += p as f64;
        }
        Some((min, max, sum / self.pixels.len() as f64))
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("exposure", &self.exposure)
            .field("binning", &self.binning)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(vec![0.0; 512 * 256], 512, 256, 1, 0.5, 4);

        assert_eq!(frame.width(), 512);
        assert_eq!(frame.height(), 256);
        assert_eq!(frame.sequence(), 1);
        assert_eq!(frame.binning(), 4);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        let frame = Frame::new(vec![0.0; 100], 640, 480, 1, 0.1, 1);
        assert!(!frame.is_valid());
    }

    #[test]
    fn test_pixel_lookup_is_row_major() {
        let frame = Frame::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 3, 2, 1, 0.1, 1);
        assert_eq!(frame.get(2, 0), Some(2.0));
        assert_eq!(frame.get(0, 1), Some(3.0));
        assert_eq!(frame.get(3, 0), None);
    }

    #[test]
    fn test_statistics() {
        let frame = Frame::new(vec![1.0, 3.0, 5.0, 7.0], 2, 2, 1, 0.1, 1);
        assert_eq!(frame.statistics(), Some((1.0, 7.0, 4.0)));
    }
}
