//! Sensor regions and image dimensions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
}

impl Dimensions {
    /// Creates dimensions of `width` columns and `height` rows.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Region validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoiError {
    /// `top >= bottom` or `left >= right`.
    #[error("region is empty or inverted: top {top} / bottom {bottom}, left {left} / right {right}")]
    #[allow(missing_docs)]
    Empty {
        top: i32,
        left: i32,
        bottom: i32,
        right: i32,
    },
    /// The region does not lie on the sensor.
    #[error("region exceeds the {sensor} sensor")]
    OutOfBounds {
        /// Sensor size the region was checked against.
        sensor: Dimensions,
    },
}

/// Capture window in native sensor pixels.
///
/// `top`/`left` are inclusive, `bottom`/`right` exclusive, so the full
/// frame of a 2048x2048 sensor is `(0, 0, 2048, 2048)`. Rows run along
/// `top..bottom`, columns along `left..right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    /// First row.
    pub top: i32,
    /// First column.
    pub left: i32,
    /// Row past the last.
    pub bottom: i32,
    /// Column past the last.
    pub right: i32,
}

impl Roi {
    /// Creates a region from its edges.
    pub fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Returns the region covering a whole sensor.
    pub fn full_frame(sensor: Dimensions) -> Self {
        Self::new(
            0,
            0,
            i32::try_from(sensor.height).unwrap_or(i32::MAX),
            i32::try_from(sensor.width).unwrap_or(i32::MAX),
        )
    }

    /// Column extent, `right - left`. Zero for inverted regions.
    pub fn width(&self) -> u32 {
        (self.right as i64 - self.left as i64).max(0) as u32
    }

    /// Row extent, `bottom - top`. Zero for inverted regions.
    pub fn height(&self) -> u32 {
        (self.bottom as i64 - self.top as i64).max(0) as u32
    }

    /// Checks that the region is non-empty and lies on the sensor.
    pub fn validate(&self, sensor: Dimensions) -> Result<(), RoiError> {
        if self.top >= self.bottom || self.left >= self.right {
            return Err(RoiError::Empty {
                top: self.top,
                left: self.left,
                bottom: self.bottom,
                right: self.right,
            });
        }
        if self.top < 0
            || self.left < 0
            || self.bottom as i64 > sensor.height as i64
            || self.right as i64 > sensor.width as i64
        {
            return Err(RoiError::OutOfBounds { sensor });
        }
        Ok(())
    }

    /// Output size after binning.
    ///
    /// Extents that are not a multiple of `binning` are truncated: the
    /// trailing partial block of rows or columns is dropped.
    pub fn binned(&self, binning: u32) -> Dimensions {
        let binning = binning.max(1);
        Dimensions::new(self.width() / binning, self.height() / binning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENSOR: Dimensions = Dimensions {
        width: 2048,
        height: 1024,
    };

    #[test]
    fn test_full_frame_valid() {
        let roi = Roi::full_frame(SENSOR);
        assert_eq!(roi, Roi::new(0, 0, 1024, 2048));
        assert!(roi.validate(SENSOR).is_ok());
    }

    #[test]
    fn test_inverted_region_rejected() {
        let roi = Roi::new(0, 100, 10, 100);
        assert!(matches!(roi.validate(SENSOR), Err(RoiError::Empty { .. })));
        assert_eq!(roi.width(), 0);
    }

    #[test]
    fn test_region_off_sensor() {
        let tall = Roi::new(0, 0, 1025, 10);
        assert!(matches!(
            tall.validate(SENSOR),
            Err(RoiError::OutOfBounds { .. })
        ));
        let negative = Roi::new(-1, 0, 10, 10);
        assert!(negative.validate(SENSOR).is_err());
    }

    #[test]
    fn test_binning_truncates() {
        let roi = Roi::new(0, 0, 10, 7);
        assert_eq!(roi.binned(2), Dimensions::new(3, 5));
        assert_eq!(roi.binned(1), Dimensions::new(7, 10));
    }
}
