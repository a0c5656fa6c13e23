//! Acquisition request parameters.

use super::roi::{Dimensions, Roi};
use crate::Error;
use serde::{Deserialize, Serialize};

/// Parameters of a single exposure.
///
/// Constructed per call; validated against the sensor by the session
/// before anything reaches the driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionRequest {
    /// Capture window in sensor pixels.
    pub roi: Roi,
    /// Sensor pixels per output pixel along each axis.
    pub binning: u32,
    /// Exposure time in seconds.
    pub exposure: f64,
    /// Ask the host application to also render the frame.
    ///
    /// Never affects the returned pixels.
    pub display: bool,
}

impl AcquisitionRequest {
    /// Creates an unbinned, one-second, undisplayed request.
    pub fn new(roi: Roi) -> Self {
        Self {
            roi,
            binning: 1,
            exposure: 1.0,
            display: false,
        }
    }

    /// Sets the binning factor.
    pub fn with_binning(mut self, binning: u32) -> Self {
        self.binning = binning;
        self
    }

    /// Sets the exposure time in seconds.
    pub fn with_exposure(mut self, exposure: f64) -> Self {
        self.exposure = exposure;
        self
    }

    /// Asks the vendor software to display the frame.
    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    /// Validates the request and returns the binned output size.
    pub fn validate(&self, sensor: Dimensions) -> Result<Dimensions, Error> {
        if self.binning == 0 {
            return Err(Error::InvalidBinning(self.binning));
        }
        if !(self.exposure.is_finite() && self.exposure > 0.0) {
            return Err(Error::InvalidExposure(self.exposure));
        }
        self.roi.validate(sensor)?;

        let output = self.roi.binned(self.binning);
        if output.pixel_count() == 0 {
            return Err(Error::BinningExceedsRegion {
                binning: self.binning,
                region: Dimensions::new(self.roi.width(), self.roi.height()),
            });
        }
        Ok(output)
    }
}
