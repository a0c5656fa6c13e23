//! Crate-level error type and integer status codes.
//!
//! Every operation returns `Result<_, Error>`. Hosts that speak the
//! driver's integer protocol use [`Error::status`] to recover the code.

use crate::acquisition::{Dimensions, RoiError};
use crate::capture::ConfigError;
use crate::driver::DriverError;
use crate::session::SessionState;
use thiserror::Error;

/// Success.
pub const STATUS_OK: i32 = 0;
/// The session is not open.
pub const STATUS_NOT_READY: i32 = -1;
/// Region, binning or exposure rejected.
pub const STATUS_INVALID_REQUEST: i32 = -2;
/// Caller buffer cannot hold the output image.
pub const STATUS_BUFFER_TOO_SMALL: i32 = -3;
/// The camera does not report the requested metadata.
pub const STATUS_UNAVAILABLE: i32 = -4;
/// The driver library or one of its exports is missing.
pub const STATUS_DRIVER_UNAVAILABLE: i32 = -5;
/// The driver failed but reported the success code.
pub const STATUS_DRIVER_FAILURE: i32 = -6;
/// Configuration rejected.
pub const STATUS_INVALID_CONFIG: i32 = -7;
/// Contract violation; the session must not be used further.
pub const STATUS_FATAL: i32 = -100;

/// Errors returned by session, acquisition and camera operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation needs a ready session.
    #[error("session is not ready (state: {0})")]
    NotReady(SessionState),
    /// The region is empty or off the sensor.
    #[error("invalid region of interest: {0}")]
    InvalidRoi(#[from] RoiError),
    /// Binning of zero.
    #[error("binning must be a positive integer, got {0}")]
    InvalidBinning(u32),
    /// Binning leaves no whole output pixel in the region.
    #[error("binning {binning} leaves no output pixels in a {region} region")]
    BinningExceedsRegion {
        /// Requested binning.
        binning: u32,
        /// Region size in sensor pixels.
        region: Dimensions,
    },
    /// Binning not among the configured binsizes.
    #[error("binsize {binsize} is not one of {allowed:?}")]
    UnsupportedBinning {
        /// Requested binsize.
        binsize: u32,
        /// Configured binsizes.
        allowed: Vec<u32>,
    },
    /// Exposure not a positive finite number of seconds.
    #[error("exposure must be a positive number of seconds, got {0}")]
    InvalidExposure(f64),
    /// Caller buffer cannot hold the output.
    #[error("output buffer holds {capacity} samples, {required} required")]
    BufferTooSmall {
        /// Samples the buffer holds.
        capacity: usize,
        /// Samples the output needs.
        required: usize,
    },
    /// The camera does not report the requested metadata.
    #[error("camera metadata is unavailable")]
    MetadataUnavailable,
    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Failure reported by the driver.
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// Misuse that leaves the session unusable.
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl Error {
    /// Integer status code for this error.
    ///
    /// Driver status codes are passed through verbatim, except a driver
    /// failure carrying the success code, which maps to
    /// [`STATUS_DRIVER_FAILURE`].
    pub fn status(&self) -> i32 {
        match self {
            Self::NotReady(_) => STATUS_NOT_READY,
            Self::InvalidRoi(_)
            | Self::InvalidBinning(_)
            | Self::BinningExceedsRegion { .. }
            | Self::UnsupportedBinning { .. }
            | Self::InvalidExposure(_) => STATUS_INVALID_REQUEST,
            Self::BufferTooSmall { .. } => STATUS_BUFFER_TOO_SMALL,
            Self::MetadataUnavailable => STATUS_UNAVAILABLE,
            Self::Config(_) => STATUS_INVALID_CONFIG,
            Self::Driver(e) => match e.code() {
                Some(STATUS_OK) => STATUS_DRIVER_FAILURE,
                Some(code) => code,
                None => STATUS_DRIVER_UNAVAILABLE,
            },
            Self::ContractViolation(_) => STATUS_FATAL,
        }
    }

    /// Returns true for errors detected before touching the driver.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotReady(_)
                | Self::InvalidRoi(_)
                | Self::InvalidBinning(_)
                | Self::BinningExceedsRegion { .. }
                | Self::UnsupportedBinning { .. }
                | Self::InvalidExposure(_)
                | Self::BufferTooSmall { .. }
        )
    }
}

/// Converts an operation result to its status code.
pub fn status_of<T>(result: &Result<T, Error>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(e) => e.status(),
    }
}
