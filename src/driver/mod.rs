//! Camera driver abstraction.
//!
//! The driver is the external collaborator that actually talks to the
//! camera: the CCDCOM2 dynamic library in production, or an in-process
//! simulator in tests. Everything above this module (session state,
//! request validation, buffer ownership) is driver-independent.
//!
//! Calls into a driver are not assumed to be reentrant. The session
//! guarantees exclusive access for every `&mut self` method and shared
//! access only for the read-only metadata queries.

mod simulated;
#[cfg(feature = "vendor")]
mod symbols;
#[cfg(feature = "vendor")]
mod vendor;
mod wide;

pub use simulated::{
    CallRecord, DriverCall, DriverMonitor, SimulatedAllocation, SimulatedConfig, SimulatedDriver,
};
#[cfg(feature = "vendor")]
pub use vendor::{VendorAllocation, VendorDriver, VendorLibrary};
pub use wide::{decode_wide, encode_wide, WideChar};

use crate::acquisition::AcquisitionRequest;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The library could not be loaded.
    #[error("failed to load driver library {path}: {reason}")]
    LibraryLoad {
        /// Path that was tried.
        path: PathBuf,
        /// Loader message.
        reason: String,
    },
    /// A required export is missing.
    #[error("driver library does not export {0}")]
    MissingSymbol(String),
    /// The loaded library lacks an optional operation.
    #[error("driver does not support {0}")]
    Unsupported(&'static str),
    /// The driver reported a failure status.
    #[error("{operation} failed with driver status {code}")]
    Status {
        /// Vendor entry point that failed.
        operation: &'static str,
        /// Status it returned.
        code: i32,
    },
}

impl DriverError {
    /// Builds a status error for the given driver operation.
    pub fn status(operation: &'static str, code: i32) -> Self {
        Self::Status { operation, code }
    }

    /// Returns the raw driver status code, if the driver produced one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Pixel memory allocated by the driver for a floating-point acquisition.
///
/// The memory stays owned by the driver until it is handed back through
/// [`Driver::release_float`].
pub trait DriverAllocation: Send {
    /// Returns the pixels in row-major order.
    fn pixels(&self) -> &[f32];

    /// Returns the image width in output pixels.
    fn width(&self) -> u32;

    /// Returns the image height in output pixels.
    fn height(&self) -> u32;
}

/// Trait for camera driver implementations.
///
/// This abstraction allows swapping between the vendor library and the
/// simulator. Implementations report raw status codes; interpretation of
/// session state and request validity happens in [`crate::Session`].
pub trait Driver: Send + Sync {
    /// Buffer type produced by [`Driver::acquire_float`].
    type Allocation: DriverAllocation;

    /// Short label used in log messages.
    fn label(&self) -> &str;

    /// Opens the driver connection, presenting the compatibility token.
    fn open(&mut self, magic: i32) -> Result<(), DriverError>;

    /// Releases the driver connection.
    fn close(&mut self);

    /// Returns true if the camera reports its name and sensor size.
    fn is_camera_info_available(&self) -> bool;

    /// Writes the null-terminated camera name into `buf`.
    ///
    /// Returns false if the name is unavailable or does not fit. The
    /// content of `buf` is unspecified in that case.
    fn camera_name(&self, buf: &mut [WideChar]) -> bool;

    /// Returns the full-frame sensor size as `(width, height)`.
    fn camera_dimensions(&self) -> Option<(i32, i32)>;

    /// Returns the number of cameras the driver currently sees.
    fn camera_count(&self) -> Result<i32, DriverError>;

    /// Forwards a null-terminated script to the vendor runtime.
    ///
    /// Returns the runtime's status unchanged.
    fn execute_script(&mut self, script: &[WideChar]) -> Result<i32, DriverError>;

    /// Acquires a frame as integer counts into `out`.
    ///
    /// The caller guarantees `out` can hold the binned output of the
    /// request. Returns the `(width, height)` the driver wrote.
    fn acquire_int(
        &mut self,
        request: &AcquisitionRequest,
        out: &mut [i32],
    ) -> Result<(i32, i32), DriverError>;

    /// Acquires a frame into a freshly allocated floating-point buffer.
    fn acquire_float(&mut self, request: &AcquisitionRequest) -> Result<Self::Allocation, DriverError>;

    /// Hands a buffer from [`Driver::acquire_float`] back to the driver.
    fn release_float(&mut self, allocation: Self::Allocation);
}
