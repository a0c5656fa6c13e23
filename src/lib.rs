//! CCD Camera Acquisition Library
//!
//! A safe interface to a vendor CCD camera driver. Manages the driver
//! session, queries camera metadata, runs driver scripts and acquires
//! images either into caller memory or into driver-allocated buffers.
//!
//! # Architecture
//!
//! ```text
//! capture (Camera, Frame, config)
//!     ↓
//! session ──→ acquisition (requests, buffers)
//!     ↓
//! driver (vendor library or simulation)
//! ```
//!
//! # Design Principles
//!
//! - **Explicit session**: No global driver state; a [`Session`] owns its driver
//! - **Validate first**: Requests are checked before the driver is touched
//! - **Serialized acquisition**: At most one acquisition in flight per session
//! - **Owned buffers**: Driver memory is released exactly once, by moving its handle
//!
//! # Example
//!
//! ```no_run
//! use ccd_camera::{
//!     capture::{Camera, CameraConfig},
//!     driver::SimulatedDriver,
//!     Roi, DEFAULT_MAGIC,
//! };
//!
//! let camera = Camera::open(SimulatedDriver::default(), DEFAULT_MAGIC, CameraConfig::default())
//!     .unwrap();
//!
//! // Full frame with configured defaults
//! let frame = camera.get_image(None, None, None, false).unwrap();
//! println!("{} frame #{}", frame.dimensions(), frame.sequence());
//!
//! // Binned region, 0.5 s exposure
//! let frame = camera
//!     .get_image(Some(0.5), Some(2), Some(Roi::new(0, 0, 512, 512)), false)
//!     .unwrap();
//! assert_eq!(frame.width(), 256);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod acquisition;
pub mod capture;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod session;

// Re-export commonly used types at crate root
pub use acquisition::{AcquisitionPhase, AcquisitionRequest, BufferHandle, Dimensions, Roi};
pub use capture::{Camera, CameraConfig, FileConfig, Frame};
pub use driver::{Driver, SimulatedDriver};
pub use error::{
    status_of, Error, STATUS_BUFFER_TOO_SMALL, STATUS_DRIVER_FAILURE, STATUS_DRIVER_UNAVAILABLE,
    STATUS_FATAL, STATUS_INVALID_CONFIG, STATUS_INVALID_REQUEST, STATUS_NOT_READY, STATUS_OK,
    STATUS_UNAVAILABLE,
};
pub use session::{Session, SessionState, SessionStats, DEFAULT_MAGIC};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
