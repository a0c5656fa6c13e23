//! Image acquisition.
//!
//! Requests are validated against the sensor, then run as a single
//! synchronous exposure on the driver. Two output modes exist:
//!
//! - [`Session::acquire_into`](crate::Session::acquire_into) writes raw
//!   integer counts into memory the caller owns.
//! - [`Session::acquire_allocated`](crate::Session::acquire_allocated)
//!   returns a [`BufferHandle`] over driver-allocated floating-point
//!   pixels, which the caller hands back through
//!   [`Session::release_buffer`](crate::Session::release_buffer).

mod buffer;
mod engine;
mod request;
mod roi;

pub(crate) use buffer::BufferLedger;
pub use buffer::BufferHandle;
pub(crate) use engine::EngineState;
pub use engine::AcquisitionPhase;
pub use request::AcquisitionRequest;
pub use roi::{Dimensions, Roi, RoiError};
