//! Prometheus metrics for camera sessions.
//!
//! Metrics are gathered from [`SessionStats`](crate::SessionStats)
//! snapshots and encoded in Prometheus text format on demand.
//!
//! # Metrics Exposed
//!
//! - `ccd_camera_session_ready` - 1 while the session is open
//! - `ccd_camera_acquisitions_total` - Successful acquisitions
//! - `ccd_camera_acquisitions_failed_total` - Acquisitions failed by the driver
//! - `ccd_camera_requests_rejected_total` - Requests rejected before the driver
//! - `ccd_camera_last_exposure_seconds` - Exposure of the latest acquisition
//! - `ccd_camera_buffers_outstanding` - Driver buffers awaiting release
//! - `ccd_camera_buffers_released_total` - Driver buffers released
//! - `ccd_camera_buffers_leaked_total` - Buffers orphaned by closing early
//!
//! # Example
//!
//! ```no_run
//! use ccd_camera::driver::SimulatedDriver;
//! use ccd_camera::metrics::{MetricsRegistry, MetricsSnapshot};
//! use ccd_camera::{Session, DEFAULT_MAGIC};
//!
//! let session = Session::new(SimulatedDriver::default());
//! session.open(DEFAULT_MAGIC).unwrap();
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.update(&MetricsSnapshot::from_session(&session));
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
