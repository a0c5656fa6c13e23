//! Camera handle, configuration and frames.
//!
//! This module provides the convenience layer most callers want: a
//! [`Camera`] opened from configuration that hands back owned [`Frame`]s
//! and never exposes driver memory.

mod camera;
mod config;
mod frame;

pub use camera::{Camera, Movie};
pub use config::{CameraConfig, ConfigError, DriverConfig, DriverKind, FileConfig};
pub use frame::Frame;
