//! In-process simulated camera driver.
//!
//! Produces deterministic frames without any hardware, and records every
//! call it receives so tests can check what reached the driver and when.

use super::{encode_wide, Driver, DriverAllocation, DriverError, WideChar};
use crate::acquisition::AcquisitionRequest;
use crate::session::DEFAULT_MAGIC;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Behaviour of a [`SimulatedDriver`].
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Sensor width in pixels.
    pub width: i32,
    /// Sensor height in pixels.
    pub height: i32,
    /// Name reported by the camera.
    pub name: String,
    /// Number of cameras reported.
    pub camera_count: i32,
    /// Whether name and size queries succeed.
    pub info_available: bool,
    /// Token `open` accepts.
    pub expected_magic: i32,
    /// Wall-clock seconds slept per second of requested exposure.
    pub exposure_scale: f64,
    /// Gain applied by the floating-point readout.
    pub gain: f32,
    /// Offset applied by the floating-point readout.
    pub offset: f32,
    /// Status returned for every script.
    pub script_status: i32,
    /// Status returned by `open` instead of connecting.
    pub fail_open: Option<i32>,
    /// Status returned by every acquisition instead of a frame.
    pub fail_acquire: Option<i32>,
    /// Panic inside every acquisition, like a crashing vendor library.
    pub panic_acquire: bool,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 2048,
            name: "Simulated CCD".to_string(),
            camera_count: 1,
            info_available: true,
            expected_magic: DEFAULT_MAGIC,
            exposure_scale: 0.0,
            gain: 1.0,
            offset: 0.0,
            script_status: 0,
            fail_open: None,
            fail_acquire: None,
            panic_acquire: false,
        }
    }
}

impl SimulatedConfig {
    /// Creates a configuration for a sensor of the given size.
    pub fn with_dimensions(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

/// A driver operation, as recorded by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    /// `Driver::open`.
    Open,
    /// `Driver::close`.
    Close,
    /// `Driver::is_camera_info_available`.
    IsCameraInfoAvailable,
    /// `Driver::camera_name`.
    CameraName,
    /// `Driver::camera_dimensions`.
    CameraDimensions,
    /// `Driver::camera_count`.
    CameraCount,
    /// `Driver::execute_script`, with the decoded script text.
    ExecuteScript(String),
    /// `Driver::acquire_int`.
    AcquireInt,
    /// `Driver::acquire_float`.
    AcquireFloat,
    /// `Driver::release_float`.
    ReleaseFloat,
}

impl DriverCall {
    /// Returns true for the two acquisition calls.
    pub fn is_acquisition(&self) -> bool {
        matches!(self, Self::AcquireInt | Self::AcquireFloat)
    }
}

/// One recorded driver call with its start and end time.
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Operation called.
    pub call: DriverCall,
    /// When the driver entered the call.
    pub started: Instant,
    /// When the driver returned.
    pub finished: Instant,
}

#[derive(Debug, Default)]
struct MonitorState {
    calls: Mutex<Vec<CallRecord>>,
    outstanding: AtomicUsize,
    allocated: AtomicU64,
    displayed: AtomicU64,
}

/// Shared view into a simulator's activity.
///
/// Clones observe the same driver, so a test can keep a monitor after the
/// driver has been moved into a session.
#[derive(Debug, Clone, Default)]
pub struct DriverMonitor {
    inner: Arc<MonitorState>,
}

impl DriverMonitor {
    /// Returns every call recorded so far, in completion order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns how many times `call` was recorded.
    pub fn count_of(&self, call: &DriverCall) -> usize {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|record| &record.call == call)
            .count()
    }

    /// Returns the number of float buffers not yet released.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Returns the number of float buffers ever allocated.
    pub fn allocated_total(&self) -> u64 {
        self.inner.allocated.load(Ordering::SeqCst)
    }

    /// Returns the number of frames the host was asked to display.
    pub fn displayed(&self) -> u64 {
        self.inner.displayed.load(Ordering::SeqCst)
    }

    fn record(&self, call: DriverCall, started: Instant) {
        let record = CallRecord {
            call,
            started,
            finished: Instant::now(),
        };
        tracing::trace!(call = ?record.call, "simulated driver call");
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Float pixels owned by a [`SimulatedDriver`].
#[derive(Debug)]
pub struct SimulatedAllocation {
    pixels: Vec<f32>,
    width: u32,
    height: u32,
}

impl DriverAllocation for SimulatedAllocation {
    fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Simulated camera driver for testing and demonstration.
#[derive(Debug, Default)]
pub struct SimulatedDriver {
    config: SimulatedConfig,
    monitor: DriverMonitor,
    connected: bool,
}

impl SimulatedDriver {
    /// Creates a disconnected simulator.
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            monitor: DriverMonitor::default(),
            connected: false,
        }
    }

    /// Returns a monitor observing this driver.
    pub fn monitor(&self) -> DriverMonitor {
        self.monitor.clone()
    }

    /// Returns the simulator configuration.
    pub fn config(&self) -> &SimulatedConfig {
        &self.config
    }

    /// Integrates and bins the synthetic scene over the requested region.
    fn expose(&self, request: &AcquisitionRequest) -> (Vec<i32>, i32, i32) {
        if self.config.exposure_scale > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(
                request.exposure * self.config.exposure_scale,
            ));
        }

        let bin = request.binning as i64;
        let roi = request.roi;
        let width = (roi.right - roi.left) as i64 / bin;
        let height = (roi.bottom - roi.top) as i64 / bin;
        let level = (request.exposure * 1000.0) as i64;

        let mut counts = Vec::with_capacity((width * height) as usize);
        for oy in 0..height {
            for ox in 0..width {
                let mut sum = 0i64;
                for by in 0..bin {
                    for bx in 0..bin {
                        let x = roi.left as i64 + ox * bin + bx;
                        let y = roi.top as i64 + oy * bin + by;
                        sum += (x * 3 + y * 5) % 1000 + level;
                    }
                }
                counts.push(sum as i32);
            }
        }

        if request.display {
            self.monitor.inner.displayed.fetch_add(1, Ordering::SeqCst);
        }

        (counts, width as i32, height as i32)
    }

    fn check_capture(&self, operation: &'static str) -> Result<(), DriverError> {
        if !self.connected {
            return Err(DriverError::status(operation, -1));
        }
        if self.config.panic_acquire {
            panic!("simulated driver fault in {operation}");
        }
        if let Some(code) = self.config.fail_acquire {
            return Err(DriverError::status(operation, code));
        }
        Ok(())
    }
}

impl Driver for SimulatedDriver {
    type Allocation = SimulatedAllocation;

    fn label(&self) -> &str {
        "simulated"
    }

    fn open(&mut self, magic: i32) -> Result<(), DriverError> {
        let started = Instant::now();
        let result = match self.config.fail_open {
            Some(code) => Err(DriverError::status("initCCDCOM", code)),
            None if magic != self.config.expected_magic => {
                Err(DriverError::status("initCCDCOM", 0))
            }
            None => {
                self.connected = true;
                Ok(())
            }
        };
        self.monitor.record(DriverCall::Open, started);
        result
    }

    fn close(&mut self) {
        let started = Instant::now();
        self.connected = false;
        self.monitor.record(DriverCall::Close, started);
    }

    fn is_camera_info_available(&self) -> bool {
        let started = Instant::now();
        self.monitor.record(DriverCall::IsCameraInfoAvailable, started);
        self.config.info_available
    }

    fn camera_name(&self, buf: &mut [WideChar]) -> bool {
        let started = Instant::now();
        let wide = encode_wide(&self.config.name);
        let ok = self.config.info_available && wide.len() <= buf.len();
        if ok {
            buf[..wide.len()].copy_from_slice(&wide);
        }
        self.monitor.record(DriverCall::CameraName, started);
        ok
    }

    fn camera_dimensions(&self) -> Option<(i32, i32)> {
        let started = Instant::now();
        self.monitor.record(DriverCall::CameraDimensions, started);
        self.config
            .info_available
            .then_some((self.config.width, self.config.height))
    }

    fn camera_count(&self) -> Result<i32, DriverError> {
        let started = Instant::now();
        self.monitor.record(DriverCall::CameraCount, started);
        Ok(self.config.camera_count)
    }

    fn execute_script(&mut self, script: &[WideChar]) -> Result<i32, DriverError> {
        let started = Instant::now();
        let text = super::decode_wide(script);
        self.monitor.record(DriverCall::ExecuteScript(text), started);
        Ok(self.config.script_status)
    }

    fn acquire_int(
        &mut self,
        request: &AcquisitionRequest,
        out: &mut [i32],
    ) -> Result<(i32, i32), DriverError> {
        let started = Instant::now();
        let result = self.check_capture("acquireImageNewInt").and_then(|()| {
            let (counts, width, height) = self.expose(request);
            if counts.len() > out.len() {
                return Err(DriverError::status("acquireImageNewInt", 3));
            }
            out[..counts.len()].copy_from_slice(&counts);
            Ok((width, height))
        });
        self.monitor.record(DriverCall::AcquireInt, started);
        result
    }

    fn acquire_float(&mut self, request: &AcquisitionRequest) -> Result<Self::Allocation, DriverError> {
        let started = Instant::now();
        let result = self.check_capture("acquireImageNewFloat").map(|()| {
            let (counts, width, height) = self.expose(request);
            let (gain, offset) = (self.config.gain, self.config.offset);
            let pixels = counts
                .into_iter()
                .map(|c| c as f32 * gain + offset)
                .collect();
            self.monitor.inner.outstanding.fetch_add(1, Ordering::SeqCst);
            self.monitor.inner.allocated.fetch_add(1, Ordering::SeqCst);
            SimulatedAllocation {
                pixels,
                width: width as u32,
                height: height as u32,
            }
        });
        self.monitor.record(DriverCall::AcquireFloat, started);
        result
    }

    fn release_float(&mut self, allocation: Self::Allocation) {
        let started = Instant::now();
        drop(allocation);
        self.monitor.inner.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.monitor.record(DriverCall::ReleaseFloat, started);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::Roi;

    fn request(roi: Roi, binning: u32) -> AcquisitionRequest {
        AcquisitionRequest::new(roi).with_binning(binning).with_exposure(0.5)
    }

    #[test]
    fn test_open_requires_magic() {
        let mut driver = SimulatedDriver::default();
        let err = driver.open(1234).unwrap_err();
        assert_eq!(err.code(), Some(0));
        assert!(driver.open(DEFAULT_MAGIC).is_ok());
    }

    #[test]
    fn test_float_applies_gain_and_offset() {
        let config = SimulatedConfig {
            gain: 2.0,
            offset: 10.0,
            ..SimulatedConfig::with_dimensions(16, 16)
        };
        let mut driver = SimulatedDriver::new(config);
        driver.open(DEFAULT_MAGIC).unwrap();

        let req = request(Roi::new(0, 0, 8, 8), 2);
        let mut ints = vec![0i32; 16];
        driver.acquire_int(&req, &mut ints).unwrap();
        let floats = driver.acquire_float(&req).unwrap();

        for (i, f) in ints.iter().zip(floats.pixels()) {
            assert_eq!(*f, *i as f32 * 2.0 + 10.0);
        }
        driver.release_float(floats);
        assert_eq!(driver.monitor().outstanding(), 0);
    }

    #[test]
    fn test_capture_without_open() {
        let mut driver = SimulatedDriver::default();
        let req = request(Roi::new(0, 0, 4, 4), 1);
        assert!(driver.acquire_float(&req).is_err());
        assert_eq!(driver.monitor().allocated_total(), 0);
    }

    #[test]
    fn test_name_capacity() {
        let driver = SimulatedDriver::default();
        let mut small = [0u16; 4];
        assert!(!driver.camera_name(&mut small));

        let mut buf = [0u16; 32];
        assert!(driver.camera_name(&mut buf));
        assert_eq!(super::super::decode_wide(&buf), "Simulated CCD");
    }
}
