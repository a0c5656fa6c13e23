//! Synchronous single-exposure capture.
//!
//! Both public acquisition calls share one capture path; they differ only
//! in where the pixels go (see [`OutputPolicy`]).

use super::buffer::BufferHandle;
use super::request::AcquisitionRequest;
use super::roi::Dimensions;
use crate::driver::{Driver, DriverAllocation};
use crate::session::Session;
use crate::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::PoisonError;
use std::time::Instant;

/// Whether an exposure is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionPhase {
    /// No exposure running.
    Idle,
    /// An exposure or readout is in progress.
    Capturing,
}

/// State guarded by the acquisition lock.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    /// Sequence number of the last successful acquisition.
    sequence: u64,
}

/// Where a capture writes its pixels.
trait OutputPolicy<D: Driver> {
    type Output;

    /// Local checks against the expected output size, before the driver.
    fn check(&self, expected: Dimensions) -> Result<(), Error>;

    /// Runs the exposure on the driver.
    fn fill(
        self,
        session: &Session<D>,
        driver: &mut D,
        request: &AcquisitionRequest,
        expected: Dimensions,
        sequence: u64,
    ) -> Result<Self::Output, Error>;
}

/// Integer counts written into caller-owned memory.
struct IntoCaller<'a>(&'a mut [i32]);

impl<D: Driver> OutputPolicy<D> for IntoCaller<'_> {
    type Output = Dimensions;

    fn check(&self, expected: Dimensions) -> Result<(), Error> {
        if self.0.len() < expected.pixel_count() {
            return Err(Error::BufferTooSmall {
                capacity: self.0.len(),
                required: expected.pixel_count(),
            });
        }
        Ok(())
    }

    fn fill(
        self,
        _session: &Session<D>,
        driver: &mut D,
        request: &AcquisitionRequest,
        expected: Dimensions,
        _sequence: u64,
    ) -> Result<Dimensions, Error> {
        let capacity = self.0.len();
        let (width, height) = driver.acquire_int(request, self.0)?;
        let written = Dimensions::new(width.max(0) as u32, height.max(0) as u32);

        if written.pixel_count() > capacity {
            return Err(Error::ContractViolation(format!(
                "driver wrote a {written} image into a buffer of {capacity} samples"
            )));
        }
        if written != expected {
            tracing::warn!(%written, %expected, "driver output size differs from request");
        }
        Ok(written)
    }
}

/// Floating-point pixels in a driver allocation handed to the caller.
struct Allocate;

impl<D: Driver> OutputPolicy<D> for Allocate {
    type Output = BufferHandle<D::Allocation>;

    fn check(&self, _expected: Dimensions) -> Result<(), Error> {
        Ok(())
    }

    fn fill(
        self,
        session: &Session<D>,
        driver: &mut D,
        request: &AcquisitionRequest,
        expected: Dimensions,
        sequence: u64,
    ) -> Result<Self::Output, Error> {
        let allocation = driver.acquire_float(request)?;
        let size = Dimensions::new(allocation.width(), allocation.height());

        if allocation.pixels().len() != size.pixel_count() {
            let len = allocation.pixels().len();
            driver.release_float(allocation);
            return Err(Error::ContractViolation(format!(
                "driver returned {len} samples for a {size} image"
            )));
        }
        if size != expected {
            tracing::warn!(written = %size, %expected, "driver output size differs from request");
        }

        // Registered while the driver is still held, so a concurrent close
        // cannot miss this buffer.
        let id = session
            .ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register();
        Ok(BufferHandle::new(session.id, id, sequence, allocation))
    }
}

/// Holds [`AcquisitionPhase::Capturing`] until dropped, including on unwind.
struct CapturingFlag<'a>(&'a AtomicBool);

impl<'a> CapturingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for CapturingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<D: Driver> Session<D> {
    /// Acquires a frame as raw integer counts into `buffer`.
    ///
    /// `buffer` must hold at least the binned output size, row-major.
    /// Returns the size written. On failure nothing in `buffer` may be
    /// relied upon.
    ///
    /// Blocks for the full exposure and readout, and behind any
    /// acquisition already in progress.
    pub fn acquire_into(
        &self,
        request: &AcquisitionRequest,
        buffer: &mut [i32],
    ) -> Result<Dimensions, Error> {
        self.capture(request, IntoCaller(buffer))
    }

    /// Acquires a frame into a buffer allocated by the driver.
    ///
    /// Pixels carry whatever gain and offset correction the driver applies.
    /// The returned handle must be passed to [`Session::release_buffer`]
    /// before the session is closed. On failure nothing is allocated.
    pub fn acquire_allocated(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<BufferHandle<D::Allocation>, Error> {
        self.capture(request, Allocate)
    }

    /// Validates `request` against the sensor and returns its output size,
    /// without touching the driver beyond the size query.
    pub(crate) fn expected_output(&self, request: &AcquisitionRequest) -> Result<Dimensions, Error> {
        let link = self.ready_link().inspect_err(|_| self.reject())?;
        let sensor = self.sensor_bounds(&link).inspect_err(|_| self.reject())?;
        request.validate(sensor).inspect_err(|e| {
            tracing::debug!(error = %e, "acquisition request rejected");
            self.reject();
        })
    }

    /// Returns whether an exposure is currently running.
    pub fn phase(&self) -> AcquisitionPhase {
        if self.capturing.load(Ordering::Acquire) {
            AcquisitionPhase::Capturing
        } else {
            AcquisitionPhase::Idle
        }
    }

    fn capture<P: OutputPolicy<D>>(
        &self,
        request: &AcquisitionRequest,
        policy: P,
    ) -> Result<P::Output, Error> {
        let mut engine = self
            .engine
            .lock()
            .map_err(|_| Error::ContractViolation("acquisition lock poisoned".to_string()))?;
        let mut link = self.ready_link_mut().inspect_err(|_| self.reject())?;

        let sensor = self.sensor_bounds(&link).inspect_err(|_| self.reject())?;
        let expected = request
            .validate(sensor)
            .and_then(|expected| policy.check(expected).map(|()| expected))
            .inspect_err(|e| {
                tracing::debug!(error = %e, "acquisition request rejected");
                self.reject();
            })?;

        let roi = request.roi;
        tracing::debug!(
            top = roi.top,
            left = roi.left,
            bottom = roi.bottom,
            right = roi.right,
            binning = request.binning,
            exposure = request.exposure,
            display = request.display,
            "starting exposure"
        );

        let sequence = engine.sequence + 1;
        let started = Instant::now();
        let result = {
            let _capturing = CapturingFlag::raise(&self.capturing);
            policy.fill(self, &mut link.driver, request, expected, sequence)
        };

        match &result {
            Ok(_) => {
                engine.sequence = sequence;
                self.record_success(request.exposure);
                tracing::debug!(
                    sequence,
                    %expected,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "exposure complete"
                );
            }
            Err(e) => {
                self.record_failure();
                tracing::warn!(error = %e, "acquisition failed");
            }
        }
        result
    }

    fn reject(&self) {
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn record_success(&self, exposure: f64) {
        self.counters.acquisitions.fetch_add(1, Ordering::Relaxed);
        self.counters.set_last_exposure(exposure);
    }

    fn record_failure(&self) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::Roi;
    use crate::driver::{SimulatedConfig, SimulatedDriver};
    use crate::session::DEFAULT_MAGIC;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn test_phase_idle_between_acquisitions() {
        let session = Session::new(SimulatedDriver::new(SimulatedConfig::with_dimensions(32, 32)));
        session.open(DEFAULT_MAGIC).unwrap();
        assert_eq!(session.phase(), AcquisitionPhase::Idle);

        let mut counts = vec![0i32; 64];
        let request = AcquisitionRequest::new(Roi::new(0, 0, 8, 8));
        session.acquire_into(&request, &mut counts).unwrap();
        assert_eq!(session.phase(), AcquisitionPhase::Idle);
    }

    #[test]
    fn test_driver_panic_clears_capturing() {
        let session = Session::new(SimulatedDriver::new(SimulatedConfig {
            panic_acquire: true,
            ..SimulatedConfig::with_dimensions(32, 32)
        }));
        session.open(DEFAULT_MAGIC).unwrap();
        let request = AcquisitionRequest::new(Roi::new(0, 0, 8, 8));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = session.acquire_allocated(&request);
        }));
        assert!(outcome.is_err());
        assert_eq!(session.phase(), AcquisitionPhase::Idle);

        // The poisoned locks make the session unusable afterwards.
        let err = session.acquire_allocated(&request).unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
    }
}
