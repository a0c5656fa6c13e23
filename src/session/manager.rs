//! Session lifecycle and shared state.

use super::state::SessionState;
use crate::acquisition::{BufferLedger, Dimensions, EngineState};
use crate::driver::Driver;
use crate::Error;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// The driver together with the lifecycle state it is in.
pub(crate) struct Link<D> {
    pub(crate) driver: D,
    pub(crate) state: SessionState,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) acquisitions: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) rejected: AtomicU64,
    pub(crate) released: AtomicU64,
    pub(crate) leaked: AtomicU64,
    last_exposure: AtomicU64,
}

impl Counters {
    pub(crate) fn set_last_exposure(&self, seconds: f64) {
        self.last_exposure.store(seconds.to_bits(), Ordering::Relaxed);
    }

    fn last_exposure(&self) -> Option<f64> {
        let bits = self.last_exposure.load(Ordering::Relaxed);
        (bits != 0).then(|| f64::from_bits(bits))
    }
}

/// Point-in-time view of a session's activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Successful acquisitions, both variants.
    pub acquisitions: u64,
    /// Acquisitions the driver failed.
    pub failed_acquisitions: u64,
    /// Requests rejected before reaching the driver.
    pub rejected_requests: u64,
    /// Callee-allocated buffers not yet released.
    pub outstanding_buffers: usize,
    /// Callee-allocated buffers released through the session.
    pub released_buffers: u64,
    /// Buffers still outstanding when the session was closed.
    pub leaked_buffers: u64,
    /// Exposure of the most recent successful acquisition, in seconds.
    pub last_exposure: Option<f64>,
}

/// A connection to one camera driver.
///
/// The session is an explicit value rather than process-global state, so
/// tests can run several against independent simulated drivers. Production
/// code is expected to hold exactly one.
///
/// Locking: open, close, script execution, acquisition and buffer release
/// take the driver exclusively; metadata queries share it. Acquisitions are
/// additionally serialized by their own lock, so a second caller blocks
/// until the first exposure has been read out.
pub struct Session<D: Driver> {
    pub(crate) id: u64,
    pub(crate) link: RwLock<Link<D>>,
    pub(crate) engine: Mutex<EngineState>,
    pub(crate) ledger: Mutex<BufferLedger>,
    pub(crate) counters: Counters,
    pub(crate) capturing: AtomicBool,
    fallback_sensor: Option<Dimensions>,
}

impl<D: Driver> Session<D> {
    /// Wraps a driver in a new, unopened session.
    pub fn new(driver: D) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            link: RwLock::new(Link {
                driver,
                state: SessionState::Uninitialized,
            }),
            engine: Mutex::new(EngineState::default()),
            ledger: Mutex::new(BufferLedger::default()),
            counters: Counters::default(),
            capturing: AtomicBool::new(false),
            fallback_sensor: None,
        }
    }

    /// Sets the sensor size used to validate regions when the camera does
    /// not report its own.
    pub fn with_fallback_sensor(mut self, sensor: Dimensions) -> Self {
        self.fallback_sensor = Some(sensor);
        self
    }

    /// Opens the driver connection.
    ///
    /// `magic` is the compatibility token agreed with the driver release
    /// and is passed through uninterpreted. Opening a session that is
    /// already ready succeeds without contacting the driver again.
    pub fn open(&self, magic: i32) -> Result<(), Error> {
        let mut link = self.write_link()?;

        if link.state.is_ready() {
            tracing::debug!(session = self.id, "session already open");
            return Ok(());
        }
        if !link.state.can_open() {
            return Err(Error::ContractViolation(format!(
                "open attempted while the session is {}",
                link.state
            )));
        }

        link.state = SessionState::Initializing;
        tracing::info!(
            session = self.id,
            driver = link.driver.label(),
            "opening camera session"
        );

        match link.driver.open(magic) {
            Ok(()) => {
                link.state = SessionState::Ready;
                tracing::info!(session = self.id, "camera session ready");
                Ok(())
            }
            Err(e) => {
                link.state = SessionState::Failed;
                tracing::warn!(session = self.id, error = %e, "failed to open camera session");
                Err(e.into())
            }
        }
    }

    /// Releases the driver connection.
    ///
    /// A no-op unless the session is ready. Callee-allocated buffers must
    /// be released first; any still outstanding are leaked and can no
    /// longer be released.
    pub fn close(&self) {
        let mut link = self.link.write().unwrap_or_else(PoisonError::into_inner);

        if !link.state.is_ready() {
            tracing::debug!(session = self.id, state = %link.state, "close on inactive session");
            return;
        }

        let orphaned = self
            .ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .orphan_all();
        if orphaned > 0 {
            self.counters
                .leaked
                .fetch_add(orphaned as u64, Ordering::Relaxed);
            tracing::error!(
                session = self.id,
                outstanding = orphaned,
                "closing session with unreleased buffers"
            );
        }

        link.driver.close();
        link.state = SessionState::Released;
        tracing::info!(session = self.id, "camera session released");
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.link
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// Returns the driver's label.
    pub fn driver_label(&self) -> String {
        self.link
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .driver
            .label()
            .to_string()
    }

    /// Returns a snapshot of the session's counters.
    pub fn stats(&self) -> SessionStats {
        let outstanding_buffers = self
            .ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .outstanding();
        SessionStats {
            state: self.state(),
            acquisitions: self.counters.acquisitions.load(Ordering::Relaxed),
            failed_acquisitions: self.counters.failed.load(Ordering::Relaxed),
            rejected_requests: self.counters.rejected.load(Ordering::Relaxed),
            outstanding_buffers,
            released_buffers: self.counters.released.load(Ordering::Relaxed),
            leaked_buffers: self.counters.leaked.load(Ordering::Relaxed),
            last_exposure: self.counters.last_exposure(),
        }
    }

    pub(crate) fn read_link(&self) -> Result<RwLockReadGuard<'_, Link<D>>, Error> {
        self.link.read().map_err(|_| poisoned())
    }

    pub(crate) fn write_link(&self) -> Result<RwLockWriteGuard<'_, Link<D>>, Error> {
        self.link.write().map_err(|_| poisoned())
    }

    /// Shared driver access, failing unless the session is ready.
    pub(crate) fn ready_link(&self) -> Result<RwLockReadGuard<'_, Link<D>>, Error> {
        let link = self.read_link()?;
        if !link.state.is_ready() {
            tracing::debug!(session = self.id, state = %link.state, "session not ready");
            return Err(Error::NotReady(link.state));
        }
        Ok(link)
    }

    /// Exclusive driver access, failing unless the session is ready.
    pub(crate) fn ready_link_mut(&self) -> Result<RwLockWriteGuard<'_, Link<D>>, Error> {
        let link = self.write_link()?;
        if !link.state.is_ready() {
            tracing::debug!(session = self.id, state = %link.state, "session not ready");
            return Err(Error::NotReady(link.state));
        }
        Ok(link)
    }

    /// Sensor bounds for region validation.
    pub(crate) fn sensor_bounds(&self, link: &Link<D>) -> Result<Dimensions, Error> {
        match link.driver.camera_dimensions() {
            Some((w, h)) if w > 0 && h > 0 => Ok(Dimensions::new(w as u32, h as u32)),
            _ => self.fallback_sensor.ok_or(Error::MetadataUnavailable),
        }
    }
}

impl<D: Driver> Drop for Session<D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<D: Driver> std::fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("fallback_sensor", &self.fallback_sensor)
            .finish()
    }
}

fn poisoned() -> Error {
    Error::ContractViolation("session lock poisoned by a panicking driver call".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, SimulatedConfig, SimulatedDriver};
    use crate::session::DEFAULT_MAGIC;

    #[test]
    fn test_session_lifecycle() {
        let session = Session::new(SimulatedDriver::default());
        assert_eq!(session.state(), SessionState::Uninitialized);

        session.open(DEFAULT_MAGIC).unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        session.close();
        assert_eq!(session.state(), SessionState::Released);
    }

    #[test]
    fn test_open_is_idempotent() {
        let driver = SimulatedDriver::default();
        let monitor = driver.monitor();
        let session = Session::new(driver);

        session.open(DEFAULT_MAGIC).unwrap();
        session.open(DEFAULT_MAGIC).unwrap();
        assert_eq!(monitor.count_of(&DriverCall::Open), 1);
    }

    #[test]
    fn test_wrong_magic_fails() {
        let session = Session::new(SimulatedDriver::default());
        let err = session.open(42).unwrap_err();
        assert!(matches!(err, Error::Driver(_)));
        assert_eq!(session.state(), SessionState::Failed);

        // A failed session can be retried.
        session.open(DEFAULT_MAGIC).unwrap();
        assert!(session.state().is_ready());
    }

    #[test]
    fn test_open_refused_mid_initialization() {
        let driver = SimulatedDriver::default();
        let monitor = driver.monitor();
        let session = Session::new(driver);
        session.link.write().unwrap().state = SessionState::Initializing;

        let err = session.open(DEFAULT_MAGIC).unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
        assert_eq!(session.state(), SessionState::Initializing);
        assert_eq!(monitor.count_of(&DriverCall::Open), 0);
    }

    #[test]
    fn test_close_without_open_is_noop() {
        let driver = SimulatedDriver::default();
        let monitor = driver.monitor();
        let session = Session::new(driver);

        session.close();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(monitor.call_count(), 0);
    }

    #[test]
    fn test_drop_closes_driver() {
        let driver = SimulatedDriver::default();
        let monitor = driver.monitor();
        {
            let session = Session::new(driver);
            session.open(DEFAULT_MAGIC).unwrap();
        }
        assert_eq!(monitor.count_of(&DriverCall::Close), 1);
    }

    #[test]
    fn test_fallback_sensor() {
        let config = SimulatedConfig {
            info_available: false,
            ..Default::default()
        };
        let session = Session::new(SimulatedDriver::new(config))
            .with_fallback_sensor(Dimensions::new(512, 256));
        session.open(DEFAULT_MAGIC).unwrap();

        let link = session.read_link().unwrap();
        assert_eq!(
            session.sensor_bounds(&link).unwrap(),
            Dimensions::new(512, 256)
        );
    }
}
