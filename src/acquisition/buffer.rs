//! Callee-allocated image buffers and their release gate.

use super::roi::Dimensions;
use crate::driver::{Driver, DriverAllocation};
use crate::session::Session;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::PoisonError;

/// A floating-point image allocated by the driver and owned by the caller.
///
/// The handle cannot be cloned and is consumed by
/// [`Session::release_buffer`], so a buffer cannot be read after release
/// or released twice:
///
/// ```compile_fail
/// use ccd_camera::driver::SimulatedDriver;
/// use ccd_camera::{AcquisitionRequest, Roi, Session, DEFAULT_MAGIC};
///
/// let session = Session::new(SimulatedDriver::default());
/// session.open(DEFAULT_MAGIC).unwrap();
/// let request = AcquisitionRequest::new(Roi::new(0, 0, 16, 16));
/// let buffer = session.acquire_allocated(&request).unwrap();
/// session.release_buffer(buffer);
/// session.release_buffer(buffer);
/// ```
///
/// ```compile_fail
/// use ccd_camera::driver::SimulatedDriver;
/// use ccd_camera::{AcquisitionRequest, Roi, Session, DEFAULT_MAGIC};
///
/// let session = Session::new(SimulatedDriver::default());
/// session.open(DEFAULT_MAGIC).unwrap();
/// let request = AcquisitionRequest::new(Roi::new(0, 0, 16, 16));
/// let buffer = session.acquire_allocated(&request).unwrap();
/// session.release_buffer(buffer);
/// let _ = buffer.pixels();
/// ```
#[must_use = "driver-allocated buffers must be passed to Session::release_buffer"]
pub struct BufferHandle<A: DriverAllocation> {
    session: u64,
    id: u64,
    sequence: u64,
    allocation: A,
}

impl<A: DriverAllocation> BufferHandle<A> {
    pub(crate) fn new(session: u64, id: u64, sequence: u64, allocation: A) -> Self {
        Self {
            session,
            id,
            sequence,
            allocation,
        }
    }

    /// Identifier of this buffer within its session.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Sequence number of the acquisition that produced this buffer.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the pixels in row-major order.
    #[inline]
    pub fn pixels(&self) -> &[f32] {
        self.allocation.pixels()
    }

    /// Image width in output pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.allocation.width()
    }

    /// Image height in output pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.allocation.height()
    }

    /// Image size.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Copies the pixels out of driver memory.
    pub fn to_vec(&self) -> Vec<f32> {
        self.pixels().to_vec()
    }
}

impl<A: DriverAllocation> std::fmt::Debug for BufferHandle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferHandle")
            .field("session", &self.session)
            .field("id", &self.id)
            .field("sequence", &self.sequence)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Buffers handed out by a session and not yet released.
#[derive(Debug, Default)]
pub(crate) struct BufferLedger {
    next_id: u64,
    outstanding: HashSet<u64>,
}

impl BufferLedger {
    pub(crate) fn register(&mut self) -> u64 {
        self.next_id += 1;
        self.outstanding.insert(self.next_id);
        self.next_id
    }

    /// Removes `id`, returning false if it was not outstanding.
    pub(crate) fn retire(&mut self, id: u64) -> bool {
        self.outstanding.remove(&id)
    }

    /// Forgets every outstanding buffer, returning how many there were.
    pub(crate) fn orphan_all(&mut self) -> usize {
        let count = self.outstanding.len();
        self.outstanding.clear();
        count
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.len()
    }
}

impl<D: Driver> Session<D> {
    /// Returns a callee-allocated buffer to the driver.
    ///
    /// # Panics
    ///
    /// Releasing a buffer produced by another session, or one whose
    /// session has since been closed, is a contract violation and panics.
    /// Such a handle may refer to memory the driver has already reclaimed.
    pub fn release_buffer(&self, handle: BufferHandle<D::Allocation>) {
        if let Err(violation) = self.try_release(handle) {
            tracing::error!(session = self.id, %violation, "buffer release contract violated");
            panic!("buffer release contract violated: {violation}");
        }
    }

    fn try_release(&self, handle: BufferHandle<D::Allocation>) -> Result<(), String> {
        if handle.session != self.id {
            return Err(format!(
                "buffer {} belongs to session {}, not {}",
                handle.id, handle.session, self.id
            ));
        }

        let mut link = self.link.write().unwrap_or_else(PoisonError::into_inner);
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);

        if !link.state.is_ready() {
            return Err(format!(
                "buffer {} released while the session is {}",
                handle.id, link.state
            ));
        }
        if !ledger.retire(handle.id) {
            return Err(format!(
                "buffer {} is not outstanding; it was released already or orphaned by close",
                handle.id
            ));
        }

        let id = handle.id;
        link.driver.release_float(handle.allocation);
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(session = self.id, buffer = id, "released buffer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_register_retire() {
        let mut ledger = BufferLedger::default();
        let a = ledger.register();
        let b = ledger.register();
        assert_ne!(a, b);
        assert_eq!(ledger.outstanding(), 2);

        assert!(ledger.retire(a));
        assert!(!ledger.retire(a));
        assert_eq!(ledger.outstanding(), 1);
    }

    #[test]
    fn test_orphan_all() {
        let mut ledger = BufferLedger::default();
        let id = ledger.register();
        ledger.register();

        assert_eq!(ledger.orphan_all(), 2);
        assert!(!ledger.retire(id));
    }
}
