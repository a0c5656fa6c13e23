//! Metrics collection and registry.

use crate::driver::Driver;
use crate::session::{Session, SessionStats};
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether the session is ready.
    pub is_ready: bool,
    /// Successful acquisitions.
    pub acquisitions: u64,
    /// Acquisitions failed by the driver.
    pub failed_acquisitions: u64,
    /// Requests rejected before reaching the driver.
    pub rejected_requests: u64,
    /// Callee-allocated buffers not yet released.
    pub outstanding_buffers: usize,
    /// Buffers released through the session.
    pub released_buffers: u64,
    /// Buffers leaked by closing with outstanding handles.
    pub leaked_buffers: u64,
    /// Exposure of the latest acquisition, in seconds.
    pub last_exposure: Option<f64>,
}

/// Prometheus metrics registry for camera monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // Session metrics
    session_ready: IntGauge,

    // Acquisition metrics
    acquisitions_total: IntCounter,
    failed_total: IntCounter,
    rejected_total: IntCounter,
    last_exposure: Gauge,

    // Buffer metrics
    outstanding_buffers: IntGauge,
    released_total: IntCounter,
    leaked_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all camera metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let session_ready = IntGauge::new(
            "ccd_camera_session_ready",
            "Current session status (1=ready, 0=not ready)",
        )?;

        let acquisitions_total = IntCounter::new(
            "ccd_camera_acquisitions_total",
            "Total number of successful acquisitions",
        )?;
        let failed_total = IntCounter::new(
            "ccd_camera_acquisitions_failed_total",
            "Total number of acquisitions failed by the driver",
        )?;
        let rejected_total = IntCounter::new(
            "ccd_camera_requests_rejected_total",
            "Total number of acquisition requests rejected before the driver",
        )?;
        let last_exposure = Gauge::new(
            "ccd_camera_last_exposure_seconds",
            "Exposure time of the most recent acquisition",
        )?;

        let outstanding_buffers = IntGauge::new(
            "ccd_camera_buffers_outstanding",
            "Driver-allocated buffers not yet released",
        )?;
        let released_total = IntCounter::new(
            "ccd_camera_buffers_released_total",
            "Total number of driver-allocated buffers released",
        )?;
        let leaked_total = IntCounter::new(
            "ccd_camera_buffers_leaked_total",
            "Buffers still outstanding when their session closed",
        )?;

        registry.register(Box::new(session_ready.clone()))?;
        registry.register(Box::new(acquisitions_total.clone()))?;
        registry.register(Box::new(failed_total.clone()))?;
        registry.register(Box::new(rejected_total.clone()))?;
        registry.register(Box::new(last_exposure.clone()))?;
        registry.register(Box::new(outstanding_buffers.clone()))?;
        registry.register(Box::new(released_total.clone()))?;
        registry.register(Box::new(leaked_total.clone()))?;

        Ok(Self {
            registry,
            session_ready,
            acquisitions_total,
            failed_total,
            rejected_total,
            last_exposure,
            outstanding_buffers,
            released_total,
            leaked_total,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.session_ready.set(i64::from(snapshot.is_ready));

        // Counters only move forward; apply the difference.
        advance(&self.acquisitions_total, snapshot.acquisitions);
        advance(&self.failed_total, snapshot.failed_acquisitions);
        advance(&self.rejected_total, snapshot.rejected_requests);
        advance(&self.released_total, snapshot.released_buffers);
        advance(&self.leaked_total, snapshot.leaked_buffers);

        if let Some(exposure) = snapshot.last_exposure {
            self.last_exposure.set(exposure);
        }
        self.outstanding_buffers
            .set(snapshot.outstanding_buffers as i64);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl From<&SessionStats> for MetricsSnapshot {
    fn from(stats: &SessionStats) -> Self {
        Self {
            is_ready: stats.state.is_ready(),
            acquisitions: stats.acquisitions,
            failed_acquisitions: stats.failed_acquisitions,
            rejected_requests: stats.rejected_requests,
            outstanding_buffers: stats.outstanding_buffers,
            released_buffers: stats.released_buffers,
            leaked_buffers: stats.leaked_buffers,
            last_exposure: stats.last_exposure,
        }
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of a session.
    pub fn from_session<D: Driver>(session: &Session<D>) -> Self {
        Self::from(&session.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let snapshot = MetricsSnapshot {
            is_ready: true,
            acquisitions: 5,
            failed_acquisitions: 1,
            rejected_requests: 2,
            outstanding_buffers: 1,
            released_buffers: 4,
            leaked_buffers: 0,
            last_exposure: Some(0.5),
        };

        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("ccd_camera_session_ready 1"));
        assert!(output.contains("ccd_camera_acquisitions_total 5"));
        assert!(output.contains("ccd_camera_buffers_outstanding 1"));
        assert!(output.contains("ccd_camera_last_exposure_seconds 0.5"));
    }

    #[test]
    fn test_counters_do_not_double_count() {
        let registry = MetricsRegistry::new().unwrap();
        let snapshot = MetricsSnapshot {
            acquisitions: 3,
            ..Default::default()
        };

        registry.update(&snapshot);
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("ccd_camera_acquisitions_total 3"));
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        assert!(output.contains("ccd_camera_session_ready"));
        assert!(output.contains("ccd_camera_buffers_released_total"));
    }
}
