//! Read-only camera queries.

use super::Session;
use crate::acquisition::Dimensions;
use crate::driver::{decode_wide, Driver, DriverError, WideChar};
use crate::Error;

/// Wide characters reserved for [`Session::camera_name`].
pub const CAMERA_NAME_CAPACITY: usize = 256;

impl<D: Driver> Session<D> {
    /// Returns true if the camera reports its name and sensor size.
    pub fn is_camera_info_available(&self) -> Result<bool, Error> {
        let link = self.ready_link()?;
        Ok(link.driver.is_camera_info_available())
    }

    /// Writes the null-terminated camera name into `buf`.
    ///
    /// Returns the number of code units before the terminator. Fails with
    /// [`Error::MetadataUnavailable`] if the camera does not report a name
    /// or `buf` is too small; `buf` must not be read in that case.
    pub fn camera_name_into(&self, buf: &mut [WideChar]) -> Result<usize, Error> {
        let link = self.ready_link()?;
        if !link.driver.camera_name(buf) {
            tracing::debug!(capacity = buf.len(), "camera name unavailable");
            return Err(Error::MetadataUnavailable);
        }
        Ok(buf.iter().position(|&c| c == 0).unwrap_or(buf.len()))
    }

    /// Returns the camera name.
    pub fn camera_name(&self) -> Result<String, Error> {
        let mut buf = [0 as WideChar; CAMERA_NAME_CAPACITY];
        let len = self.camera_name_into(&mut buf)?;
        Ok(decode_wide(&buf[..len]))
    }

    /// Returns the native full-frame sensor size.
    pub fn camera_dimensions(&self) -> Result<Dimensions, Error> {
        let link = self.ready_link()?;
        match link.driver.camera_dimensions() {
            Some((w, h)) if w > 0 && h > 0 => Ok(Dimensions::new(w as u32, h as u32)),
            _ => Err(Error::MetadataUnavailable),
        }
    }

    /// Returns the number of cameras the driver reports.
    ///
    /// Zero is a valid answer, distinct from a failed query.
    pub fn camera_count(&self) -> Result<u32, Error> {
        let link = self.ready_link()?;
        let count = link.driver.camera_count()?;
        u32::try_from(count)
            .map_err(|_| Error::Driver(DriverError::status("cameraCount", count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{SimulatedConfig, SimulatedDriver};
    use crate::session::DEFAULT_MAGIC;

    fn open(config: SimulatedConfig) -> Session<SimulatedDriver> {
        let session = Session::new(SimulatedDriver::new(config));
        session.open(DEFAULT_MAGIC).unwrap();
        session
    }

    #[test]
    fn test_queries_require_ready() {
        let driver = SimulatedDriver::default();
        let monitor = driver.monitor();
        let session = Session::new(driver);

        assert!(matches!(session.camera_dimensions(), Err(Error::NotReady(_))));
        assert!(matches!(session.camera_count(), Err(Error::NotReady(_))));
        assert!(matches!(session.camera_name(), Err(Error::NotReady(_))));
        assert!(matches!(
            session.is_camera_info_available(),
            Err(Error::NotReady(_))
        ));
        assert_eq!(monitor.call_count(), 0);
    }

    #[test]
    fn test_camera_name() {
        let session = open(SimulatedConfig {
            name: "Orius SC1000".into(),
            ..Default::default()
        });
        assert_eq!(session.camera_name().unwrap(), "Orius SC1000");

        let mut small = [0u16; 5];
        assert!(matches!(
            session.camera_name_into(&mut small),
            Err(Error::MetadataUnavailable)
        ));
    }

    #[test]
    fn test_info_unavailable() {
        let session = open(SimulatedConfig {
            info_available: false,
            ..Default::default()
        });
        assert!(!session.is_camera_info_available().unwrap());
        assert!(matches!(
            session.camera_dimensions(),
            Err(Error::MetadataUnavailable)
        ));
    }

    #[test]
    fn test_zero_cameras_is_valid() {
        let session = open(SimulatedConfig {
            camera_count: 0,
            ..Default::default()
        });
        assert_eq!(session.camera_count().unwrap(), 0);
    }

    #[test]
    fn test_negative_count_is_driver_error() {
        let session = open(SimulatedConfig {
            camera_count: -3,
            ..Default::default()
        });
        assert_eq!(session.camera_count().unwrap_err().status(), -3);
    }
}
