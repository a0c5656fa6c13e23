//! High-level camera handle.
//!
//! Wraps a [`Session`] with the configured acquisition defaults and
//! returns owned [`Frame`]s, so callers never hold driver memory.

use super::{CameraConfig, FileConfig, Frame};
use crate::acquisition::{AcquisitionRequest, Dimensions, Roi};
use crate::driver::Driver;
use crate::session::Session;
use crate::Error;

/// An open camera.
///
/// The connection is released when the camera is dropped.
pub struct Camera<D: Driver> {
    session: Session<D>,
    config: CameraConfig,
    name: String,
}

impl<D: Driver> Camera<D> {
    /// Opens a session on `driver` and applies the acquisition defaults.
    pub fn open(driver: D, magic: i32, config: CameraConfig) -> Result<Self, Error> {
        config.validate()?;

        let session = Session::new(driver).with_fallback_sensor(config.dimensions());
        session.open(magic)?;

        let name = session
            .camera_name()
            .unwrap_or_else(|_| session.driver_label());
        tracing::info!("Camera {} initialized", name);

        Ok(Self {
            session,
            config,
            name,
        })
    }

    /// Opens a camera using the driver and camera sections of a config file.
    pub fn from_config(driver: D, config: &FileConfig) -> Result<Self, Error> {
        Self::open(driver, config.driver.magic, config.camera.clone())
    }

    /// Name reported by the camera, or the driver label if it has none.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the acquisition defaults.
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Returns the underlying session.
    pub fn session(&self) -> &Session<D> {
        &self.session
    }

    /// Acquires an image, filling in configured defaults.
    ///
    /// `exposure` is in seconds. A missing `region` means the full
    /// configured frame. `binsize` must be one of the configured
    /// `possible_binsizes`.
    pub fn get_image(
        &self,
        exposure: Option<f64>,
        binsize: Option<u32>,
        region: Option<Roi>,
        display: bool,
    ) -> Result<Frame, Error> {
        let request = self.request(exposure, binsize, region, display)?;
        self.capture(&request)
    }

    /// Like [`Camera::get_image`], but reads raw integer counts.
    pub fn get_counts(
        &self,
        exposure: Option<f64>,
        binsize: Option<u32>,
        region: Option<Roi>,
        display: bool,
    ) -> Result<(Vec<i32>, Dimensions), Error> {
        let request = self.request(exposure, binsize, region, display)?;
        self.capture_counts(&request)
    }

    /// Acquires `n_frames` images with the same settings.
    ///
    /// Stops at the first failure. See [`Camera::movie`] to process frames
    /// as they arrive.
    pub fn get_movie(
        &self,
        n_frames: usize,
        exposure: Option<f64>,
        binsize: Option<u32>,
        region: Option<Roi>,
        display: bool,
    ) -> Result<Vec<Frame>, Error> {
        self.movie(n_frames, exposure, binsize, region, display)?
            .collect()
    }

    /// Returns an iterator acquiring up to `n_frames` images lazily.
    ///
    /// Settings are checked once, up front.
    pub fn movie(
        &self,
        n_frames: usize,
        exposure: Option<f64>,
        binsize: Option<u32>,
        region: Option<Roi>,
        display: bool,
    ) -> Result<Movie<'_, D>, Error> {
        let request = self.request(exposure, binsize, region, display)?;
        Ok(Movie {
            camera: self,
            request,
            remaining: n_frames,
        })
    }

    /// Acquires a frame into driver memory, copies it out and releases it.
    pub fn capture(&self, request: &AcquisitionRequest) -> Result<Frame, Error> {
        let buffer = self.session.acquire_allocated(request)?;
        let frame = Frame::new(
            buffer.to_vec(),
            buffer.width(),
            buffer.height(),
            buffer.sequence(),
            request.exposure,
            request.binning,
        );
        self.session.release_buffer(buffer);
        Ok(frame)
    }

    /// Acquires raw integer counts into a newly sized vector.
    ///
    /// The request is validated before anything is allocated.
    pub fn capture_counts(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<(Vec<i32>, Dimensions), Error> {
        let expected = self.session.expected_output(request)?;
        let mut counts = vec![0i32; expected.pixel_count()];
        let size = self.session.acquire_into(request, &mut counts)?;
        counts.truncate(size.pixel_count());
        Ok((counts, size))
    }

    /// Builds a request from configured defaults.
    fn request(
        &self,
        exposure: Option<f64>,
        binsize: Option<u32>,
        region: Option<Roi>,
        display: bool,
    ) -> Result<AcquisitionRequest, Error> {
        let exposure = exposure.unwrap_or(self.config.default_exposure);
        let binsize = binsize.unwrap_or(self.config.default_binsize);

        if !self.config.possible_binsizes.contains(&binsize) {
            return Err(Error::UnsupportedBinning {
                binsize,
                allowed: self.config.possible_binsizes.clone(),
            });
        }

        let roi = region.unwrap_or_else(|| Roi::full_frame(self.config.dimensions()));
        Ok(AcquisitionRequest::new(roi)
            .with_binning(binsize)
            .with_exposure(exposure)
            .with_display(display))
    }

    /// Releases the connection.
    pub fn close(self) {}
}

impl<D: Driver> Drop for Camera<D> {
    fn drop(&mut self) {
        if self.session.state().is_ready() {
            self.session.close();
            tracing::info!("Connection to camera {} released", self.name);
        }
    }
}

/// Frames acquired one at a time by [`Camera::movie`].
pub struct Movie<'a, D: Driver> {
    camera: &'a Camera<D>,
    request: AcquisitionRequest,
    remaining: usize,
}

impl<D: Driver> Iterator for Movie<'_, D> {
    type Item = Result<Frame, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let frame = self.camera.capture(&self.request);
        if frame.is_err() {
            self.remaining = 0;
        }
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<D: Driver> std::fmt::Debug for Camera<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("name", &self.name)
            .field("session", &self.session)
            .field("config", &self.config)
            .finish()
    }
}
