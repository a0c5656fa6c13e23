use ccd_camera::driver::{DriverCall, SimulatedConfig, SimulatedDriver};
use ccd_camera::{
    AcquisitionRequest, Dimensions, Error, Roi, Session, SessionState, STATUS_NOT_READY,
    STATUS_OK, DEFAULT_MAGIC,
};

fn open_session(config: SimulatedConfig) -> Session<SimulatedDriver> {
    let session = Session::new(SimulatedDriver::new(config));
    session.open(DEFAULT_MAGIC).unwrap();
    session
}

#[test]
fn test_full_frame_round_trip() -> Result<(), Error> {
    let driver = SimulatedDriver::default();
    let monitor = driver.monitor();
    let session = Session::new(driver);

    session.open(DEFAULT_MAGIC)?;
    assert_eq!(session.state(), SessionState::Ready);

    let sensor = session.camera_dimensions()?;
    assert_eq!(sensor, Dimensions::new(2048, 2048));

    let request = AcquisitionRequest::new(Roi::full_frame(sensor))
        .with_binning(1)
        .with_exposure(0.5);
    let buffer = session.acquire_allocated(&request)?;
    assert_eq!(buffer.width(), 2048);
    assert_eq!(buffer.height(), 2048);
    assert_eq!(buffer.pixels().len(), 2048 * 2048);

    session.release_buffer(buffer);
    assert_eq!(monitor.outstanding(), 0);

    session.close();
    assert_eq!(session.state(), SessionState::Released);
    assert_eq!(monitor.count_of(&DriverCall::Close), 1);
    Ok(())
}

#[test]
fn test_nothing_reaches_driver_before_open() {
    let driver = SimulatedDriver::default();
    let monitor = driver.monitor();
    let session = Session::new(driver);

    let request = AcquisitionRequest::new(Roi::new(0, 0, 16, 16));
    let result = session.acquire_allocated(&request);
    assert!(matches!(result, Err(Error::NotReady(SessionState::Uninitialized))));

    let mut counts = vec![0i32; 256];
    let err = session.acquire_into(&request, &mut counts).unwrap_err();
    assert_eq!(err.status(), STATUS_NOT_READY);

    assert!(session.camera_name().is_err());
    assert!(session.camera_dimensions().is_err());
    assert!(session.camera_count().is_err());
    assert!(session.is_camera_info_available().is_err());
    assert!(session.execute_script("Exit(0)").is_err());

    assert_eq!(monitor.call_count(), 0);
}

#[test]
fn test_metadata_is_stable() {
    let session = open_session(SimulatedConfig::with_dimensions(4096, 4096));

    assert!(session.is_camera_info_available().unwrap());
    assert_eq!(session.camera_name().unwrap(), "Simulated CCD");

    let first = session.camera_dimensions().unwrap();
    let second = session.camera_dimensions().unwrap();
    assert_eq!(first, Dimensions::new(4096, 4096));
    assert_eq!(first, second);
}

#[test]
fn test_zero_cameras_is_not_an_error() {
    let session = open_session(SimulatedConfig {
        camera_count: 0,
        ..Default::default()
    });

    assert_eq!(session.camera_count().unwrap(), 0);
}

#[test]
fn test_metadata_unavailable() {
    let session = open_session(SimulatedConfig {
        info_available: false,
        ..Default::default()
    });

    assert!(!session.is_camera_info_available().unwrap());
    assert!(matches!(session.camera_name(), Err(Error::MetadataUnavailable)));
    assert!(matches!(
        session.camera_dimensions(),
        Err(Error::MetadataUnavailable)
    ));
}

#[test]
fn test_operations_fail_after_close() {
    let session = open_session(SimulatedConfig::with_dimensions(64, 64));
    session.close();

    let request = AcquisitionRequest::new(Roi::new(0, 0, 8, 8));
    let err = session.acquire_allocated(&request).unwrap_err();
    assert!(matches!(err, Error::NotReady(SessionState::Released)));

    // Closing twice leaves the state alone.
    session.close();
    assert_eq!(session.state(), SessionState::Released);
}

#[test]
fn test_reopen_after_release() {
    let driver = SimulatedDriver::new(SimulatedConfig::with_dimensions(64, 64));
    let monitor = driver.monitor();
    let session = Session::new(driver);

    session.open(DEFAULT_MAGIC).unwrap();
    session.close();
    session.open(DEFAULT_MAGIC).unwrap();

    assert!(session.state().is_ready());
    assert_eq!(monitor.count_of(&DriverCall::Open), 2);
}

#[test]
fn test_open_failure_status_passthrough() {
    let session = Session::new(SimulatedDriver::new(SimulatedConfig {
        fail_open: Some(-42),
        ..Default::default()
    }));

    let result = session.open(DEFAULT_MAGIC);
    assert_eq!(ccd_camera::status_of(&result), -42);
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn test_script_status_returned() {
    let session = open_session(SimulatedConfig {
        script_status: 3,
        ..Default::default()
    });

    let result = session.execute_script("Result(\"hello\")");
    assert_eq!(result.as_ref().ok(), Some(&3));
    assert_eq!(ccd_camera::status_of(&result), STATUS_OK);
}

#[test]
#[should_panic(expected = "buffer release contract violated")]
fn test_release_into_foreign_session_panics() {
    let first = open_session(SimulatedConfig::with_dimensions(64, 64));
    let second = open_session(SimulatedConfig::with_dimensions(64, 64));

    let request = AcquisitionRequest::new(Roi::new(0, 0, 8, 8));
    let buffer = first.acquire_allocated(&request).unwrap();
    second.release_buffer(buffer);
}

#[test]
#[should_panic(expected = "buffer release contract violated")]
fn test_release_after_close_panics() {
    let session = open_session(SimulatedConfig::with_dimensions(64, 64));

    let request = AcquisitionRequest::new(Roi::new(0, 0, 8, 8));
    let buffer = session.acquire_allocated(&request).unwrap();
    session.close();
    session.release_buffer(buffer);
}

#[test]
fn test_close_with_outstanding_buffer_counts_leak() {
    let session = open_session(SimulatedConfig::with_dimensions(64, 64));

    let request = AcquisitionRequest::new(Roi::new(0, 0, 8, 8));
    let buffer = session.acquire_allocated(&request).unwrap();
    assert_eq!(session.stats().outstanding_buffers, 1);

    session.close();
    let stats = session.stats();
    assert_eq!(stats.outstanding_buffers, 0);
    assert_eq!(stats.leaked_buffers, 1);
    drop(buffer);
}
