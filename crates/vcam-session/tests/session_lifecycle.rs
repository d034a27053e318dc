//! Open/close lifecycle: cache population, teardown and closed-session
//! behavior.

mod common;

use common::{open_default_session, open_session};
use vcam_session::{AcquisitionMode, AcquisitionSession, CameraError, MockConfig, MockPort};

#[test]
fn open_populates_caches() {
    let session = open_default_session();

    assert!(session.is_open());
    assert_eq!(session.acquisition_mode(), AcquisitionMode::Idle);
    assert_eq!(session.sensor_size().unwrap(), (2048, 2048));

    // Default ROI covers the full sensor.
    let rois = session.rois().unwrap();
    assert_eq!(rois.len(), 1);
    assert_eq!(rois[0].shape(), (2048, 2048));

    assert!(!session.port_speed_gain_table().is_empty());
    assert!(!session.post_processing_table().is_empty());
    assert!(!session.readout_ports().is_empty());
}

#[test]
fn close_resets_everything_and_session_reopens() {
    let mut session = open_default_session();
    session.set_roi(10, 10, 100, 100).unwrap();
    session.close().unwrap();

    assert!(!session.is_open());
    assert!(session.port_speed_gain_table().is_empty());
    assert!(session.readout_ports().is_empty());
    assert!(matches!(
        session.rois().unwrap_err(),
        CameraError::NotOpen { .. }
    ));
    assert!(matches!(
        session.chip_name().unwrap_err(),
        CameraError::NotOpen { .. }
    ));

    session.open().unwrap();
    assert!(session.is_open());
    assert_eq!(session.rois().unwrap()[0].shape(), (2048, 2048));
}

#[test]
fn failed_close_still_leaves_session_closed() {
    let mut session = open_session(MockConfig {
        fail_close: true,
        ..MockConfig::default()
    });

    assert!(matches!(
        session.close().unwrap_err(),
        CameraError::CloseFailed(_)
    ));
    assert!(!session.is_open());
    assert!(session.close().is_err()); // now NotOpen, not CloseFailed
}

#[test]
fn open_unknown_camera_fails() {
    let mut session = AcquisitionSession::new(MockPort::default(), "NoSuchCam");
    assert!(matches!(
        session.open().unwrap_err(),
        CameraError::DeviceUnavailable(_)
    ));
    assert!(!session.is_open());
}

#[test]
fn check_param_is_false_while_closed() {
    use vcam_session::params::PARAM_CHIP_NAME;
    let mut session = open_default_session();
    assert!(session.check_param(PARAM_CHIP_NAME));
    session.close().unwrap();
    assert!(!session.check_param(PARAM_CHIP_NAME));
}

#[test]
fn device_info_accessors() {
    let session = open_default_session();
    assert_eq!(session.chip_name().unwrap(), "MockSensor2048B");
    assert_eq!(session.serial_no().unwrap(), "A23X000123");
    assert_eq!(session.driver_version().unwrap(), "3.2.5");
    assert_eq!(session.bit_depth().unwrap(), 16);
    assert_eq!(session.pix_time().unwrap(), 10);
    assert!((session.temp().unwrap() - (-5.0)).abs() < f64::EPSILON);
}

#[test]
fn serial_number_falls_back_when_unsupported() {
    let session = open_session(MockConfig {
        serial_no: None,
        ..MockConfig::default()
    });
    assert_eq!(session.serial_no().unwrap(), "N/A");
}

#[test]
fn temperature_setpoint_rejects_out_of_range() {
    let mut session = open_default_session();
    session.set_temp_setpoint(-20.0).unwrap();
    assert!((session.temp_setpoint().unwrap() - (-20.0)).abs() < f64::EPSILON);

    let err = session.set_temp_setpoint(60.0).unwrap_err();
    assert!(err.to_string().contains("-50"), "range in message: {err}");
}
