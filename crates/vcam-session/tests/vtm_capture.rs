//! Variable-timed sequences: the native re-trigger path, the emulated
//! fallback and exposure-resolution restore.

mod common;

use common::{open_capture_session, open_session};
use vcam_session::{AcquisitionMode, CameraError, MockConfig};

const MILLIS: &str = "One Millisecond";
const MICROS: &str = "One Microsecond";

#[test]
fn native_path_cycles_exposure_times() {
    let mut session = open_capture_session();
    session.set_exp_mode("Variable Timed Mode").unwrap();

    let stack = session
        .get_vtm_sequence(&[10, 20, 30], MILLIS, 7, 1000, None, true)
        .unwrap();

    assert_eq!(stack.len(), 7);
    assert_eq!(
        session.port().vtm_exposure_log(),
        vec![10, 20, 30, 10, 20, 30, 10]
    );
    // One preparation, not one arming per frame.
    assert_eq!(session.port().exposure_log().len(), 0);
    assert_eq!(session.acquisition_mode(), AcquisitionMode::Idle);
}

#[test]
fn native_path_arms_without_a_session_exposure_time() {
    // No set_exp_time call: the session cache is still zero. The device
    // refuses a zero-exposure arming, so the preparation must carry its own
    // placeholder.
    let mut session = open_session(MockConfig::default());
    session.set_roi(0, 0, 32, 32).unwrap();
    session.set_exp_mode("Variable Timed Mode").unwrap();

    let stack = session
        .get_vtm_sequence(&[10, 20], MILLIS, 2, 1000, None, true)
        .unwrap();
    assert_eq!(stack.len(), 2);
    assert_eq!(session.port().vtm_exposure_log(), vec![10, 20]);
}

#[test]
fn emulated_path_arms_one_sequence_per_frame() {
    let mut session = open_capture_session();
    // Exposure mode stays timed, so the capture falls back to emulation.
    let stack = session
        .get_vtm_sequence(&[10, 20, 30], MILLIS, 5, 1000, None, true)
        .unwrap();

    assert_eq!(stack.len(), 5);
    assert_eq!(session.port().exposure_log(), vec![10, 20, 30, 10, 20]);
    assert!(session.port().vtm_exposure_log().is_empty());
}

#[test]
fn unsupported_devices_still_emulate() {
    let mut session = open_session(MockConfig {
        supports_vtm: false,
        ..MockConfig::default()
    });
    session.set_roi(0, 0, 32, 32).unwrap();
    session.set_exp_time(10).unwrap();
    assert!(session.exp_modes().resolve("Variable Timed Mode").is_err());

    let stack = session
        .get_vtm_sequence(&[5, 15], MILLIS, 2, 1000, None, true)
        .unwrap();
    assert_eq!(stack.len(), 2);
}

#[test]
fn exposure_resolution_is_restored_after_a_mid_sequence_fault() {
    let mut session = open_session(MockConfig {
        fail_poll_at: Some(3),
        ..MockConfig::default()
    });
    session.set_roi(0, 0, 32, 32).unwrap();
    session.set_exp_time(10).unwrap();
    session.set_exp_mode("Variable Timed Mode").unwrap();

    let before = session.exp_res().unwrap();
    let err = session
        .get_vtm_sequence(&[10, 20, 30, 40], MICROS, 4, 1000, None, true)
        .unwrap_err();

    assert!(matches!(err, CameraError::HardwareRejected { .. }));
    assert_eq!(session.exp_res().unwrap(), before);
    assert_eq!(session.acquisition_mode(), AcquisitionMode::Idle);
}

#[test]
fn time_list_is_validated_up_front() {
    let mut session = open_capture_session();
    session.set_exp_mode("Variable Timed Mode").unwrap();

    let err = session
        .get_vtm_sequence(&[], MILLIS, 1, 1000, None, false)
        .unwrap_err();
    assert!(err.to_string().contains("at least one"), "{err}");

    // 0 is below the device minimum; nothing was prepared or triggered.
    let err = session
        .get_vtm_sequence(&[10, 0, 30], MILLIS, 3, 1000, None, false)
        .unwrap_err();
    assert!(matches!(err, CameraError::InvalidValue { .. }));
    assert!(session.port().vtm_exposure_log().is_empty());
}

#[test]
fn vtm_requires_a_single_region() {
    let mut session = open_capture_session();
    session.set_roi(200, 200, 32, 32).unwrap();
    assert!(session
        .get_vtm_sequence(&[10], MILLIS, 1, 1000, None, false)
        .is_err());
}

#[test]
fn vtm_exposure_setter_respects_device_bounds() {
    let mut session = open_capture_session();
    session.set_vtm_exp_time(500).unwrap();
    assert_eq!(session.vtm_exp_time().unwrap(), 500);
    assert!(session.set_vtm_exp_time(20_000).is_err());
}
