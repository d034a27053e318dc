//! The capture state machine: arming guards, teardown and status reporting.

mod common;

use common::open_capture_session;
use vcam_session::{
    AcquisitionMode, CameraError, FrameCopy, FrameSelection, FrameStatus, ParameterPort,
};

#[test]
fn arming_while_active_is_rejected() {
    let mut session = open_capture_session();
    session.start_live(None, 16, None, false).unwrap();
    assert_eq!(session.acquisition_mode(), AcquisitionMode::Live);

    let err = session.start_seq(None, 1, false).unwrap_err();
    assert!(matches!(err, CameraError::AcquisitionState(_)));
    let err = session.start_live(None, 16, None, false).unwrap_err();
    assert!(matches!(err, CameraError::AcquisitionState(_)));

    // Still live; the failed arms did not disturb the capture.
    assert_eq!(session.acquisition_mode(), AcquisitionMode::Live);
    session.finish().unwrap();
    assert_eq!(session.acquisition_mode(), AcquisitionMode::Idle);
}

#[test]
fn polling_an_idle_session_fails() {
    let session = open_capture_session();
    let err = session
        .poll_frame(100, FrameSelection::Oldest, FrameCopy::Deep)
        .unwrap_err();
    assert!(matches!(err, CameraError::AcquisitionState(_)));
}

#[test]
fn finish_is_idempotent() {
    let mut session = open_capture_session();
    session.finish().unwrap();

    session.start_seq(None, 1, false).unwrap();
    session.finish().unwrap();
    session.finish().unwrap();
    assert_eq!(session.acquisition_mode(), AcquisitionMode::Idle);
}

#[test]
fn frame_status_reads_idle_between_captures() {
    let mut session = open_capture_session();
    assert_eq!(
        session.check_frame_status().unwrap(),
        FrameStatus::ReadoutNotActive
    );

    session.get_frame(None, 1000, false).unwrap();

    // The delivery layer still reports the finished capture as available;
    // the session masks that while idle.
    let raw = session
        .port()
        .frame_status(session.handle())
        .unwrap();
    assert_eq!(raw, FrameStatus::FrameAvailable);
    assert_eq!(
        session.check_frame_status().unwrap(),
        FrameStatus::ReadoutNotActive
    );

    session.start_live(None, 16, None, false).unwrap();
    assert_eq!(
        session.check_frame_status().unwrap(),
        FrameStatus::FrameAvailable
    );
    session.finish().unwrap();
}

#[test]
fn software_trigger_requires_an_armed_capture() {
    let mut session = open_capture_session();
    assert!(session.sw_trigger().is_err());
    session.start_live(None, 16, None, false).unwrap();
    session.sw_trigger().unwrap();
    session.finish().unwrap();
}

mod stream_to_disk {
    use super::common::open_capture_session;
    use vcam_session::CameraError;

    #[test]
    fn missing_directory_fails_before_arming() {
        let mut session = open_capture_session();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("frames.raw");

        let err = session
            .start_live(None, 16, Some(&path), false)
            .unwrap_err();
        assert!(matches!(err, CameraError::InvalidValue { .. }));
        assert!(session.port().exposure_log().is_empty());
        assert!(session.port().last_stream_path().is_none());
    }

    #[test]
    fn leftover_file_is_removed_and_path_forwarded() {
        let mut session = open_capture_session();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.raw");
        std::fs::write(&path, b"stale").unwrap();

        session.start_live(None, 16, Some(&path), false).unwrap();
        assert!(!path.exists());
        assert_eq!(session.port().last_stream_path().as_deref(), Some(&*path));
        session.finish().unwrap();
    }
}
