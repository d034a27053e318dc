//! Single-shot, sequence and live capture paths over the simulated device.

mod common;

use common::{open_capture_session, open_default_session};
use vcam_session::{CameraError, FrameCopy, FrameSelection, PixelData, PixelType};

#[test]
fn get_frame_returns_to_idle_with_matching_shape() {
    let mut session = open_capture_session();
    let pixel_data = session.get_frame(Some(20), 1000, true).unwrap();

    let frame = pixel_data.single().unwrap();
    assert_eq!(frame.shape(), (64, 48));
    assert_eq!(frame.pixel_type(), PixelType::U16);
    assert_eq!(
        session.acquisition_mode(),
        vcam_session::AcquisitionMode::Idle
    );
    assert_eq!(session.exp_time().unwrap(), 20);
    assert_eq!(session.last_exp_time().unwrap(), 20);
}

#[test]
fn sequence_delivers_monotonic_frame_counts() {
    let mut session = open_capture_session();
    session.start_seq(None, 5, true).unwrap();

    for expected in 1..=5u32 {
        let frame = session
            .poll_frame(1000, FrameSelection::Oldest, FrameCopy::Deep)
            .unwrap();
        assert_eq!(frame.frame_count, expected);
        assert_eq!(frame.pixel_data.single().unwrap().shape(), (64, 48));
    }

    // The sixth frame never arrives.
    let err = session
        .poll_frame(50, FrameSelection::Oldest, FrameCopy::Deep)
        .unwrap_err();
    assert!(matches!(err, CameraError::Timeout { timeout_ms: 50 }));
    session.finish().unwrap();
}

#[test]
fn get_sequence_stacks_uniform_frames() {
    let mut session = open_capture_session();
    let stack = session.get_sequence(5, Some(15), 1000, None, true).unwrap();

    assert_eq!(stack.len(), 5);
    for frame in stack.frames() {
        assert_eq!(frame.shape(), (64, 48));
    }
    // One arming per element, all at the same exposure.
    assert_eq!(session.port().exposure_log(), vec![15; 5]);
}

#[test]
fn get_sequence_requires_a_single_region() {
    let mut session = open_capture_session();
    session.set_roi(200, 200, 64, 48).unwrap();

    let err = session.get_sequence(2, None, 1000, None, false).unwrap_err();
    assert!(err.to_string().contains("2 regions"), "{err}");
}

#[test]
fn multi_region_frames_deliver_one_payload_per_region() {
    let mut session = open_capture_session();
    session.set_roi(200, 200, 32, 32).unwrap();

    let pixel_data = session.get_frame(None, 1000, false).unwrap();
    match &pixel_data {
        PixelData::Multi(rois) => {
            assert_eq!(rois.len(), 2);
            assert_eq!(rois[0].shape(), (64, 48));
            assert_eq!(rois[1].shape(), (32, 32));
        }
        PixelData::Single(_) => panic!("expected one payload per region"),
    }
    assert!(pixel_data.single().is_err());
}

#[test]
fn live_capture_streams_until_finished() {
    let mut session = open_capture_session();
    session.start_live(None, 16, None, true).unwrap();

    let first = session
        .poll_frame(1000, FrameSelection::Oldest, FrameCopy::Deep)
        .unwrap();
    let second = session
        .poll_frame(1000, FrameSelection::Newest, FrameCopy::Deep)
        .unwrap();
    assert_eq!(first.frame_count, 1);
    assert_eq!(second.frame_count, 2);
    assert!(second.fps > 0.0);

    session.finish().unwrap();
    assert!(session
        .poll_frame(50, FrameSelection::Oldest, FrameCopy::Deep)
        .is_err());
}

#[test]
fn metadata_headers_arrive_when_enabled() {
    let mut session = open_capture_session();
    session.set_metadata_enabled(true).unwrap();
    session.start_seq(Some(25), 1, true).unwrap();

    let frame = session
        .poll_frame(1000, FrameSelection::Oldest, FrameCopy::Deep)
        .unwrap();
    let meta = frame.meta.expect("metadata enabled");
    assert_eq!(meta.frame_nr, 1);
    assert_eq!(meta.exposure_time_us, 25_000);
    assert_eq!(meta.roi_headers.len(), 1);
    assert!(meta.roi_headers[0].timestamp_eof_ns > meta.roi_headers[0].timestamp_bof_ns);
    session.finish().unwrap();
}

#[test]
fn frame_pixels_are_deterministic() {
    let mut session = open_capture_session();
    let first = session.get_frame(None, 1000, true).unwrap();
    let again = session.get_frame(None, 1000, true).unwrap();

    // Same counter value after a reset, same synthetic gradient.
    assert_eq!(
        first.single().unwrap().as_bytes(),
        again.single().unwrap().as_bytes()
    );

    let samples = first.single().unwrap().to_u16().unwrap();
    assert_eq!(samples.len(), 64 * 48);
    assert!(samples.iter().all(|&s| s >= 100));
}

#[test]
fn bit_depth_drives_pixel_type() {
    let mut session = open_default_session();
    assert_eq!(session.pixel_type(), PixelType::U16);

    // The 200 MHz speed digitizes at 12 bits, still two bytes per pixel.
    session.set_speed(1).unwrap();
    assert_eq!(session.bit_depth().unwrap(), 12);
    assert_eq!(session.pixel_type(), PixelType::U16);
}

#[test]
fn exposure_time_is_validated_at_arming() {
    let mut session = open_capture_session();
    let err = session.get_frame(Some(0), 1000, false).unwrap_err();
    assert!(matches!(err, CameraError::InvalidValue { .. }));
    let err = session.start_seq(Some(20_000), 1, false).unwrap_err();
    assert!(err.to_string().contains("1 to 10000"), "{err}");
}
