//! ROI-list management: replace-then-append policy, overlap rejection and
//! binning propagation.

mod common;

use common::{open_default_session, open_session};
use vcam_session::{CameraError, MockConfig};

#[test]
fn first_roi_replaces_the_default_then_appends() {
    let mut session = open_default_session();

    session.set_roi(100, 100, 256, 256).unwrap();
    let rois = session.rois().unwrap();
    assert_eq!(rois.len(), 1);
    assert_eq!(rois[0].shape(), (256, 256));
    assert_eq!(rois[0].s1(), 100);

    session.set_roi(600, 600, 128, 128).unwrap();
    assert_eq!(session.rois().unwrap().len(), 2);
    assert_eq!(session.shape(1).unwrap(), (128, 128));
}

#[test]
fn overlapping_region_is_rejected_and_list_unchanged() {
    let mut session = open_session(MockConfig {
        max_roi_count: 3,
        ..MockConfig::default()
    });
    session.set_roi(100, 100, 256, 256).unwrap();
    session.set_roi(600, 600, 128, 128).unwrap();

    // Touches the first region's corner: closed intervals overlap.
    let err = session.set_roi(355, 355, 64, 64).unwrap_err();
    assert!(matches!(err, CameraError::CapacityExceeded(_)));
    assert_eq!(session.rois().unwrap().len(), 2);
}

#[test]
fn region_budget_is_enforced() {
    let mut session = open_default_session(); // budget of 2
    session.set_roi(0, 0, 100, 100).unwrap();
    session.set_roi(200, 200, 100, 100).unwrap();

    let err = session.set_roi(400, 400, 100, 100).unwrap_err();
    assert!(matches!(err, CameraError::CapacityExceeded(_)));
    assert!(err.to_string().contains("at most 2"));
}

#[test]
fn single_region_devices_always_replace() {
    let mut session = open_session(MockConfig {
        max_roi_count: 1,
        ..MockConfig::default()
    });
    session.set_roi(0, 0, 100, 100).unwrap();
    session.set_roi(500, 500, 100, 100).unwrap();

    let rois = session.rois().unwrap();
    assert_eq!(rois.len(), 1);
    assert_eq!(rois[0].s1(), 500);
}

#[test]
fn rejects_degenerate_and_out_of_bounds_regions() {
    let mut session = open_default_session();
    assert!(session.set_roi(0, 0, 0, 100).is_err());
    assert!(session.set_roi(0, 0, 100, 0).is_err());
    // 2000 + 100 - 1 exceeds the 2048-wide sensor's last column.
    assert!(session.set_roi(2000, 0, 100, 100).is_err());
    // Corner case: exactly fits.
    assert!(session.set_roi(1948, 1948, 100, 100).is_ok());
}

#[test]
fn reset_rois_restores_full_frame() {
    let mut session = open_default_session();
    session.set_roi(0, 0, 64, 64).unwrap();
    session.set_roi(128, 128, 64, 64).unwrap();
    session.reset_rois().unwrap();

    let rois = session.rois().unwrap();
    assert_eq!(rois.len(), 1);
    assert_eq!(rois[0].shape(), (2048, 2048));
}

#[test]
fn binning_applies_to_every_region_and_reclips() {
    let mut session = open_default_session();
    assert_eq!(session.binning().unwrap(), (1, 1));
    session.set_roi(0, 0, 100, 100).unwrap();
    session.set_roi(200, 200, 100, 100).unwrap();

    session.set_binning(3, 3).unwrap();
    assert_eq!(session.binning().unwrap(), (3, 3));
    for roi in session.rois().unwrap() {
        assert_eq!(roi.shape(), (33, 33));
        assert_eq!((roi.s2() - roi.s1() + 1) % 3, 0);
    }
}

#[test]
fn new_regions_inherit_current_binning() {
    let mut session = open_default_session();
    session.set_binning(2, 2).unwrap();
    // The list still holds the (rebinned) default region, so this replaces.
    session.set_roi(0, 0, 100, 100).unwrap();

    let rois = session.rois().unwrap();
    assert_eq!(rois.len(), 1);
    assert_eq!(rois[0].sbin(), 2);
    assert_eq!(rois[0].shape(), (50, 50));
}

#[test]
fn binning_wider_than_a_region_is_rejected_atomically() {
    let mut session = open_default_session();
    session.set_roi(0, 0, 512, 512).unwrap();
    session.set_roi(600, 600, 2, 2).unwrap();

    // The second region holds no 4x4-binned pixel; nothing changes.
    let err = session.set_binning(4, 4).unwrap_err();
    assert!(matches!(err, CameraError::InvalidValue { .. }));
    assert_eq!(session.binning().unwrap(), (1, 1));
    assert_eq!(session.rois().unwrap()[1].shape(), (2, 2));
}

#[test]
fn limited_binnings_restrict_the_setter() {
    let mut session = open_session(MockConfig {
        limited_binnings: Some(vec![(1, 1), (2, 2), (4, 4)]),
        ..MockConfig::default()
    });
    assert_eq!(
        session.binnings().unwrap(),
        Some(&[(1, 1), (2, 2), (4, 4)][..])
    );
    session.set_binning(2, 2).unwrap();

    let err = session.set_binning(3, 3).unwrap_err();
    assert!(err.to_string().contains("(2, 2)"), "list in message: {err}");
    assert_eq!(session.binning().unwrap(), (2, 2));
}

#[test]
fn arbitrary_binning_devices_report_none() {
    let session = open_default_session();
    assert_eq!(session.binnings().unwrap(), None);
}
