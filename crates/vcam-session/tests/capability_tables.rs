//! Capability tables built at open time, enum lookups and post-processing
//! parameter access.

mod common;

use common::{open_default_session, open_session};
use vcam_session::{EnumKey, MockConfig};

#[test]
fn port_speed_gain_table_matches_device_topology() {
    let session = open_default_session();
    let table = session.port_speed_gain_table();

    assert_eq!(table.ports.len(), 1);
    let port = table.port("Sensitivity").expect("port by name");
    assert_eq!(port.value, 0);
    assert_eq!(port.speeds.len(), 2);

    let fast = port.speed("100 MHz").expect("speed by name");
    assert_eq!(fast.pixel_time, 10);
    assert_eq!(fast.bit_depth, 16);
    assert_eq!(fast.gain_range(), vec![1, 2, 3]);
    assert_eq!(fast.gain("Gain 2").expect("gain by name").index, 2);

    let slow = port.speed("200 MHz").expect("speed by name");
    assert_eq!(slow.bit_depth, 12);
    assert_eq!(slow.gain_range(), vec![1]);
}

#[test]
fn table_walk_restores_the_default_readout_chain() {
    let session = open_default_session();
    assert_eq!(session.readout_port().unwrap(), 0);
    assert_eq!(session.speed().unwrap(), 0);
    assert_eq!(session.gain().unwrap(), 1);
    assert_eq!(session.speed_name().unwrap(), "100 MHz");
    assert_eq!(session.gain_name().unwrap(), "Gain 1");
}

#[test]
fn nameless_speeds_and_gains_get_synthesized_names() {
    let session = open_session(MockConfig {
        has_speed_name: false,
        has_gain_name: false,
        ..MockConfig::default()
    });
    assert_eq!(session.speed_name().unwrap(), "Speed_0");
    assert_eq!(session.gain_name().unwrap(), "Gain_1");

    let table = session.port_speed_gain_table();
    let port = table.port("Sensitivity").unwrap();
    assert_eq!(port.speeds[0].name, "Speed_0");
    assert_eq!(port.speeds[0].gains[0].name, "Gain_1");
}

#[test]
fn readout_chain_setters_validate_their_ranges() {
    let mut session = open_default_session();
    session.set_speed(1).unwrap();
    // The 200 MHz speed has a single gain.
    assert_eq!(session.gain().unwrap(), 1);
    let err = session.set_gain(2).unwrap_err();
    assert!(err.to_string().contains("1 to 1"), "{err}");

    let err = session.set_speed(5).unwrap_err();
    assert!(err.to_string().contains("0 to 1"), "{err}");

    assert!(session.set_readout_port("Turbo").is_err());
    session.set_readout_port("Sensitivity").unwrap();
}

#[test]
fn enum_lookups_resolve_names_and_codes() {
    let session = open_default_session();
    let ports = session.readout_ports();

    assert_eq!(ports.resolve("Sensitivity").unwrap(), 0);
    assert_eq!(ports.resolve(0).unwrap(), 0);
    assert_eq!(ports.name_of(0).unwrap(), "Sensitivity");

    let err = ports.resolve(EnumKey::from("Turbo")).unwrap_err();
    assert!(err.to_string().contains("Sensitivity"), "{err}");
    assert!(ports.resolve(9).is_err());
}

#[test]
fn unsupported_enum_families_are_empty_not_errors() {
    let mut session = open_default_session(); // centroids off by default
    assert!(session.centroids_modes().is_empty());
    assert!(!session.clear_modes().is_empty());
    assert!(session.set_clear_mode("Pre-Sequence").is_ok());
}

#[test]
fn post_processing_round_trip() {
    let mut session = open_default_session();
    let table = session.post_processing_table();
    assert_eq!(table.features.len(), 1);
    let pp = table
        .find("DESPECKLE BRIGHT LOW", "THRESHOLD")
        .expect("parameter in table");
    assert_eq!((pp.min, pp.max), (0, 100));
    assert_eq!((pp.feature_id, pp.param_id), (1, 11));

    assert_eq!(
        session
            .get_post_processing_param("DESPECKLE BRIGHT LOW", "THRESHOLD")
            .unwrap(),
        50
    );
    session
        .set_post_processing_param("DESPECKLE BRIGHT LOW", "THRESHOLD", 80)
        .unwrap();
    assert_eq!(
        session
            .get_post_processing_param("DESPECKLE BRIGHT LOW", "THRESHOLD")
            .unwrap(),
        80
    );

    session.reset_pp().unwrap();
    assert_eq!(
        session
            .get_post_processing_param("DESPECKLE BRIGHT LOW", "THRESHOLD")
            .unwrap(),
        50
    );
}

#[test]
fn post_processing_rejects_out_of_range_and_unknown_names() {
    let mut session = open_default_session();

    let err = session
        .set_post_processing_param("DESPECKLE BRIGHT LOW", "THRESHOLD", 200)
        .unwrap_err();
    assert!(err.to_string().contains("0 to 100"), "{err}");

    let err = session
        .set_post_processing_param("SHARPEN", "ENABLED", 1)
        .unwrap_err();
    assert!(err.to_string().contains("DESPECKLE BRIGHT LOW"), "{err}");

    let err = session
        .set_post_processing_param("DESPECKLE BRIGHT LOW", "LEVEL", 1)
        .unwrap_err();
    assert!(err.to_string().contains("THRESHOLD"), "{err}");
}

#[test]
fn devices_without_post_processing_keep_an_empty_table() {
    let session = open_session(MockConfig {
        pp_features: Vec::new(),
        ..MockConfig::default()
    });
    assert!(session.post_processing_table().is_empty());
}

#[test]
fn capability_tables_serialize_for_diagnostics() {
    let session = open_default_session();
    let json = serde_json::to_string(session.port_speed_gain_table()).unwrap();
    assert!(json.contains("\"100 MHz\""));
    let json = serde_json::to_string(session.post_processing_table()).unwrap();
    assert!(json.contains("THRESHOLD"));
}
