//! Shared helpers for the simulated-device integration tests.

#![allow(dead_code)] // Utilities may not all be used in every test file

use vcam_session::{AcquisitionSession, MockConfig, MockPort};

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An opened session over a default simulated device.
pub fn open_default_session() -> AcquisitionSession<MockPort> {
    open_session(MockConfig::default())
}

/// An opened session over a simulated device with the given configuration.
pub fn open_session(config: MockConfig) -> AcquisitionSession<MockPort> {
    init_tracing();
    let name = config.name.clone();
    let mut session = AcquisitionSession::new(MockPort::new(config), name);
    session.open().expect("mock device should open");
    session
}

/// A session sized for fast capture tests: a small ROI and a short exposure.
pub fn open_capture_session() -> AcquisitionSession<MockPort> {
    let mut session = open_default_session();
    session.set_roi(0, 0, 64, 48).expect("ROI within sensor");
    session.set_exp_time(10).expect("exposure within bounds");
    session
}
