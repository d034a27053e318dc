//! Opens the simulated camera and dumps its identity, settings and
//! capability tables.
//!
//! Run: cargo run -p vcam-session --example camera_info

use anyhow::Result;
use vcam_session::{AcquisitionSession, MockPort};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port = MockPort::default();
    let names = AcquisitionSession::available_camera_names(&port)?;
    println!("cameras: {names:?}");

    let mut session = AcquisitionSession::new(port, names[0].clone());
    session.open()?;

    println!("chip:     {}", session.chip_name()?);
    println!("serial:   {}", session.serial_no()?);
    println!("driver:   {}", session.driver_version()?);
    println!("sensor:   {:?}", session.sensor_size()?);
    println!("temp:     {:.2} degC", session.temp()?);
    println!(
        "readout:  port {} / {} / {}",
        session.readout_port()?,
        session.speed_name()?,
        session.gain_name()?
    );

    println!(
        "speed/gain table:\n{}",
        serde_json::to_string_pretty(session.port_speed_gain_table())?
    );
    println!(
        "post-processing table:\n{}",
        serde_json::to_string_pretty(session.post_processing_table())?
    );

    session.close()?;
    Ok(())
}
