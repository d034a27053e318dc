//! Runs a short live capture against the simulated camera and prints per-frame
//! statistics.
//!
//! Run: cargo run -p vcam-session --example live_preview

use anyhow::Result;
use vcam_session::{AcquisitionSession, FrameCopy, FrameSelection, MockPort};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut session = AcquisitionSession::new(MockPort::default(), "MockCam00");
    session.open()?;
    session.set_roi(512, 512, 256, 256)?;
    session.set_exp_time(10)?;

    session.start_live(None, 16, None, true)?;
    for _ in 0..20 {
        let frame = session.poll_frame(1000, FrameSelection::Oldest, FrameCopy::Deep)?;
        let pixels = frame.pixel_data.single()?.to_u16()?;
        let max = pixels.iter().copied().max().unwrap_or(0);
        let mean = pixels.iter().map(|&p| u64::from(p)).sum::<u64>() / pixels.len() as u64;
        println!(
            "frame {:>3}  fps {:>6.1}  mean {mean:>5}  max {max:>5}",
            frame.frame_count, frame.fps
        );
    }
    session.finish()?;
    session.close()?;
    Ok(())
}
