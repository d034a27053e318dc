//! Capture operations: arming, polling, convenience captures and teardown.
//!
//! All captures run through the session state machine: `start_live` and
//! `start_seq` move the session out of [`AcquisitionMode::Idle`], `finish`
//! moves it back. Arming while a capture is active is an error; callers
//! must `finish` first.

use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use vcam_core::params::VARIABLE_TIMED_MODE;
use vcam_core::{
    CamResult, CameraError, Frame, FrameCopy, FrameSelection, FrameStack, FrameStatus, Handle,
    ParameterPort, PixelData,
};

use super::{AcquisitionMode, AcquisitionSession};
use crate::enums::EnumKey;

impl<P: ParameterPort> AcquisitionSession<P> {
    /// Readout status of the in-flight capture.
    ///
    /// The delivery layer keeps reporting the last capture's status after the
    /// capture ends, so while the session is idle the port is not consulted
    /// and the answer is always [`FrameStatus::ReadoutNotActive`].
    pub fn check_frame_status(&self) -> CamResult<FrameStatus> {
        let handle = self.ensure_open()?;
        if self.acquisition_mode == AcquisitionMode::Idle {
            return Ok(FrameStatus::ReadoutNotActive);
        }
        self.port.frame_status(handle)
    }

    /// Fires a software exposure trigger at the armed capture.
    pub fn sw_trigger(&mut self) -> CamResult<()> {
        let handle = self.ensure_open()?;
        self.port.sw_trigger(handle)
    }

    /// Arms a circular-buffer live capture over the configured ROI list.
    ///
    /// `exp_time`, when given, replaces the session's cached exposure time.
    /// `stream_to_disk_path` directs the delivery layer to also write raw
    /// frames to that file; its directory must already exist, and a leftover
    /// file from an earlier run is removed first.
    pub fn start_live(
        &mut self,
        exp_time: Option<u32>,
        buffer_frame_count: u16,
        stream_to_disk_path: Option<&Path>,
        reset_frame_counter: bool,
    ) -> CamResult<()> {
        let handle = self.ensure_open()?;
        self.ensure_idle("start a live capture")?;
        if let Some(path) = stream_to_disk_path {
            prepare_stream_path(path)?;
        }
        if let Some(value) = exp_time {
            self.set_exp_time(value)?;
        }
        if reset_frame_counter {
            self.port.reset_frame_counter(handle)?;
        }
        self.update_pixel_type()?;
        self.port.start_live(
            handle,
            &self.roi_descriptors(),
            self.exp_time,
            self.mode,
            buffer_frame_count,
            stream_to_disk_path,
        )?;
        self.acquisition_mode = AcquisitionMode::Live;
        info!(
            camera = %self.name,
            buffer_frames = buffer_frame_count,
            exp_time = self.exp_time,
            "live capture armed"
        );
        Ok(())
    }

    /// Arms a fixed-count sequence capture over the configured ROI list.
    pub fn start_seq(
        &mut self,
        exp_time: Option<u32>,
        num_frames: u16,
        reset_frame_counter: bool,
    ) -> CamResult<()> {
        let handle = self.ensure_open()?;
        self.ensure_idle("start a sequence capture")?;
        if num_frames < 1 {
            return Err(CameraError::invalid_value(
                "frame count",
                num_frames,
                ">= 1",
            ));
        }
        if let Some(value) = exp_time {
            self.set_exp_time(value)?;
        }
        if reset_frame_counter {
            self.port.reset_frame_counter(handle)?;
        }
        self.update_pixel_type()?;
        self.port.start_seq(
            handle,
            &self.roi_descriptors(),
            self.exp_time,
            self.mode,
            num_frames,
        )?;
        self.acquisition_mode = AcquisitionMode::Sequence;
        debug!(
            camera = %self.name,
            frames = num_frames,
            exp_time = self.exp_time,
            "sequence capture armed"
        );
        Ok(())
    }

    /// Tears down whatever capture is in flight. Idempotent: finishing an
    /// idle session is a no-op.
    ///
    /// The session goes idle even when the teardown itself fails; a wedged
    /// capture is not recoverable by calling this again.
    pub fn finish(&mut self) -> CamResult<()> {
        if self.acquisition_mode == AcquisitionMode::Idle {
            return Ok(());
        }
        let handle = self.ensure_open()?;
        let result = match self.acquisition_mode {
            AcquisitionMode::Live => self.port.abort(handle),
            AcquisitionMode::Sequence => self.port.finish_seq(handle),
            AcquisitionMode::Idle => Ok(()),
        };
        self.acquisition_mode = AcquisitionMode::Idle;
        result
    }

    /// Blocks until the next frame of the in-flight capture is delivered.
    ///
    /// A negative `timeout_ms` blocks indefinitely. With
    /// [`FrameCopy::Borrowed`] the payload aliases port-owned memory and must
    /// not be retained past the next poll.
    pub fn poll_frame(
        &self,
        timeout_ms: i32,
        selection: FrameSelection,
        copy: FrameCopy,
    ) -> CamResult<Frame> {
        let handle = self.ensure_open()?;
        if self.acquisition_mode == AcquisitionMode::Idle {
            return Err(CameraError::AcquisitionState(
                "no capture is active; arm with start_live or start_seq first".to_owned(),
            ));
        }
        let polled = self.port.poll(handle, timeout_ms, selection)?;
        let mut pixel_data = PixelData::from_rois(polled.rois);
        if copy == FrameCopy::Deep {
            pixel_data = pixel_data.deep_copy();
        }
        Ok(Frame {
            pixel_data,
            meta: polled.meta,
            fps: polled.fps,
            frame_count: polled.frame_count,
        })
    }

    /// Captures a single frame: arms a one-frame sequence, polls it and
    /// tears the capture down again. The teardown runs even when the poll
    /// fails, and the poll error wins over a teardown error.
    pub fn get_frame(
        &mut self,
        exp_time: Option<u32>,
        timeout_ms: i32,
        reset_frame_counter: bool,
    ) -> CamResult<PixelData> {
        self.start_seq(exp_time, 1, reset_frame_counter)?;
        let polled = self.poll_frame(timeout_ms, FrameSelection::Oldest, FrameCopy::Deep);
        let finished = self.finish();
        let frame = polled?;
        finished?;
        Ok(frame.pixel_data)
    }

    /// Captures `num_frames` single-region frames into a dense stack, one
    /// one-frame sequence per element. Requires a single-ROI configuration.
    ///
    /// When `reset_frame_counter` is set, only the first capture resets the
    /// counter, so frame numbers stay monotonic across the stack.
    pub fn get_sequence(
        &mut self,
        num_frames: u32,
        exp_time: Option<u32>,
        timeout_ms: i32,
        interval_ms: Option<u64>,
        reset_frame_counter: bool,
    ) -> CamResult<FrameStack> {
        self.ensure_open()?;
        self.single_roi_only("a frame sequence")?;
        if num_frames < 1 {
            return Err(CameraError::invalid_value(
                "frame count",
                num_frames,
                ">= 1",
            ));
        }

        let mut stack = FrameStack::with_capacity(num_frames as usize);
        let mut reset = reset_frame_counter;
        for index in 0..num_frames {
            if index > 0 {
                if let Some(ms) = interval_ms {
                    thread::sleep(Duration::from_millis(ms));
                }
            }
            let pixel_data = self.get_frame(exp_time, timeout_ms, reset)?;
            reset = false;
            stack.push(pixel_data.single()?.clone())?;
        }
        Ok(stack)
    }

    /// Captures `num_frames` frames cycling through `time_list` exposure
    /// times, in the given exposure resolution. Requires a single-ROI
    /// configuration.
    ///
    /// When the current exposure mode is variable-timed the capture is
    /// prepared once and re-triggered per frame with a new exposure time.
    /// Otherwise each frame is an independent one-frame sequence. The
    /// previous exposure resolution is restored on every exit path; a
    /// capture error wins over a restore error.
    pub fn get_vtm_sequence(
        &mut self,
        time_list: &[u16],
        exp_res: impl Into<EnumKey>,
        num_frames: u32,
        timeout_ms: i32,
        interval_ms: Option<u64>,
        reset_frame_counter: bool,
    ) -> CamResult<FrameStack> {
        self.ensure_open()?;
        self.ensure_idle("start a variable-timed sequence")?;
        self.single_roi_only("a variable-timed sequence")?;
        if time_list.is_empty() {
            return Err(CameraError::invalid_value(
                "exposure time list",
                "[]",
                "at least one exposure time",
            ));
        }
        if num_frames < 1 {
            return Err(CameraError::invalid_value(
                "frame count",
                num_frames,
                ">= 1",
            ));
        }

        // Validate the whole list up front so a bad entry cannot fail the
        // capture halfway through. The native path writes each time into a
        // 16-bit register, which additionally caps the device maximum.
        let native = self.exp_mode == VARIABLE_TIMED_MODE;
        let (min, max) = self.exposure_bounds()?;
        let max = if native { max.min(65_535) } else { max };
        for &time in time_list {
            if u64::from(time) < min || u64::from(time) > max {
                return Err(CameraError::invalid_value(
                    "exposure time",
                    time,
                    format!("{min} to {max}"),
                ));
            }
        }

        let previous_res = self.exp_res()?;
        self.set_exp_res(exp_res)?;
        let captured = if native {
            self.vtm_capture_native(
                time_list,
                num_frames,
                timeout_ms,
                interval_ms,
                reset_frame_counter,
            )
        } else {
            debug!(
                camera = %self.name,
                "variable-timed mode not selected; emulating with one-frame sequences"
            );
            self.vtm_capture_emulated(
                time_list,
                num_frames,
                timeout_ms,
                interval_ms,
                reset_frame_counter,
            )
        };
        let restored = self.set_exp_res(previous_res);
        let stack = captured?;
        restored?;
        Ok(stack)
    }

    fn vtm_capture_native(
        &mut self,
        time_list: &[u16],
        num_frames: u32,
        timeout_ms: i32,
        interval_ms: Option<u64>,
        reset_frame_counter: bool,
    ) -> CamResult<FrameStack> {
        let handle = self.ensure_open()?;
        if reset_frame_counter {
            self.port.reset_frame_counter(handle)?;
        }
        self.update_pixel_type()?;
        // The per-frame exposure is pushed before each trigger; the arming
        // value is a non-zero placeholder the delivery layer never uses.
        self.port
            .setup_seq(handle, &self.roi_descriptors(), 1, self.mode, 1)?;
        self.acquisition_mode = AcquisitionMode::Sequence;

        let captured =
            self.vtm_native_frames(handle, time_list, num_frames, timeout_ms, interval_ms);
        let finished = self.finish();
        let stack = captured?;
        finished?;
        Ok(stack)
    }

    fn vtm_native_frames(
        &mut self,
        handle: Handle,
        time_list: &[u16],
        num_frames: u32,
        timeout_ms: i32,
        interval_ms: Option<u64>,
    ) -> CamResult<FrameStack> {
        let mut stack = FrameStack::with_capacity(num_frames as usize);
        for index in 0..num_frames {
            if index > 0 {
                if let Some(ms) = interval_ms {
                    thread::sleep(Duration::from_millis(ms));
                }
            }
            let time = time_list[index as usize % time_list.len()];
            self.set_vtm_exp_time(time)?;
            self.port.start_set_seq(handle)?;
            let frame = self.poll_frame(timeout_ms, FrameSelection::Oldest, FrameCopy::Deep)?;
            stack.push(frame.pixel_data.single()?.clone())?;
        }
        Ok(stack)
    }

    fn vtm_capture_emulated(
        &mut self,
        time_list: &[u16],
        num_frames: u32,
        timeout_ms: i32,
        interval_ms: Option<u64>,
        reset_frame_counter: bool,
    ) -> CamResult<FrameStack> {
        let mut stack = FrameStack::with_capacity(num_frames as usize);
        let mut reset = reset_frame_counter;
        for index in 0..num_frames {
            if index > 0 {
                if let Some(ms) = interval_ms {
                    thread::sleep(Duration::from_millis(ms));
                }
            }
            let time = time_list[index as usize % time_list.len()];
            let pixel_data = self.get_frame(Some(u32::from(time)), timeout_ms, reset)?;
            reset = false;
            stack.push(pixel_data.single()?.clone())?;
        }
        Ok(stack)
    }

    fn ensure_idle(&self, operation: &str) -> CamResult<()> {
        if self.acquisition_mode != AcquisitionMode::Idle {
            return Err(CameraError::AcquisitionState(format!(
                "cannot {operation} while a {:?} capture is active; call finish first",
                self.acquisition_mode
            )));
        }
        Ok(())
    }
}

/// A stream target must sit in an existing directory; a leftover file from an
/// earlier run is removed so the delivery layer starts from a fresh file.
fn prepare_stream_path(path: &Path) -> CamResult<()> {
    if path.exists() {
        if let Err(err) = std::fs::remove_file(path) {
            warn!(path = %path.display(), "could not remove existing stream file: {err}");
        }
    } else if !path.parent().is_some_and(Path::is_dir) {
        return Err(CameraError::invalid_value(
            "stream path",
            path.display(),
            "a file inside an existing directory",
        ));
    }
    Ok(())
}
