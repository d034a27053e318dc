//! The boundary trait behind which the native SDK binding lives.

use crate::error::CamResult;
use crate::frame::{FrameSelection, FrameStatus, PolledFrame};
use crate::params::{ParamAttr, ParamId, ParamValue, RegionDescriptor};
use std::path::Path;

/// Opaque device handle. `-1` denotes "no handle".
pub type Handle = i16;

pub const NO_HANDLE: Handle = -1;

/// Primitive, synchronous access to one or more camera devices.
///
/// This is the native SDK boundary: parameter-ID driven, stateless about
/// sessions. Implementations use interior mutability; all methods take
/// `&self` and block the calling thread. The armed ROI list and exposure
/// setup live in the implementation between `start_live`/`start_seq` and
/// the matching `abort`/`finish_seq`.
pub trait ParameterPort {
    /// Number of devices the host can see.
    fn total_cameras(&self) -> CamResult<u16>;

    /// Name of the device at `index`, for discovery.
    fn camera_name(&self, index: u16) -> CamResult<String>;

    /// Acquires a device handle by name.
    fn open(&self, name: &str) -> CamResult<Handle>;

    /// Releases a device handle.
    fn close(&self, handle: Handle) -> CamResult<()>;

    /// Reads one attribute of a parameter. Fails with
    /// [`CameraError::UnsupportedParameter`](crate::error::CameraError::UnsupportedParameter)
    /// when the device lacks the parameter, distinct from other errors.
    fn get_param(&self, handle: Handle, param: ParamId, attr: ParamAttr) -> CamResult<ParamValue>;

    /// Writes the current value of a parameter.
    fn set_param(&self, handle: Handle, param: ParamId, value: ParamValue) -> CamResult<()>;

    /// Availability probe. Never fails, even for unknown IDs.
    fn check_param(&self, handle: Handle, param: ParamId) -> bool;

    /// Enumerates an enum-typed parameter as an ordered name → code mapping.
    fn read_enum(&self, handle: Handle, param: ParamId) -> CamResult<Vec<(String, i32)>>;

    /// Validates a combined exposure-mode word against the device.
    fn set_exp_modes(&self, handle: Handle, mode: i32) -> CamResult<()>;

    /// Arms circular-buffer capture over `rois`. `stream_path`, when given,
    /// directs the delivery layer to write frames straight to disk.
    fn start_live(
        &self,
        handle: Handle,
        rois: &[RegionDescriptor],
        exp_time: u32,
        mode: i32,
        buffer_frame_count: u16,
        stream_path: Option<&Path>,
    ) -> CamResult<()>;

    /// Arms a fixed-count, non-circular capture of `num_frames`.
    fn start_seq(
        &self,
        handle: Handle,
        rois: &[RegionDescriptor],
        exp_time: u32,
        mode: i32,
        num_frames: u16,
    ) -> CamResult<()>;

    /// Prepares a sequence capture without triggering it. Used by native
    /// variable-timed captures, where each frame is triggered separately via
    /// [`ParameterPort::start_set_seq`] after pushing a new exposure time.
    fn setup_seq(
        &self,
        handle: Handle,
        rois: &[RegionDescriptor],
        exp_time: u32,
        mode: i32,
        num_frames: u16,
    ) -> CamResult<()>;

    /// Re-triggers a capture prepared with [`ParameterPort::setup_seq`].
    fn start_set_seq(&self, handle: Handle) -> CamResult<()>;

    /// Blocks until a frame is delivered or `timeout_ms` elapses. A negative
    /// timeout blocks indefinitely. Payload buffers are shared handles over
    /// port-owned memory.
    fn poll(
        &self,
        handle: Handle,
        timeout_ms: i32,
        selection: FrameSelection,
    ) -> CamResult<PolledFrame>;

    /// Stops a live capture.
    fn abort(&self, handle: Handle) -> CamResult<()>;

    /// Finalizes a sequence capture.
    fn finish_seq(&self, handle: Handle) -> CamResult<()>;

    /// Raw readout status as the delivery layer reports it.
    fn frame_status(&self, handle: Handle) -> CamResult<FrameStatus>;

    /// Software-initiated exposure trigger.
    fn sw_trigger(&self, handle: Handle) -> CamResult<()>;

    /// Restores all post-processing features to factory defaults.
    fn reset_pp(&self, handle: Handle) -> CamResult<()>;

    /// Resets the delivery layer's frame counter to zero.
    fn reset_frame_counter(&self, handle: Handle) -> CamResult<()>;
}
