//! Frame value types shared between the port boundary and the session layer.
//!
//! The acquisition buffer is owned by the native layer. A delivered frame is
//! exposed here as one [`RoiFrame`] per configured region, each holding an
//! `Arc<[u8]>` over the delivery buffer. Borrowed frames alias memory the
//! native layer may reuse on the next poll; callers wanting a stable copy ask
//! for [`FrameCopy::Deep`] or call [`RoiFrame::deep_copy`].

use crate::error::{CamResult, CameraError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Element type of a delivered pixel buffer, derived from the device bit
/// depth rounded up to whole bytes. Three-byte depths widen to `U32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelType {
    U8,
    U16,
    U32,
}

impl PixelType {
    pub fn from_bit_depth(bits: u16) -> Self {
        match bits.div_ceil(8) {
            0 | 1 => PixelType::U8,
            2 => PixelType::U16,
            _ => PixelType::U32,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelType::U8 => 1,
            PixelType::U16 => 2,
            PixelType::U32 => 4,
        }
    }
}

/// Which end of the native delivery queue a poll drains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameSelection {
    /// FIFO pop: consume the oldest undelivered frame.
    #[default]
    Oldest,
    /// Peek the most recently delivered frame, discarding older ones.
    Newest,
}

/// Copy semantics for delivered pixel data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameCopy {
    /// Defensive copy into caller-owned memory. Safe default.
    #[default]
    Deep,
    /// Zero-copy view over the port-owned buffer. Must not be retained past
    /// the next poll on the same session.
    Borrowed,
}

/// Pixel payload of one region within one delivered frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RoiFrame {
    width: u32,
    height: u32,
    pixel_type: PixelType,
    data: Arc<[u8]>,
}

impl RoiFrame {
    /// Wraps a delivery buffer. Fails if the byte length does not match
    /// `width * height * bytes_per_pixel`.
    pub fn new(width: u32, height: u32, pixel_type: PixelType, data: Arc<[u8]>) -> CamResult<Self> {
        let expected = width as usize * height as usize * pixel_type.bytes_per_pixel();
        if data.len() != expected {
            return Err(CameraError::invalid_value(
                "frame buffer length",
                data.len(),
                format!("{expected} bytes for {width}x{height} {pixel_type:?}"),
            ));
        }
        Ok(RoiFrame {
            width,
            height,
            pixel_type,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// `(columns, rows)` of the binned output, matching the ROI shape.
    pub fn shape(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Clones the underlying buffer into fresh caller-owned memory.
    pub fn deep_copy(&self) -> Self {
        RoiFrame {
            width: self.width,
            height: self.height,
            pixel_type: self.pixel_type,
            data: Arc::from(self.data.to_vec().into_boxed_slice()),
        }
    }

    /// Decodes the payload as little-endian `u16` samples.
    pub fn to_u16(&self) -> CamResult<Vec<u16>> {
        if self.pixel_type != PixelType::U16 {
            return Err(CameraError::invalid_value(
                "pixel type",
                format!("{:?}", self.pixel_type),
                "U16",
            ));
        }
        Ok(self
            .data
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }
}

/// Per-region metadata header attached when frame metadata is enabled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiMeta {
    pub roi_nr: u16,
    pub timestamp_bof_ns: u64,
    pub timestamp_eof_ns: u64,
}

/// Per-frame metadata header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMeta {
    pub frame_nr: u32,
    pub exposure_time_us: u64,
    pub roi_headers: Vec<RoiMeta>,
}

/// One delivered frame as handed over the port boundary: one payload per
/// configured region, in ROI-list order.
#[derive(Clone, Debug)]
pub struct PolledFrame {
    pub rois: Vec<RoiFrame>,
    pub meta: Option<FrameMeta>,
    pub fps: f64,
    pub frame_count: u32,
}

/// Pixel data as surfaced by the session: collapsed to a single payload when
/// exactly one region is configured.
#[derive(Clone, Debug)]
pub enum PixelData {
    Single(RoiFrame),
    Multi(Vec<RoiFrame>),
}

impl PixelData {
    /// Wraps delivered region payloads, collapsing a one-element list.
    pub fn from_rois(mut rois: Vec<RoiFrame>) -> Self {
        if rois.len() == 1 {
            // Single-ROI callers get the array itself, not a one-element list.
            PixelData::Single(rois.remove(0))
        } else {
            PixelData::Multi(rois)
        }
    }

    /// The sole payload, for single-ROI configurations.
    pub fn single(&self) -> CamResult<&RoiFrame> {
        match self {
            PixelData::Single(frame) => Ok(frame),
            PixelData::Multi(rois) => Err(CameraError::invalid_value(
                "pixel data access",
                format!("{} regions", rois.len()),
                "a single-region configuration",
            )),
        }
    }

    /// All payloads in ROI-list order.
    pub fn rois(&self) -> &[RoiFrame] {
        match self {
            PixelData::Single(frame) => std::slice::from_ref(frame),
            PixelData::Multi(rois) => rois,
        }
    }

    pub fn deep_copy(&self) -> Self {
        match self {
            PixelData::Single(frame) => PixelData::Single(frame.deep_copy()),
            PixelData::Multi(rois) => {
                PixelData::Multi(rois.iter().map(RoiFrame::deep_copy).collect())
            }
        }
    }
}

/// A delivered frame as returned by `poll_frame`.
#[derive(Clone, Debug)]
pub struct Frame {
    pub pixel_data: PixelData,
    pub meta: Option<FrameMeta>,
    /// Achieved frame rate reported by the delivery layer.
    pub fps: f64,
    /// Monotonically increasing counter of frames delivered since arming.
    pub frame_count: u32,
}

/// Dense single-region stack returned by `get_sequence` and
/// `get_vtm_sequence`. All member frames share one shape and pixel type.
#[derive(Clone, Debug, Default)]
pub struct FrameStack {
    frames: Vec<RoiFrame>,
}

impl FrameStack {
    pub fn with_capacity(n: usize) -> Self {
        FrameStack {
            frames: Vec::with_capacity(n),
        }
    }

    /// Appends a frame, enforcing shape and pixel-type uniformity.
    pub fn push(&mut self, frame: RoiFrame) -> CamResult<()> {
        if let Some(first) = self.frames.first() {
            if first.shape() != frame.shape() || first.pixel_type() != frame.pixel_type() {
                return Err(CameraError::invalid_value(
                    "stack frame shape",
                    format!("{:?} {:?}", frame.shape(), frame.pixel_type()),
                    format!("{:?} {:?}", first.shape(), first.pixel_type()),
                ));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[RoiFrame] {
        &self.frames
    }
}

/// Readout status reported by the delivery layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameStatus {
    ReadoutNotActive,
    ExposureInProgress,
    ReadoutInProgress,
    FrameAvailable,
    ReadoutFailed,
}

impl FrameStatus {
    /// Native status code.
    pub fn code(self) -> i16 {
        match self {
            FrameStatus::ReadoutNotActive => 0,
            FrameStatus::ExposureInProgress => 1,
            FrameStatus::ReadoutInProgress => 2,
            FrameStatus::FrameAvailable => 3,
            FrameStatus::ReadoutFailed => 4,
        }
    }
}
