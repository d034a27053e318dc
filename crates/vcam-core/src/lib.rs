//! Foundation types for the vcam camera control stack.
//!
//! This crate holds everything the session layer and a native port
//! implementation share: the error taxonomy, parameter identifiers and typed
//! values, frame value types, and the [`port::ParameterPort`] trait that
//! marks the native SDK boundary. It contains no device logic of its own.

pub mod error;
pub mod frame;
pub mod params;
pub mod port;

pub use error::{CamResult, CameraError};
pub use frame::{
    Frame, FrameCopy, FrameMeta, FrameSelection, FrameStack, FrameStatus, PixelData, PixelType,
    PolledFrame, RoiFrame, RoiMeta,
};
pub use params::{ParamAttr, ParamId, ParamValue, RegionDescriptor};
pub use port::{Handle, ParameterPort, NO_HANDLE};
