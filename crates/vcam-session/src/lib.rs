//! Host-side acquisition sessions for scientific cameras.
//!
//! This crate layers session semantics over the raw parameter port defined
//! in `vcam-core`: device lifecycle, cached capability tables, named setting
//! accessors, ROI-list management and the capture state machine. The
//! hardware itself sits behind the [`ParameterPort`](vcam_core::ParameterPort)
//! trait; [`MockPort`] provides a scriptable in-process implementation for
//! tests and development without a device attached.
//!
//! Typical use: build an [`AcquisitionSession`] over a port, `open` it,
//! configure regions and settings, then capture with `get_frame`,
//! `get_sequence`, or the `start_live`/`poll_frame`/`finish` loop.

pub mod enums;
pub mod mock;
pub mod roi;
pub mod session;
pub mod tables;

pub use enums::{EnumKey, EnumLookup};
pub use mock::{MockConfig, MockPort, MockPortDef, MockPpFeatureDef, MockPpParamDef, MockSpeedDef};
pub use roi::RegionOfInterest;
pub use session::{AcquisitionMode, AcquisitionSession};
pub use tables::{
    GainEntry, PortEntry, PortSpeedGainTable, PostProcessingFeature, PostProcessingParam,
    PostProcessingTable, SpeedEntry,
};

pub use vcam_core::params;
pub use vcam_core::{
    CamResult, CameraError, Frame, FrameCopy, FrameMeta, FrameSelection, FrameStack, FrameStatus,
    ParamAttr, ParamId, ParamValue, ParameterPort, PixelData, PixelType, RoiFrame,
};
