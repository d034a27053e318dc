//! Error types for the camera control stack.
//!
//! `CameraError` is the single error enum shared by the port boundary and the
//! session layer. Every variant is a local, structural condition detected
//! before or immediately after a native call; there is no retry logic in this
//! layer, so errors carry enough context (parameter name, attempted value,
//! valid range or set) for the caller to act on them directly.

use crate::params::ParamId;
use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type CamResult<T> = std::result::Result<T, CameraError>;

#[derive(Error, Debug)]
pub enum CameraError {
    /// A parameter, geometry or acquisition operation was attempted while the
    /// session is closed.
    #[error("camera '{name}' is not open")]
    NotOpen { name: String },

    /// Opening the underlying device handle failed.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Releasing the underlying device handle failed. The session is still
    /// marked closed when this is returned.
    #[error("failed to close camera: {0}")]
    CloseFailed(String),

    /// The device does not expose the given parameter. Surfaced distinctly
    /// from an invalid value for a supported parameter.
    #[error("parameter {param} is not supported by this camera")]
    UnsupportedParameter { param: ParamId },

    /// A supplied value is outside the device-reported valid range or set.
    /// `valid` enumerates the legal range/set where feasible.
    #[error("invalid {what} '{value}' - valid: {valid}")]
    InvalidValue {
        what: String,
        value: String,
        valid: String,
    },

    /// ROI count exceeds the device maximum, or a new ROI overlaps an
    /// existing one.
    #[error("{0}")]
    CapacityExceeded(String),

    /// Polling while idle, or arming while an acquisition is already active.
    #[error("acquisition state error: {0}")]
    AcquisitionState(String),

    /// A poll exceeded its wait budget with no frame delivered.
    #[error("timed out after {timeout_ms} ms waiting for a frame")]
    Timeout { timeout_ms: i32 },

    /// The native layer accepted the call but the hardware declined it.
    #[error("hardware rejected {operation}: {reason}")]
    HardwareRejected { operation: String, reason: String },

    /// I/O failure while validating a stream-to-disk destination.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CameraError {
    /// Shorthand for an [`CameraError::InvalidValue`] with formatted fields.
    pub fn invalid_value(
        what: impl Into<String>,
        value: impl std::fmt::Display,
        valid: impl Into<String>,
    ) -> Self {
        CameraError::InvalidValue {
            what: what.into(),
            value: value.to_string(),
            valid: valid.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, CameraError::UnsupportedParameter { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PARAM_READOUT_PORT;

    #[test]
    fn display_includes_context() {
        let err = CameraError::invalid_value("gain index", 9, "1 to 3");
        assert_eq!(err.to_string(), "invalid gain index '9' - valid: 1 to 3");

        let err = CameraError::UnsupportedParameter {
            param: PARAM_READOUT_PORT,
        };
        assert!(err.to_string().contains("PARAM_READOUT_PORT"));
    }
}
