//! Parameter identifiers, attributes and typed values.
//!
//! Parameter IDs keep the native SDK's numeric encoding: a class in bits
//! 16..24, a data-type tag in bits 24..32 and an index in the low 16 bits.
//! The session layer never decodes an ID; it only passes them through the
//! [`ParameterPort`](crate::port::ParameterPort) boundary, so the encoding
//! matters solely for interoperability with the vendor headers.

use crate::error::{CamResult, CameraError};
use serde::{Deserialize, Serialize};
use std::fmt;

const CLASS0: u32 = 0;
const CLASS2: u32 = 2;
const CLASS3: u32 = 3;

const TYPE_INT16: u32 = 1;
const TYPE_FLT64: u32 = 4;
const TYPE_UNS16: u32 = 6;
const TYPE_UNS32: u32 = 7;
const TYPE_UNS64: u32 = 8;
const TYPE_ENUM: u32 = 9;
const TYPE_BOOLEAN: u32 = 11;
const TYPE_CHAR_PTR: u32 = 13;
const TYPE_VOID_PTR: u32 = 14;
const TYPE_INT64: u32 = 16;
const TYPE_RGN_TYPE: u32 = 20;

/// A hardware parameter identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamId(pub u32);

const fn param(class: u32, ty: u32, index: u32) -> ParamId {
    ParamId((class << 16) + (ty << 24) + index)
}

pub const PARAM_DD_VERSION: ParamId = param(CLASS0, TYPE_UNS16, 2);

pub const PARAM_ADC_OFFSET: ParamId = param(CLASS2, TYPE_INT16, 195);
pub const PARAM_CHIP_NAME: ParamId = param(CLASS2, TYPE_CHAR_PTR, 129);
pub const PARAM_PAR_SIZE: ParamId = param(CLASS2, TYPE_UNS16, 57);
pub const PARAM_SER_SIZE: ParamId = param(CLASS2, TYPE_UNS16, 58);
pub const PARAM_READOUT_PORT: ParamId = param(CLASS2, TYPE_ENUM, 247);
pub const PARAM_READOUT_TIME: ParamId = param(CLASS2, TYPE_FLT64, 179);
pub const PARAM_CLEARING_TIME: ParamId = param(CLASS2, TYPE_INT64, 180);
pub const PARAM_POST_TRIGGER_DELAY: ParamId = param(CLASS2, TYPE_INT64, 181);
pub const PARAM_PRE_TRIGGER_DELAY: ParamId = param(CLASS2, TYPE_INT64, 182);
pub const PARAM_FRAME_CAPABLE: ParamId = param(CLASS2, TYPE_BOOLEAN, 509);
pub const PARAM_BIT_DEPTH: ParamId = param(CLASS2, TYPE_INT16, 511);
pub const PARAM_GAIN_INDEX: ParamId = param(CLASS2, TYPE_INT16, 512);
pub const PARAM_SPDTAB_INDEX: ParamId = param(CLASS2, TYPE_INT16, 513);
pub const PARAM_GAIN_NAME: ParamId = param(CLASS2, TYPE_CHAR_PTR, 514);
pub const PARAM_SPDTAB_NAME: ParamId = param(CLASS2, TYPE_CHAR_PTR, 515);
pub const PARAM_PIX_TIME: ParamId = param(CLASS2, TYPE_UNS16, 516);
pub const PARAM_CLEAR_MODE: ParamId = param(CLASS2, TYPE_ENUM, 523);
pub const PARAM_PMODE: ParamId = param(CLASS2, TYPE_ENUM, 524);
pub const PARAM_TEMP: ParamId = param(CLASS2, TYPE_INT16, 525);
pub const PARAM_TEMP_SETPOINT: ParamId = param(CLASS2, TYPE_INT16, 526);
pub const PARAM_HEAD_SER_NUM_ALPHA: ParamId = param(CLASS2, TYPE_CHAR_PTR, 533);
pub const PARAM_EXPOSURE_MODE: ParamId = param(CLASS2, TYPE_ENUM, 535);
pub const PARAM_PP_FEAT_NAME: ParamId = param(CLASS2, TYPE_CHAR_PTR, 542);
pub const PARAM_PP_INDEX: ParamId = param(CLASS2, TYPE_INT16, 543);
pub const PARAM_PP_PARAM_INDEX: ParamId = param(CLASS2, TYPE_INT16, 545);
pub const PARAM_PP_PARAM_NAME: ParamId = param(CLASS2, TYPE_CHAR_PTR, 546);
pub const PARAM_PP_PARAM: ParamId = param(CLASS2, TYPE_UNS32, 547);
pub const PARAM_PP_FEAT_ID: ParamId = param(CLASS2, TYPE_UNS16, 549);
pub const PARAM_PP_PARAM_ID: ParamId = param(CLASS2, TYPE_UNS16, 550);
pub const PARAM_BIT_DEPTH_HOST: ParamId = param(CLASS2, TYPE_INT16, 551);
pub const PARAM_EXPOSE_OUT_MODE: ParamId = param(CLASS2, TYPE_ENUM, 560);
pub const PARAM_SMART_STREAM_MODE_ENABLED: ParamId = param(CLASS2, TYPE_BOOLEAN, 700);
pub const PARAM_SMART_STREAM_MODE: ParamId = param(CLASS2, TYPE_UNS16, 701);
pub const PARAM_SMART_STREAM_EXP_PARAMS: ParamId = param(CLASS2, TYPE_VOID_PTR, 702);
pub const PARAM_FAN_SPEED_SETPOINT: ParamId = param(CLASS2, TYPE_ENUM, 710);

pub const PARAM_EXP_TIME: ParamId = param(CLASS3, TYPE_UNS16, 1);
pub const PARAM_EXP_RES: ParamId = param(CLASS3, TYPE_ENUM, 2);
pub const PARAM_EXP_RES_INDEX: ParamId = param(CLASS3, TYPE_UNS16, 4);
pub const PARAM_EXPOSURE_TIME: ParamId = param(CLASS3, TYPE_UNS64, 8);
pub const PARAM_ROI: ParamId = param(CLASS3, TYPE_RGN_TYPE, 1);
pub const PARAM_BINNING_SER: ParamId = param(CLASS3, TYPE_ENUM, 165);
pub const PARAM_BINNING_PAR: ParamId = param(CLASS3, TYPE_ENUM, 166);
pub const PARAM_METADATA_ENABLED: ParamId = param(CLASS3, TYPE_BOOLEAN, 168);
pub const PARAM_ROI_COUNT: ParamId = param(CLASS3, TYPE_UNS16, 169);
pub const PARAM_CENTROIDS_MODE: ParamId = param(CLASS3, TYPE_ENUM, 173);
pub const PARAM_SCAN_MODE: ParamId = param(CLASS3, TYPE_ENUM, 250);
pub const PARAM_SCAN_DIRECTION: ParamId = param(CLASS3, TYPE_ENUM, 251);
pub const PARAM_SCAN_DIRECTION_RESET: ParamId = param(CLASS3, TYPE_BOOLEAN, 252);
pub const PARAM_SCAN_LINE_DELAY: ParamId = param(CLASS3, TYPE_UNS16, 253);
pub const PARAM_SCAN_LINE_TIME: ParamId = param(CLASS3, TYPE_INT64, 254);
pub const PARAM_SCAN_WIDTH: ParamId = param(CLASS3, TYPE_UNS16, 255);

impl ParamId {
    /// Human-readable name for known IDs, used in error messages and logs.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            PARAM_DD_VERSION => "PARAM_DD_VERSION",
            PARAM_ADC_OFFSET => "PARAM_ADC_OFFSET",
            PARAM_CHIP_NAME => "PARAM_CHIP_NAME",
            PARAM_PAR_SIZE => "PARAM_PAR_SIZE",
            PARAM_SER_SIZE => "PARAM_SER_SIZE",
            PARAM_READOUT_PORT => "PARAM_READOUT_PORT",
            PARAM_READOUT_TIME => "PARAM_READOUT_TIME",
            PARAM_CLEARING_TIME => "PARAM_CLEARING_TIME",
            PARAM_POST_TRIGGER_DELAY => "PARAM_POST_TRIGGER_DELAY",
            PARAM_PRE_TRIGGER_DELAY => "PARAM_PRE_TRIGGER_DELAY",
            PARAM_FRAME_CAPABLE => "PARAM_FRAME_CAPABLE",
            PARAM_BIT_DEPTH => "PARAM_BIT_DEPTH",
            PARAM_GAIN_INDEX => "PARAM_GAIN_INDEX",
            PARAM_SPDTAB_INDEX => "PARAM_SPDTAB_INDEX",
            PARAM_GAIN_NAME => "PARAM_GAIN_NAME",
            PARAM_SPDTAB_NAME => "PARAM_SPDTAB_NAME",
            PARAM_PIX_TIME => "PARAM_PIX_TIME",
            PARAM_CLEAR_MODE => "PARAM_CLEAR_MODE",
            PARAM_PMODE => "PARAM_PMODE",
            PARAM_TEMP => "PARAM_TEMP",
            PARAM_TEMP_SETPOINT => "PARAM_TEMP_SETPOINT",
            PARAM_HEAD_SER_NUM_ALPHA => "PARAM_HEAD_SER_NUM_ALPHA",
            PARAM_EXPOSURE_MODE => "PARAM_EXPOSURE_MODE",
            PARAM_PP_FEAT_NAME => "PARAM_PP_FEAT_NAME",
            PARAM_PP_INDEX => "PARAM_PP_INDEX",
            PARAM_PP_PARAM_INDEX => "PARAM_PP_PARAM_INDEX",
            PARAM_PP_PARAM_NAME => "PARAM_PP_PARAM_NAME",
            PARAM_PP_PARAM => "PARAM_PP_PARAM",
            PARAM_PP_FEAT_ID => "PARAM_PP_FEAT_ID",
            PARAM_PP_PARAM_ID => "PARAM_PP_PARAM_ID",
            PARAM_BIT_DEPTH_HOST => "PARAM_BIT_DEPTH_HOST",
            PARAM_EXPOSE_OUT_MODE => "PARAM_EXPOSE_OUT_MODE",
            PARAM_SMART_STREAM_MODE_ENABLED => "PARAM_SMART_STREAM_MODE_ENABLED",
            PARAM_SMART_STREAM_MODE => "PARAM_SMART_STREAM_MODE",
            PARAM_SMART_STREAM_EXP_PARAMS => "PARAM_SMART_STREAM_EXP_PARAMS",
            PARAM_FAN_SPEED_SETPOINT => "PARAM_FAN_SPEED_SETPOINT",
            PARAM_EXP_TIME => "PARAM_EXP_TIME",
            PARAM_EXP_RES => "PARAM_EXP_RES",
            PARAM_EXP_RES_INDEX => "PARAM_EXP_RES_INDEX",
            PARAM_EXPOSURE_TIME => "PARAM_EXPOSURE_TIME",
            PARAM_ROI => "PARAM_ROI",
            PARAM_BINNING_SER => "PARAM_BINNING_SER",
            PARAM_BINNING_PAR => "PARAM_BINNING_PAR",
            PARAM_METADATA_ENABLED => "PARAM_METADATA_ENABLED",
            PARAM_ROI_COUNT => "PARAM_ROI_COUNT",
            PARAM_CENTROIDS_MODE => "PARAM_CENTROIDS_MODE",
            PARAM_SCAN_MODE => "PARAM_SCAN_MODE",
            PARAM_SCAN_DIRECTION => "PARAM_SCAN_DIRECTION",
            PARAM_SCAN_DIRECTION_RESET => "PARAM_SCAN_DIRECTION_RESET",
            PARAM_SCAN_LINE_DELAY => "PARAM_SCAN_LINE_DELAY",
            PARAM_SCAN_LINE_TIME => "PARAM_SCAN_LINE_TIME",
            PARAM_SCAN_WIDTH => "PARAM_SCAN_WIDTH",
            _ => return None,
        })
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "PARAM({:#010x})", self.0),
        }
    }
}

impl fmt::Debug for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// Exposure modes (low bits of the acquisition mode word).
pub const TIMED_MODE: i32 = 0;
pub const STROBED_MODE: i32 = 1;
pub const BULB_MODE: i32 = 2;
pub const TRIGGER_FIRST_MODE: i32 = 3;
pub const FLASH_MODE: i32 = 4;
pub const VARIABLE_TIMED_MODE: i32 = 5;
pub const INT_STROBE_MODE: i32 = 6;

// Extended trigger modes occupy the high byte.
pub const EXT_TRIG_INTERNAL: i32 = 7 << 8;
pub const EXT_TRIG_TRIG_FIRST: i32 = 8 << 8;
pub const EXT_TRIG_EDGE_RISING: i32 = 9 << 8;
pub const EXT_TRIG_SOFTWARE_FIRST: i32 = 11 << 8;
pub const EXT_TRIG_SOFTWARE_EDGE: i32 = 12 << 8;

// Expose-out modes (OR-ed with the exposure mode into the mode word).
pub const EXPOSE_OUT_FIRST_ROW: i32 = 0;
pub const EXPOSE_OUT_ALL_ROWS: i32 = 1;
pub const EXPOSE_OUT_ANY_ROW: i32 = 2;
pub const EXPOSE_OUT_ROLLING_SHUTTER: i32 = 3;

// Exposure resolutions.
pub const EXP_RES_ONE_MILLISEC: i32 = 0;
pub const EXP_RES_ONE_MICROSEC: i32 = 1;
pub const EXP_RES_ONE_SEC: i32 = 2;

// Parallel clocking modes.
pub const PMODE_NORMAL: i32 = 0;
pub const PMODE_FT: i32 = 1;

/// Attribute selector for [`ParameterPort::get_param`](crate::port::ParameterPort::get_param).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamAttr {
    Current,
    Count,
    Type,
    Min,
    Max,
    Default,
    Increment,
    Access,
    Avail,
    Live,
}

impl ParamAttr {
    /// Native attribute code.
    pub fn code(self) -> u32 {
        match self {
            ParamAttr::Current => 0,
            ParamAttr::Count => 1,
            ParamAttr::Type => 2,
            ParamAttr::Min => 3,
            ParamAttr::Max => 4,
            ParamAttr::Default => 5,
            ParamAttr::Increment => 6,
            ParamAttr::Access => 7,
            ParamAttr::Avail => 8,
            ParamAttr::Live => 9,
        }
    }
}

/// Region descriptor as exchanged over the port boundary for
/// region-typed parameters and acquisition setup. All bounds inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    pub s1: u16,
    pub s2: u16,
    pub sbin: u16,
    pub p1: u16,
    pub p2: u16,
    pub pbin: u16,
}

/// A typed parameter value crossing the port boundary.
///
/// The port reports and accepts primitive values only; which variant a given
/// parameter uses is fixed by its type tag. Integers of every native width
/// are widened to `i64`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Region(RegionDescriptor),
    /// Smart-stream exposure list (u16 device units).
    SmartStream(Vec<u16>),
}

impl ParamValue {
    pub fn as_bool(&self) -> CamResult<bool> {
        match self {
            ParamValue::Bool(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v != 0),
            other => Err(type_mismatch("bool", other)),
        }
    }

    pub fn as_i64(&self) -> CamResult<i64> {
        match self {
            ParamValue::Int(v) => Ok(*v),
            ParamValue::Bool(v) => Ok(i64::from(*v)),
            other => Err(type_mismatch("integer", other)),
        }
    }

    pub fn as_i32(&self) -> CamResult<i32> {
        let v = self.as_i64()?;
        i32::try_from(v).map_err(|_| type_mismatch("i32", self))
    }

    pub fn as_u16(&self) -> CamResult<u16> {
        let v = self.as_i64()?;
        u16::try_from(v).map_err(|_| type_mismatch("u16", self))
    }

    pub fn as_u32(&self) -> CamResult<u32> {
        let v = self.as_i64()?;
        u32::try_from(v).map_err(|_| type_mismatch("u32", self))
    }

    pub fn as_f64(&self) -> CamResult<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(type_mismatch("float", other)),
        }
    }

    pub fn as_str(&self) -> CamResult<&str> {
        match self {
            ParamValue::Str(v) => Ok(v),
            other => Err(type_mismatch("string", other)),
        }
    }

    pub fn as_region(&self) -> CamResult<RegionDescriptor> {
        match self {
            ParamValue::Region(v) => Ok(*v),
            other => Err(type_mismatch("region", other)),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<u16> for ParamValue {
    fn from(v: u16) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_owned())
    }
}

fn type_mismatch(expected: &str, got: &ParamValue) -> CameraError {
    CameraError::invalid_value("parameter value type", format!("{got:?}"), expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_encoding_matches_vendor_headers() {
        // Spot checks against the generated vendor constant table.
        assert_eq!(PARAM_SER_SIZE.0, (2 << 16) + (6 << 24) + 58);
        assert_eq!(PARAM_EXP_RES.0, (3 << 16) + (9 << 24) + 2);
        assert_eq!(PARAM_PP_PARAM.0, (2 << 16) + (7 << 24) + 547);
    }

    #[test]
    fn value_conversions() {
        assert_eq!(ParamValue::from(12u16).as_u16().unwrap(), 12);
        assert_eq!(ParamValue::Int(1).as_bool().unwrap(), true);
        assert!(ParamValue::Str("x".into()).as_i64().is_err());
        assert_eq!(ParamValue::Int(-3).as_f64().unwrap(), -3.0);
    }
}
