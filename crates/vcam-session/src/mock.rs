//! An in-memory simulated device implementing [`ParameterPort`].
//!
//! Used by tests and examples in place of the native SDK binding. The
//! topology (ports, speeds, gains), sensor geometry and fault injection are
//! all configurable; the defaults model a 2048x2048 sensor with two readout
//! speeds and a small post-processing feature set.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use vcam_core::params::*;
use vcam_core::{
    CamResult, CameraError, FrameMeta, FrameSelection, FrameStatus, Handle, ParamAttr, ParamValue,
    ParameterPort, PixelType, PolledFrame, RegionDescriptor, RoiFrame, RoiMeta,
};

#[derive(Clone, Debug)]
pub struct MockSpeedDef {
    pub name: String,
    /// Pixel time in nanoseconds.
    pub pixel_time: u16,
    pub bit_depth: u16,
    pub gain_min: i32,
    pub gain_max: i32,
    pub gain_increment: i32,
}

#[derive(Clone, Debug)]
pub struct MockPortDef {
    pub name: String,
    pub value: i32,
    pub speeds: Vec<MockSpeedDef>,
}

#[derive(Clone, Debug)]
pub struct MockPpParamDef {
    pub name: String,
    pub id: u16,
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

#[derive(Clone, Debug)]
pub struct MockPpFeatureDef {
    pub name: String,
    pub id: u16,
    pub params: Vec<MockPpParamDef>,
}

/// Configuration of the simulated device.
#[derive(Clone, Debug)]
pub struct MockConfig {
    pub name: String,
    pub chip_name: String,
    /// `None` makes the serial-number parameter unsupported.
    pub serial_no: Option<String>,
    /// `(serial, parallel)` sensor dimensions.
    pub sensor_size: (u16, u16),
    pub max_roi_count: u16,
    /// `None` makes the host-side bit depth parameter unsupported.
    pub bit_depth_host: Option<u16>,
    /// Exposure time bounds in current device units.
    pub exposure_bounds: (u64, u64),
    /// Whether the exposure-mode enumeration includes variable-timed mode.
    pub supports_vtm: bool,
    pub frame_transfer_capable: bool,
    pub has_speed_name: bool,
    pub has_gain_name: bool,
    pub supports_centroids: bool,
    /// Legal `(sbin, pbin)` pairs; `None` means arbitrary binning.
    pub limited_binnings: Option<Vec<(u16, u16)>>,
    pub ports: Vec<MockPortDef>,
    pub pp_features: Vec<MockPpFeatureDef>,
    /// Fault injection: the delivery of the frame that would carry this
    /// counter value fails instead.
    pub fail_poll_at: Option<u32>,
    /// Close the handle with an error, for teardown-path tests.
    pub fail_close: bool,
    pub fps: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        MockConfig {
            name: "MockCam00".to_owned(),
            chip_name: "MockSensor2048B".to_owned(),
            serial_no: Some("A23X000123".to_owned()),
            sensor_size: (2048, 2048),
            max_roi_count: 2,
            bit_depth_host: None,
            exposure_bounds: (1, 10_000),
            supports_vtm: true,
            frame_transfer_capable: false,
            has_speed_name: true,
            has_gain_name: true,
            supports_centroids: false,
            limited_binnings: None,
            ports: vec![MockPortDef {
                name: "Sensitivity".to_owned(),
                value: 0,
                speeds: vec![
                    MockSpeedDef {
                        name: "100 MHz".to_owned(),
                        pixel_time: 10,
                        bit_depth: 16,
                        gain_min: 1,
                        gain_max: 3,
                        gain_increment: 1,
                    },
                    MockSpeedDef {
                        name: "200 MHz".to_owned(),
                        pixel_time: 5,
                        bit_depth: 12,
                        gain_min: 1,
                        gain_max: 1,
                        gain_increment: 1,
                    },
                ],
            }],
            pp_features: vec![MockPpFeatureDef {
                name: "DESPECKLE BRIGHT LOW".to_owned(),
                id: 1,
                params: vec![
                    MockPpParamDef {
                        name: "ENABLED".to_owned(),
                        id: 10,
                        min: 0,
                        max: 1,
                        default: 0,
                    },
                    MockPpParamDef {
                        name: "THRESHOLD".to_owned(),
                        id: 11,
                        min: 0,
                        max: 100,
                        default: 50,
                    },
                ],
            }],
            fail_poll_at: None,
            fail_close: false,
            fps: 100.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArmKind {
    Live,
    Sequence,
}

#[derive(Clone, Debug)]
struct Armed {
    kind: ArmKind,
    rois: Vec<RegionDescriptor>,
    exp_time: u32,
    /// `None` for circular-buffer capture and variable-timed sessions.
    frames_total: Option<u32>,
    delivered: u32,
    /// Armed via `setup_seq`: each frame needs a `start_set_seq` trigger.
    vtm: bool,
    triggered: bool,
}

#[derive(Debug)]
struct MockState {
    open: bool,
    pmode: i32,
    mode: i32,
    exp_res: i32,
    vtm_exp_time: u16,
    last_exp_time: u64,
    port_value: i32,
    speed_index: i32,
    gain_index: i32,
    temp_centi: i64,
    temp_setpoint_centi: i64,
    fan_speed: i32,
    clear_mode: i32,
    metadata_enabled: bool,
    centroids_mode: i32,
    scan_mode: i32,
    scan_dir: i32,
    scan_dir_reset: bool,
    scan_line_delay: u16,
    scan_width: u16,
    smart_stream_enabled: bool,
    smart_stream_mode: u16,
    smart_stream_exposures: Vec<u16>,
    roi: RegionDescriptor,
    pp_feature_sel: i32,
    pp_param_sel: i32,
    pp_values: Vec<Vec<u32>>,
    armed: Option<Armed>,
    frame_counter: u32,
    exposure_log: Vec<u32>,
    vtm_exposure_log: Vec<u16>,
    stream_path: Option<PathBuf>,
}

/// The simulated device.
pub struct MockPort {
    config: MockConfig,
    state: Mutex<MockState>,
}

impl Default for MockPort {
    fn default() -> Self {
        MockPort::new(MockConfig::default())
    }
}

impl MockPort {
    pub fn new(config: MockConfig) -> Self {
        let pp_values = config
            .pp_features
            .iter()
            .map(|f| f.params.iter().map(|p| p.default).collect())
            .collect();
        let state = MockState {
            open: false,
            pmode: PMODE_NORMAL,
            mode: TIMED_MODE | EXPOSE_OUT_FIRST_ROW,
            exp_res: EXP_RES_ONE_MILLISEC,
            vtm_exp_time: 1,
            last_exp_time: 0,
            port_value: config.ports.first().map_or(0, |p| p.value),
            speed_index: 0,
            gain_index: 1,
            temp_centi: -500,
            temp_setpoint_centi: -1000,
            fan_speed: 0,
            clear_mode: 1,
            metadata_enabled: false,
            centroids_mode: 0,
            scan_mode: 0,
            scan_dir: 0,
            scan_dir_reset: true,
            scan_line_delay: 0,
            scan_width: 0,
            smart_stream_enabled: false,
            smart_stream_mode: 0,
            smart_stream_exposures: Vec::new(),
            roi: RegionDescriptor {
                s1: 0,
                s2: config.sensor_size.0 - 1,
                sbin: 1,
                p1: 0,
                p2: config.sensor_size.1 - 1,
                pbin: 1,
            },
            pp_feature_sel: 0,
            pp_param_sel: 0,
            pp_values,
            armed: None,
            frame_counter: 0,
            exposure_log: Vec::new(),
            vtm_exposure_log: Vec::new(),
            stream_path: None,
        };
        MockPort {
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Exposure times used at each sequence/live arming, in order.
    pub fn exposure_log(&self) -> Vec<u32> {
        self.lock().exposure_log.clone()
    }

    /// Variable-timed exposure values pushed before each re-trigger.
    pub fn vtm_exposure_log(&self) -> Vec<u16> {
        self.lock().vtm_exposure_log.clone()
    }

    /// Stream-to-disk path passed at the last live arming, if any.
    pub fn last_stream_path(&self) -> Option<PathBuf> {
        self.lock().stream_path.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // Recover from poison; the state stays consistent enough for tests.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn current_port(&self, state: &MockState) -> CamResult<&MockPortDef> {
        self.config
            .ports
            .iter()
            .find(|p| p.value == state.port_value)
            .ok_or_else(|| {
                CameraError::HardwareRejected {
                    operation: "readout port lookup".to_owned(),
                    reason: format!("no port with value {}", state.port_value),
                }
            })
    }

    fn current_speed(&self, state: &MockState) -> CamResult<&MockSpeedDef> {
        let port = self.current_port(state)?;
        port.speeds
            .get(state.speed_index as usize)
            .ok_or_else(|| CameraError::HardwareRejected {
                operation: "speed lookup".to_owned(),
                reason: format!("no speed {} at port {}", state.speed_index, port.name),
            })
    }

    fn ensure_open(&self, state: &MockState) -> CamResult<()> {
        if state.open {
            Ok(())
        } else {
            Err(CameraError::HardwareRejected {
                operation: "device access".to_owned(),
                reason: "handle is not open".to_owned(),
            })
        }
    }

    fn supported(&self, param: ParamId) -> bool {
        match param {
            PARAM_BIT_DEPTH_HOST => self.config.bit_depth_host.is_some(),
            PARAM_SPDTAB_NAME => self.config.has_speed_name,
            PARAM_GAIN_NAME => self.config.has_gain_name,
            PARAM_HEAD_SER_NUM_ALPHA => self.config.serial_no.is_some(),
            PARAM_FRAME_CAPABLE => self.config.frame_transfer_capable,
            PARAM_CENTROIDS_MODE => self.config.supports_centroids,
            PARAM_BINNING_SER | PARAM_BINNING_PAR => self.config.limited_binnings.is_some(),
            PARAM_PP_INDEX | PARAM_PP_PARAM_INDEX | PARAM_PP_FEAT_ID | PARAM_PP_FEAT_NAME
            | PARAM_PP_PARAM_ID | PARAM_PP_PARAM_NAME | PARAM_PP_PARAM => {
                !self.config.pp_features.is_empty()
            }
            PARAM_DD_VERSION
            | PARAM_CHIP_NAME
            | PARAM_SER_SIZE
            | PARAM_PAR_SIZE
            | PARAM_READOUT_PORT
            | PARAM_SPDTAB_INDEX
            | PARAM_GAIN_INDEX
            | PARAM_PIX_TIME
            | PARAM_BIT_DEPTH
            | PARAM_ADC_OFFSET
            | PARAM_PMODE
            | PARAM_CLEAR_MODE
            | PARAM_TEMP
            | PARAM_TEMP_SETPOINT
            | PARAM_FAN_SPEED_SETPOINT
            | PARAM_EXPOSURE_MODE
            | PARAM_EXPOSE_OUT_MODE
            | PARAM_EXP_RES
            | PARAM_EXP_RES_INDEX
            | PARAM_EXP_TIME
            | PARAM_EXPOSURE_TIME
            | PARAM_READOUT_TIME
            | PARAM_CLEARING_TIME
            | PARAM_PRE_TRIGGER_DELAY
            | PARAM_POST_TRIGGER_DELAY
            | PARAM_METADATA_ENABLED
            | PARAM_ROI
            | PARAM_ROI_COUNT
            | PARAM_SCAN_MODE
            | PARAM_SCAN_DIRECTION
            | PARAM_SCAN_DIRECTION_RESET
            | PARAM_SCAN_LINE_DELAY
            | PARAM_SCAN_LINE_TIME
            | PARAM_SCAN_WIDTH
            | PARAM_SMART_STREAM_MODE_ENABLED
            | PARAM_SMART_STREAM_MODE
            | PARAM_SMART_STREAM_EXP_PARAMS => true,
            _ => false,
        }
    }

    fn unsupported(param: ParamId) -> CameraError {
        CameraError::UnsupportedParameter { param }
    }

    fn pp_feature(&self, index: i32) -> CamResult<&MockPpFeatureDef> {
        self.config
            .pp_features
            .get(index as usize)
            .ok_or(CameraError::HardwareRejected {
                operation: "post-processing feature select".to_owned(),
                reason: format!("feature index {index} out of range"),
            })
    }

    fn synth_frame(
        &self,
        roi: &RegionDescriptor,
        frame_num: u32,
        pixel_type: PixelType,
    ) -> CamResult<RoiFrame> {
        let width = u32::from(roi.s2 - roi.s1 + 1) / u32::from(roi.sbin.max(1));
        let height = u32::from(roi.p2 - roi.p1 + 1) / u32::from(roi.pbin.max(1));
        let bpp = pixel_type.bytes_per_pixel();
        let mut bytes = Vec::with_capacity(width as usize * height as usize * bpp);
        for y in 0..height {
            for x in 0..width {
                // Deterministic diagonal gradient that drifts per frame.
                let value = (((x + y + frame_num) % 4096) as u16).saturating_add(100);
                match pixel_type {
                    PixelType::U8 => bytes.push((value & 0xFF) as u8),
                    PixelType::U16 => bytes.extend_from_slice(&value.to_le_bytes()),
                    PixelType::U32 => bytes.extend_from_slice(&u32::from(value).to_le_bytes()),
                }
            }
        }
        RoiFrame::new(width, height, pixel_type, Arc::from(bytes.into_boxed_slice()))
    }

    fn current_pixel_type(&self, state: &MockState) -> CamResult<PixelType> {
        let bits = match self.config.bit_depth_host {
            Some(bits) => bits,
            None => self.current_speed(state)?.bit_depth,
        };
        Ok(PixelType::from_bit_depth(bits))
    }
}

impl ParameterPort for MockPort {
    fn total_cameras(&self) -> CamResult<u16> {
        Ok(1)
    }

    fn camera_name(&self, index: u16) -> CamResult<String> {
        if index == 0 {
            Ok(self.config.name.clone())
        } else {
            Err(CameraError::invalid_value("camera index", index, "0"))
        }
    }

    fn open(&self, name: &str) -> CamResult<Handle> {
        let mut state = self.lock();
        if name != self.config.name {
            return Err(CameraError::DeviceUnavailable(format!(
                "no camera named '{name}'"
            )));
        }
        if state.open {
            return Err(CameraError::DeviceUnavailable(format!(
                "camera '{name}' is already in use"
            )));
        }
        state.open = true;
        tracing::debug!(camera = %name, "mock device opened");
        Ok(0)
    }

    fn close(&self, _handle: Handle) -> CamResult<()> {
        let mut state = self.lock();
        state.open = false;
        state.armed = None;
        if self.config.fail_close {
            return Err(CameraError::HardwareRejected {
                operation: "close".to_owned(),
                reason: "simulated close failure".to_owned(),
            });
        }
        tracing::debug!(camera = %self.config.name, "mock device closed");
        Ok(())
    }

    fn get_param(&self, _handle: Handle, param: ParamId, attr: ParamAttr) -> CamResult<ParamValue> {
        let state = self.lock();
        self.ensure_open(&state)?;
        if !self.supported(param) {
            return Err(Self::unsupported(param));
        }

        // Attribute-specific surfaces first.
        match (param, attr) {
            (PARAM_SPDTAB_INDEX, ParamAttr::Count) => {
                return Ok(ParamValue::Int(self.current_port(&state)?.speeds.len() as i64));
            }
            (PARAM_GAIN_INDEX, ParamAttr::Min) => {
                return Ok(ParamValue::Int(i64::from(self.current_speed(&state)?.gain_min)));
            }
            (PARAM_GAIN_INDEX, ParamAttr::Max) => {
                return Ok(ParamValue::Int(i64::from(self.current_speed(&state)?.gain_max)));
            }
            (PARAM_GAIN_INDEX, ParamAttr::Increment) => {
                return Ok(ParamValue::Int(i64::from(
                    self.current_speed(&state)?.gain_increment,
                )));
            }
            (PARAM_EXPOSURE_TIME, ParamAttr::Min) => {
                return Ok(ParamValue::Int(self.config.exposure_bounds.0 as i64));
            }
            (PARAM_EXPOSURE_TIME, ParamAttr::Max) => {
                return Ok(ParamValue::Int(self.config.exposure_bounds.1 as i64));
            }
            (PARAM_TEMP_SETPOINT, ParamAttr::Min) => return Ok(ParamValue::Int(-5000)),
            (PARAM_TEMP_SETPOINT, ParamAttr::Max) => return Ok(ParamValue::Int(2500)),
            (PARAM_ROI_COUNT, ParamAttr::Max) => {
                return Ok(ParamValue::Int(i64::from(self.config.max_roi_count)));
            }
            (PARAM_PP_INDEX, ParamAttr::Count) => {
                return Ok(ParamValue::Int(self.config.pp_features.len() as i64));
            }
            (PARAM_PP_PARAM_INDEX, ParamAttr::Count) => {
                let feature = self.pp_feature(state.pp_feature_sel)?;
                return Ok(ParamValue::Int(feature.params.len() as i64));
            }
            (PARAM_PP_PARAM, ParamAttr::Min) => {
                let feature = self.pp_feature(state.pp_feature_sel)?;
                let p = feature.params.get(state.pp_param_sel as usize).ok_or(
                    CameraError::HardwareRejected {
                        operation: "post-processing parameter select".to_owned(),
                        reason: format!("parameter index {} out of range", state.pp_param_sel),
                    },
                )?;
                return Ok(ParamValue::Int(i64::from(p.min)));
            }
            (PARAM_PP_PARAM, ParamAttr::Max) => {
                let feature = self.pp_feature(state.pp_feature_sel)?;
                let p = feature.params.get(state.pp_param_sel as usize).ok_or(
                    CameraError::HardwareRejected {
                        operation: "post-processing parameter select".to_owned(),
                        reason: format!("parameter index {} out of range", state.pp_param_sel),
                    },
                )?;
                return Ok(ParamValue::Int(i64::from(p.max)));
            }
            _ => {}
        }

        if attr != ParamAttr::Current {
            return Err(CameraError::invalid_value(
                "parameter attribute",
                format!("{attr:?} for {param}"),
                "an attribute the simulated device reports",
            ));
        }

        let value = match param {
            PARAM_DD_VERSION => ParamValue::Int(0x0325),
            PARAM_CHIP_NAME => ParamValue::Str(self.config.chip_name.clone()),
            PARAM_HEAD_SER_NUM_ALPHA => match &self.config.serial_no {
                Some(s) => ParamValue::Str(s.clone()),
                None => return Err(Self::unsupported(param)),
            },
            PARAM_SER_SIZE => ParamValue::Int(i64::from(self.config.sensor_size.0)),
            PARAM_PAR_SIZE => ParamValue::Int(i64::from(self.config.sensor_size.1)),
            PARAM_FRAME_CAPABLE => ParamValue::Bool(true),
            PARAM_PMODE => ParamValue::Int(i64::from(state.pmode)),
            PARAM_READOUT_PORT => ParamValue::Int(i64::from(state.port_value)),
            PARAM_SPDTAB_INDEX => ParamValue::Int(i64::from(state.speed_index)),
            PARAM_SPDTAB_NAME => ParamValue::Str(self.current_speed(&state)?.name.clone()),
            PARAM_GAIN_INDEX => ParamValue::Int(i64::from(state.gain_index)),
            PARAM_GAIN_NAME => ParamValue::Str(format!("Gain {}", state.gain_index)),
            PARAM_PIX_TIME => ParamValue::Int(i64::from(self.current_speed(&state)?.pixel_time)),
            PARAM_BIT_DEPTH => ParamValue::Int(i64::from(self.current_speed(&state)?.bit_depth)),
            PARAM_BIT_DEPTH_HOST => match self.config.bit_depth_host {
                Some(bits) => ParamValue::Int(i64::from(bits)),
                None => return Err(Self::unsupported(param)),
            },
            PARAM_ADC_OFFSET => ParamValue::Int(100),
            PARAM_CLEAR_MODE => ParamValue::Int(i64::from(state.clear_mode)),
            PARAM_TEMP => ParamValue::Int(state.temp_centi),
            PARAM_TEMP_SETPOINT => ParamValue::Int(state.temp_setpoint_centi),
            PARAM_FAN_SPEED_SETPOINT => ParamValue::Int(i64::from(state.fan_speed)),
            PARAM_EXPOSURE_MODE => ParamValue::Int(i64::from(state.mode & 0x7)),
            PARAM_EXPOSE_OUT_MODE => ParamValue::Int(i64::from(state.mode & !0x7)),
            PARAM_EXP_RES => ParamValue::Int(i64::from(state.exp_res)),
            PARAM_EXP_RES_INDEX => ParamValue::Int(i64::from(state.exp_res)),
            PARAM_EXP_TIME => ParamValue::Int(i64::from(state.vtm_exp_time)),
            PARAM_EXPOSURE_TIME => ParamValue::Int(state.last_exp_time as i64),
            PARAM_READOUT_TIME => ParamValue::Float(520.0),
            PARAM_CLEARING_TIME => ParamValue::Int(12_000),
            PARAM_PRE_TRIGGER_DELAY => ParamValue::Int(800),
            PARAM_POST_TRIGGER_DELAY => ParamValue::Int(650),
            PARAM_METADATA_ENABLED => ParamValue::Bool(state.metadata_enabled),
            PARAM_ROI => ParamValue::Region(state.roi),
            PARAM_ROI_COUNT => {
                ParamValue::Int(state.armed.as_ref().map_or(1, |a| a.rois.len()) as i64)
            }
            PARAM_CENTROIDS_MODE => ParamValue::Int(i64::from(state.centroids_mode)),
            PARAM_SCAN_MODE => ParamValue::Int(i64::from(state.scan_mode)),
            PARAM_SCAN_DIRECTION => ParamValue::Int(i64::from(state.scan_dir)),
            PARAM_SCAN_DIRECTION_RESET => ParamValue::Bool(state.scan_dir_reset),
            PARAM_SCAN_LINE_DELAY => ParamValue::Int(i64::from(state.scan_line_delay)),
            PARAM_SCAN_LINE_TIME => ParamValue::Int(31_250),
            PARAM_SCAN_WIDTH => ParamValue::Int(i64::from(state.scan_width)),
            PARAM_SMART_STREAM_MODE_ENABLED => ParamValue::Bool(state.smart_stream_enabled),
            PARAM_SMART_STREAM_MODE => ParamValue::Int(i64::from(state.smart_stream_mode)),
            PARAM_SMART_STREAM_EXP_PARAMS => {
                ParamValue::SmartStream(state.smart_stream_exposures.clone())
            }
            PARAM_PP_FEAT_ID => {
                ParamValue::Int(i64::from(self.pp_feature(state.pp_feature_sel)?.id))
            }
            PARAM_PP_FEAT_NAME => {
                ParamValue::Str(self.pp_feature(state.pp_feature_sel)?.name.clone())
            }
            PARAM_PP_INDEX => ParamValue::Int(i64::from(state.pp_feature_sel)),
            PARAM_PP_PARAM_INDEX => ParamValue::Int(i64::from(state.pp_param_sel)),
            PARAM_PP_PARAM_ID | PARAM_PP_PARAM_NAME | PARAM_PP_PARAM => {
                let feature = self.pp_feature(state.pp_feature_sel)?;
                let idx = state.pp_param_sel as usize;
                let def = feature.params.get(idx).ok_or(CameraError::HardwareRejected {
                    operation: "post-processing parameter select".to_owned(),
                    reason: format!("parameter index {} out of range", state.pp_param_sel),
                })?;
                match param {
                    PARAM_PP_PARAM_ID => ParamValue::Int(i64::from(def.id)),
                    PARAM_PP_PARAM_NAME => ParamValue::Str(def.name.clone()),
                    _ => ParamValue::Int(i64::from(
                        state.pp_values[state.pp_feature_sel as usize][idx],
                    )),
                }
            }
            _ => return Err(Self::unsupported(param)),
        };
        Ok(value)
    }

    fn set_param(&self, _handle: Handle, param: ParamId, value: ParamValue) -> CamResult<()> {
        let mut state = self.lock();
        self.ensure_open(&state)?;
        if !self.supported(param) {
            return Err(Self::unsupported(param));
        }
        match param {
            PARAM_PMODE => state.pmode = value.as_i32()?,
            PARAM_READOUT_PORT => {
                let v = value.as_i32()?;
                if !self.config.ports.iter().any(|p| p.value == v) {
                    return Err(CameraError::HardwareRejected {
                        operation: "set readout port".to_owned(),
                        reason: format!("no port with value {v}"),
                    });
                }
                state.port_value = v;
                // Downstream indices are re-interpreted in the new context.
                state.speed_index = 0;
                let gain_min = self.current_speed(&state)?.gain_min;
                state.gain_index = gain_min;
            }
            PARAM_SPDTAB_INDEX => {
                let v = value.as_i32()?;
                let count = self.current_port(&state)?.speeds.len() as i32;
                if v < 0 || v >= count {
                    return Err(CameraError::HardwareRejected {
                        operation: "set speed index".to_owned(),
                        reason: format!("index {v} out of range 0..{count}"),
                    });
                }
                state.speed_index = v;
                let gain_min = self.current_speed(&state)?.gain_min;
                state.gain_index = gain_min;
            }
            PARAM_GAIN_INDEX => {
                let v = value.as_i32()?;
                let speed = self.current_speed(&state)?;
                if v < speed.gain_min || v > speed.gain_max {
                    return Err(CameraError::HardwareRejected {
                        operation: "set gain index".to_owned(),
                        reason: format!(
                            "index {v} out of range {}..={}",
                            speed.gain_min, speed.gain_max
                        ),
                    });
                }
                state.gain_index = v;
            }
            PARAM_CLEAR_MODE => state.clear_mode = value.as_i32()?,
            PARAM_FAN_SPEED_SETPOINT => state.fan_speed = value.as_i32()?,
            PARAM_EXP_RES => state.exp_res = value.as_i32()?,
            PARAM_EXP_TIME => state.vtm_exp_time = value.as_u16()?,
            PARAM_TEMP_SETPOINT => {
                let v = value.as_i64()?;
                if !(-5000..=2500).contains(&v) {
                    return Err(CameraError::HardwareRejected {
                        operation: "set temperature setpoint".to_owned(),
                        reason: format!("{v} out of range -5000..=2500"),
                    });
                }
                state.temp_setpoint_centi = v;
            }
            PARAM_METADATA_ENABLED => state.metadata_enabled = value.as_bool()?,
            PARAM_ROI => state.roi = value.as_region()?,
            PARAM_CENTROIDS_MODE => state.centroids_mode = value.as_i32()?,
            PARAM_SCAN_MODE => state.scan_mode = value.as_i32()?,
            PARAM_SCAN_DIRECTION => state.scan_dir = value.as_i32()?,
            PARAM_SCAN_DIRECTION_RESET => state.scan_dir_reset = value.as_bool()?,
            PARAM_SCAN_LINE_DELAY => state.scan_line_delay = value.as_u16()?,
            PARAM_SCAN_WIDTH => state.scan_width = value.as_u16()?,
            PARAM_SMART_STREAM_MODE_ENABLED => state.smart_stream_enabled = value.as_bool()?,
            PARAM_SMART_STREAM_MODE => state.smart_stream_mode = value.as_u16()?,
            PARAM_SMART_STREAM_EXP_PARAMS => match value {
                ParamValue::SmartStream(v) => state.smart_stream_exposures = v,
                other => {
                    return Err(CameraError::invalid_value(
                        "smart stream exposures",
                        format!("{other:?}"),
                        "a list of u16 exposures",
                    ))
                }
            },
            PARAM_PP_INDEX => {
                let v = value.as_i32()?;
                self.pp_feature(v)?;
                state.pp_feature_sel = v;
                state.pp_param_sel = 0;
            }
            PARAM_PP_PARAM_INDEX => {
                let v = value.as_i32()?;
                let feature = self.pp_feature(state.pp_feature_sel)?;
                if v < 0 || v as usize >= feature.params.len() {
                    return Err(CameraError::HardwareRejected {
                        operation: "post-processing parameter select".to_owned(),
                        reason: format!("parameter index {v} out of range"),
                    });
                }
                state.pp_param_sel = v;
            }
            PARAM_PP_PARAM => {
                let v = value.as_u32()?;
                let feature = self.pp_feature(state.pp_feature_sel)?;
                let idx = state.pp_param_sel as usize;
                let def = feature.params.get(idx).ok_or(CameraError::HardwareRejected {
                    operation: "post-processing parameter select".to_owned(),
                    reason: format!("parameter index {} out of range", state.pp_param_sel),
                })?;
                if v < def.min || v > def.max {
                    return Err(CameraError::HardwareRejected {
                        operation: "set post-processing parameter".to_owned(),
                        reason: format!("{v} out of range {}..={}", def.min, def.max),
                    });
                }
                let feature_sel = state.pp_feature_sel as usize;
                state.pp_values[feature_sel][idx] = v;
            }
            _ => {
                return Err(CameraError::HardwareRejected {
                    operation: format!("set {param}"),
                    reason: "parameter is read-only on the simulated device".to_owned(),
                })
            }
        }
        Ok(())
    }

    fn check_param(&self, _handle: Handle, param: ParamId) -> bool {
        let state = self.lock();
        state.open && self.supported(param)
    }

    fn read_enum(&self, _handle: Handle, param: ParamId) -> CamResult<Vec<(String, i32)>> {
        let state = self.lock();
        self.ensure_open(&state)?;
        if !self.supported(param) {
            return Err(Self::unsupported(param));
        }
        let entries = match param {
            PARAM_READOUT_PORT => self
                .config
                .ports
                .iter()
                .map(|p| (p.name.clone(), p.value))
                .collect(),
            PARAM_CLEAR_MODE => vec![
                ("Never".to_owned(), 0),
                ("Pre-Exposure".to_owned(), 1),
                ("Pre-Sequence".to_owned(), 2),
            ],
            PARAM_EXPOSURE_MODE => {
                let mut modes = vec![("Timed Mode".to_owned(), TIMED_MODE)];
                if self.config.supports_vtm {
                    modes.push(("Variable Timed Mode".to_owned(), VARIABLE_TIMED_MODE));
                }
                modes
            }
            // Expose-out codes kept disjoint from the exposure-mode bits so
            // the combined mode word decodes unambiguously.
            PARAM_EXPOSE_OUT_MODE => vec![
                ("First Row".to_owned(), EXPOSE_OUT_FIRST_ROW),
                ("Rolling Shutter".to_owned(), 8),
            ],
            PARAM_EXP_RES => vec![
                ("One Millisecond".to_owned(), EXP_RES_ONE_MILLISEC),
                ("One Microsecond".to_owned(), EXP_RES_ONE_MICROSEC),
                ("One Second".to_owned(), EXP_RES_ONE_SEC),
            ],
            PARAM_FAN_SPEED_SETPOINT => vec![
                ("High".to_owned(), 0),
                ("Medium".to_owned(), 1),
                ("Low".to_owned(), 2),
                ("Off".to_owned(), 3),
            ],
            PARAM_SCAN_MODE => vec![
                ("Auto".to_owned(), 0),
                ("Line Delay".to_owned(), 1),
                ("Scan Width".to_owned(), 2),
            ],
            PARAM_SCAN_DIRECTION => vec![
                ("Down".to_owned(), 0),
                ("Up".to_owned(), 1),
                ("Down-Up Alternate".to_owned(), 2),
            ],
            PARAM_CENTROIDS_MODE => vec![("Locate".to_owned(), 0), ("Track".to_owned(), 1)],
            PARAM_BINNING_SER => match &self.config.limited_binnings {
                Some(pairs) => pairs
                    .iter()
                    .map(|&(s, p)| (format!("{s}x{p}"), i32::from(s)))
                    .collect(),
                None => return Err(Self::unsupported(param)),
            },
            PARAM_BINNING_PAR => match &self.config.limited_binnings {
                Some(pairs) => pairs
                    .iter()
                    .map(|&(s, p)| (format!("{s}x{p}"), i32::from(p)))
                    .collect(),
                None => return Err(Self::unsupported(param)),
            },
            _ => return Err(Self::unsupported(param)),
        };
        Ok(entries)
    }

    fn set_exp_modes(&self, _handle: Handle, mode: i32) -> CamResult<()> {
        let mut state = self.lock();
        self.ensure_open(&state)?;
        let exp_part = mode & 0x7;
        let known = exp_part == TIMED_MODE
            || (self.config.supports_vtm && exp_part == VARIABLE_TIMED_MODE);
        if !known {
            return Err(CameraError::HardwareRejected {
                operation: "set exposure modes".to_owned(),
                reason: format!("mode word {mode:#x} not supported"),
            });
        }
        state.mode = mode;
        Ok(())
    }

    fn start_live(
        &self,
        _handle: Handle,
        rois: &[RegionDescriptor],
        exp_time: u32,
        _mode: i32,
        buffer_frame_count: u16,
        stream_path: Option<&std::path::Path>,
    ) -> CamResult<()> {
        let mut state = self.lock();
        self.ensure_open(&state)?;
        state.last_exp_time = u64::from(exp_time);
        state.exposure_log.push(exp_time);
        state.stream_path = stream_path.map(PathBuf::from);
        state.armed = Some(Armed {
            kind: ArmKind::Live,
            rois: rois.to_vec(),
            exp_time,
            frames_total: None,
            delivered: 0,
            vtm: false,
            triggered: true,
        });
        tracing::debug!(exp_time, buffer_frame_count, "mock live capture armed");
        Ok(())
    }

    fn start_seq(
        &self,
        _handle: Handle,
        rois: &[RegionDescriptor],
        exp_time: u32,
        _mode: i32,
        num_frames: u16,
    ) -> CamResult<()> {
        let mut state = self.lock();
        self.ensure_open(&state)?;
        state.last_exp_time = u64::from(exp_time);
        state.exposure_log.push(exp_time);
        state.armed = Some(Armed {
            kind: ArmKind::Sequence,
            rois: rois.to_vec(),
            exp_time,
            frames_total: Some(u32::from(num_frames)),
            delivered: 0,
            vtm: false,
            triggered: true,
        });
        tracing::debug!(exp_time, num_frames, "mock sequence capture armed");
        Ok(())
    }

    fn setup_seq(
        &self,
        _handle: Handle,
        rois: &[RegionDescriptor],
        exp_time: u32,
        _mode: i32,
        _num_frames: u16,
    ) -> CamResult<()> {
        let mut state = self.lock();
        self.ensure_open(&state)?;
        if exp_time == 0 {
            // Real hardware refuses a zero-exposure arming.
            return Err(CameraError::HardwareRejected {
                operation: "sequence setup".to_owned(),
                reason: "exposure time must be non-zero".to_owned(),
            });
        }
        state.armed = Some(Armed {
            kind: ArmKind::Sequence,
            rois: rois.to_vec(),
            exp_time,
            frames_total: None,
            delivered: 0,
            vtm: true,
            triggered: false,
        });
        tracing::debug!("mock variable-timed capture prepared");
        Ok(())
    }

    fn start_set_seq(&self, _handle: Handle) -> CamResult<()> {
        let mut state = self.lock();
        self.ensure_open(&state)?;
        let vtm_exp = state.vtm_exp_time;
        match state.armed.as_mut() {
            Some(armed) if armed.vtm => {
                armed.triggered = true;
            }
            _ => {
                return Err(CameraError::AcquisitionState(
                    "no variable-timed capture prepared".to_owned(),
                ))
            }
        }
        state.vtm_exposure_log.push(vtm_exp);
        Ok(())
    }

    fn poll(
        &self,
        _handle: Handle,
        timeout_ms: i32,
        _selection: FrameSelection,
    ) -> CamResult<PolledFrame> {
        let mut state = self.lock();
        self.ensure_open(&state)?;
        let pixel_type = self.current_pixel_type(&state)?;
        let metadata_enabled = state.metadata_enabled;
        let fail_at = self.config.fail_poll_at;
        let next_count = state.frame_counter + 1;

        let armed = state.armed.as_mut().ok_or_else(|| {
            CameraError::AcquisitionState("no acquisition armed".to_owned())
        })?;

        if let Some(total) = armed.frames_total {
            if armed.delivered >= total {
                // Sequence exhausted; no further frames will ever arrive.
                return Err(CameraError::Timeout { timeout_ms });
            }
        }
        if armed.vtm && !armed.triggered {
            return Err(CameraError::Timeout { timeout_ms });
        }
        if fail_at == Some(next_count) {
            return Err(CameraError::HardwareRejected {
                operation: "frame poll".to_owned(),
                reason: "simulated delivery fault".to_owned(),
            });
        }

        armed.delivered += 1;
        armed.triggered = false;
        let rois = armed.rois.clone();
        let exp_time = armed.exp_time;
        state.frame_counter = next_count;

        let mut frames = Vec::with_capacity(rois.len());
        for roi in &rois {
            frames.push(self.synth_frame(roi, next_count, pixel_type)?);
        }
        let meta = metadata_enabled.then(|| FrameMeta {
            frame_nr: next_count,
            exposure_time_us: u64::from(exp_time) * 1000,
            roi_headers: rois
                .iter()
                .enumerate()
                .map(|(i, _)| RoiMeta {
                    roi_nr: i as u16,
                    timestamp_bof_ns: u64::from(next_count) * 1_000_000,
                    timestamp_eof_ns: u64::from(next_count) * 1_000_000 + 500_000,
                })
                .collect(),
        });

        Ok(PolledFrame {
            rois: frames,
            meta,
            fps: self.config.fps,
            frame_count: next_count,
        })
    }

    fn abort(&self, _handle: Handle) -> CamResult<()> {
        // Aborting tears down circular-buffer capture only.
        match self.lock().armed.take() {
            Some(armed) if armed.kind == ArmKind::Sequence => {
                Err(CameraError::AcquisitionState(
                    "abort called on a sequence capture".to_owned(),
                ))
            }
            _ => Ok(()),
        }
    }

    fn finish_seq(&self, _handle: Handle) -> CamResult<()> {
        match self.lock().armed.take() {
            Some(armed) if armed.kind == ArmKind::Live => Err(CameraError::AcquisitionState(
                "finish_seq called on a live capture".to_owned(),
            )),
            _ => Ok(()),
        }
    }

    fn frame_status(&self, _handle: Handle) -> CamResult<FrameStatus> {
        let state = self.lock();
        self.ensure_open(&state)?;
        // Mirrors the native quirk: the status stays FRAME_AVAILABLE after a
        // capture completes until the next arming.
        if state.armed.is_some() || state.frame_counter > 0 {
            Ok(FrameStatus::FrameAvailable)
        } else {
            Ok(FrameStatus::ReadoutNotActive)
        }
    }

    fn sw_trigger(&self, _handle: Handle) -> CamResult<()> {
        let state = self.lock();
        self.ensure_open(&state)?;
        if state.armed.is_some() {
            Ok(())
        } else {
            Err(CameraError::HardwareRejected {
                operation: "software trigger".to_owned(),
                reason: "no acquisition armed".to_owned(),
            })
        }
    }

    fn reset_pp(&self, _handle: Handle) -> CamResult<()> {
        let mut state = self.lock();
        self.ensure_open(&state)?;
        state.pp_values = self
            .config
            .pp_features
            .iter()
            .map(|f| f.params.iter().map(|p| p.default).collect())
            .collect();
        Ok(())
    }

    fn reset_frame_counter(&self, _handle: Handle) -> CamResult<()> {
        let mut state = self.lock();
        self.ensure_open(&state)?;
        state.frame_counter = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roi() -> [RegionDescriptor; 1] {
        [RegionDescriptor {
            s1: 0,
            s2: 31,
            sbin: 1,
            p1: 0,
            p2: 31,
            pbin: 1,
        }]
    }

    #[test]
    fn teardown_must_match_the_arm_kind() {
        let port = MockPort::default();
        let h = port.open("MockCam00").unwrap();

        port.start_seq(h, &roi(), 10, 0, 1).unwrap();
        assert!(port.abort(h).is_err());

        port.start_seq(h, &roi(), 10, 0, 1).unwrap();
        port.finish_seq(h).unwrap();

        port.start_live(h, &roi(), 10, 0, 16, None).unwrap();
        assert!(port.finish_seq(h).is_err());

        port.start_live(h, &roi(), 10, 0, 16, None).unwrap();
        port.abort(h).unwrap();

        // Tearing down an unarmed device stays quiet either way.
        port.abort(h).unwrap();
        port.finish_seq(h).unwrap();
    }

    #[test]
    fn zero_exposure_arming_is_refused() {
        let port = MockPort::default();
        let h = port.open("MockCam00").unwrap();
        assert!(port.setup_seq(h, &roi(), 0, 0, 1).is_err());
        assert!(port.setup_seq(h, &roi(), 1, 0, 1).is_ok());
    }
}
