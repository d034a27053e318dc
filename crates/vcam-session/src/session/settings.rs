//! Named setting accessors.
//!
//! Every enumerated setting accepts either the display name or the numeric
//! code on write (via [`EnumKey`]) and returns the numeric code on read.
//! Writes funnel through the matching [`EnumLookup`], which is the sole
//! source of valid-value errors for that family.
//!
//! Readout port, speed and gain form a dependency chain: after changing any
//! one of them, the downstream ones must be set again in that order, because
//! each downstream legal range depends on the upstream choice. The session
//! does not enforce the order; it is a usage contract mirroring the
//! hardware dependency.

use vcam_core::params::*;
use vcam_core::{CamResult, CameraError, ParamAttr, ParamValue, ParameterPort};

use super::AcquisitionSession;
use crate::enums::{EnumKey, EnumLookup};

impl<P: ParameterPort> AcquisitionSession<P> {
    // --- enum lookup access ---

    pub fn readout_ports(&self) -> &EnumLookup {
        &self.lookups.readout_ports
    }

    pub fn centroids_modes(&self) -> &EnumLookup {
        &self.lookups.centroids_modes
    }

    pub fn clear_modes(&self) -> &EnumLookup {
        &self.lookups.clear_modes
    }

    pub fn exp_modes(&self) -> &EnumLookup {
        &self.lookups.exp_modes
    }

    pub fn exp_out_modes(&self) -> &EnumLookup {
        &self.lookups.exp_out_modes
    }

    pub fn exp_resolutions(&self) -> &EnumLookup {
        &self.lookups.exp_resolutions
    }

    pub fn fan_speeds(&self) -> &EnumLookup {
        &self.lookups.fan_speeds
    }

    pub fn prog_scan_modes(&self) -> &EnumLookup {
        &self.lookups.prog_scan_modes
    }

    pub fn prog_scan_dirs(&self) -> &EnumLookup {
        &self.lookups.prog_scan_dirs
    }

    // --- readout chain: port, speed, gain ---

    pub fn readout_port(&self) -> CamResult<i32> {
        self.current_i32(PARAM_READOUT_PORT)
    }

    /// Also updates the cached pixel type, since the port choice can change
    /// the effective bit depth.
    pub fn set_readout_port(&mut self, key: impl Into<EnumKey>) -> CamResult<()> {
        let value = self.lookups.readout_ports.resolve(key)?;
        self.set_param(PARAM_READOUT_PORT, ParamValue::from(value))?;
        self.update_pixel_type()
    }

    pub fn speed(&self) -> CamResult<i32> {
        self.current_i32(PARAM_SPDTAB_INDEX)
    }

    /// Also updates the cached pixel type.
    pub fn set_speed(&mut self, index: i32) -> CamResult<()> {
        let count = self.attr_i64(PARAM_SPDTAB_INDEX, ParamAttr::Count)?;
        if i64::from(index) >= count || index < 0 {
            return Err(CameraError::invalid_value(
                "speed index",
                index,
                format!("0 to {}", count - 1),
            ));
        }
        self.set_param(PARAM_SPDTAB_INDEX, ParamValue::from(index))?;
        self.update_pixel_type()
    }

    /// Display name of the current speed, synthesized from the index when
    /// the device has no named speeds.
    pub fn speed_name(&self) -> CamResult<String> {
        if self.has_speed_name {
            self.current_string(PARAM_SPDTAB_NAME)
        } else {
            Ok(format!("Speed_{}", self.speed()?))
        }
    }

    pub fn gain(&self) -> CamResult<i32> {
        self.current_i32(PARAM_GAIN_INDEX)
    }

    /// Also updates the cached pixel type.
    pub fn set_gain(&mut self, index: i32) -> CamResult<()> {
        let min = self.attr_i64(PARAM_GAIN_INDEX, ParamAttr::Min)?;
        let max = self.attr_i64(PARAM_GAIN_INDEX, ParamAttr::Max)?;
        if i64::from(index) < min || i64::from(index) > max {
            return Err(CameraError::invalid_value(
                "gain index",
                index,
                format!("{min} to {max}"),
            ));
        }
        self.set_param(PARAM_GAIN_INDEX, ParamValue::from(index))?;
        self.update_pixel_type()
    }

    /// Display name of the current gain, synthesized from the index when
    /// the device has no named gains.
    pub fn gain_name(&self) -> CamResult<String> {
        if self.has_gain_name {
            self.current_string(PARAM_GAIN_NAME)
        } else {
            Ok(format!("Gain_{}", self.gain()?))
        }
    }

    // --- exposure ---

    /// The session-cached exposure time used when arming without an explicit
    /// value. The device does not retain this across idle periods.
    pub fn exp_time(&self) -> CamResult<u32> {
        self.ensure_open()?;
        Ok(self.exp_time)
    }

    /// Validates against the device-reported exposure bounds and caches
    /// locally; nothing is written to the device until the next arming.
    pub fn set_exp_time(&mut self, value: u32) -> CamResult<()> {
        let (min, max) = self.exposure_bounds()?;
        if u64::from(value) < min || u64::from(value) > max {
            return Err(CameraError::invalid_value(
                "exposure time",
                value,
                format!("{min} to {max}"),
            ));
        }
        self.exp_time = value;
        Ok(())
    }

    /// Exposure time of the last-armed capture, in current device units.
    pub fn last_exp_time(&self) -> CamResult<u64> {
        Ok(self.current_i64(PARAM_EXPOSURE_TIME)? as u64)
    }

    pub(crate) fn exposure_bounds(&self) -> CamResult<(u64, u64)> {
        let min = self.attr_i64(PARAM_EXPOSURE_TIME, ParamAttr::Min)? as u64;
        let max = self.attr_i64(PARAM_EXPOSURE_TIME, ParamAttr::Max)? as u64;
        Ok((min, max))
    }

    /// Per-trigger exposure time of a prepared variable-timed capture.
    pub fn vtm_exp_time(&self) -> CamResult<u16> {
        self.current_u16(PARAM_EXP_TIME)
    }

    /// Bounds-checked against the device exposure range, additionally capped
    /// at the 16-bit limit of the variable-timed exposure register.
    pub fn set_vtm_exp_time(&mut self, value: u16) -> CamResult<()> {
        let (min, max) = self.exposure_bounds()?;
        let max = max.min(65_535);
        if u64::from(value) < min || u64::from(value) > max {
            return Err(CameraError::invalid_value(
                "exposure time",
                value,
                format!("{min} to {max}"),
            ));
        }
        self.set_param(PARAM_EXP_TIME, ParamValue::from(value))
    }

    pub fn exp_mode(&self) -> CamResult<i32> {
        self.current_i32(PARAM_EXPOSURE_MODE)
    }

    /// Re-derives and pushes the combined mode word before returning.
    pub fn set_exp_mode(&mut self, key: impl Into<EnumKey>) -> CamResult<()> {
        self.exp_mode = self.lookups.exp_modes.resolve(key)?;
        self.update_mode()
    }

    pub fn exp_out_mode(&self) -> CamResult<i32> {
        self.current_i32(PARAM_EXPOSE_OUT_MODE)
    }

    /// Re-derives and pushes the combined mode word before returning.
    pub fn set_exp_out_mode(&mut self, key: impl Into<EnumKey>) -> CamResult<()> {
        self.exp_out_mode = self.lookups.exp_out_modes.resolve(key)?;
        self.update_mode()
    }

    pub fn exp_res(&self) -> CamResult<i32> {
        self.current_i32(PARAM_EXP_RES)
    }

    pub fn set_exp_res(&mut self, key: impl Into<EnumKey>) -> CamResult<()> {
        let value = self.lookups.exp_resolutions.resolve(key)?;
        self.set_param(PARAM_EXP_RES, ParamValue::from(value))
    }

    pub fn exp_res_index(&self) -> CamResult<u16> {
        self.current_u16(PARAM_EXP_RES_INDEX)
    }

    // --- other enumerated settings ---

    pub fn clear_mode(&self) -> CamResult<i32> {
        self.current_i32(PARAM_CLEAR_MODE)
    }

    pub fn set_clear_mode(&mut self, key: impl Into<EnumKey>) -> CamResult<()> {
        let value = self.lookups.clear_modes.resolve(key)?;
        self.set_param(PARAM_CLEAR_MODE, ParamValue::from(value))
    }

    pub fn fan_speed(&self) -> CamResult<i32> {
        self.current_i32(PARAM_FAN_SPEED_SETPOINT)
    }

    pub fn set_fan_speed(&mut self, key: impl Into<EnumKey>) -> CamResult<()> {
        let value = self.lookups.fan_speeds.resolve(key)?;
        self.set_param(PARAM_FAN_SPEED_SETPOINT, ParamValue::from(value))
    }

    pub fn centroids_mode(&self) -> CamResult<i32> {
        self.current_i32(PARAM_CENTROIDS_MODE)
    }

    pub fn set_centroids_mode(&mut self, key: impl Into<EnumKey>) -> CamResult<()> {
        let value = self.lookups.centroids_modes.resolve(key)?;
        self.set_param(PARAM_CENTROIDS_MODE, ParamValue::from(value))
    }

    pub fn prog_scan_mode(&self) -> CamResult<i32> {
        self.current_i32(PARAM_SCAN_MODE)
    }

    pub fn set_prog_scan_mode(&mut self, key: impl Into<EnumKey>) -> CamResult<()> {
        let value = self.lookups.prog_scan_modes.resolve(key)?;
        self.set_param(PARAM_SCAN_MODE, ParamValue::from(value))
    }

    pub fn prog_scan_dir(&self) -> CamResult<i32> {
        self.current_i32(PARAM_SCAN_DIRECTION)
    }

    pub fn set_prog_scan_dir(&mut self, key: impl Into<EnumKey>) -> CamResult<()> {
        let value = self.lookups.prog_scan_dirs.resolve(key)?;
        self.set_param(PARAM_SCAN_DIRECTION, ParamValue::from(value))
    }

    // --- programmable-scan numerics ---

    pub fn prog_scan_dir_reset(&self) -> CamResult<bool> {
        self.get_param(PARAM_SCAN_DIRECTION_RESET, ParamAttr::Current)?
            .as_bool()
    }

    pub fn set_prog_scan_dir_reset(&mut self, value: bool) -> CamResult<()> {
        self.set_param(PARAM_SCAN_DIRECTION_RESET, ParamValue::from(value))
    }

    pub fn prog_scan_line_delay(&self) -> CamResult<u16> {
        self.current_u16(PARAM_SCAN_LINE_DELAY)
    }

    pub fn set_prog_scan_line_delay(&mut self, value: u16) -> CamResult<()> {
        self.set_param(PARAM_SCAN_LINE_DELAY, ParamValue::from(value))
    }

    /// Line time in nanoseconds; read-only.
    pub fn prog_scan_line_time(&self) -> CamResult<i64> {
        self.current_i64(PARAM_SCAN_LINE_TIME)
    }

    pub fn prog_scan_width(&self) -> CamResult<u16> {
        self.current_u16(PARAM_SCAN_WIDTH)
    }

    pub fn set_prog_scan_width(&mut self, value: u16) -> CamResult<()> {
        self.set_param(PARAM_SCAN_WIDTH, ParamValue::from(value))
    }

    // --- metadata & smart streaming ---

    pub fn metadata_enabled(&self) -> CamResult<bool> {
        self.get_param(PARAM_METADATA_ENABLED, ParamAttr::Current)?
            .as_bool()
    }

    pub fn set_metadata_enabled(&mut self, value: bool) -> CamResult<()> {
        self.set_param(PARAM_METADATA_ENABLED, ParamValue::from(value))
    }

    pub fn smart_stream_mode_enabled(&self) -> CamResult<bool> {
        self.get_param(PARAM_SMART_STREAM_MODE_ENABLED, ParamAttr::Current)?
            .as_bool()
    }

    pub fn set_smart_stream_mode_enabled(&mut self, value: bool) -> CamResult<()> {
        self.set_param(PARAM_SMART_STREAM_MODE_ENABLED, ParamValue::from(value))
    }

    pub fn smart_stream_mode(&self) -> CamResult<u16> {
        self.current_u16(PARAM_SMART_STREAM_MODE)
    }

    pub fn set_smart_stream_mode(&mut self, value: u16) -> CamResult<()> {
        self.set_param(PARAM_SMART_STREAM_MODE, ParamValue::from(value))
    }

    pub fn smart_stream_exp_params(&self) -> CamResult<Vec<u16>> {
        match self.get_param(PARAM_SMART_STREAM_EXP_PARAMS, ParamAttr::Current)? {
            ParamValue::SmartStream(values) => Ok(values),
            other => Err(CameraError::invalid_value(
                "smart stream exposures",
                format!("{other:?}"),
                "a list of u16 exposures",
            )),
        }
    }

    pub fn set_smart_stream_exp_params(&mut self, values: Vec<u16>) -> CamResult<()> {
        self.set_param(PARAM_SMART_STREAM_EXP_PARAMS, ParamValue::SmartStream(values))
    }

    // --- thermal ---

    /// Sensor temperature in degrees Celsius (device reports hundredths).
    pub fn temp(&self) -> CamResult<f64> {
        Ok(self.current_i64(PARAM_TEMP)? as f64 / 100.0)
    }

    /// Cooling setpoint in degrees Celsius.
    pub fn temp_setpoint(&self) -> CamResult<f64> {
        Ok(self.current_i64(PARAM_TEMP_SETPOINT)? as f64 / 100.0)
    }

    /// Range-checked in device units (hundredths of a degree); the error
    /// reports the valid range in degrees.
    pub fn set_temp_setpoint(&mut self, celsius: f64) -> CamResult<()> {
        let centi = (celsius * 100.0) as i64;
        let min = self.attr_i64(PARAM_TEMP_SETPOINT, ParamAttr::Min)?;
        let max = self.attr_i64(PARAM_TEMP_SETPOINT, ParamAttr::Max)?;
        if centi < min || centi > max {
            return Err(CameraError::invalid_value(
                "temperature setpoint",
                celsius,
                format!("{} to {} degC", min as f64 / 100.0, max as f64 / 100.0),
            ));
        }
        self.set_param(PARAM_TEMP_SETPOINT, ParamValue::Int(centi))
    }

    // --- read-only device info ---

    pub fn chip_name(&self) -> CamResult<String> {
        self.current_string(PARAM_CHIP_NAME)
    }

    /// Head serial number; `"N/A"` when the device does not report one.
    pub fn serial_no(&self) -> CamResult<String> {
        match self.current_string(PARAM_HEAD_SER_NUM_ALPHA) {
            Ok(serial) => Ok(serial),
            Err(err) if err.is_unsupported() => Ok("N/A".to_owned()),
            Err(err) => Err(err),
        }
    }

    /// Device driver version decoded from the packed 16-bit field:
    /// major in the high byte, minor and build in the low nibbles.
    pub fn driver_version(&self) -> CamResult<String> {
        let dd_ver = self.current_i64(PARAM_DD_VERSION)?;
        Ok(format!(
            "{}.{}.{}",
            (dd_ver >> 8) & 0xFF,
            (dd_ver >> 4) & 0x0F,
            dd_ver & 0x0F
        ))
    }

    pub fn bit_depth(&self) -> CamResult<u16> {
        self.current_u16(PARAM_BIT_DEPTH)
    }

    /// Host-side bit depth, falling back to the native depth when the device
    /// does not distinguish them.
    pub fn bit_depth_host(&self) -> CamResult<u16> {
        if self.has_bit_depth_host {
            self.current_u16(PARAM_BIT_DEPTH_HOST)
        } else {
            self.current_u16(PARAM_BIT_DEPTH)
        }
    }

    /// Pixel time in nanoseconds at the current speed.
    pub fn pix_time(&self) -> CamResult<u16> {
        self.current_u16(PARAM_PIX_TIME)
    }

    pub fn adc_offset(&self) -> CamResult<i32> {
        self.current_i32(PARAM_ADC_OFFSET)
    }

    /// Readout time of the last-configured capture, in microseconds.
    pub fn readout_time(&self) -> CamResult<f64> {
        self.get_param(PARAM_READOUT_TIME, ParamAttr::Current)?
            .as_f64()
    }

    /// Sensor clearing time in nanoseconds.
    pub fn clear_time(&self) -> CamResult<i64> {
        self.current_i64(PARAM_CLEARING_TIME)
    }

    pub fn pre_trigger_delay(&self) -> CamResult<i64> {
        self.current_i64(PARAM_PRE_TRIGGER_DELAY)
    }

    pub fn post_trigger_delay(&self) -> CamResult<i64> {
        self.current_i64(PARAM_POST_TRIGGER_DELAY)
    }

    /// The region-typed parameter holding the device's active region, read
    /// back as reported by the hardware.
    pub fn live_roi(&self) -> CamResult<crate::roi::RegionOfInterest> {
        let descriptor = self.get_param(PARAM_ROI, ParamAttr::Current)?.as_region()?;
        Ok(descriptor.into())
    }

    pub fn set_live_roi(&mut self, roi: &crate::roi::RegionOfInterest) -> CamResult<()> {
        self.set_param(PARAM_ROI, ParamValue::Region(roi.descriptor()))
    }

    // --- post-processing ---

    /// Sets a post-processing parameter through the select-then-access
    /// protocol, range-checked against the bounds captured at open. Also
    /// updates the cached pixel type, since some features change the
    /// effective bit depth.
    pub fn set_post_processing_param(
        &mut self,
        feature_name: &str,
        param_name: &str,
        value: u32,
    ) -> CamResult<()> {
        let pp = self.lookup_pp(feature_name, param_name)?;
        if value < pp.min || value > pp.max {
            return Err(CameraError::invalid_value(
                format!("{feature_name}/{param_name}"),
                value,
                format!("{} to {}", pp.min, pp.max),
            ));
        }
        self.set_param(PARAM_PP_INDEX, ParamValue::from(pp.feature_index))?;
        self.set_param(PARAM_PP_PARAM_INDEX, ParamValue::from(pp.param_index))?;
        self.set_param(PARAM_PP_PARAM, ParamValue::from(value))?;
        self.update_pixel_type()
    }

    /// Reads a post-processing parameter through the select-then-access
    /// protocol.
    pub fn get_post_processing_param(
        &mut self,
        feature_name: &str,
        param_name: &str,
    ) -> CamResult<u32> {
        let pp = self.lookup_pp(feature_name, param_name)?;
        self.set_param(PARAM_PP_INDEX, ParamValue::from(pp.feature_index))?;
        self.set_param(PARAM_PP_PARAM_INDEX, ParamValue::from(pp.param_index))?;
        self.get_param(PARAM_PP_PARAM, ParamAttr::Current)?.as_u32()
    }

    fn lookup_pp(
        &self,
        feature_name: &str,
        param_name: &str,
    ) -> CamResult<crate::tables::PostProcessingParam> {
        self.ensure_open()?;
        let feature = self.post_processing_table.feature(feature_name).ok_or_else(|| {
            let valid: Vec<&str> = self
                .post_processing_table
                .features
                .iter()
                .map(|f| f.name.as_str())
                .collect();
            CameraError::invalid_value("post-processing feature", feature_name, format!("{valid:?}"))
        })?;
        feature.param(param_name).copied().ok_or_else(|| {
            let valid: Vec<&str> = feature.params.iter().map(|(n, _)| n.as_str()).collect();
            CameraError::invalid_value(
                format!("parameter of {feature_name}"),
                param_name,
                format!("{valid:?}"),
            )
        })
    }
}
