//! The acquisition session: device lifecycle, cached state, parameter access
//! and ROI-list management.
//!
//! One session owns one device handle. The session performs no internal
//! locking and is not safe for concurrent calls from multiple threads;
//! independent devices may be driven concurrently from separate sessions.

mod acquisition;
mod settings;

use std::fmt;

use tracing::{debug, info};
use vcam_core::params::*;
use vcam_core::{
    CamResult, CameraError, Handle, ParamAttr, ParamValue, ParameterPort, PixelType,
    RegionDescriptor, NO_HANDLE,
};

use crate::enums::EnumLookup;
use crate::roi::RegionOfInterest;
use crate::tables::{
    GainEntry, PortEntry, PortSpeedGainTable, PostProcessingFeature, PostProcessingParam,
    PostProcessingTable, SpeedEntry,
};

/// Acquisition state machine. At most one capture is in flight per session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AcquisitionMode {
    #[default]
    Idle,
    Live,
    Sequence,
}

/// All reversible enum lookups, rebuilt on every open.
#[derive(Clone, Debug)]
pub(crate) struct SessionLookups {
    pub readout_ports: EnumLookup,
    pub centroids_modes: EnumLookup,
    pub clear_modes: EnumLookup,
    pub exp_modes: EnumLookup,
    pub exp_out_modes: EnumLookup,
    pub exp_resolutions: EnumLookup,
    pub fan_speeds: EnumLookup,
    pub prog_scan_modes: EnumLookup,
    pub prog_scan_dirs: EnumLookup,
}

impl SessionLookups {
    fn empty() -> Self {
        SessionLookups {
            readout_ports: EnumLookup::empty("readout_ports"),
            centroids_modes: EnumLookup::empty("centroids_modes"),
            clear_modes: EnumLookup::empty("clear_modes"),
            exp_modes: EnumLookup::empty("exp_modes"),
            exp_out_modes: EnumLookup::empty("exp_out_modes"),
            exp_resolutions: EnumLookup::empty("exp_resolutions"),
            fan_speeds: EnumLookup::empty("fan_speeds"),
            prog_scan_modes: EnumLookup::empty("prog_scan_modes"),
            prog_scan_dirs: EnumLookup::empty("prog_scan_dirs"),
        }
    }
}

/// One camera device's live control state.
///
/// Constructed closed; [`open`](AcquisitionSession::open) populates every
/// cache and capability table, [`close`](AcquisitionSession::close) tears
/// them down. The session may be reopened. While closed, every
/// parameter-dependent accessor fails with [`CameraError::NotOpen`].
pub struct AcquisitionSession<P: ParameterPort> {
    port: P,
    name: String,
    handle: Handle,
    is_open: bool,

    sensor_size: (u16, u16),
    has_bit_depth_host: bool,
    has_speed_name: bool,
    has_gain_name: bool,

    acquisition_mode: AcquisitionMode,

    exp_mode: i32,
    exp_out_mode: i32,
    /// Combined mode word, always `exp_mode | exp_out_mode`.
    mode: i32,
    /// Locally cached exposure time; the device does not retain it across
    /// idle periods.
    exp_time: u32,

    default_roi: RegionOfInterest,
    rois: Vec<RegionOfInterest>,
    /// Legal binning pairs when the device does not support arbitrary
    /// binning.
    limited_binnings: Option<Vec<(u16, u16)>>,

    lookups: SessionLookups,
    port_speed_gain_table: PortSpeedGainTable,
    post_processing_table: PostProcessingTable,

    pixel_type: PixelType,
}

impl<P: ParameterPort> fmt::Debug for AcquisitionSession<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquisitionSession")
            .field("name", &self.name)
            .field("is_open", &self.is_open)
            .field("acquisition_mode", &self.acquisition_mode)
            .finish_non_exhaustive()
    }
}

impl<P: ParameterPort> AcquisitionSession<P> {
    /// Creates a closed session for the named device.
    pub fn new(port: P, name: impl Into<String>) -> Self {
        AcquisitionSession {
            port,
            name: name.into(),
            handle: NO_HANDLE,
            is_open: false,
            sensor_size: (0, 0),
            has_bit_depth_host: false,
            has_speed_name: false,
            has_gain_name: false,
            acquisition_mode: AcquisitionMode::Idle,
            exp_mode: TIMED_MODE,
            exp_out_mode: EXPOSE_OUT_FIRST_ROW,
            mode: TIMED_MODE | EXPOSE_OUT_FIRST_ROW,
            exp_time: 0,
            default_roi: RegionOfInterest::default(),
            rois: Vec::new(),
            limited_binnings: None,
            lookups: SessionLookups::empty(),
            port_speed_gain_table: PortSpeedGainTable::default(),
            post_processing_table: PostProcessingTable::default(),
            pixel_type: PixelType::U16,
        }
    }

    /// Names of every device the port can see, sorted by index.
    pub fn available_camera_names(port: &P) -> CamResult<Vec<String>> {
        let total = port.total_cameras()?;
        let mut names = Vec::with_capacity(usize::from(total));
        for index in 0..total {
            names.push(port.camera_name(index)?);
        }
        Ok(names)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn acquisition_mode(&self) -> AcquisitionMode {
        self.acquisition_mode
    }

    /// The element type delivered frames decode to, tracking the effective
    /// bit depth.
    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Direct access to the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    pub(crate) fn ensure_open(&self) -> CamResult<Handle> {
        if self.is_open {
            Ok(self.handle)
        } else {
            Err(CameraError::NotOpen {
                name: self.name.clone(),
            })
        }
    }

    /// Opens the device and populates every cache: sensor geometry, the
    /// default full-frame ROI, capability flags, enum lookups and the
    /// capability tables. Only handle acquisition failure aborts the open;
    /// every capability probe degrades gracefully.
    pub fn open(&mut self) -> CamResult<()> {
        let handle = match self.port.open(&self.name) {
            Ok(handle) => handle,
            Err(CameraError::DeviceUnavailable(reason)) => {
                return Err(CameraError::DeviceUnavailable(reason))
            }
            Err(other) => return Err(CameraError::DeviceUnavailable(other.to_string())),
        };
        self.handle = handle;
        self.is_open = true;
        info!(camera = %self.name, "opening camera");

        // Frame-transfer capable sensors run in frame-transfer clocking;
        // everything else in normal mode. A missing capability parameter
        // means normal mode, not an error.
        match self.get_param(PARAM_FRAME_CAPABLE, ParamAttr::Current) {
            Ok(value) => {
                let pmode = if value.as_bool()? { PMODE_FT } else { PMODE_NORMAL };
                self.set_param(PARAM_PMODE, ParamValue::from(pmode))?;
            }
            Err(err) if err.is_unsupported() => {
                self.set_param(PARAM_PMODE, ParamValue::from(PMODE_NORMAL))?;
            }
            Err(err) => return Err(err),
        }

        self.sensor_size = (
            self.current_u16(PARAM_SER_SIZE)?,
            self.current_u16(PARAM_PAR_SIZE)?,
        );
        self.has_bit_depth_host = self.check_param(PARAM_BIT_DEPTH_HOST);
        self.has_speed_name = self.check_param(PARAM_SPDTAB_NAME);
        self.has_gain_name = self.check_param(PARAM_GAIN_NAME);

        self.default_roi = RegionOfInterest::new(
            0,
            self.sensor_size.0 - 1,
            1,
            0,
            self.sensor_size.1 - 1,
            1,
        )?;
        self.reset_rois()?;

        self.limited_binnings = self.probe_limited_binnings()?;

        self.exp_mode = self.current_i32(PARAM_EXPOSURE_MODE)?;
        self.exp_out_mode = if self.check_param(PARAM_EXPOSE_OUT_MODE) {
            self.current_i32(PARAM_EXPOSE_OUT_MODE)?
        } else {
            0
        };
        self.mode = self.exp_mode | self.exp_out_mode;

        self.lookups = SessionLookups {
            readout_ports: self.probe_lookup("readout_ports", PARAM_READOUT_PORT)?,
            centroids_modes: self.probe_lookup("centroids_modes", PARAM_CENTROIDS_MODE)?,
            clear_modes: self.probe_lookup("clear_modes", PARAM_CLEAR_MODE)?,
            exp_modes: self.probe_lookup("exp_modes", PARAM_EXPOSURE_MODE)?,
            exp_out_modes: self.probe_lookup("exp_out_modes", PARAM_EXPOSE_OUT_MODE)?,
            exp_resolutions: self.probe_lookup("exp_resolutions", PARAM_EXP_RES)?,
            fan_speeds: self.probe_lookup("fan_speeds", PARAM_FAN_SPEED_SETPOINT)?,
            prog_scan_modes: self.probe_lookup("prog_scan_modes", PARAM_SCAN_MODE)?,
            prog_scan_dirs: self.probe_lookup("prog_scan_dirs", PARAM_SCAN_DIRECTION)?,
        };

        self.build_port_speed_gain_table()?;

        // A device without post-processing truncates the walk early; the
        // partial table (possibly empty) is kept.
        if let Err(err) = self.build_post_processing_table() {
            if !err.is_unsupported() {
                return Err(err);
            }
            debug!(camera = %self.name, "post-processing walk truncated: {err}");
        }

        info!(
            camera = %self.name,
            sensor = ?self.sensor_size,
            ports = self.port_speed_gain_table.ports.len(),
            pp_features = self.post_processing_table.features.len(),
            "camera opened"
        );
        Ok(())
    }

    /// Releases the handle and resets every cached field. The session is
    /// marked closed even when the release itself fails, so a failed close
    /// never leaves a usable session behind.
    pub fn close(&mut self) -> CamResult<()> {
        let handle = self.ensure_open()?;
        let released = self.port.close(handle);

        self.handle = NO_HANDLE;
        self.is_open = false;
        self.sensor_size = (0, 0);
        self.has_bit_depth_host = false;
        self.has_speed_name = false;
        self.has_gain_name = false;
        self.acquisition_mode = AcquisitionMode::Idle;
        self.exp_mode = TIMED_MODE;
        self.exp_out_mode = EXPOSE_OUT_FIRST_ROW;
        self.mode = self.exp_mode | self.exp_out_mode;
        self.exp_time = 0;
        self.default_roi = RegionOfInterest::default();
        self.rois.clear();
        self.limited_binnings = None;
        self.lookups = SessionLookups::empty();
        self.port_speed_gain_table = PortSpeedGainTable::default();
        self.post_processing_table = PostProcessingTable::default();
        self.pixel_type = PixelType::U16;

        match released {
            Ok(()) => {
                info!(camera = %self.name, "camera closed");
                Ok(())
            }
            Err(err) => Err(CameraError::CloseFailed(err.to_string())),
        }
    }

    // --- raw parameter access, the escape hatch for settings without a
    // --- named accessor ---

    pub fn get_param(&self, param: ParamId, attr: ParamAttr) -> CamResult<ParamValue> {
        let handle = self.ensure_open()?;
        self.port.get_param(handle, param, attr)
    }

    pub fn set_param(&mut self, param: ParamId, value: ParamValue) -> CamResult<()> {
        let handle = self.ensure_open()?;
        self.port.set_param(handle, param, value)
    }

    /// Availability probe; answers `false` for a closed session or an
    /// unknown parameter, never errors.
    pub fn check_param(&self, param: ParamId) -> bool {
        if !self.is_open {
            return false;
        }
        self.port.check_param(self.handle, param)
    }

    pub fn read_enum(&self, param: ParamId) -> CamResult<Vec<(String, i32)>> {
        let handle = self.ensure_open()?;
        self.port.read_enum(handle, param)
    }

    /// Restores all post-processing features to factory defaults.
    pub fn reset_pp(&mut self) -> CamResult<()> {
        let handle = self.ensure_open()?;
        self.port.reset_pp(handle)
    }

    // --- typed read helpers ---

    pub(crate) fn current_i32(&self, param: ParamId) -> CamResult<i32> {
        self.get_param(param, ParamAttr::Current)?.as_i32()
    }

    pub(crate) fn current_i64(&self, param: ParamId) -> CamResult<i64> {
        self.get_param(param, ParamAttr::Current)?.as_i64()
    }

    pub(crate) fn current_u16(&self, param: ParamId) -> CamResult<u16> {
        self.get_param(param, ParamAttr::Current)?.as_u16()
    }

    pub(crate) fn current_string(&self, param: ParamId) -> CamResult<String> {
        Ok(self.get_param(param, ParamAttr::Current)?.as_str()?.to_owned())
    }

    pub(crate) fn attr_i64(&self, param: ParamId, attr: ParamAttr) -> CamResult<i64> {
        self.get_param(param, attr)?.as_i64()
    }

    fn probe_lookup(&self, tag: &str, param: ParamId) -> CamResult<EnumLookup> {
        EnumLookup::probe(tag, &self.port, self.handle, param)
    }

    fn probe_limited_binnings(&self) -> CamResult<Option<Vec<(u16, u16)>>> {
        if !self.check_param(PARAM_BINNING_SER) || !self.check_param(PARAM_BINNING_PAR) {
            return Ok(None);
        }
        let ser = match self.read_enum(PARAM_BINNING_SER) {
            Ok(entries) => entries,
            Err(err) if err.is_unsupported() => return Ok(None),
            Err(err) => return Err(err),
        };
        let par = match self.read_enum(PARAM_BINNING_PAR) {
            Ok(entries) => entries,
            Err(err) if err.is_unsupported() => return Ok(None),
            Err(err) => return Err(err),
        };
        let pairs = ser
            .iter()
            .zip(par.iter())
            .map(|(&(_, s), &(_, p))| (s as u16, p as u16))
            .collect();
        Ok(Some(pairs))
    }

    // --- capability tables ---

    /// Walks every readout port, every speed at that port and every legal
    /// gain at that speed. O(ports x speeds x gains) hardware round-trips,
    /// executed once per open. Restores port 0 / speed 0 / gain 1 afterward.
    fn build_port_speed_gain_table(&mut self) -> CamResult<()> {
        let mut table = PortSpeedGainTable::default();
        for (port_name, port_value) in self.read_enum(PARAM_READOUT_PORT)? {
            self.set_readout_port(port_value)?;

            let speed_count = self.attr_i64(PARAM_SPDTAB_INDEX, ParamAttr::Count)? as i32;
            let mut speeds = Vec::with_capacity(speed_count as usize);
            for speed_index in 0..speed_count {
                self.set_speed(speed_index)?;

                let gain_min = self.attr_i64(PARAM_GAIN_INDEX, ParamAttr::Min)? as i32;
                let gain_max = self.attr_i64(PARAM_GAIN_INDEX, ParamAttr::Max)? as i32;
                let gain_increment =
                    (self.attr_i64(PARAM_GAIN_INDEX, ParamAttr::Increment)? as i32).max(1);

                let mut gains = Vec::new();
                let mut gain_index = gain_min;
                while gain_index <= gain_max {
                    self.set_gain(gain_index)?;
                    gains.push(GainEntry {
                        name: self.gain_name()?,
                        index: gain_index,
                    });
                    gain_index += gain_increment;
                }

                speeds.push(SpeedEntry {
                    name: self.speed_name()?,
                    index: speed_index,
                    pixel_time: self.pix_time()?,
                    bit_depth: self.bit_depth()?,
                    gains,
                });
            }
            table.ports.push(PortEntry {
                name: port_name,
                value: port_value,
                speeds,
            });
        }
        self.port_speed_gain_table = table;

        // The walk left the camera on the last combination. Restore the
        // defaults; Port first, then Speed, then Gain, because each
        // downstream index is interpreted in the upstream context.
        self.set_readout_port(0)?;
        self.set_speed(0)?;
        self.set_gain(1)?;
        Ok(())
    }

    /// Walks every post-processing feature and its parameters through the
    /// index-based select-then-read protocol.
    fn build_post_processing_table(&mut self) -> CamResult<()> {
        self.post_processing_table = PostProcessingTable::default();
        let feature_count = self.attr_i64(PARAM_PP_INDEX, ParamAttr::Count)? as i32;
        for feature_index in 0..feature_count {
            self.set_param(PARAM_PP_INDEX, ParamValue::from(feature_index))?;

            let feature_id = self.current_u16(PARAM_PP_FEAT_ID)?;
            let feature_name = self.current_string(PARAM_PP_FEAT_NAME)?;

            let param_count = self.attr_i64(PARAM_PP_PARAM_INDEX, ParamAttr::Count)? as i32;
            let mut params = Vec::with_capacity(param_count as usize);
            for param_index in 0..param_count {
                self.set_param(PARAM_PP_PARAM_INDEX, ParamValue::from(param_index))?;

                params.push((
                    self.current_string(PARAM_PP_PARAM_NAME)?,
                    PostProcessingParam {
                        feature_index,
                        feature_id,
                        param_index,
                        param_id: self.current_u16(PARAM_PP_PARAM_ID)?,
                        min: self.attr_i64(PARAM_PP_PARAM, ParamAttr::Min)? as u32,
                        max: self.attr_i64(PARAM_PP_PARAM, ParamAttr::Max)? as u32,
                    },
                ));
            }
            self.post_processing_table.features.push(PostProcessingFeature {
                name: feature_name,
                params,
            });
        }
        Ok(())
    }

    pub fn port_speed_gain_table(&self) -> &PortSpeedGainTable {
        &self.port_speed_gain_table
    }

    pub fn post_processing_table(&self) -> &PostProcessingTable {
        &self.post_processing_table
    }

    // --- ROI list management ---

    /// Replaces the ROI list with the default full-frame region.
    pub fn reset_rois(&mut self) -> CamResult<()> {
        self.ensure_open()?;
        self.rois = vec![self.default_roi];
        Ok(())
    }

    /// Configures a capture region from a top-left corner and size.
    ///
    /// While the list still holds only the default region (or the device
    /// supports a single region), the new region replaces it, inheriting the
    /// current binning factors. Later calls append, provided the device's
    /// region budget allows it and the new region overlaps nothing.
    pub fn set_roi(&mut self, s1: u16, p1: u16, width: u16, height: u16) -> CamResult<()> {
        self.ensure_open()?;

        if width < 1 || height < 1 {
            return Err(CameraError::invalid_value(
                "ROI size",
                format!("{width}x{height}"),
                "width and height >= 1",
            ));
        }

        let s2 = u32::from(s1) + u32::from(width) - 1;
        let p2 = u32::from(p1) + u32::from(height) - 1;
        let (ser, par) = self.sensor_size;
        if s2 >= u32::from(ser) || p2 >= u32::from(par) {
            return Err(CameraError::invalid_value(
                "ROI geometry",
                format!("({s1},{p1}) {width}x{height}"),
                format!("a region within the {ser}x{par} sensor"),
            ));
        }

        let using_default_roi = self.rois.len() == 1 && self.rois[0] == self.default_roi;
        let max_roi_count = self.attr_i64(PARAM_ROI_COUNT, ParamAttr::Max)? as usize;

        // New regions inherit the current binning factors.
        let (sbin, pbin) = (self.rois[0].sbin(), self.rois[0].pbin());
        let new_roi = RegionOfInterest::new(s1, s2 as u16, sbin, p1, p2 as u16, pbin)?;

        if max_roi_count == 1 || using_default_roi {
            self.rois = vec![new_roi];
        } else if self.rois.len() < max_roi_count {
            if let Some(existing) = self.rois.iter().find(|roi| roi.overlaps(&new_roi)) {
                return Err(CameraError::CapacityExceeded(format!(
                    "new region ({},{})..({},{}) overlaps existing region ({},{})..({},{})",
                    new_roi.s1(),
                    new_roi.p1(),
                    new_roi.s2(),
                    new_roi.p2(),
                    existing.s1(),
                    existing.p1(),
                    existing.s2(),
                    existing.p2(),
                )));
            }
            self.rois.push(new_roi);
        } else {
            return Err(CameraError::CapacityExceeded(format!(
                "camera supports at most {max_roi_count} regions"
            )));
        }
        Ok(())
    }

    /// The active ROI list. Never empty while open.
    pub fn rois(&self) -> CamResult<&[RegionOfInterest]> {
        self.ensure_open()?;
        Ok(&self.rois)
    }

    /// Binned output shape of the region at `roi_index`.
    pub fn shape(&self, roi_index: usize) -> CamResult<(u32, u32)> {
        self.ensure_open()?;
        self.rois
            .get(roi_index)
            .map(RegionOfInterest::shape)
            .ok_or_else(|| {
                CameraError::invalid_value(
                    "ROI index",
                    roi_index,
                    format!("0 to {}", self.rois.len() - 1),
                )
            })
    }

    pub(crate) fn roi_descriptors(&self) -> Vec<RegionDescriptor> {
        self.rois.iter().map(RegionOfInterest::descriptor).collect()
    }

    pub(crate) fn single_roi_only(&self, operation: &str) -> CamResult<()> {
        if self.rois.len() > 1 {
            return Err(CameraError::invalid_value(
                "ROI configuration",
                format!("{} regions", self.rois.len()),
                format!("a single region for {operation}"),
            ));
        }
        Ok(())
    }

    // --- mode derivation ---

    /// Re-derives the combined mode word and pushes it to the device. Called
    /// by both sub-mode setters; a stale mode word is never observable.
    pub(crate) fn update_mode(&mut self) -> CamResult<()> {
        let handle = self.ensure_open()?;
        self.mode = self.exp_mode | self.exp_out_mode;
        self.port.set_exp_modes(handle, self.mode)
    }

    /// Recomputes the pixel element type from whichever bit-depth parameter
    /// the device supports. Called after every operation that can change the
    /// effective bit depth.
    pub(crate) fn update_pixel_type(&mut self) -> CamResult<()> {
        let bits = if self.has_bit_depth_host {
            self.current_u16(PARAM_BIT_DEPTH_HOST)?
        } else {
            self.current_u16(PARAM_BIT_DEPTH)?
        };
        self.pixel_type = PixelType::from_bit_depth(bits);
        Ok(())
    }

    /// Sensor dimensions `(serial, parallel)` cached at open.
    pub fn sensor_size(&self) -> CamResult<(u16, u16)> {
        self.ensure_open()?;
        Ok(self.sensor_size)
    }

    /// Current binning factors, shared by every region in the list.
    pub fn binning(&self) -> CamResult<(u16, u16)> {
        self.ensure_open()?;
        Ok((self.rois[0].sbin(), self.rois[0].pbin()))
    }

    /// Applies binning factors to every region, re-clipping each one so its
    /// shape stays integral. Validated against the device's enumerated
    /// binning pairs when it does not support arbitrary binning.
    pub fn set_binning(&mut self, sbin: u16, pbin: u16) -> CamResult<()> {
        self.ensure_open()?;
        if sbin < 1 || pbin < 1 {
            return Err(CameraError::invalid_value(
                "binning",
                format!("({sbin}, {pbin})"),
                "factors >= 1",
            ));
        }
        if let Some(legal) = &self.limited_binnings {
            if !legal.contains(&(sbin, pbin)) {
                return Err(CameraError::invalid_value(
                    "binning",
                    format!("({sbin}, {pbin})"),
                    format!("{legal:?}"),
                ));
            }
        }
        let mut rebinned = Vec::with_capacity(self.rois.len());
        for roi in &self.rois {
            rebinned.push(roi.with_binning(sbin, pbin)?);
        }
        self.rois = rebinned;
        Ok(())
    }

    /// Legal binning pairs, or `None` when the device supports arbitrary
    /// binning.
    pub fn binnings(&self) -> CamResult<Option<&[(u16, u16)]>> {
        self.ensure_open()?;
        Ok(self.limited_binnings.as_deref())
    }
}
