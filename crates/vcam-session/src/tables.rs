//! Capability tables built once per device open.
//!
//! Both tables are derived caches: building them walks every combination the
//! hardware reports (ports x speeds x gains, features x parameters), which is
//! a bounded number of round-trips executed only at open time.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GainEntry {
    pub name: String,
    pub index: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedEntry {
    pub name: String,
    pub index: i32,
    /// Pixel readout time in nanoseconds at this speed.
    pub pixel_time: u16,
    pub bit_depth: u16,
    pub gains: Vec<GainEntry>,
}

impl SpeedEntry {
    pub fn gain(&self, name: &str) -> Option<&GainEntry> {
        self.gains.iter().find(|g| g.name == name)
    }

    /// All legal gain indices at this speed, in hardware order.
    pub fn gain_range(&self) -> Vec<i32> {
        self.gains.iter().map(|g| g.index).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortEntry {
    pub name: String,
    pub value: i32,
    pub speeds: Vec<SpeedEntry>,
}

impl PortEntry {
    pub fn speed(&self, name: &str) -> Option<&SpeedEntry> {
        self.speeds.iter().find(|s| s.name == name)
    }
}

/// The port x speed x gain matrix: every readout port the device reports,
/// every digitization speed at that port, and every legal gain index at that
/// speed, each speed annotated with its pixel time and bit depth.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortSpeedGainTable {
    pub ports: Vec<PortEntry>,
}

impl PortSpeedGainTable {
    pub fn port(&self, name: &str) -> Option<&PortEntry> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// One post-processing parameter with the positional indices needed to drive
/// the select-then-access protocol, plus its reported value bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProcessingParam {
    pub feature_index: i32,
    pub feature_id: u16,
    pub param_index: i32,
    pub param_id: u16,
    pub min: u32,
    pub max: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProcessingFeature {
    pub name: String,
    pub params: Vec<(String, PostProcessingParam)>,
}

impl PostProcessingFeature {
    pub fn param(&self, name: &str) -> Option<&PostProcessingParam> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }
}

/// The post-processing feature x parameter matrix. The indices are
/// positional and session-scoped: every access must re-run the full
/// select-feature, select-parameter sequence; no "currently selected" index
/// is cached across calls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProcessingTable {
    pub features: Vec<PostProcessingFeature>,
}

impl PostProcessingTable {
    pub fn feature(&self, name: &str) -> Option<&PostProcessingFeature> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn find(&self, feature_name: &str, param_name: &str) -> Option<&PostProcessingParam> {
        self.feature(feature_name)?.param(param_name)
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
