//! Reversible name/code lookup for enumerated camera settings.

use serde::{Deserialize, Serialize};
use vcam_core::{CamResult, CameraError, Handle, ParamId, ParameterPort};

/// A key into an [`EnumLookup`]: either the display name or the hardware
/// code. Setters accept both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnumKey {
    Name(String),
    Code(i32),
}

impl From<&str> for EnumKey {
    fn from(name: &str) -> Self {
        EnumKey::Name(name.to_owned())
    }
}

impl From<String> for EnumKey {
    fn from(name: String) -> Self {
        EnumKey::Name(name)
    }
}

impl From<i32> for EnumKey {
    fn from(code: i32) -> Self {
        EnumKey::Code(code)
    }
}

/// Bidirectional mapping between display names and hardware codes for one
/// enumerated parameter family.
///
/// Entry order is the hardware enumeration order. Lookups either succeed or
/// fail with an error listing every valid name (or code); there is no silent
/// default. Rebuilt on every device open, since the reported codes can depend
/// on the current port/speed/gain context for some families.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EnumLookup {
    tag: String,
    entries: Vec<(String, i32)>,
}

impl EnumLookup {
    /// An empty lookup carrying only its tag, the closed-session state.
    pub fn empty(tag: &str) -> Self {
        EnumLookup {
            tag: tag.to_owned(),
            entries: Vec::new(),
        }
    }

    /// Queries the port's enumeration for `param`. A device that does not
    /// support the parameter yields an empty lookup, not an error; any other
    /// failure propagates.
    pub fn probe<P: ParameterPort>(
        tag: &str,
        port: &P,
        handle: Handle,
        param: ParamId,
    ) -> CamResult<Self> {
        match port.read_enum(handle, param) {
            Ok(entries) => Ok(EnumLookup {
                tag: tag.to_owned(),
                entries,
            }),
            Err(err) if err.is_unsupported() => Ok(EnumLookup::empty(tag)),
            Err(err) => Err(err),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `(name, code)` pairs in hardware enumeration order.
    pub fn entries(&self) -> &[(String, i32)] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn codes(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().map(|&(_, code)| code)
    }

    /// Resolves a key to its hardware code. A name is translated; a code is
    /// verified to be one of the enumerated values.
    pub fn resolve(&self, key: impl Into<EnumKey>) -> CamResult<i32> {
        match key.into() {
            EnumKey::Name(name) => self
                .entries
                .iter()
                .find(|(n, _)| *n == name)
                .map(|&(_, code)| code)
                .ok_or_else(|| self.unknown_name(&name)),
            EnumKey::Code(code) => {
                if self.entries.iter().any(|&(_, c)| c == code) {
                    Ok(code)
                } else {
                    Err(self.unknown_code(code))
                }
            }
        }
    }

    /// Reverse lookup: the display name for a hardware code.
    pub fn name_of(&self, code: i32) -> CamResult<&str> {
        self.entries
            .iter()
            .find(|&&(_, c)| c == code)
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| self.unknown_code(code))
    }

    fn unknown_name(&self, name: &str) -> CameraError {
        let valid: Vec<&str> = self.names().collect();
        CameraError::invalid_value(format!("key for {}", self.tag), name, format!("{valid:?}"))
    }

    fn unknown_code(&self, code: i32) -> CameraError {
        let valid: Vec<i32> = self.codes().collect();
        CameraError::invalid_value(
            format!("value for {}", self.tag),
            code,
            format!("{valid:?}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> EnumLookup {
        EnumLookup {
            tag: "readout_ports".to_owned(),
            entries: vec![("Sensitivity".to_owned(), 0), ("Speed".to_owned(), 1)],
        }
    }

    #[test]
    fn round_trips_names_and_codes() {
        let l = lookup();
        assert_eq!(l.resolve("Sensitivity").unwrap(), 0);
        assert_eq!(l.resolve(1).unwrap(), 1);
        assert_eq!(l.name_of(1).unwrap(), "Speed");
    }

    #[test]
    fn unknown_name_error_lists_all_valid_names() {
        let err = lookup().resolve("Turbo").unwrap_err().to_string();
        assert!(err.contains("readout_ports"), "{err}");
        assert!(err.contains("Sensitivity"), "{err}");
        assert!(err.contains("Speed"), "{err}");
    }

    #[test]
    fn unknown_code_error_lists_all_valid_codes() {
        let err = lookup().resolve(7).unwrap_err().to_string();
        assert!(err.contains('0'), "{err}");
        assert!(err.contains('1'), "{err}");
    }

    #[test]
    fn empty_lookup_fails_every_access() {
        let l = EnumLookup::empty("fan_speeds");
        assert!(l.is_empty());
        assert!(l.resolve(0).is_err());
        assert!(l.resolve("High").is_err());
    }
}
