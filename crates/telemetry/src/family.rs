//! GPU architecture detection from die codenames.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Known GPU architecture generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GpuFamily {
    Kepler,
    Maxwell,
    Pascal,
    Volta,
    Turing,
    Ampere,
    Ada,
    Blackwell,
    Hopper,
    Orin,
    #[default]
    Unknown,
}

impl GpuFamily {
    /// Detects the architecture from a die codename (e.g. "AD102", "GA104").
    pub fn from_codename(codename: &str) -> Self {
        if codename.trim().is_empty() {
            return GpuFamily::Unknown;
        }

        let name = codename.trim().to_uppercase();

        if name.starts_with("GK") {
            GpuFamily::Kepler
        } else if name.starts_with("GM") {
            GpuFamily::Maxwell
        } else if name.starts_with("GP") {
            GpuFamily::Pascal
        } else if name.starts_with("GV") {
            GpuFamily::Volta
        } else if name.starts_with("TU") {
            GpuFamily::Turing
        } else if name.starts_with("GA") {
            GpuFamily::Ampere
        } else if name.starts_with("AD") {
            GpuFamily::Ada
        } else if name.starts_with("BL") {
            GpuFamily::Blackwell
        } else if name.starts_with("GH") || name == "H100" || name == "H200" {
            GpuFamily::Hopper
        } else if name.starts_with("ORIN") {
            GpuFamily::Orin
        } else {
            GpuFamily::Unknown
        }
    }

    /// Detects the architecture from its marketing name as recorded in
    /// spec catalogs (e.g. "Ada Lovelace", "Ampere").
    pub fn from_architecture(name: &str) -> Self {
        let name = name.trim().to_lowercase();

        if name.contains("kepler") {
            GpuFamily::Kepler
        } else if name.contains("maxwell") {
            GpuFamily::Maxwell
        } else if name.contains("pascal") {
            GpuFamily::Pascal
        } else if name.contains("volta") {
            GpuFamily::Volta
        } else if name.contains("turing") {
            GpuFamily::Turing
        } else if name.contains("ampere") {
            GpuFamily::Ampere
        } else if name.contains("ada") || name.contains("lovelace") {
            GpuFamily::Ada
        } else if name.contains("blackwell") {
            GpuFamily::Blackwell
        } else if name.contains("hopper") {
            GpuFamily::Hopper
        } else if name.contains("orin") {
            GpuFamily::Orin
        } else {
            GpuFamily::Unknown
        }
    }

    /// Returns a human-readable description with the production window.
    pub fn description(&self) -> &'static str {
        match self {
            GpuFamily::Kepler => "Kepler (2012-2014)",
            GpuFamily::Maxwell => "Maxwell (2014-2016)",
            GpuFamily::Pascal => "Pascal (2016-2017)",
            GpuFamily::Volta => "Volta (2017-2018)",
            GpuFamily::Turing => "Turing (2018-2020)",
            GpuFamily::Ampere => "Ampere (2020-2021)",
            GpuFamily::Ada => "Ada Lovelace (2022-2023)",
            GpuFamily::Blackwell => "Blackwell (2025+)",
            GpuFamily::Hopper => "Hopper (2022-2023, Data Center)",
            GpuFamily::Orin => "Orin (Edge/Mobile)",
            GpuFamily::Unknown => "Unknown",
        }
    }

    /// Whether the architecture supports the NVLink interconnect.
    pub fn supports_nvlink(&self) -> bool {
        matches!(
            self,
            GpuFamily::Volta | GpuFamily::Ampere | GpuFamily::Ada | GpuFamily::Hopper
        )
    }
}

impl fmt::Display for GpuFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_family_from_codename_prefix() {
        assert_eq!(GpuFamily::from_codename("AD102"), GpuFamily::Ada);
        assert_eq!(GpuFamily::from_codename("ga104"), GpuFamily::Ampere);
        assert_eq!(GpuFamily::from_codename("TU116"), GpuFamily::Turing);
        assert_eq!(GpuFamily::from_codename("GB202"), GpuFamily::Unknown);
        assert_eq!(GpuFamily::from_codename("BL102"), GpuFamily::Blackwell);
        assert_eq!(GpuFamily::from_codename("H100"), GpuFamily::Hopper);
        assert_eq!(GpuFamily::from_codename(""), GpuFamily::Unknown);
    }

    #[test]
    fn detects_family_from_architecture_name() {
        assert_eq!(GpuFamily::from_architecture("Ada Lovelace"), GpuFamily::Ada);
        assert_eq!(GpuFamily::from_architecture("Ampere"), GpuFamily::Ampere);
        assert_eq!(GpuFamily::from_architecture("Hopper"), GpuFamily::Hopper);
        assert_eq!(GpuFamily::from_architecture("Custom"), GpuFamily::Unknown);
    }

    #[test]
    fn nvlink_support_by_family() {
        assert!(GpuFamily::Hopper.supports_nvlink());
        assert!(GpuFamily::Ampere.supports_nvlink());
        assert!(!GpuFamily::Turing.supports_nvlink());
        assert!(!GpuFamily::Unknown.supports_nvlink());
    }
}
