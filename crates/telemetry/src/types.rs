//! Shared driver-value types: performance states, power domains, and
//! throttle flag sets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A discrete GPU performance state as reported by the driver.
///
/// `All` is a wildcard sentinel used in policy entries that apply
/// regardless of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceState {
    P0,
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
    P8,
    P9,
    P10,
    P11,
    P12,
    P13,
    P14,
    P15,
    /// Applies to every performance state.
    All,
    /// State cannot be determined.
    #[default]
    Unknown,
}

impl PerformanceState {
    /// Maps a raw driver state index to a performance state.
    ///
    /// Indices 0-15 are P0-P15; 16 is the "all states" wildcard used by
    /// limit policy entries. Anything else is unknown.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => PerformanceState::P0,
            1 => PerformanceState::P1,
            2 => PerformanceState::P2,
            3 => PerformanceState::P3,
            4 => PerformanceState::P4,
            5 => PerformanceState::P5,
            6 => PerformanceState::P6,
            7 => PerformanceState::P7,
            8 => PerformanceState::P8,
            9 => PerformanceState::P9,
            10 => PerformanceState::P10,
            11 => PerformanceState::P11,
            12 => PerformanceState::P12,
            13 => PerformanceState::P13,
            14 => PerformanceState::P14,
            15 => PerformanceState::P15,
            16 => PerformanceState::All,
            _ => PerformanceState::Unknown,
        }
    }

    /// Returns a human-readable label for the state.
    pub fn label(&self) -> &'static str {
        match self {
            PerformanceState::P0 => "P0",
            PerformanceState::P1 => "P1",
            PerformanceState::P2 => "P2",
            PerformanceState::P3 => "P3",
            PerformanceState::P4 => "P4",
            PerformanceState::P5 => "P5",
            PerformanceState::P6 => "P6",
            PerformanceState::P7 => "P7",
            PerformanceState::P8 => "P8",
            PerformanceState::P9 => "P9",
            PerformanceState::P10 => "P10",
            PerformanceState::P11 => "P11",
            PerformanceState::P12 => "P12",
            PerformanceState::P13 => "P13",
            PerformanceState::P14 => "P14",
            PerformanceState::P15 => "P15",
            PerformanceState::All => "All",
            PerformanceState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PerformanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A power topology domain the driver reports usage for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PowerDomain {
    /// GPU core domain.
    Gpu,
    /// Whole-board domain (includes memory and VRM losses).
    Board,
    /// Reserved or unrecognized domain id.
    #[default]
    Unknown,
}

impl PowerDomain {
    /// Maps a raw driver domain id to a power domain.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => PowerDomain::Gpu,
            1 => PowerDomain::Board,
            _ => PowerDomain::Unknown,
        }
    }

    /// Returns a human-readable label for the domain.
    pub fn label(&self) -> &'static str {
        match self {
            PowerDomain::Gpu => "GPU",
            PowerDomain::Board => "Board",
            PowerDomain::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PowerDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Active performance limit flags, combinable.
///
/// Bit values mirror the driver ABI, so flags survive a round-trip through
/// raw telemetry even when bits this crate does not name are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ThrottleFlags(u32);

impl ThrottleFlags {
    /// No limit is active.
    pub const NONE: ThrottleFlags = ThrottleFlags(0);
    /// Performance capped by the power limit.
    pub const POWER: ThrottleFlags = ThrottleFlags(1);
    /// Performance capped by a temperature limit.
    pub const THERMAL: ThrottleFlags = ThrottleFlags(1 << 1);
    /// Performance capped by a voltage/reliability limit.
    pub const VOLTAGE: ThrottleFlags = ThrottleFlags(1 << 2);
    /// Clocks reduced because the GPU is idle.
    pub const NO_LOAD: ThrottleFlags = ThrottleFlags(1 << 3);

    /// Builds a flag set from raw driver bits, preserving unknown bits.
    pub fn from_bits(bits: u32) -> Self {
        ThrottleFlags(bits)
    }

    /// Returns the raw bit representation.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Returns true if no flag is set.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if every bit of `other` is set in `self`.
    pub fn contains(&self, other: ThrottleFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    pub fn union(&self, other: ThrottleFlags) -> ThrottleFlags {
        ThrottleFlags(self.0 | other.0)
    }

    pub fn has_power_limit(&self) -> bool {
        self.contains(ThrottleFlags::POWER)
    }

    pub fn has_thermal_limit(&self) -> bool {
        self.contains(ThrottleFlags::THERMAL)
    }

    pub fn has_voltage_limit(&self) -> bool {
        self.contains(ThrottleFlags::VOLTAGE)
    }

    pub fn has_no_load_limit(&self) -> bool {
        self.contains(ThrottleFlags::NO_LOAD)
    }
}

impl fmt::Display for ThrottleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Reason flags for a driver-initiated performance decrease, combinable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SlowdownReason(u32);

impl SlowdownReason {
    pub const NONE: SlowdownReason = SlowdownReason(0);
    /// Thermal protection kicked in.
    pub const THERMAL_PROTECTION: SlowdownReason = SlowdownReason(1);
    /// Power control reduced clocks.
    pub const POWER_CONTROL: SlowdownReason = SlowdownReason(1 << 1);
    /// AC/battery power source event.
    pub const AC_BATTERY_EVENT: SlowdownReason = SlowdownReason(1 << 2);
    /// Requested through the driver API.
    pub const API_TRIGGERED: SlowdownReason = SlowdownReason(1 << 3);
    /// Insufficient external power (e.g. missing PCIe power connector).
    pub const INSUFFICIENT_POWER: SlowdownReason = SlowdownReason(1 << 4);

    /// Builds a reason set from raw driver bits.
    pub fn from_bits(bits: u32) -> Self {
        SlowdownReason(bits)
    }

    /// Returns the raw bit representation.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Returns true if no reason is set.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns a human-readable summary of the set reasons.
    pub fn label(&self) -> String {
        if self.is_empty() {
            return "None".to_string();
        }

        let mut reasons = Vec::new();
        if self.0 & Self::THERMAL_PROTECTION.0 != 0 {
            reasons.push("Thermal Protection");
        }
        if self.0 & Self::POWER_CONTROL.0 != 0 {
            reasons.push("Power Control");
        }
        if self.0 & Self::AC_BATTERY_EVENT.0 != 0 {
            reasons.push("AC/Battery Event");
        }
        if self.0 & Self::API_TRIGGERED.0 != 0 {
            reasons.push("API Triggered");
        }
        if self.0 & Self::INSUFFICIENT_POWER.0 != 0 {
            reasons.push("Insufficient Power");
        }

        if reasons.is_empty() {
            format!("{:#x}", self.0)
        } else {
            reasons.join(" + ")
        }
    }
}

impl fmt::Display for SlowdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The monitor's coarse operating state, mapped from the driver's raw
/// performance state during refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperatingState {
    /// Maximum performance (full boost).
    P0,
    /// High performance.
    P1,
    /// Balanced performance/power.
    P2,
    /// Power saving.
    P3,
    /// Minimal power (idle).
    P4,
    /// Deep sleep.
    P5,
    /// Performance reduced by a thermal or power limit.
    Throttled,
    /// State cannot be determined.
    #[default]
    Unknown,
}

impl OperatingState {
    /// Maps a raw performance state to an operating state.
    ///
    /// States deeper than P5 are not distinguished and map to unknown.
    pub fn from_performance_state(state: PerformanceState) -> Self {
        match state {
            PerformanceState::P0 => OperatingState::P0,
            PerformanceState::P1 => OperatingState::P1,
            PerformanceState::P2 => OperatingState::P2,
            PerformanceState::P3 => OperatingState::P3,
            PerformanceState::P4 => OperatingState::P4,
            PerformanceState::P5 => OperatingState::P5,
            _ => OperatingState::Unknown,
        }
    }

    /// Returns a human-readable label for the operating state.
    pub fn label(&self) -> &'static str {
        match self {
            OperatingState::P0 => "Full Performance (P0)",
            OperatingState::P1 => "High Performance (P1)",
            OperatingState::P2 => "Balanced (P2)",
            OperatingState::P3 => "Power Saving (P3)",
            OperatingState::P4 => "Minimal Power (P4)",
            OperatingState::P5 => "Sleep (P5)",
            OperatingState::Throttled => "Throttled",
            OperatingState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
