//! Raw per-sample telemetry as handed over by the driver access layer.
//!
//! The driver reports power values in per-cent-mille (PCM), a fixed-point
//! percentage where 100000 = 100.000% of the board's current power limit.
//! Nothing in this module is watt-denominated; resolution to watts happens
//! in [`crate::snapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};
use crate::types::{PerformanceState, PowerDomain, SlowdownReason, ThrottleFlags};

/// Current power usage of one topology domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainUsage {
    /// The domain this reading belongs to.
    pub domain: PowerDomain,
    /// Power usage in PCM relative to the current power limit.
    pub usage_pcm: u32,
}

impl DomainUsage {
    /// Usage as a percentage (0-100+). Values above 100 indicate a
    /// transient excursion past the current power limit.
    pub fn usage_percent(&self) -> f32 {
        self.usage_pcm as f32 / 1000.0
    }

    /// Estimates this domain's draw in watts against a caller-supplied
    /// reference limit (e.g. the board TGP for the board domain).
    pub fn estimate_watts(&self, reference_limit_watts: f64) -> Result<f64> {
        if reference_limit_watts <= 0.0 {
            return Err(TelemetryError::OutOfRange(format!(
                "reference limit must be positive, got {reference_limit_watts}"
            )));
        }

        Ok(reference_limit_watts * f64::from(self.usage_percent()) / 100.0)
    }
}

/// The currently active power target for a performance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerTarget {
    /// The performance state this target applies to.
    pub state: PerformanceState,
    /// Target power in PCM relative to the default TDP.
    /// 110000 PCM = 110% = the user raised the power limit by 10%.
    pub target_pcm: u32,
}

impl PowerTarget {
    /// Target as a percentage of the default TDP (e.g. 100.0, 110.0).
    pub fn target_percent(&self) -> f32 {
        self.target_pcm as f32 / 1000.0
    }

    /// Converts the target to watts given the board's default TDP.
    pub fn to_watts(&self, default_tdp_watts: f64) -> f64 {
        default_tdp_watts * f64::from(self.target_percent()) / 100.0
    }
}

/// The allowed power target envelope for a performance state.
///
/// All values are in PCM relative to the default TDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerLimitRange {
    /// The performance state this envelope applies to.
    pub state: PerformanceState,
    /// Lowest settable target (e.g. 70000 PCM = 70%).
    pub min_pcm: u32,
    /// Factory default target (typically 100000 PCM).
    pub default_pcm: u32,
    /// Highest settable target (e.g. 116000 PCM = 116%).
    pub max_pcm: u32,
}

impl PowerLimitRange {
    pub fn min_percent(&self) -> f32 {
        self.min_pcm as f32 / 1000.0
    }

    pub fn default_percent(&self) -> f32 {
        self.default_pcm as f32 / 1000.0
    }

    pub fn max_percent(&self) -> f32 {
        self.max_pcm as f32 / 1000.0
    }

    /// Converts the envelope to watts given the board's default TDP.
    pub fn to_watts(&self, default_tdp_watts: f64) -> LimitRangeWatts {
        LimitRangeWatts {
            min_watts: default_tdp_watts * f64::from(self.min_percent()) / 100.0,
            default_watts: default_tdp_watts * f64::from(self.default_percent()) / 100.0,
            max_watts: default_tdp_watts * f64::from(self.max_percent()) / 100.0,
        }
    }
}

/// A power limit envelope resolved to watts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitRangeWatts {
    pub min_watts: f64,
    pub default_watts: f64,
    pub max_watts: f64,
}

/// One point-in-time bundle of raw telemetry for a single GPU.
///
/// Every field beyond the device name is optional or may be empty; missing
/// telemetry is routine on GPUs or drivers that do not support a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Human-readable device name as reported by the driver
    /// (e.g. "NVIDIA GeForce RTX 4090").
    pub device_name: String,

    /// Capture time in UTC.
    pub captured_at: DateTime<Utc>,

    /// Current performance state, when known.
    pub performance_state: Option<PerformanceState>,

    /// Active performance limit flags, when known.
    pub throttle_flags: Option<ThrottleFlags>,

    /// Reason for a driver-initiated performance decrease, when known.
    pub slowdown_reason: Option<SlowdownReason>,

    /// Per-domain power usage entries (typically GPU and Board).
    pub usage: Vec<DomainUsage>,

    /// Active power target entries per performance state.
    pub targets: Vec<PowerTarget>,

    /// Power target envelope entries per performance state.
    pub limit_ranges: Vec<PowerLimitRange>,
}

impl TelemetrySample {
    /// Creates an empty sample for a device, captured now.
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            captured_at: Utc::now(),
            performance_state: None,
            throttle_flags: None,
            slowdown_reason: None,
            usage: Vec::new(),
            targets: Vec::new(),
            limit_ranges: Vec::new(),
        }
    }
}
