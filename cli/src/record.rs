//! Recorded telemetry samples: the JSON format the CLI consumes and its
//! adapter onto the engine's `TelemetrySource` boundary.
//!
//! Records carry raw driver-shaped values only (state indices, flag bits,
//! PCM entries, kHz clocks); nothing derived is stored.

use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use surge_telemetry::{
    ClockReadings, DomainUsage, PerformanceState, PowerDomain, PowerLimitRange, PowerTarget,
    SlowdownReason, TelemetrySample, TelemetrySource, ThermalReadings, ThrottleFlags,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Raw domain id (0 = GPU, 1 = Board).
    pub domain: u32,
    pub usage_pcm: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Raw performance state index (0-15, 16 = all states).
    pub state: u32,
    pub target_pcm: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimitRangeRecord {
    pub state: u32,
    pub min_pcm: u32,
    pub default_pcm: u32,
    pub max_pcm: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClockRecord {
    #[serde(default)]
    pub current_khz: Option<u32>,
    #[serde(default)]
    pub boost_khz: Option<u32>,
    #[serde(default)]
    pub base_khz: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThermalRecord {
    pub current_c: i32,
    pub throttle_c: i32,
    #[serde(default)]
    pub shutdown_c: Option<i32>,
    #[serde(default)]
    pub throttle_events: u32,
}

/// One recorded telemetry sample for one GPU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    pub device_name: String,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub performance_state: Option<u32>,
    #[serde(default)]
    pub throttle_flags: Option<u32>,
    #[serde(default)]
    pub slowdown_reason: Option<u32>,
    #[serde(default)]
    pub usage: Vec<UsageRecord>,
    #[serde(default)]
    pub targets: Vec<TargetRecord>,
    #[serde(default)]
    pub limit_ranges: Vec<LimitRangeRecord>,
    #[serde(default)]
    pub clocks: Option<ClockRecord>,
    #[serde(default)]
    pub thermals: Option<ThermalRecord>,
}

impl SampleRecord {
    /// Converts the record's raw power values into an engine sample.
    pub fn to_sample(&self) -> TelemetrySample {
        let mut sample = TelemetrySample::new(self.device_name.clone());

        if let Some(at) = self.captured_at {
            sample.captured_at = at;
        }
        sample.performance_state = self.performance_state.map(PerformanceState::from_raw);
        sample.throttle_flags = self.throttle_flags.map(ThrottleFlags::from_bits);
        sample.slowdown_reason = self.slowdown_reason.map(SlowdownReason::from_bits);

        sample.usage = self
            .usage
            .iter()
            .map(|u| DomainUsage {
                domain: PowerDomain::from_raw(u.domain),
                usage_pcm: u.usage_pcm,
            })
            .collect();

        sample.targets = self
            .targets
            .iter()
            .map(|t| PowerTarget {
                state: PerformanceState::from_raw(t.state),
                target_pcm: t.target_pcm,
            })
            .collect();

        sample.limit_ranges = self
            .limit_ranges
            .iter()
            .map(|r| PowerLimitRange {
                state: PerformanceState::from_raw(r.state),
                min_pcm: r.min_pcm,
                default_pcm: r.default_pcm,
                max_pcm: r.max_pcm,
            })
            .collect();

        sample
    }

    fn has_power_telemetry(&self) -> bool {
        !self.usage.is_empty()
            || !self.targets.is_empty()
            || !self.limit_ranges.is_empty()
            || self.throttle_flags.is_some()
    }
}

/// Serves one record through the engine's source boundary. Categories the
/// record did not capture fail, exercising the monitor's partial-refresh
/// tolerance the same way an unsupported driver capability would.
pub struct RecordSource<'a> {
    record: &'a SampleRecord,
}

impl<'a> RecordSource<'a> {
    pub fn new(record: &'a SampleRecord) -> Self {
        Self { record }
    }
}

impl TelemetrySource for RecordSource<'_> {
    fn performance_state(&mut self) -> Result<PerformanceState> {
        self.record
            .performance_state
            .map(PerformanceState::from_raw)
            .ok_or_else(|| eyre!("performance state not recorded"))
    }

    fn power_sample(&mut self) -> Result<TelemetrySample> {
        if !self.record.has_power_telemetry() {
            return Err(eyre!("power telemetry not recorded"));
        }
        Ok(self.record.to_sample())
    }

    fn clocks(&mut self) -> Result<ClockReadings> {
        let clocks = self
            .record
            .clocks
            .ok_or_else(|| eyre!("clocks not recorded"))?;
        Ok(ClockReadings {
            current_khz: clocks.current_khz,
            boost_khz: clocks.boost_khz,
            base_khz: clocks.base_khz,
        })
    }

    fn thermals(&mut self) -> Result<ThermalReadings> {
        let thermals = self
            .record
            .thermals
            .ok_or_else(|| eyre!("thermals not recorded"))?;
        Ok(ThermalReadings {
            current_c: thermals.current_c,
            throttle_c: thermals.throttle_c,
            shutdown_c: thermals.shutdown_c,
            throttle_events: thermals.throttle_events,
        })
    }
}

/// Loads records from a file, or stdin when the path is absent or "-".
/// Accepts either a single record object or an array of records.
pub fn load_records(path: Option<&Path>) -> Result<Vec<SampleRecord>> {
    let content = match path {
        Some(p) if p.as_os_str() != "-" => fs::read_to_string(p)
            .wrap_err_with(|| format!("failed to read {}", p.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .wrap_err("failed to read stdin")?;
            buf
        }
    };

    parse_records(&content)
}

fn parse_records(content: &str) -> Result<Vec<SampleRecord>> {
    let value: serde_json::Value =
        serde_json::from_str(content).wrap_err("recording is not valid JSON")?;

    if value.is_array() {
        serde_json::from_value(value).wrap_err("malformed sample records")
    } else {
        Ok(vec![
            serde_json::from_value(value).wrap_err("malformed sample record")?,
        ])
    }
}
