//! GPU health monitor: rolls resolved power telemetry, clock frequencies,
//! and thermal sensor readings into an overall health verdict.

use color_eyre::eyre::Result;
use tracing::debug;

use crate::catalog::SpecCatalog;
use crate::sample::TelemetrySample;
use crate::snapshot::PowerSnapshot;
use crate::types::{OperatingState, PerformanceState};

/// Raw graphics clock readings, in kHz as reported by the driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockReadings {
    /// Current graphics clock.
    pub current_khz: Option<u32>,
    /// Maximum boost clock (hardware limit).
    pub boost_khz: Option<u32>,
    /// Base clock (firmware default).
    pub base_khz: Option<u32>,
}

/// Raw thermal sensor readings for the GPU core sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThermalReadings {
    /// Current temperature in Celsius.
    pub current_c: i32,
    /// Temperature at which thermal throttling activates.
    pub throttle_c: i32,
    /// Shutdown temperature, when the driver reports one separately.
    pub shutdown_c: Option<i32>,
    /// Thermal slowdown events since last reset.
    pub throttle_events: u32,
}

/// The boundary to the driver access layer.
///
/// Each method covers one independently refreshable telemetry category;
/// a failure means the capability is unsupported or the query failed, and
/// is absorbed by [`GpuMonitor::refresh`] without affecting the others.
pub trait TelemetrySource {
    /// Current raw performance state.
    fn performance_state(&mut self) -> Result<PerformanceState>;

    /// Raw power telemetry bundle for the device.
    fn power_sample(&mut self) -> Result<TelemetrySample>;

    /// Graphics clock frequencies.
    fn clocks(&mut self) -> Result<ClockReadings>;

    /// GPU core thermal sensor readings.
    fn thermals(&mut self) -> Result<ThermalReadings>;
}

/// Boost clock state, refreshed from the clock and power categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockInfo {
    /// Current graphics clock in MHz.
    pub current_mhz: u32,
    /// Maximum boost clock in MHz.
    pub max_mhz: u32,
    /// Base clock in MHz.
    pub base_mhz: u32,
    /// Offset of the current clock over the base clock in MHz.
    pub offset_mhz: i32,
    /// Boost is held back by a temperature limit.
    pub throttled_by_temperature: bool,
    /// Boost is held back by the power limit.
    pub throttled_by_power: bool,
}

/// Power limit state, refreshed from the resolved power snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerLimitInfo {
    /// Estimated current board draw in watts, when resolvable.
    pub current_watts: Option<f64>,
    /// Default board TDP in watts, when the device is in the catalog.
    pub default_tdp_watts: Option<f64>,
    /// Currently active power limit in watts (accounts for the slider).
    pub active_limit_watts: Option<f64>,
    /// Board power usage as a percentage of the current limit.
    pub utilization_percent: f64,
    /// The power limit is currently being hit.
    pub exceeding_limit: bool,
    /// The device matched the spec catalog.
    pub tdp_known: bool,
}

/// Thermal state, refreshed from the thermal sensor category.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThermalInfo {
    /// Current temperature in Celsius.
    pub current_c: i32,
    /// Throttle activation temperature in Celsius.
    pub throttle_c: i32,
    /// Shutdown temperature in Celsius (estimated as throttle + 10 when
    /// the driver does not report it separately).
    pub shutdown_c: i32,
    /// Thermal throttling is currently active.
    pub throttling_active: bool,
    /// Remaining margin to shutdown, as a percentage of the
    /// throttle-to-shutdown span (0-100).
    pub headroom_percent: f64,
    /// Thermal slowdown events since last reset.
    pub throttle_events: u32,
}

/// Remaining thermal margin before shutdown, as a percentage of the
/// throttle-to-shutdown span. A non-positive span (misconfigured or
/// missing sensor limits) yields zero headroom rather than dividing by it.
fn thermal_headroom_percent(current_c: i32, throttle_c: i32, shutdown_c: i32) -> f64 {
    let span = shutdown_c - throttle_c;
    if span <= 0 {
        return 0.0;
    }

    let remaining = shutdown_c - current_c;
    if remaining <= 0 {
        return 0.0;
    }

    (100.0 * f64::from(remaining) / f64::from(span)).min(100.0)
}

/// Rolling GPU state: operating mode, clock, power, and thermal details.
///
/// Owned by the caller and updated in place through [`Self::refresh`].
/// Fields hold their unknown/zero defaults until the first successful
/// refresh of their category.
#[derive(Debug, Clone, Default)]
pub struct GpuMonitor {
    /// Coarse operating state mapped from the driver's performance state.
    pub operating_state: OperatingState,
    /// Boost clock details.
    pub clock: ClockInfo,
    /// Power limit details.
    pub power: PowerLimitInfo,
    /// Thermal details.
    pub thermal: ThermalInfo,
}

impl GpuMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes all four telemetry categories from the source.
    ///
    /// Each category is attempted independently; failures are expected on
    /// GPUs or drivers without the capability and are logged and absorbed,
    /// leaving that category's fields stale. Returns true when at least
    /// one category refreshed successfully.
    pub fn refresh(&mut self, catalog: &SpecCatalog, source: &mut dyn TelemetrySource) -> bool {
        let mut any_success = false;

        match source.performance_state() {
            Ok(state) => {
                self.operating_state = OperatingState::from_performance_state(state);
                any_success = true;
            }
            Err(e) => debug!("performance state refresh failed: {e:#}"),
        }

        match source.power_sample() {
            Ok(sample) => {
                let snapshot = PowerSnapshot::resolve(catalog, sample);
                self.apply_power(&snapshot);
                any_success = true;
            }
            Err(e) => debug!("power telemetry refresh failed: {e:#}"),
        }

        match source.clocks() {
            Ok(readings) => any_success |= self.apply_clocks(readings),
            Err(e) => debug!("clock refresh failed: {e:#}"),
        }

        match source.thermals() {
            Ok(readings) => {
                self.apply_thermals(readings);
                any_success = true;
            }
            Err(e) => debug!("thermal refresh failed: {e:#}"),
        }

        any_success
    }

    fn apply_power(&mut self, snapshot: &PowerSnapshot) {
        self.power.utilization_percent = snapshot
            .board_usage_percent()
            .map(f64::from)
            .unwrap_or(0.0);
        self.power.tdp_known = snapshot.is_tdp_known();
        self.power.exceeding_limit = snapshot.is_power_limit_active();
        self.power.default_tdp_watts = snapshot.default_tdp_watts();
        self.power.current_watts = snapshot.board_power_draw_watts();
        self.power.active_limit_watts = snapshot.current_power_limit_watts();

        self.clock.throttled_by_power = snapshot.is_power_limit_active();
        self.clock.throttled_by_temperature = snapshot.is_thermal_limit_active();
    }

    fn apply_clocks(&mut self, readings: ClockReadings) -> bool {
        let mut current_present = false;

        if let Some(khz) = readings.current_khz {
            self.clock.current_mhz = khz / 1000;
            current_present = true;
        }
        if let Some(khz) = readings.boost_khz {
            self.clock.max_mhz = khz / 1000;
        }
        if let Some(khz) = readings.base_khz {
            self.clock.base_mhz = khz / 1000;
        }

        self.clock.offset_mhz = self.clock.current_mhz as i32 - self.clock.base_mhz as i32;

        current_present
    }

    fn apply_thermals(&mut self, readings: ThermalReadings) {
        let shutdown_c = readings.shutdown_c.unwrap_or(readings.throttle_c + 10);

        self.thermal.current_c = readings.current_c;
        self.thermal.throttle_c = readings.throttle_c;
        self.thermal.shutdown_c = shutdown_c;
        self.thermal.throttling_active = readings.current_c >= readings.throttle_c;
        self.thermal.headroom_percent =
            thermal_headroom_percent(readings.current_c, readings.throttle_c, shutdown_c);
        self.thermal.throttle_events = readings.throttle_events;
    }

    /// Whether the GPU is currently in any throttled state.
    pub fn is_throttled(&self) -> bool {
        self.clock.throttled_by_temperature
            || self.clock.throttled_by_power
            || self.thermal.throttling_active
            || self.operating_state == OperatingState::Throttled
    }

    /// Human-readable operating mode.
    pub fn operating_mode(&self) -> &'static str {
        self.operating_state.label()
    }

    /// Categorical health verdict; first matching rule wins.
    pub fn health_status(&self) -> &'static str {
        if self.is_throttled() && self.power.exceeding_limit && self.thermal.throttling_active {
            return "CRITICAL: Thermal AND Power Throttling";
        }

        if self.is_throttled() && self.power.exceeding_limit {
            return "WARNING: Power Throttling Active";
        }

        if self.is_throttled() && self.thermal.throttling_active {
            return "WARNING: Thermal Throttling Active";
        }

        if self.is_throttled() {
            return "CAUTION: Performance Throttled";
        }

        if self.power.utilization_percent > 90.0 {
            return "CAUTION: High Power Utilization (>90%)";
        }

        if self.thermal.headroom_percent < 10.0 {
            return "CAUTION: Low Thermal Headroom (<10%)";
        }

        "HEALTHY"
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::eyre::eyre;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sample::DomainUsage;
    use crate::types::{PowerDomain, ThrottleFlags};

    /// Scripted source where each category either returns a canned value
    /// or fails.
    #[derive(Default)]
    struct FakeSource {
        state: Option<PerformanceState>,
        sample: Option<TelemetrySample>,
        clocks: Option<ClockReadings>,
        thermals: Option<ThermalReadings>,
    }

    impl TelemetrySource for FakeSource {
        fn performance_state(&mut self) -> Result<PerformanceState> {
            self.state.ok_or_else(|| eyre!("pstate unsupported"))
        }

        fn power_sample(&mut self) -> Result<TelemetrySample> {
            self.sample.clone().ok_or_else(|| eyre!("power unsupported"))
        }

        fn clocks(&mut self) -> Result<ClockReadings> {
            self.clocks.ok_or_else(|| eyre!("clocks unsupported"))
        }

        fn thermals(&mut self) -> Result<ThermalReadings> {
            self.thermals.ok_or_else(|| eyre!("thermals unsupported"))
        }
    }

    fn rtx4090_sample(usage_pcm: u32, flags: ThrottleFlags) -> TelemetrySample {
        let mut sample = TelemetrySample::new("NVIDIA GeForce RTX 4090");
        sample.usage.push(DomainUsage {
            domain: PowerDomain::Board,
            usage_pcm,
        });
        sample.throttle_flags = Some(flags);
        sample
    }

    #[test]
    fn refresh_succeeds_when_any_category_succeeds() {
        let catalog = SpecCatalog::builtin();
        let mut monitor = GpuMonitor::new();
        let mut source = FakeSource {
            thermals: Some(ThermalReadings {
                current_c: 60,
                throttle_c: 83,
                shutdown_c: None,
                throttle_events: 0,
            }),
            ..FakeSource::default()
        };

        assert!(monitor.refresh(&catalog, &mut source));
        assert_eq!(monitor.thermal.current_c, 60);
        // Estimated shutdown is throttle + 10.
        assert_eq!(monitor.thermal.shutdown_c, 93);
        // Failed categories keep their defaults.
        assert_eq!(monitor.operating_state, OperatingState::Unknown);
        assert_eq!(monitor.clock.current_mhz, 0);
        assert!(!monitor.power.tdp_known);
    }

    #[test]
    fn refresh_fails_only_when_every_category_fails() {
        let catalog = SpecCatalog::builtin();
        let mut monitor = GpuMonitor::new();
        let mut source = FakeSource::default();

        assert!(!monitor.refresh(&catalog, &mut source));
        assert_eq!(monitor.health_status(), "CAUTION: Low Thermal Headroom (<10%)");
    }

    #[test]
    fn refresh_populates_power_fields_from_snapshot() {
        let catalog = SpecCatalog::builtin();
        let mut monitor = GpuMonitor::new();
        let mut source = FakeSource {
            state: Some(PerformanceState::P0),
            sample: Some(rtx4090_sample(50_000, ThrottleFlags::NONE)),
            clocks: Some(ClockReadings {
                current_khz: Some(2_520_000),
                boost_khz: Some(2_800_000),
                base_khz: Some(2_235_000),
            }),
            thermals: Some(ThermalReadings {
                current_c: 65,
                throttle_c: 83,
                shutdown_c: Some(95),
                throttle_events: 2,
            }),
        };

        assert!(monitor.refresh(&catalog, &mut source));
        assert_eq!(monitor.operating_state, OperatingState::P0);
        assert!(monitor.power.tdp_known);
        assert_eq!(monitor.power.default_tdp_watts, Some(450.0));
        assert_eq!(monitor.power.active_limit_watts, Some(450.0));
        assert_eq!(monitor.power.current_watts, Some(225.0));
        assert_eq!(monitor.power.utilization_percent, 50.0);
        assert_eq!(monitor.clock.current_mhz, 2520);
        assert_eq!(monitor.clock.offset_mhz, 285);
        assert_eq!(monitor.thermal.throttle_events, 2);
        assert!(!monitor.is_throttled());
        assert_eq!(monitor.health_status(), "HEALTHY");
    }

    #[test]
    fn clock_refresh_counts_only_when_current_clock_present() {
        let catalog = SpecCatalog::builtin();
        let mut monitor = GpuMonitor::new();
        let mut source = FakeSource {
            clocks: Some(ClockReadings {
                current_khz: None,
                boost_khz: Some(2_800_000),
                base_khz: None,
            }),
            ..FakeSource::default()
        };

        assert!(!monitor.refresh(&catalog, &mut source));
        assert_eq!(monitor.clock.max_mhz, 2800);
    }

    #[test]
    fn headroom_guard_handles_zero_span() {
        assert_eq!(thermal_headroom_percent(70, 85, 85), 0.0);
        assert_eq!(thermal_headroom_percent(70, 90, 85), 0.0);
    }

    #[test]
    fn headroom_is_clamped_and_zero_at_shutdown() {
        assert_eq!(thermal_headroom_percent(95, 83, 93), 0.0);
        assert_eq!(thermal_headroom_percent(20, 83, 93), 100.0);
        assert_eq!(thermal_headroom_percent(88, 83, 93), 50.0);
    }

    #[test]
    fn health_critical_outranks_lower_priority_cautions() {
        let catalog = SpecCatalog::builtin();
        let mut monitor = GpuMonitor::new();
        let mut source = FakeSource {
            // Power limit AND thermal limit active, 95% utilization.
            sample: Some(rtx4090_sample(
                95_000,
                ThrottleFlags::POWER.union(ThrottleFlags::THERMAL),
            )),
            // At the throttle temperature with almost no headroom.
            thermals: Some(ThermalReadings {
                current_c: 92,
                throttle_c: 83,
                shutdown_c: Some(93),
                throttle_events: 10,
            }),
            ..FakeSource::default()
        };

        assert!(monitor.refresh(&catalog, &mut source));
        assert!(monitor.is_throttled());
        assert!(monitor.power.exceeding_limit);
        assert!(monitor.thermal.throttling_active);
        assert_eq!(
            monitor.health_status(),
            "CRITICAL: Thermal AND Power Throttling"
        );
    }

    #[test]
    fn health_warning_power_only() {
        let catalog = SpecCatalog::builtin();
        let mut monitor = GpuMonitor::new();
        let mut source = FakeSource {
            sample: Some(rtx4090_sample(99_000, ThrottleFlags::POWER)),
            thermals: Some(ThermalReadings {
                current_c: 60,
                throttle_c: 83,
                shutdown_c: Some(93),
                throttle_events: 0,
            }),
            ..FakeSource::default()
        };

        assert!(monitor.refresh(&catalog, &mut source));
        assert_eq!(monitor.health_status(), "WARNING: Power Throttling Active");
    }

    #[test]
    fn health_warning_thermal_only() {
        let catalog = SpecCatalog::builtin();
        let mut monitor = GpuMonitor::new();
        let mut source = FakeSource {
            sample: Some(rtx4090_sample(40_000, ThrottleFlags::NONE)),
            thermals: Some(ThermalReadings {
                current_c: 84,
                throttle_c: 83,
                shutdown_c: Some(93),
                throttle_events: 1,
            }),
            ..FakeSource::default()
        };

        assert!(monitor.refresh(&catalog, &mut source));
        assert_eq!(monitor.health_status(), "WARNING: Thermal Throttling Active");
    }

    #[test]
    fn health_caution_on_high_utilization_without_throttle() {
        let catalog = SpecCatalog::builtin();
        let mut monitor = GpuMonitor::new();
        let mut source = FakeSource {
            sample: Some(rtx4090_sample(92_000, ThrottleFlags::NONE)),
            thermals: Some(ThermalReadings {
                current_c: 50,
                throttle_c: 83,
                shutdown_c: Some(93),
                throttle_events: 0,
            }),
            ..FakeSource::default()
        };

        assert!(monitor.refresh(&catalog, &mut source));
        assert!(!monitor.is_throttled());
        assert_eq!(
            monitor.health_status(),
            "CAUTION: High Power Utilization (>90%)"
        );
    }
}
