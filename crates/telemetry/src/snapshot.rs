//! Resolves one raw telemetry sample into watt-denominated readings.
//!
//! A [`PowerSnapshot`] binds a sample to a catalog match exactly once, at
//! construction. Everything else is read-only derivation: percent getters
//! straight off the raw entries, and watt getters that chain the matched
//! spec's TDP through the sample's power target percentages.

use chrono::{DateTime, Utc};

use crate::catalog::{PowerSpec, SpecCatalog};
use crate::error::{Result, TelemetryError};
use crate::sample::TelemetrySample;
use crate::types::{PerformanceState, PowerDomain, SlowdownReason, ThrottleFlags};

/// Selects the entry that best matches the current performance state.
///
/// Fallback order: an entry for the current state, then an entry for the
/// "All" wildcard state, then the first entry in driver order. This is the
/// only disambiguation applied when data for several states is present.
fn select_entry<'a, T>(
    entries: &'a [T],
    current_state: Option<PerformanceState>,
    state_of: impl Fn(&T) -> PerformanceState,
) -> Option<&'a T> {
    if entries.is_empty() {
        return None;
    }

    if let Some(current) = current_state {
        if let Some(entry) = entries.iter().find(|e| state_of(e) == current) {
            return Some(entry);
        }
    }

    if let Some(entry) = entries.iter().find(|e| state_of(e) == PerformanceState::All) {
        return Some(entry);
    }

    entries.first()
}

/// A resolved point-in-time view of one GPU's power telemetry.
///
/// Immutable after construction; the matched spec is fixed for the
/// snapshot's lifetime even if the catalog changes afterwards.
#[derive(Debug, Clone)]
pub struct PowerSnapshot {
    sample: TelemetrySample,
    spec: Option<PowerSpec>,
}

impl PowerSnapshot {
    /// Binds a sample to the catalog, looking up the device name once.
    pub fn resolve(catalog: &SpecCatalog, sample: TelemetrySample) -> Self {
        let spec = catalog.lookup(&sample.device_name).cloned();

        if spec.is_none() {
            tracing::debug!(
                device = %sample.device_name,
                "no power spec matched; watt readings will be unavailable"
            );
        }

        Self { sample, spec }
    }

    /// The raw sample this snapshot was resolved from.
    pub fn sample(&self) -> &TelemetrySample {
        &self.sample
    }

    pub fn device_name(&self) -> &str {
        &self.sample.device_name
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.sample.captured_at
    }

    pub fn performance_state(&self) -> Option<PerformanceState> {
        self.sample.performance_state
    }

    pub fn throttle_flags(&self) -> Option<ThrottleFlags> {
        self.sample.throttle_flags
    }

    pub fn slowdown_reason(&self) -> Option<SlowdownReason> {
        self.sample.slowdown_reason
    }

    // === Spec resolution ===

    /// Whether the device matched a spec in the catalog. When true, every
    /// watt getter returns a value (given the corresponding percentage).
    pub fn is_tdp_known(&self) -> bool {
        self.spec.is_some()
    }

    /// The spec the device name resolved to, if any.
    pub fn matched_spec(&self) -> Option<&PowerSpec> {
        self.spec.as_ref()
    }

    /// Architecture label of the matched spec (e.g. "Ada Lovelace").
    pub fn matched_architecture(&self) -> Option<&str> {
        self.spec.as_ref().map(|s| s.architecture.as_str())
    }

    /// Nameplate default TDP/TGP in watts from the matched spec.
    pub fn default_tdp_watts(&self) -> Option<f64> {
        self.spec.as_ref().map(|s| s.default_tdp_watts)
    }

    /// Maximum board power limit in watts from the matched spec.
    pub fn max_tdp_watts(&self) -> Option<f64> {
        self.spec.as_ref().map(|s| s.max_tdp_watts)
    }

    /// Minimum board power limit in watts from the matched spec.
    pub fn min_tdp_watts(&self) -> Option<f64> {
        self.spec.as_ref().map(|s| s.min_tdp_watts)
    }

    // === Percentage readings ===

    /// Usage percentage for a topology domain, from the first matching
    /// usage entry.
    pub fn domain_usage_percent(&self, domain: PowerDomain) -> Option<f32> {
        self.sample
            .usage
            .iter()
            .find(|u| u.domain == domain)
            .map(|u| u.usage_percent())
    }

    /// Board-domain power usage percentage, when reported.
    pub fn board_usage_percent(&self) -> Option<f32> {
        self.domain_usage_percent(PowerDomain::Board)
    }

    /// GPU-domain power usage percentage, when reported.
    pub fn gpu_usage_percent(&self) -> Option<f32> {
        self.domain_usage_percent(PowerDomain::Gpu)
    }

    /// Active power target percentage for the current state (with the
    /// "All"/first-entry fallback), when reported.
    pub fn active_target_percent(&self) -> Option<f32> {
        select_entry(&self.sample.targets, self.sample.performance_state, |t| {
            t.state
        })
        .map(|t| t.target_percent())
    }

    /// Default power target percentage from the limit envelope.
    pub fn default_target_percent(&self) -> Option<f32> {
        self.selected_limit_range().map(|r| r.default_percent())
    }

    /// Minimum power target percentage from the limit envelope.
    pub fn min_target_percent(&self) -> Option<f32> {
        self.selected_limit_range().map(|r| r.min_percent())
    }

    /// Maximum power target percentage from the limit envelope.
    pub fn max_target_percent(&self) -> Option<f32> {
        self.selected_limit_range().map(|r| r.max_percent())
    }

    fn selected_limit_range(&self) -> Option<&crate::sample::PowerLimitRange> {
        select_entry(
            &self.sample.limit_ranges,
            self.sample.performance_state,
            |r| r.state,
        )
    }

    // === Watt readings ===

    /// The watt ceiling the GPU is operating under right now.
    ///
    /// When the active target is known this is `default TDP * target%`,
    /// which accounts for a user-moved power limit slider. Without target
    /// telemetry the GPU is assumed to sit exactly at its nameplate TDP.
    pub fn current_power_limit_watts(&self) -> Option<f64> {
        let spec = self.spec.as_ref()?;

        match self.active_target_percent() {
            Some(pct) => Some(spec.default_tdp_watts * f64::from(pct) / 100.0),
            None => Some(spec.default_tdp_watts),
        }
    }

    /// Default power limit in watts.
    ///
    /// Falls back to the spec's default TDP when the envelope's default
    /// percentage is unavailable.
    pub fn default_power_limit_watts(&self) -> Option<f64> {
        let spec = self.spec.as_ref()?;

        match self.default_target_percent() {
            Some(pct) => Some(spec.default_tdp_watts * f64::from(pct) / 100.0),
            None => Some(spec.default_tdp_watts),
        }
    }

    /// Minimum power limit in watts.
    ///
    /// Note the fallback differs from [`Self::default_power_limit_watts`]:
    /// without envelope telemetry this uses the spec's absolute minimum
    /// board limit, not a percentage of the default TDP.
    pub fn min_power_limit_watts(&self) -> Option<f64> {
        let spec = self.spec.as_ref()?;

        match self.min_target_percent() {
            Some(pct) => Some(spec.default_tdp_watts * f64::from(pct) / 100.0),
            None => Some(spec.min_tdp_watts),
        }
    }

    /// Maximum power limit in watts, with the same absolute-value fallback
    /// as [`Self::min_power_limit_watts`].
    pub fn max_power_limit_watts(&self) -> Option<f64> {
        let spec = self.spec.as_ref()?;

        match self.max_target_percent() {
            Some(pct) => Some(spec.default_tdp_watts * f64::from(pct) / 100.0),
            None => Some(spec.max_tdp_watts),
        }
    }

    /// Estimated board power draw in watts. None when the TDP is unknown
    /// or board telemetry is unavailable.
    pub fn board_power_draw_watts(&self) -> Option<f64> {
        self.power_in_watts(self.board_usage_percent())
    }

    /// Estimated GPU-domain power draw in watts.
    pub fn gpu_power_draw_watts(&self) -> Option<f64> {
        self.power_in_watts(self.gpu_usage_percent())
    }

    /// Topology percentages are relative to the current effective power
    /// limit, so draw = effective limit * usage%.
    fn power_in_watts(&self, usage_percent: Option<f32>) -> Option<f64> {
        if self.spec.is_none() {
            return None;
        }

        let usage = usage_percent?;
        let effective_limit = self.current_power_limit_watts()?;

        Some(effective_limit * f64::from(usage) / 100.0)
    }

    // === Throttle decoding ===

    pub fn is_power_limit_active(&self) -> bool {
        self.sample
            .throttle_flags
            .is_some_and(|f| f.has_power_limit())
    }

    pub fn is_thermal_limit_active(&self) -> bool {
        self.sample
            .throttle_flags
            .is_some_and(|f| f.has_thermal_limit())
    }

    pub fn is_voltage_limit_active(&self) -> bool {
        self.sample
            .throttle_flags
            .is_some_and(|f| f.has_voltage_limit())
    }

    pub fn is_no_load_limit_active(&self) -> bool {
        self.sample
            .throttle_flags
            .is_some_and(|f| f.has_no_load_limit())
    }

    /// Human-readable throttle summary.
    ///
    /// Reasons are reported in a fixed order (Power, Thermal, Voltage,
    /// No Load). Nonzero flags with none of the named bits set fall back
    /// to the raw bit representation.
    pub fn throttle_status(&self) -> String {
        let flags = match self.sample.throttle_flags {
            Some(flags) if !flags.is_empty() => flags,
            _ => return "No Throttling".to_string(),
        };

        let mut reasons = Vec::new();
        if self.is_power_limit_active() {
            reasons.push("Power");
        }
        if self.is_thermal_limit_active() {
            reasons.push("Thermal");
        }
        if self.is_voltage_limit_active() {
            reasons.push("Voltage");
        }
        if self.is_no_load_limit_active() {
            reasons.push("No Load");
        }

        if reasons.is_empty() {
            format!("Throttled: {flags}")
        } else {
            format!("Throttled: {}", reasons.join(" + "))
        }
    }

    // === Manual estimation ===

    /// Estimates board power draw against a caller-supplied reference
    /// limit, for devices the catalog does not know.
    ///
    /// Returns `Ok(None)` when board telemetry is absent; fails with
    /// `OutOfRange` when the reference is not positive.
    pub fn estimate_board_power_watts(&self, reference_limit_watts: f64) -> Result<Option<f64>> {
        Self::estimate_in_watts(self.board_usage_percent(), reference_limit_watts)
    }

    /// Estimates GPU-domain power draw against a caller-supplied reference
    /// limit.
    pub fn estimate_gpu_power_watts(&self, reference_limit_watts: f64) -> Result<Option<f64>> {
        Self::estimate_in_watts(self.gpu_usage_percent(), reference_limit_watts)
    }

    fn estimate_in_watts(
        usage_percent: Option<f32>,
        reference_limit_watts: f64,
    ) -> Result<Option<f64>> {
        if reference_limit_watts <= 0.0 {
            return Err(TelemetryError::OutOfRange(format!(
                "reference limit must be positive, got {reference_limit_watts}"
            )));
        }

        Ok(usage_percent.map(|pct| reference_limit_watts * f64::from(pct) / 100.0))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sample::{DomainUsage, PowerLimitRange, PowerTarget};

    fn catalog_with(pattern: &str, default_tdp: f64, max_tdp: f64, min_tdp: f64) -> SpecCatalog {
        let mut catalog = SpecCatalog::empty();
        catalog
            .register(pattern, default_tdp, max_tdp, min_tdp, "Test")
            .unwrap();
        catalog
    }

    fn board_usage(pcm: u32) -> DomainUsage {
        DomainUsage {
            domain: PowerDomain::Board,
            usage_pcm: pcm,
        }
    }

    #[test]
    fn resolves_spec_once_at_construction() {
        let mut catalog = catalog_with("RTX 4090", 450.0, 660.0, 300.0);
        let sample = TelemetrySample::new("NVIDIA GeForce RTX 4090");
        let snapshot = PowerSnapshot::resolve(&catalog, sample);

        // Later registrations must not affect an existing snapshot.
        catalog
            .register("RTX 4090", 999.0, 999.0, 999.0, "Later")
            .unwrap();

        assert!(snapshot.is_tdp_known());
        assert_eq!(snapshot.default_tdp_watts(), Some(450.0));
        assert_eq!(snapshot.matched_architecture(), Some("Test"));
    }

    #[test]
    fn unknown_device_has_no_watt_readings() {
        let catalog = SpecCatalog::builtin();
        let mut sample = TelemetrySample::new("Some Unknown Card");
        sample.usage.push(board_usage(50_000));

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert!(!snapshot.is_tdp_known());
        assert_eq!(snapshot.board_usage_percent(), Some(50.0));
        assert!(snapshot.board_power_draw_watts().is_none());
        assert!(snapshot.current_power_limit_watts().is_none());
        assert!(snapshot.default_power_limit_watts().is_none());
    }

    #[test]
    fn board_draw_without_active_target_assumes_nameplate_tdp() {
        let catalog = catalog_with("TestCard", 300.0, 360.0, 200.0);
        let mut sample = TelemetrySample::new("TestCard");
        sample.usage.push(board_usage(50_000));

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert_eq!(snapshot.current_power_limit_watts(), Some(300.0));
        assert_eq!(snapshot.board_power_draw_watts(), Some(150.0));
    }

    #[test]
    fn board_draw_scales_with_raised_active_target() {
        let catalog = catalog_with("TestCard", 300.0, 360.0, 200.0);
        let mut sample = TelemetrySample::new("TestCard");
        sample.usage.push(board_usage(50_000));
        sample.targets.push(PowerTarget {
            state: PerformanceState::All,
            target_pcm: 110_000,
        });

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert_eq!(snapshot.active_target_percent(), Some(110.0));
        assert_eq!(snapshot.current_power_limit_watts(), Some(330.0));
        assert_eq!(snapshot.board_power_draw_watts(), Some(165.0));
    }

    #[test]
    fn select_entry_prefers_current_state_over_all() {
        let catalog = catalog_with("TestCard", 300.0, 360.0, 200.0);
        let mut sample = TelemetrySample::new("TestCard");
        sample.performance_state = Some(PerformanceState::P0);
        sample.targets.push(PowerTarget {
            state: PerformanceState::All,
            target_pcm: 100_000,
        });
        sample.targets.push(PowerTarget {
            state: PerformanceState::P0,
            target_pcm: 116_000,
        });

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert_eq!(snapshot.active_target_percent(), Some(116.0));
    }

    #[test]
    fn select_entry_falls_back_to_all_wildcard() {
        let catalog = catalog_with("TestCard", 300.0, 360.0, 200.0);
        let mut sample = TelemetrySample::new("TestCard");
        sample.performance_state = Some(PerformanceState::P0);
        // No entry for P0; the wildcard entry must win over plain first-entry
        // order even though another state's entry sits at index 0.
        sample.targets.push(PowerTarget {
            state: PerformanceState::P5,
            target_pcm: 50_000,
        });
        sample.targets.push(PowerTarget {
            state: PerformanceState::All,
            target_pcm: 105_000,
        });

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert_eq!(snapshot.active_target_percent(), Some(105.0));
    }

    #[test]
    fn select_entry_last_resort_is_first_entry() {
        let catalog = catalog_with("TestCard", 300.0, 360.0, 200.0);
        let mut sample = TelemetrySample::new("TestCard");
        sample.performance_state = Some(PerformanceState::P0);
        sample.targets.push(PowerTarget {
            state: PerformanceState::P5,
            target_pcm: 90_000,
        });
        sample.targets.push(PowerTarget {
            state: PerformanceState::P8,
            target_pcm: 80_000,
        });

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert_eq!(snapshot.active_target_percent(), Some(90.0));
    }

    #[test]
    fn default_limit_falls_back_to_tdp_but_min_max_use_spec_bounds() {
        let catalog = catalog_with("TestCard", 300.0, 360.0, 200.0);
        let sample = TelemetrySample::new("TestCard");

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        // No envelope telemetry at all: default is percent-term fallback,
        // min/max use the spec's absolute board limits.
        assert_eq!(snapshot.default_power_limit_watts(), Some(300.0));
        assert_eq!(snapshot.min_power_limit_watts(), Some(200.0));
        assert_eq!(snapshot.max_power_limit_watts(), Some(360.0));
    }

    #[test]
    fn limit_envelope_overrides_spec_bounds() {
        let catalog = catalog_with("TestCard", 300.0, 360.0, 200.0);
        let mut sample = TelemetrySample::new("TestCard");
        sample.limit_ranges.push(PowerLimitRange {
            state: PerformanceState::All,
            min_pcm: 70_000,
            default_pcm: 100_000,
            max_pcm: 116_000,
        });

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert_eq!(snapshot.min_power_limit_watts(), Some(210.0));
        assert_eq!(snapshot.default_power_limit_watts(), Some(300.0));
        assert_eq!(snapshot.max_power_limit_watts(), Some(348.0));
    }

    #[test]
    fn throttle_status_reports_reasons_in_fixed_order() {
        let catalog = SpecCatalog::builtin();
        let mut sample = TelemetrySample::new("NVIDIA GeForce RTX 4090");
        sample.throttle_flags = Some(ThrottleFlags::POWER.union(ThrottleFlags::THERMAL));

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert!(snapshot.is_power_limit_active());
        assert!(snapshot.is_thermal_limit_active());
        assert_eq!(snapshot.throttle_status(), "Throttled: Power + Thermal");
    }

    #[test]
    fn throttle_status_without_flags_is_no_throttling() {
        let catalog = SpecCatalog::builtin();

        let sample = TelemetrySample::new("NVIDIA GeForce RTX 4090");
        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert_eq!(snapshot.throttle_status(), "No Throttling");

        let mut sample = TelemetrySample::new("NVIDIA GeForce RTX 4090");
        sample.throttle_flags = Some(ThrottleFlags::NONE);
        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert_eq!(snapshot.throttle_status(), "No Throttling");
    }

    #[test]
    fn throttle_status_falls_back_to_raw_bits_for_unknown_flags() {
        let catalog = SpecCatalog::builtin();
        let mut sample = TelemetrySample::new("NVIDIA GeForce RTX 4090");
        sample.throttle_flags = Some(ThrottleFlags::from_bits(0x40));

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert_eq!(snapshot.throttle_status(), "Throttled: 0x40");
    }

    #[test]
    fn manual_estimation_works_without_catalog_match() {
        let catalog = SpecCatalog::empty();
        let mut sample = TelemetrySample::new("Some Unknown Card");
        sample.usage.push(board_usage(80_000));

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        assert!(!snapshot.is_tdp_known());
        assert_eq!(
            snapshot.estimate_board_power_watts(250.0).unwrap(),
            Some(200.0)
        );
        // Absent telemetry is None, not an error.
        assert_eq!(snapshot.estimate_gpu_power_watts(250.0).unwrap(), None);
    }

    #[test]
    fn manual_estimation_rejects_non_positive_reference() {
        let catalog = SpecCatalog::empty();
        let snapshot = PowerSnapshot::resolve(&catalog, TelemetrySample::new("Card"));
        assert!(matches!(
            snapshot.estimate_board_power_watts(0.0),
            Err(TelemetryError::OutOfRange(_))
        ));
    }
}
