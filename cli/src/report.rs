//! Plain-text rendering of resolved telemetry.

use surge_telemetry::{GpuMonitor, PowerSnapshot, PowerSpec};

fn watts(value: Option<f64>) -> String {
    match value {
        Some(w) => format!("{w:.1} W"),
        None => "unknown".to_string(),
    }
}

fn percent(value: Option<f32>) -> String {
    match value {
        Some(p) => format!("{p:.1}%"),
        None => "unknown".to_string(),
    }
}

/// Full report for one sample: resolution result, power readings, clocks,
/// thermals, and the health verdict.
pub fn print_report(snapshot: &PowerSnapshot, monitor: &GpuMonitor) {
    println!("{}", snapshot.device_name());
    println!(
        "  captured:        {}",
        snapshot.captured_at().format("%Y-%m-%d %H:%M:%S UTC")
    );

    match snapshot.matched_spec() {
        Some(spec) => println!(
            "  matched spec:    {} ({}, {:.0} W default, {:.0}-{:.0} W range)",
            spec.name_pattern,
            spec.architecture,
            spec.default_tdp_watts,
            spec.min_tdp_watts,
            spec.max_tdp_watts
        ),
        None => println!("  matched spec:    none (watt readings unavailable)"),
    }

    println!("  operating mode:  {}", monitor.operating_mode());
    println!();
    println!("  Power");
    println!(
        "    board usage:   {}",
        percent(snapshot.board_usage_percent())
    );
    println!(
        "    gpu usage:     {}",
        percent(snapshot.gpu_usage_percent())
    );
    println!(
        "    board draw:    {}",
        watts(snapshot.board_power_draw_watts())
    );
    println!(
        "    active limit:  {}{}",
        watts(snapshot.current_power_limit_watts()),
        match snapshot.active_target_percent() {
            Some(pct) => format!(" ({pct:.1}% target)"),
            None => String::new(),
        }
    );
    println!(
        "    limit range:   {} / {} / {}",
        watts(snapshot.min_power_limit_watts()),
        watts(snapshot.default_power_limit_watts()),
        watts(snapshot.max_power_limit_watts())
    );
    println!("    throttle:      {}", snapshot.throttle_status());
    if let Some(reason) = snapshot.slowdown_reason() {
        if !reason.is_empty() {
            println!("    slowdown:      {}", reason.label());
        }
    }

    if monitor.clock.current_mhz > 0 {
        println!();
        println!("  Clocks");
        println!(
            "    graphics:      {} MHz (base {} MHz, boost {} MHz)",
            monitor.clock.current_mhz, monitor.clock.base_mhz, monitor.clock.max_mhz
        );
        println!("    offset:        {:+} MHz", monitor.clock.offset_mhz);
    }

    if monitor.thermal.throttle_c > 0 {
        println!();
        println!("  Thermals");
        println!(
            "    temperature:   {}°C (throttle {}°C, shutdown {}°C)",
            monitor.thermal.current_c, monitor.thermal.throttle_c, monitor.thermal.shutdown_c
        );
        println!(
            "    headroom:      {:.1}%",
            monitor.thermal.headroom_percent
        );
        if monitor.thermal.throttle_events > 0 {
            println!(
                "    slowdowns:     {} since reset",
                monitor.thermal.throttle_events
            );
        }
    }

    println!();
    println!("  Health: {}", monitor.health_status());
}

/// One-line summary used by the watch loop.
pub fn compact_line(snapshot: &PowerSnapshot, monitor: &GpuMonitor) -> String {
    let draw = match snapshot.board_power_draw_watts() {
        Some(w) => format!("{w:.0}W"),
        None => "--W".to_string(),
    };
    let limit = match snapshot.current_power_limit_watts() {
        Some(w) => format!("{w:.0}W"),
        None => "--W".to_string(),
    };
    let usage = match snapshot.board_usage_percent() {
        Some(p) => format!("{p:.0}%"),
        None => "--%".to_string(),
    };

    format!(
        "{} {} {draw}/{limit} ({usage}) {}MHz {}°C {}",
        snapshot.captured_at().format("%H:%M:%S"),
        snapshot.device_name(),
        monitor.clock.current_mhz,
        monitor.thermal.current_c,
        monitor.health_status()
    )
}

/// One line of the spec listing.
pub fn spec_line(spec: &PowerSpec) -> String {
    format!(
        "{:<40} {:>6.0} W  ({:.0}-{:.0} W)  {}",
        spec.name_pattern,
        spec.default_tdp_watts,
        spec.min_tdp_watts,
        spec.max_tdp_watts,
        spec.architecture
    )
}

#[cfg(test)]
mod tests {
    use surge_telemetry::{DomainUsage, PowerDomain, SpecCatalog, TelemetrySample};

    use super::*;

    #[test]
    fn compact_line_shows_placeholders_for_unknown_devices() {
        let catalog = SpecCatalog::empty();
        let mut sample = TelemetrySample::new("Mystery Card");
        sample.usage.push(DomainUsage {
            domain: PowerDomain::Board,
            usage_pcm: 42_000,
        });

        let snapshot = PowerSnapshot::resolve(&catalog, sample);
        let monitor = GpuMonitor::new();
        let line = compact_line(&snapshot, &monitor);

        assert!(line.contains("Mystery Card"));
        assert!(line.contains("--W/--W (42%)"));
    }

    #[test]
    fn spec_line_includes_range_and_architecture() {
        let catalog = SpecCatalog::builtin();
        let spec = catalog.lookup("NVIDIA GeForce RTX 4090").unwrap();
        let line = spec_line(spec);

        assert!(line.contains("450 W"));
        assert!(line.contains("Ada Lovelace"));
    }
}
