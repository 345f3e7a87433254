//! GPU power telemetry resolution engine for surge.
//!
//! GPU drivers report power telemetry only as a fraction of an unstated
//! reference limit (per-cent-mille, where 100000 = 100%). This crate
//! resolves those percentages into watt-denominated readings through a
//! model-name-keyed catalog of published board TDPs, decodes throttle
//! flags, and rolls resolved values up into a categorical health verdict.
//!
//! # Example
//!
//! ```
//! use surge_telemetry::{PowerSnapshot, SpecCatalog, TelemetrySample};
//!
//! let catalog = SpecCatalog::builtin();
//! let mut sample = TelemetrySample::new("NVIDIA GeForce RTX 4090");
//! sample.usage.push(surge_telemetry::DomainUsage {
//!     domain: surge_telemetry::PowerDomain::Board,
//!     usage_pcm: 50_000,
//! });
//!
//! let snapshot = PowerSnapshot::resolve(&catalog, sample);
//! assert_eq!(snapshot.board_power_draw_watts(), Some(225.0));
//! ```
//!
//! All watt values are estimates derived from vendor-published or
//! user-registered reference TDPs; nothing here measures power directly.

mod catalog;
mod error;
mod family;
mod monitor;
mod sample;
mod snapshot;
mod types;

pub use catalog::{PowerSpec, SpecCatalog};
pub use error::{Result, TelemetryError};
pub use family::GpuFamily;
pub use monitor::{
    ClockInfo, ClockReadings, GpuMonitor, PowerLimitInfo, TelemetrySource, ThermalInfo,
    ThermalReadings,
};
pub use sample::{DomainUsage, LimitRangeWatts, PowerLimitRange, PowerTarget, TelemetrySample};
pub use snapshot::PowerSnapshot;
pub use types::{
    OperatingState, PerformanceState, PowerDomain, SlowdownReason, ThrottleFlags,
};
