//! Power specification catalog.
//!
//! Driver power telemetry is percentage-only: usage is reported relative to
//! a board power limit the driver never states in watts. The catalog maps
//! free-text device names to published board TDP/TGP figures so percentages
//! can be resolved into watt estimates.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};

/// Published power specification for a GPU model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSpec {
    /// Case-insensitive substring matched against the driver device name.
    pub name_pattern: String,
    /// Default board TDP/TGP in watts.
    pub default_tdp_watts: f64,
    /// Maximum board power limit in watts (power slider fully raised).
    pub max_tdp_watts: f64,
    /// Minimum board power limit in watts (power slider fully lowered).
    pub min_tdp_watts: f64,
    /// Architecture generation label (e.g. "Ada Lovelace").
    pub architecture: String,
}

fn spec(pattern: &str, default_tdp: f64, max_tdp: f64, min_tdp: f64, arch: &str) -> PowerSpec {
    PowerSpec {
        name_pattern: pattern.to_string(),
        default_tdp_watts: default_tdp,
        max_tdp_watts: max_tdp,
        min_tdp_watts: min_tdp,
        architecture: arch.to_string(),
    }
}

fn builtin_specs() -> Vec<PowerSpec> {
    vec![
        // RTX 50 series (Blackwell), desktop
        spec("RTX 5090", 575.0, 660.0, 400.0, "Blackwell"),
        spec("RTX 5080", 360.0, 410.0, 250.0, "Blackwell"),
        spec("RTX 5070 Ti", 300.0, 350.0, 200.0, "Blackwell"),
        spec("RTX 5070", 250.0, 300.0, 175.0, "Blackwell"),
        spec("RTX 5060 Ti", 180.0, 210.0, 120.0, "Blackwell"),
        spec("RTX 5060", 150.0, 175.0, 100.0, "Blackwell"),
        // RTX 50 series (Blackwell), laptop
        spec("RTX 5090 Laptop", 150.0, 175.0, 80.0, "Blackwell"),
        spec("RTX 5080 Laptop", 150.0, 175.0, 80.0, "Blackwell"),
        spec("RTX 5070 Ti Laptop", 120.0, 140.0, 60.0, "Blackwell"),
        spec("RTX 5070 Laptop", 115.0, 135.0, 60.0, "Blackwell"),
        spec("RTX 5060 Laptop", 100.0, 115.0, 50.0, "Blackwell"),
        // RTX 40 series (Ada Lovelace), desktop
        spec("RTX 4090", 450.0, 660.0, 300.0, "Ada Lovelace"),
        spec("RTX 4090 D", 425.0, 550.0, 300.0, "Ada Lovelace"),
        spec("RTX 4080 SUPER", 320.0, 380.0, 220.0, "Ada Lovelace"),
        spec("RTX 4080", 320.0, 380.0, 220.0, "Ada Lovelace"),
        spec("RTX 4070 Ti SUPER", 285.0, 330.0, 200.0, "Ada Lovelace"),
        spec("RTX 4070 Ti", 285.0, 330.0, 200.0, "Ada Lovelace"),
        spec("RTX 4070 SUPER", 220.0, 260.0, 150.0, "Ada Lovelace"),
        spec("RTX 4070", 200.0, 240.0, 140.0, "Ada Lovelace"),
        spec("RTX 4060 Ti 16GB", 165.0, 195.0, 115.0, "Ada Lovelace"),
        spec("RTX 4060 Ti", 160.0, 190.0, 115.0, "Ada Lovelace"),
        spec("RTX 4060", 115.0, 140.0, 80.0, "Ada Lovelace"),
        // RTX 40 series (Ada Lovelace), laptop
        spec("RTX 4090 Laptop", 150.0, 175.0, 80.0, "Ada Lovelace"),
        spec("RTX 4080 Laptop", 150.0, 175.0, 80.0, "Ada Lovelace"),
        spec("RTX 4070 Laptop", 115.0, 140.0, 60.0, "Ada Lovelace"),
        spec("RTX 4060 Laptop", 115.0, 140.0, 35.0, "Ada Lovelace"),
        spec("RTX 4050 Laptop", 115.0, 140.0, 35.0, "Ada Lovelace"),
        // RTX 30 series (Ampere), desktop
        spec("RTX 3090 Ti", 450.0, 516.0, 350.0, "Ampere"),
        spec("RTX 3090", 350.0, 400.0, 280.0, "Ampere"),
        spec("RTX 3080 Ti", 350.0, 400.0, 280.0, "Ampere"),
        spec("RTX 3080 12GB", 350.0, 400.0, 280.0, "Ampere"),
        spec("RTX 3080", 320.0, 370.0, 250.0, "Ampere"),
        spec("RTX 3070 Ti", 290.0, 335.0, 220.0, "Ampere"),
        spec("RTX 3070", 220.0, 260.0, 170.0, "Ampere"),
        spec("RTX 3060 Ti", 200.0, 240.0, 150.0, "Ampere"),
        spec("RTX 3060", 170.0, 200.0, 120.0, "Ampere"),
        // RTX 20 series (Turing), desktop
        spec("RTX 2080 Ti", 250.0, 300.0, 200.0, "Turing"),
        spec("RTX 2080 SUPER", 250.0, 300.0, 200.0, "Turing"),
        spec("RTX 2080", 215.0, 260.0, 170.0, "Turing"),
        spec("RTX 2070 SUPER", 215.0, 260.0, 170.0, "Turing"),
        spec("RTX 2070", 175.0, 215.0, 140.0, "Turing"),
        spec("RTX 2060 SUPER", 175.0, 215.0, 140.0, "Turing"),
        spec("RTX 2060", 160.0, 190.0, 125.0, "Turing"),
        // GTX 16 series (Turing), desktop
        spec("GTX 1660 Ti", 120.0, 145.0, 90.0, "Turing"),
        spec("GTX 1660 SUPER", 125.0, 150.0, 95.0, "Turing"),
        spec("GTX 1660", 120.0, 145.0, 90.0, "Turing"),
        spec("GTX 1650 SUPER", 100.0, 120.0, 75.0, "Turing"),
        spec("GTX 1650", 75.0, 90.0, 55.0, "Turing"),
        // Professional / data center
        spec("RTX 6000 Ada", 300.0, 350.0, 200.0, "Ada Lovelace"),
        spec("RTX 5880 Ada", 285.0, 330.0, 200.0, "Ada Lovelace"),
        spec("RTX 5000 Ada", 250.0, 290.0, 170.0, "Ada Lovelace"),
        spec("RTX 4500 Ada", 210.0, 250.0, 150.0, "Ada Lovelace"),
        spec("RTX 4000 Ada", 130.0, 155.0, 90.0, "Ada Lovelace"),
        spec("RTX A6000", 300.0, 350.0, 200.0, "Ampere"),
        spec("RTX A5500", 230.0, 270.0, 160.0, "Ampere"),
        spec("RTX A5000", 230.0, 270.0, 160.0, "Ampere"),
        spec("RTX A4500", 200.0, 240.0, 140.0, "Ampere"),
        spec("RTX A4000", 140.0, 170.0, 100.0, "Ampere"),
        spec("L40S", 350.0, 400.0, 250.0, "Ada Lovelace"),
        spec("L40", 300.0, 350.0, 200.0, "Ada Lovelace"),
        spec("L4", 72.0, 85.0, 50.0, "Ada Lovelace"),
        spec("H100 SXM", 700.0, 800.0, 500.0, "Hopper"),
        spec("H100 PCIe", 350.0, 400.0, 250.0, "Hopper"),
        spec("H100 NVL", 400.0, 460.0, 300.0, "Hopper"),
        spec("H200", 700.0, 800.0, 500.0, "Hopper"),
        spec("A100 SXM", 400.0, 460.0, 300.0, "Ampere"),
        spec("A100 PCIe", 300.0, 350.0, 200.0, "Ampere"),
        spec("A40", 300.0, 350.0, 200.0, "Ampere"),
        spec("A30", 165.0, 195.0, 115.0, "Ampere"),
        spec("A16", 250.0, 290.0, 175.0, "Ampere"),
        spec("A10", 150.0, 175.0, 100.0, "Ampere"),
        spec("A2", 60.0, 70.0, 40.0, "Ampere"),
        // GTX 10 series (Pascal), desktop
        spec("GTX 1080 Ti", 250.0, 300.0, 200.0, "Pascal"),
        spec("GTX 1080", 180.0, 215.0, 140.0, "Pascal"),
        spec("GTX 1070 Ti", 180.0, 215.0, 140.0, "Pascal"),
        spec("GTX 1070", 150.0, 180.0, 115.0, "Pascal"),
        spec("GTX 1060 6GB", 120.0, 145.0, 90.0, "Pascal"),
        spec("GTX 1060 3GB", 120.0, 145.0, 90.0, "Pascal"),
        spec("GTX 1060", 120.0, 145.0, 90.0, "Pascal"),
        spec("GTX 1050 Ti", 75.0, 90.0, 55.0, "Pascal"),
        spec("GTX 1050", 75.0, 90.0, 55.0, "Pascal"),
        // Titan
        spec("TITAN RTX", 280.0, 330.0, 210.0, "Turing"),
        spec("TITAN V", 250.0, 300.0, 200.0, "Volta"),
        spec("TITAN Xp", 250.0, 300.0, 200.0, "Pascal"),
    ]
}

/// Ordered collection of power specifications with priority lookup.
///
/// User-registered specs are inserted at the front and therefore win ties
/// against built-in patterns of equal length. The catalog is append-only:
/// specs are never removed or mutated once registered.
///
/// The catalog performs no internal locking; wrap it in a `RwLock` when
/// registration and lookup happen on different threads.
#[derive(Debug, Clone)]
pub struct SpecCatalog {
    specs: Vec<PowerSpec>,
}

impl Default for SpecCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SpecCatalog {
    /// Creates a catalog seeded with the built-in spec table.
    pub fn builtin() -> Self {
        Self {
            specs: builtin_specs(),
        }
    }

    /// Creates a catalog with no specs at all.
    pub fn empty() -> Self {
        Self { specs: Vec::new() }
    }

    /// Registers a custom power spec at the front of the catalog.
    ///
    /// Re-registering an existing pattern adds a second front entry that
    /// shadows the earlier one; there is no de-duplication.
    pub fn register(
        &mut self,
        name_pattern: impl Into<String>,
        default_tdp_watts: f64,
        max_tdp_watts: f64,
        min_tdp_watts: f64,
        architecture: impl Into<String>,
    ) -> Result<()> {
        let name_pattern = name_pattern.into();

        if name_pattern.trim().is_empty() {
            return Err(TelemetryError::InvalidArgument(
                "spec name pattern cannot be empty".to_string(),
            ));
        }

        if default_tdp_watts <= 0.0 {
            return Err(TelemetryError::OutOfRange(format!(
                "default TDP must be positive, got {default_tdp_watts}"
            )));
        }

        tracing::debug!(pattern = %name_pattern, default_tdp_watts, "registering user power spec");

        self.specs.insert(
            0,
            PowerSpec {
                name_pattern,
                default_tdp_watts,
                max_tdp_watts,
                min_tdp_watts,
                architecture: architecture.into(),
            },
        );

        Ok(())
    }

    /// Finds the best spec for a device name.
    ///
    /// Every spec whose pattern occurs as a case-insensitive substring of
    /// the name matches; the longest pattern wins so "RTX 4080 SUPER"
    /// out-ranks "RTX 4080". Length ties go to the earliest catalog entry,
    /// which gives front-inserted user specs priority.
    pub fn lookup(&self, device_name: &str) -> Option<&PowerSpec> {
        if device_name.trim().is_empty() {
            return None;
        }

        let name_lower = device_name.to_lowercase();
        let mut best: Option<&PowerSpec> = None;

        for candidate in &self.specs {
            if !name_lower.contains(&candidate.name_pattern.to_lowercase()) {
                continue;
            }

            match best {
                Some(current) if candidate.name_pattern.len() <= current.name_pattern.len() => {}
                _ => best = Some(candidate),
            }
        }

        best
    }

    /// Default TDP in watts for a device name, if known.
    pub fn default_tdp(&self, device_name: &str) -> Option<f64> {
        self.lookup(device_name).map(|s| s.default_tdp_watts)
    }

    /// All specs in priority order (user-registered first).
    pub fn all(&self) -> &[PowerSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
