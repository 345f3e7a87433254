//! User configuration: custom power specs registered into the catalog at
//! startup.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use surge_telemetry::SpecCatalog;
use tracing::warn;

fn default_architecture() -> String {
    "Unknown".to_string()
}

/// One user-declared power spec from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSpec {
    /// Case-insensitive substring matched against the device name.
    pub pattern: String,
    pub default_tdp_watts: f64,
    pub max_tdp_watts: f64,
    pub min_tdp_watts: f64,
    #[serde(default = "default_architecture")]
    pub architecture: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Custom power specs, registered ahead of the built-in table.
    pub specs: Vec<UserSpec>,
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("surge")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl UserConfig {
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                warn!("failed to parse {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Registers every configured spec into the catalog. Invalid entries
    /// are skipped with a warning rather than aborting startup.
    pub fn apply(&self, catalog: &mut SpecCatalog) {
        for spec in &self.specs {
            if let Err(e) = catalog.register(
                spec.pattern.clone(),
                spec.default_tdp_watts,
                spec.max_tdp_watts,
                spec.min_tdp_watts,
                spec.architecture.clone(),
            ) {
                warn!("skipping configured spec {:?}: {e}", spec.pattern);
            }
        }
    }
}
