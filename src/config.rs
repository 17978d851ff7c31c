//! Application configuration loaded from a TOML file.
//!
//! Reads `~/.config/voltswap/config.toml` by default; the `VOLTSWAP_CONFIG`
//! environment variable overrides the path. Missing sections fall back to
//! defaults, so a partial file is fine.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::shared::errors::InfraError;

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub reservation: ReservationSection,
    #[serde(default)]
    pub swap: SwapSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    /// SeaORM connection URL
    pub connection_url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            connection_url: "sqlite://./voltswap.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Default tracing filter, overridden by RUST_LOG
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationSection {
    /// Minutes an Active reservation holds its batteries
    pub ttl_minutes: i64,
    /// How often the expiry sweep runs
    pub sweep_interval_secs: u64,
    /// Charge floor for auto-selected batteries
    pub min_charge_percent: f64,
}

impl Default for ReservationSection {
    fn default() -> Self {
        Self {
            ttl_minutes: 60,
            sweep_interval_secs: 60,
            min_charge_percent: 95.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapSection {
    /// Swap count past which a confirmed battery is pulled for service
    pub swap_count_threshold: u64,
    /// Energy price in the local currency, per kWh
    pub price_per_kwh: String,
}

impl Default for SwapSection {
    fn default() -> Self {
        Self {
            swap_count_threshold: 50,
            price_per_kwh: "3500".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| InfraError::Config(format!("read {}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| InfraError::Config(format!("parse {}: {}", path.display(), e)))
    }
}

/// Default config file location: `~/.config/voltswap/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voltswap")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy_constants() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.reservation.ttl_minutes, 60);
        assert_eq!(cfg.reservation.min_charge_percent, 95.0);
        assert_eq!(cfg.swap.swap_count_threshold, 50);
        assert_eq!(cfg.swap.price_per_kwh, "3500");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn partial_toml_fills_missing_sections() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [reservation]
            ttl_minutes = 30
            sweep_interval_secs = 15
            min_charge_percent = 90.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.reservation.ttl_minutes, 30);
        assert_eq!(cfg.reservation.sweep_interval_secs, 15);
        // Untouched sections keep their defaults
        assert_eq!(cfg.database.connection_url, "sqlite://./voltswap.db?mode=rwc");
        assert_eq!(cfg.swap.swap_count_threshold, 50);
    }
}
