//! Application configuration
//!
//! Loaded from a TOML file (`~/.config/evrental/config.toml` by default).
//! Every section and field has a default, so a partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::support::errors::InfraError;

/// Default config location: `<config dir>/evrental/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("evrental")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub logging: LoggingConfig,
    pub pickup: PickupConfig,
    pub fees: FeeConfig,
    pub reservations: ReservationConfig,
    pub payments: PaymentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://./evrental.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `evrental=debug,sea_orm=warn`
    pub level: String,
    /// `plain` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "plain".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupConfig {
    /// Token lifetime measured from the reservation start time
    pub token_validity_hours: i64,
    /// Secret mixed into the payload tag
    pub token_secret: String,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            token_validity_hours: 24,
            token_secret: "change-me".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Late fee per started hour past the grace period (minor units)
    pub late_fee_per_hour: i64,
    pub late_grace_minutes: i64,
    /// Window for the user+vehicle rental match when backfilling handovers
    pub backfill_match_days: i64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            late_fee_per_hour: 50_000,
            late_grace_minutes: 15,
            backfill_match_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationConfig {
    pub expiry_check_interval_secs: u64,
    /// Pending reservations expire this long after their start time
    pub pending_grace_hours: i64,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            expiry_check_interval_secs: 60,
            pending_grace_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub intent_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            intent_ttl_minutes: 30,
            sweep_interval_secs: 300,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| InfraError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InfraError> {
        if self.pickup.token_validity_hours <= 0 {
            return Err(InfraError::Config(
                "pickup.token_validity_hours must be positive".into(),
            ));
        }
        if self.pickup.token_secret.is_empty() {
            return Err(InfraError::Config("pickup.token_secret must not be empty".into()));
        }
        if self.fees.late_fee_per_hour < 0 || self.fees.late_grace_minutes < 0 {
            return Err(InfraError::Config("fee settings must not be negative".into()));
        }
        if self.payments.intent_ttl_minutes <= 0 {
            return Err(InfraError::Config(
                "payments.intent_ttl_minutes must be positive".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "plain" | "json") {
            return Err(InfraError::Config(format!(
                "logging.format must be 'plain' or 'json', got '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.server.api_host, self.server.api_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            api_port = 9100

            [fees]
            late_fee_per_hour = 10000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.api_port, 9100);
        assert_eq!(cfg.server.api_host, "0.0.0.0");
        assert_eq!(cfg.fees.late_fee_per_hour, 10000);
        assert_eq!(cfg.fees.late_grace_minutes, 15);
        assert_eq!(cfg.pickup.token_validity_hours, 24);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_log_format() {
        let mut cfg = AppConfig::default();
        cfg.logging.format = "xml".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = AppConfig::load(Path::new("/nonexistent/evrental/config.toml")).unwrap();
        assert_eq!(cfg.api_address(), "0.0.0.0:8080");
    }
}
