//! Configuration loading for TariniNav

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct TariniConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub autopilot: AutopilotConfig,
    #[serde(default)]
    pub vessel: VesselConfig,
}

/// Network connection settings for the two remote services
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Ship control API base URL (default: http://localhost:8080)
    #[serde(default = "default_ship_api_url")]
    pub ship_api_url: String,

    /// Fleet/map API base URL (default: http://localhost:8090)
    #[serde(default = "default_fleet_api_url")]
    pub fleet_api_url: String,

    /// Request timeout in milliseconds (default: 5000)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

/// Autopilot cadence preset. The command loop issues one step request per
/// delay; the live-sync loop always runs at five times that rate.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Fast,
    Normal,
    Slow,
}

impl Pace {
    pub fn step_delay(self) -> Duration {
        match self {
            Pace::Fast => Duration::from_millis(500),
            Pace::Normal => Duration::from_millis(1000),
            Pace::Slow => Duration::from_millis(2000),
        }
    }
}

/// Autopilot settings
#[derive(Clone, Debug, Deserialize)]
pub struct AutopilotConfig {
    /// Cadence preset (default: normal)
    #[serde(default = "default_pace")]
    pub pace: Pace,

    /// Explicit command-loop delay in milliseconds; overrides the preset
    #[serde(default)]
    pub step_delay_ms: Option<u64>,

    /// Consecutive transient failures tolerated before the session stops
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

impl AutopilotConfig {
    pub fn step_delay(&self) -> Duration {
        match self.step_delay_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.pace.step_delay(),
        }
    }

    /// Live-sync cadence: 5x the command-loop rate, so the view keeps moving
    /// while a step request is in flight.
    pub fn sync_interval(&self) -> Duration {
        self.step_delay() / 5
    }
}

/// Launch defaults for the operator's own vessel
#[derive(Clone, Debug, Deserialize)]
pub struct VesselConfig {
    /// Display name (default: "Tarini")
    #[serde(default = "default_vessel_name")]
    pub name: String,

    /// Launch sector x (default: 50)
    #[serde(default = "default_start_coord")]
    pub start_x: i32,

    /// Launch sector y (default: 50)
    #[serde(default = "default_start_coord")]
    pub start_y: i32,

    /// Launch heading code (default: "N")
    #[serde(default = "default_heading")]
    pub heading: String,
}

// Default value functions
fn default_ship_api_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_fleet_api_url() -> String {
    "http://localhost:8090".to_string()
}
fn default_timeout() -> u64 {
    5000
}
fn default_pace() -> Pace {
    Pace::Normal
}
fn default_max_consecutive_failures() -> u32 {
    5
}
fn default_vessel_name() -> String {
    "Tarini".to_string()
}
fn default_start_coord() -> i32 {
    50
}
fn default_heading() -> String {
    "N".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ship_api_url: default_ship_api_url(),
            fleet_api_url: default_fleet_api_url(),
            timeout_ms: default_timeout(),
        }
    }
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            pace: default_pace(),
            step_delay_ms: None,
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

impl Default for VesselConfig {
    fn default() -> Self {
        Self {
            name: default_vessel_name(),
            start_x: default_start_coord(),
            start_y: default_start_coord(),
            heading: default_heading(),
        }
    }
}

impl Default for TariniConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            autopilot: AutopilotConfig::default(),
            vessel: VesselConfig::default(),
        }
    }
}

impl TariniConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::TariniError::Config(format!("Failed to read config file: {}", e)))?;
        let config: TariniConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.connection.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TariniConfig::default();
        assert_eq!(config.connection.ship_api_url, "http://localhost:8080");
        assert_eq!(config.connection.fleet_api_url, "http://localhost:8090");
        assert_eq!(config.autopilot.step_delay(), Duration::from_millis(1000));
        assert_eq!(config.autopilot.sync_interval(), Duration::from_millis(200));
        assert_eq!(config.vessel.heading, "N");
    }

    #[test]
    fn pace_presets() {
        assert_eq!(Pace::Fast.step_delay(), Duration::from_millis(500));
        assert_eq!(Pace::Normal.step_delay(), Duration::from_millis(1000));
        assert_eq!(Pace::Slow.step_delay(), Duration::from_millis(2000));
    }

    #[test]
    fn explicit_delay_overrides_preset() {
        let toml_src = r#"
            [autopilot]
            pace = "slow"
            step_delay_ms = 250
        "#;
        let config: TariniConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.autopilot.pace, Pace::Slow);
        assert_eq!(config.autopilot.step_delay(), Duration::from_millis(250));
        assert_eq!(config.autopilot.sync_interval(), Duration::from_millis(50));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml_src = r#"
            [connection]
            ship_api_url = "http://10.0.0.5:8080"
        "#;
        let config: TariniConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.connection.ship_api_url, "http://10.0.0.5:8080");
        assert_eq!(config.connection.fleet_api_url, "http://localhost:8090");
        assert_eq!(config.autopilot.max_consecutive_failures, 5);
    }
}
