//! Configuration for the fleet coordinator
//!
//! Loads configuration from a TOML file. Every section has defaults, so an
//! empty file is a valid configuration for a single robot on the bench.

use crate::common::types::RobotId;
use crate::error::{FleetError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub network: NetworkConfig,
    pub planner: PlannerConfig,
    pub logging: LoggingConfig,
    /// Known robots; robots missing here use the planner defaults
    pub robots: Vec<RobotEntry>,
}

/// Network endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// UDP bind address for inbound pose telemetry
    pub telemetry_bind: String,
    /// UDP port robots listen on for motor commands
    pub command_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            telemetry_bind: "0.0.0.0:9751".to_string(),
            command_port: 9750,
        }
    }
}

/// Planning constants
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Added to twice the robot radius to get the reservation radius
    pub reservation_margin: f64,
    /// Subtracted from a robot's max speed to get the commanded speed
    pub speed_margin: f64,
    /// Pause between the turn command and the drive command (ms)
    pub settle_delay_ms: f64,
    /// Extra wait after a deflected leg before re-planning (ms)
    pub retry_margin_ms: f64,
    /// How far outside the obstacle tube a deflection waypoint is placed
    pub waypoint_clearance: f64,
    /// Only count conflicts inside the obstacle's time extent and ahead on the leg
    pub clamp_to_extent: bool,
    /// Radius for robots without an entry
    pub default_radius: f64,
    /// Max speed (ticks/s) for robots without an entry
    pub default_max_speed: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            reservation_margin: 5.0,
            speed_margin: 15.0,
            settle_delay_ms: 2000.0,
            retry_margin_ms: 500.0,
            waypoint_clearance: 5.0,
            clamp_to_extent: true,
            default_radius: 10.0,
            default_max_speed: 65.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

/// One robot as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct RobotEntry {
    pub id: RobotId,
    /// `"ip"` or `"ip:port"`; the command port is used when no port is given
    pub address: Option<String>,
    pub radius: Option<f64>,
    pub max_speed: Option<f64>,
}

/// Resolved per-robot hardware parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotProfile {
    pub radius: f64,
    pub max_speed: f64,
    pub address: Option<SocketAddr>,
}

impl FleetConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: FleetConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let p = &self.planner;
        if p.reservation_margin < 0.0 {
            return Err(FleetError::Config("reservation_margin must be non-negative".to_string()));
        }
        if p.settle_delay_ms <= 0.0 {
            return Err(FleetError::Config("settle_delay_ms must be positive".to_string()));
        }
        if p.retry_margin_ms < 0.0 {
            return Err(FleetError::Config("retry_margin_ms must be non-negative".to_string()));
        }
        if p.waypoint_clearance < 0.0 {
            return Err(FleetError::Config("waypoint_clearance must be non-negative".to_string()));
        }
        if p.default_radius <= 0.0 {
            return Err(FleetError::Config("default_radius must be positive".to_string()));
        }
        if p.default_max_speed <= p.speed_margin {
            return Err(FleetError::Config(
                "default_max_speed must exceed speed_margin".to_string(),
            ));
        }

        for robot in &self.robots {
            if robot.radius.is_some_and(|r| r <= 0.0) {
                return Err(FleetError::Config(format!("robot {}: radius must be positive", robot.id)));
            }
            if robot.max_speed.is_some_and(|s| s <= p.speed_margin) {
                return Err(FleetError::Config(format!(
                    "robot {}: max_speed must exceed speed_margin",
                    robot.id
                )));
            }
        }
        Ok(())
    }

    /// Resolve the robot table into profiles keyed by id
    pub fn robot_profiles(&self) -> Result<HashMap<RobotId, RobotProfile>> {
        let mut profiles = HashMap::new();
        for entry in &self.robots {
            let address = match &entry.address {
                Some(text) => Some(parse_address(text, self.network.command_port)?),
                None => None,
            };
            profiles.insert(
                entry.id,
                RobotProfile {
                    radius: entry.radius.unwrap_or(self.planner.default_radius),
                    max_speed: entry.max_speed.unwrap_or(self.planner.default_max_speed),
                    address,
                },
            );
        }
        Ok(profiles)
    }

    /// Profile used for robots that report telemetry without a config entry
    pub fn default_profile(&self) -> RobotProfile {
        RobotProfile {
            radius: self.planner.default_radius,
            max_speed: self.planner.default_max_speed,
            address: None,
        }
    }
}

fn parse_address(text: &str, default_port: u16) -> Result<SocketAddr> {
    if let Ok(addr) = text.parse::<SocketAddr>() {
        return Ok(addr);
    }
    text.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, default_port))
        .map_err(|_| FleetError::Config(format!("invalid robot address: {}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = FleetConfig::parse("").unwrap();
        assert_eq!(config.network.command_port, 9750);
        assert_eq!(config.planner.settle_delay_ms, 2000.0);
        assert!(config.planner.clamp_to_extent);
        assert!(config.robots.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn robot_table_resolves_addresses() {
        let config = FleetConfig::parse(
            r#"
            [network]
            command_port = 9000

            [[robots]]
            id = 10
            address = "192.168.1.140"

            [[robots]]
            id = 11
            address = "192.168.1.141:9100"
            radius = 12.5
            max_speed = 80
            "#,
        )
        .unwrap();

        let profiles = config.robot_profiles().unwrap();
        let first = profiles[&10];
        assert_eq!(first.address, Some("192.168.1.140:9000".parse().unwrap()));
        assert_eq!(first.radius, 10.0);
        assert_eq!(first.max_speed, 65.0);

        let second = profiles[&11];
        assert_eq!(second.address, Some("192.168.1.141:9100".parse().unwrap()));
        assert_eq!(second.radius, 12.5);
        assert_eq!(second.max_speed, 80.0);
    }

    #[test]
    fn bad_address_is_a_config_error() {
        let config = FleetConfig::parse(
            r#"
            [[robots]]
            id = 1
            address = "not-an-ip"
            "#,
        )
        .unwrap();
        assert!(matches!(config.robot_profiles(), Err(FleetError::Config(_))));
    }

    #[test]
    fn invalid_planner_values_are_rejected() {
        let result = FleetConfig::parse(
            r#"
            [planner]
            settle_delay_ms = 0
            "#,
        );
        assert!(matches!(result, Err(FleetError::Config(_))));

        let result = FleetConfig::parse(
            r#"
            [[robots]]
            id = 2
            radius = -1
            "#,
        );
        assert!(matches!(result, Err(FleetError::Config(_))));
    }
}
