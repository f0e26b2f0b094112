//! Error types for the fleet coordinator

use crate::common::types::RobotId;

/// Result type alias
pub type Result<T> = std::result::Result<T, FleetError>;

/// Errors raised while planning, reserving or talking to robots
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// Attempted to normalize a vector of zero length
    #[error("Cannot normalize vector with zero magnitude")]
    DegenerateVector,

    /// A geometric construction has no valid answer (e.g. tangent from inside a circle)
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A command referenced a robot that has never reported telemetry
    #[error("Unknown robot: {0}")]
    UnknownRobot(RobotId),

    /// Telemetry record was malformed
    #[error("Invalid telemetry: expected at least {expected} bytes, got {len}")]
    InvalidTelemetry {
        /// Minimum record length
        expected: usize,
        /// Received length
        len: usize,
    },

    /// Telemetry record carried a value that is not a usable number
    #[error("Invalid telemetry from robot {id}: {reason}")]
    InvalidPose { id: RobotId, reason: String },

    /// Move target is not a finite point
    #[error("Invalid target ({x}, {y})")]
    InvalidTarget { x: f64, y: f64 },

    /// Motor command could not be decoded
    #[error("Invalid motor command: {0}")]
    InvalidCommand(String),

    /// No network address is configured for the robot
    #[error("No address configured for robot {0}")]
    NoAddress(RobotId),

    /// Shared fleet state lock was poisoned by a panicking writer
    #[error("Fleet state lock poisoned")]
    LockPoisoned,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// A lifecycle transition failed
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

impl From<toml::de::Error> for FleetError {
    fn from(e: toml::de::Error) -> Self {
        FleetError::Config(e.to_string())
    }
}
