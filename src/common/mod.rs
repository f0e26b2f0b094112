//! Common utilities and types for the fleet coordinator

pub mod clock;

pub use clock::{Clock, ManualClock, RuntimeClock};

/// Common types and utilities used across the codebase
pub mod types {
    /// Robot identifier as carried by telemetry
    pub type RobotId = i32;

    /// A 2D point in working units
    pub type Point2D = (f64, f64);

    /// Planar pose of a robot (x, y in working units, heading in radians)
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Pose2D {
        pub x: f64,
        pub y: f64,
        /// Heading in radians, `None` until telemetry has reported one
        pub theta: Option<f64>,
    }

    impl Pose2D {
        pub fn new(x: f64, y: f64, theta: f64) -> Self {
            Pose2D {
                x,
                y,
                theta: Some(theta),
            }
        }

        /// Pose with a position but no known heading
        pub fn position_only(x: f64, y: f64) -> Self {
            Pose2D { x, y, theta: None }
        }

        pub fn point(&self) -> Point2D {
            (self.x, self.y)
        }

        /// Planar distance to a point
        pub fn distance_to(&self, point: Point2D) -> f64 {
            let dx = point.0 - self.x;
            let dy = point.1 - self.y;
            (dx * dx + dy * dy).sqrt()
        }
    }
}
