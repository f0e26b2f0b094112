//! Robot entity

use crate::common::types::{Point2D, Pose2D, RobotId};
use crate::config::RobotProfile;
use crate::error::Result;
use crate::geometry::Cylinder;
use crate::trajectory::TrajectoryLedger;
use std::net::SocketAddr;

/// Where a robot is expected to be once its last committed leg is done
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub pose: Pose2D,
    pub arrival_ms: f64,
}

/// A robot known to the coordinator
#[derive(Debug, Clone)]
pub struct Robot {
    pub id: RobotId,
    pub pose: Pose2D,
    /// Max wheel speed in encoder ticks per second
    pub max_speed: f64,
    pub address: Option<SocketAddr>,
    pub ledger: TrajectoryLedger,
    pub last_telemetry_ms: Option<f64>,
    projection: Option<Projection>,
    command_seq: u64,
}

impl Robot {
    /// Create a robot at `pose`. The reservation radius is twice the robot
    /// radius plus `reservation_margin`.
    pub fn new(id: RobotId, profile: &RobotProfile, reservation_margin: f64, pose: Pose2D) -> Self {
        let reservation_radius = 2.0 * profile.radius + reservation_margin;
        Robot {
            id,
            pose,
            max_speed: profile.max_speed,
            address: profile.address,
            ledger: TrajectoryLedger::new(id, reservation_radius),
            last_telemetry_ms: None,
            projection: None,
            command_seq: 0,
        }
    }

    /// Apply a telemetry update
    pub fn update(&mut self, x: f64, y: f64, theta: f64, now_ms: f64) {
        self.pose = Pose2D::new(x, y, theta);
        self.last_telemetry_ms = Some(now_ms);

        // Fresh telemetry after the expected arrival supersedes dead reckoning
        if self.projection.is_some_and(|p| p.arrival_ms <= now_ms) {
            self.projection = None;
        }
    }

    pub fn reservation_radius(&self) -> f64 {
        self.ledger.reservation_radius()
    }

    /// Record where the robot should be after the leg it just committed to
    pub fn project(&mut self, pose: Pose2D, arrival_ms: f64) {
        self.projection = Some(Projection { pose, arrival_ms });
    }

    pub fn projection(&self) -> Option<Projection> {
        self.projection
    }

    /// Pose to plan from at `now_ms`.
    ///
    /// Once the expected arrival time of the last leg has passed and no
    /// telemetry has arrived since, the projected pose is used.
    pub fn planning_pose(&self, now_ms: f64) -> Pose2D {
        match self.projection {
            Some(p) if p.arrival_ms <= now_ms => {
                let newer_telemetry = self
                    .last_telemetry_ms
                    .is_some_and(|t| t >= p.arrival_ms);
                if newer_telemetry {
                    self.pose
                } else {
                    p.pose
                }
            }
            _ => self.pose,
        }
    }

    pub fn position(&self, now_ms: f64) -> Point2D {
        self.planning_pose(now_ms).point()
    }

    /// Cylinder standing in for an idle robot: upright at its position from
    /// `now_ms` on, with the reservation radius.
    pub fn stationary_obstacle(&self, now_ms: f64) -> Result<Cylinder> {
        let (x, y) = self.position(now_ms);
        Cylinder::stationary(x, y, now_ms, self.reservation_radius())
    }

    /// Start a new command sequence, invalidating pending retries
    pub fn next_command(&mut self) -> u64 {
        self.command_seq += 1;
        self.command_seq
    }

    pub fn command_seq(&self) -> u64 {
        self.command_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> RobotProfile {
        RobotProfile {
            radius: 10.0,
            max_speed: 65.0,
            address: None,
        }
    }

    #[test]
    fn reservation_radius_is_twice_radius_plus_margin() {
        let robot = Robot::new(1, &profile(), 5.0, Pose2D::new(0.0, 0.0, 0.0));
        assert_eq!(robot.reservation_radius(), 25.0);
    }

    #[test]
    fn projection_used_after_arrival_without_telemetry() {
        let mut robot = Robot::new(1, &profile(), 5.0, Pose2D::new(0.0, 0.0, 0.0));
        robot.update(0.0, 0.0, 0.0, 0.0);
        robot.project(Pose2D::new(40.0, 30.0, 0.5), 1000.0);

        assert_eq!(robot.planning_pose(500.0).point(), (0.0, 0.0));
        assert_eq!(robot.planning_pose(1000.0).point(), (40.0, 30.0));

        robot.update(39.0, 31.0, 0.5, 1200.0);
        assert_eq!(robot.planning_pose(1300.0).point(), (39.0, 31.0));
        assert!(robot.projection().is_none());
    }

    #[test]
    fn command_sequence_increments() {
        let mut robot = Robot::new(1, &profile(), 5.0, Pose2D::new(0.0, 0.0, 0.0));
        assert_eq!(robot.next_command(), 1);
        assert_eq!(robot.next_command(), 2);
        assert_eq!(robot.command_seq(), 2);
    }
}
