//! Single-step trajectory planner
//!
//! Each call runs one planning attempt for one robot:
//!
//! ```text
//! PLANNING ──no conflict──▶ COMMIT
//!     │
//!     └──conflict──▶ DEFLECT ──▶ COMMIT (to tangent waypoint), resume later
//! ```
//!
//! The planner is synchronous and works on the locked robot map, so the
//! obstacle set it reads and the reservations it writes are consistent.
//! Nothing is written unless the attempt succeeds.

use crate::common::types::{Point2D, Pose2D, RobotId};
use crate::config::PlannerConfig;
use crate::control::{DriveController, MotorCommand};
use crate::error::{FleetError, Result};
use crate::fleet::{collect_obstacles, Obstacle, Robot, RobotMap};
use crate::geometry::{Cylinder, Ray, Vector3D};
use crate::trajectory::ReservationKind;

/// Targets closer than this are treated as reached
pub const ARRIVAL_TOLERANCE: f64 = 1e-6;

/// One straight move: turn in place, settle, drive
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub robot: RobotId,
    pub from: Point2D,
    pub to: Point2D,
    /// Bearing of the leg in radians
    pub bearing: f64,
    pub turn_degrees: f64,
    pub distance: f64,
    pub speed: f64,
    pub settle_ms: f64,
    pub travel_ms: f64,
    /// Time the turn command is issued
    pub start_ms: f64,
    pub turn: MotorCommand,
    pub drive: MotorCommand,
}

impl Leg {
    /// Expected arrival time at `to`
    pub fn arrival_ms(&self) -> f64 {
        self.start_ms + self.settle_ms + self.travel_ms
    }
}

/// A reservation the candidate leg runs into
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub owner: RobotId,
    pub cylinder: Cylinder,
    /// Intersection point closest to the start of the leg
    pub nearest: Vector3D,
    /// Distance from the leg origin to `nearest`
    pub distance: f64,
}

/// Outcome of a planning attempt
#[derive(Debug, Clone, PartialEq)]
pub enum PlanDecision {
    /// Already at the target; nothing to do
    Hold,
    /// Direct leg to the target, reserved
    Commit(Leg),
    /// Leg to a waypoint around `conflict`, reserved; plan again toward the
    /// original target `resume_after_ms` from now
    Deflect {
        leg: Leg,
        waypoint: Point2D,
        conflict: Conflict,
        resume_after_ms: f64,
    },
}

impl PlanDecision {
    pub fn leg(&self) -> Option<&Leg> {
        match self {
            PlanDecision::Hold => None,
            PlanDecision::Commit(leg) => Some(leg),
            PlanDecision::Deflect { leg, .. } => Some(leg),
        }
    }
}

#[derive(Debug)]
enum PlanState {
    Planning,
    Commit { target: Point2D },
    Deflect { conflicts: Vec<Conflict> },
}

/// Conflict checking and deflection for straight-line legs
#[derive(Debug, Clone)]
pub struct Planner {
    config: PlannerConfig,
    controller: DriveController,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        let controller = DriveController::new(config.speed_margin);
        Planner { config, controller }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn controller(&self) -> &DriveController {
        &self.controller
    }

    /// Run one planning attempt for robot `id` toward `target` at `now_ms`.
    ///
    /// On success the chosen leg is already reserved in the robot's ledger.
    pub fn plan(&self, robots: &mut RobotMap, id: RobotId, target: Point2D, now_ms: f64) -> Result<PlanDecision> {
        if !target.0.is_finite() || !target.1.is_finite() {
            return Err(FleetError::InvalidTarget {
                x: target.0,
                y: target.1,
            });
        }

        let robot = robots.get(&id).ok_or(FleetError::UnknownRobot(id))?;
        let pose = robot.planning_pose(now_ms);
        let speed = self.controller.commanded_speed(robot.max_speed);

        let mut state = PlanState::Planning;
        loop {
            state = match state {
                PlanState::Planning => {
                    let distance = pose.distance_to(target);
                    if distance <= ARRIVAL_TOLERANCE {
                        log::debug!("Robot {} already at ({:.1}, {:.1})", id, target.0, target.1);
                        return Ok(PlanDecision::Hold);
                    }

                    let travel_ms = self.controller.travel_time_ms(distance, speed);
                    let start = Vector3D::new(pose.x, pose.y, now_ms + self.config.settle_delay_ms);
                    let end = Vector3D::new(target.0, target.1, start.z() + travel_ms);
                    let ray = Ray::through(start, end)?;

                    let obstacles = collect_obstacles(robots, Some(id), now_ms)?;
                    let conflicts = self.find_conflicts(&ray, start.distance(&end), &obstacles);

                    if conflicts.is_empty() {
                        PlanState::Commit { target }
                    } else {
                        PlanState::Deflect { conflicts }
                    }
                }
                PlanState::Commit { target } => {
                    let robot = robot_mut(robots, id)?;
                    let leg = self.commit(robot, pose, target, now_ms)?;
                    log::info!(
                        "Robot {}: committed to ({:.1}, {:.1}), turn {:.1}°, {:.1} units in {:.0} ms",
                        id,
                        target.0,
                        target.1,
                        leg.turn_degrees,
                        leg.distance,
                        leg.travel_ms
                    );
                    return Ok(PlanDecision::Commit(leg));
                }
                PlanState::Deflect { conflicts } => {
                    let conflict = conflicts
                        .into_iter()
                        .min_by(|a, b| a.distance.total_cmp(&b.distance))
                        .ok_or_else(|| FleetError::DegenerateGeometry("no conflict to deflect around".to_string()))?;

                    let waypoint = self.waypoint(&conflict, pose)?;
                    let robot = robot_mut(robots, id)?;
                    let leg = self.commit(robot, pose, waypoint, now_ms)?;
                    let resume_after_ms = self.config.settle_delay_ms + leg.travel_ms + self.config.retry_margin_ms;

                    log::info!(
                        "Robot {}: path to ({:.1}, {:.1}) blocked by robot {}, deflecting via ({:.1}, {:.1})",
                        id,
                        target.0,
                        target.1,
                        conflict.owner,
                        waypoint.0,
                        waypoint.1
                    );
                    return Ok(PlanDecision::Deflect {
                        leg,
                        waypoint,
                        conflict,
                        resume_after_ms,
                    });
                }
            };
        }
    }

    /// Test the candidate leg against every obstacle
    fn find_conflicts(&self, ray: &Ray, length: f64, obstacles: &[Obstacle]) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for obstacle in obstacles {
            let nearest = if self.config.clamp_to_extent {
                obstacle
                    .cylinder
                    .conflict_span(ray, length)
                    .map(|(enter, _)| ray.point_at(enter))
            } else {
                obstacle.cylinder.collides_at(ray).map(|[p1, p2]| {
                    if p1.distance(&ray.origin) <= p2.distance(&ray.origin) {
                        p1
                    } else {
                        p2
                    }
                })
            };

            match nearest {
                Some(nearest) => {
                    log::debug!(
                        "Conflict with robot {} at ({:.1}, {:.1}, t={:.0})",
                        obstacle.owner,
                        nearest.x(),
                        nearest.y(),
                        nearest.z()
                    );
                    conflicts.push(Conflict {
                        owner: obstacle.owner,
                        cylinder: obstacle.cylinder,
                        distance: nearest.distance(&ray.origin),
                        nearest,
                    });
                }
                None => log::trace!("Clear of robot {}", obstacle.owner),
            }
        }

        conflicts
    }

    /// First tangent point around the conflict, pushed outward by the clearance
    fn waypoint(&self, conflict: &Conflict, pose: Pose2D) -> Result<Point2D> {
        let z = conflict.nearest.z();
        let [tangent, _] = conflict.cylinder.circle_tangents(pose.x, pose.y, z)?;
        let centre = conflict.cylinder.axis_point_at_time(z)?;

        let radius = conflict.cylinder.radius;
        let scale = (radius + self.config.waypoint_clearance) / radius;
        Ok((
            centre.x() + (tangent.x() - centre.x()) * scale,
            centre.y() + (tangent.y() - centre.y()) * scale,
        ))
    }

    /// Build a leg from `pose` to `to`
    pub fn leg(&self, robot: &Robot, pose: Pose2D, to: Point2D, now_ms: f64) -> Leg {
        let from = pose.point();
        let distance = pose.distance_to(to);
        let speed = self.controller.commanded_speed(robot.max_speed);
        let turn_degrees = self.controller.turn_angle_degrees(pose.theta, from, to);

        Leg {
            robot: robot.id,
            from,
            to,
            bearing: (to.1 - from.1).atan2(to.0 - from.0),
            turn_degrees,
            distance,
            speed,
            settle_ms: self.config.settle_delay_ms,
            travel_ms: self.controller.travel_time_ms(distance, speed),
            start_ms: now_ms,
            turn: self.controller.turn_command(turn_degrees),
            drive: self.controller.drive_command(speed),
        }
    }

    /// Reserve the holding and travel volumes for a leg and record where the
    /// robot will end up. The ledger is only replaced once both fit.
    fn commit(&self, robot: &mut Robot, pose: Pose2D, to: Point2D, now_ms: f64) -> Result<Leg> {
        let leg = self.leg(robot, pose, to, now_ms);

        let mut ledger = robot.ledger.clone();
        ledger.add_trajectory(
            leg.from.0,
            leg.from.1,
            leg.from.0,
            leg.from.1,
            leg.settle_ms,
            0.0,
            ReservationKind::Holding,
            now_ms,
        )?;
        ledger.add_trajectory(
            leg.from.0,
            leg.from.1,
            leg.to.0,
            leg.to.1,
            leg.travel_ms,
            leg.settle_ms,
            ReservationKind::Travel,
            now_ms,
        )?;

        robot.ledger = ledger;
        robot.project(Pose2D::new(to.0, to.1, leg.bearing), leg.arrival_ms());
        Ok(leg)
    }
}

fn robot_mut(robots: &mut RobotMap, id: RobotId) -> Result<&mut Robot> {
    robots.get_mut(&id).ok_or(FleetError::UnknownRobot(id))
}
