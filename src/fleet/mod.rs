//! Fleet registry
//!
//! Holds every robot seen on the telemetry link together with its
//! reservations. All access goes through one `RwLock`, so a planning attempt
//! never sees a half-written reservation set.

pub mod robot;

pub use robot::{Projection, Robot};

use crate::common::types::{Pose2D, RobotId};
use crate::config::{FleetConfig, RobotProfile};
use crate::error::{FleetError, Result};
use crate::geometry::Cylinder;
use crate::trajectory::ReservationKind;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Robots keyed by id
pub type RobotMap = HashMap<RobotId, Robot>;

/// Another robot's claim on space-time, as seen by a planner
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub owner: RobotId,
    pub cylinder: Cylinder,
    /// `None` for an idle robot standing in place
    pub kind: Option<ReservationKind>,
}

impl Obstacle {
    pub fn is_stationary(&self) -> bool {
        self.kind.is_none()
    }
}

/// Shared state of all robots
#[derive(Debug)]
pub struct Fleet {
    robots: RwLock<RobotMap>,
    profiles: HashMap<RobotId, RobotProfile>,
    default_profile: RobotProfile,
    reservation_margin: f64,
}

impl Fleet {
    pub fn new(
        profiles: HashMap<RobotId, RobotProfile>,
        default_profile: RobotProfile,
        reservation_margin: f64,
    ) -> Self {
        Fleet {
            robots: RwLock::new(HashMap::new()),
            profiles,
            default_profile,
            reservation_margin,
        }
    }

    pub fn from_config(config: &FleetConfig) -> Result<Self> {
        Ok(Self::new(
            config.robot_profiles()?,
            config.default_profile(),
            config.planner.reservation_margin,
        ))
    }

    /// Hardware parameters for `id`, falling back to the defaults
    pub fn profile(&self, id: RobotId) -> RobotProfile {
        self.profiles.get(&id).copied().unwrap_or(self.default_profile)
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, RobotMap>> {
        self.robots.read().map_err(|_| FleetError::LockPoisoned)
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, RobotMap>> {
        self.robots.write().map_err(|_| FleetError::LockPoisoned)
    }

    /// Apply a pose report, creating the robot on first sight.
    ///
    /// Returns `true` when the robot was new.
    pub fn update_pose(&self, id: RobotId, x: f64, y: f64, theta: f64, now_ms: f64) -> Result<bool> {
        for (field, value) in [("x", x), ("y", y), ("heading", theta)] {
            if !value.is_finite() {
                return Err(FleetError::InvalidPose {
                    id,
                    reason: format!("{} is {}", field, value),
                });
            }
        }

        let mut robots = self.write()?;
        let created = !robots.contains_key(&id);
        let profile = self.profile(id);
        let margin = self.reservation_margin;
        let robot = robots.entry(id).or_insert_with(|| {
            log::info!("Robot {} joined the fleet at ({:.1}, {:.1})", id, x, y);
            Robot::new(id, &profile, margin, Pose2D::position_only(x, y))
        });
        robot.update(x, y, theta, now_ms);
        Ok(created)
    }

    /// Insert a robot at a known pose without telemetry (simulation, tests)
    pub fn spawn(&self, id: RobotId, pose: Pose2D) -> Result<()> {
        let robot = Robot::new(id, &self.profile(id), self.reservation_margin, pose);
        self.write()?.insert(id, robot);
        Ok(())
    }

    /// Copy of a robot's current state
    pub fn robot(&self, id: RobotId) -> Result<Robot> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or(FleetError::UnknownRobot(id))
    }

    pub fn contains(&self, id: RobotId) -> bool {
        self.read().map(|r| r.contains_key(&id)).unwrap_or(false)
    }

    /// Ids of all known robots, sorted
    pub fn ids(&self) -> Result<Vec<RobotId>> {
        let mut ids: Vec<RobotId> = self.read()?.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// All active reservations of every robot except `exclude`, with idle
    /// robots standing in as upright cylinders.
    pub fn current_trajectories(&self, exclude: Option<RobotId>, now_ms: f64) -> Result<Vec<Obstacle>> {
        let mut robots = self.write()?;
        collect_obstacles(&mut robots, exclude, now_ms)
    }
}

/// Prune every ledger and gather the obstacles seen by a planner
pub(crate) fn collect_obstacles(
    robots: &mut RobotMap,
    exclude: Option<RobotId>,
    now_ms: f64,
) -> Result<Vec<Obstacle>> {
    let mut obstacles = Vec::new();

    for robot in robots.values_mut() {
        let dropped = robot.ledger.prune_expired(now_ms);
        if dropped > 0 {
            log::debug!("Robot {}: {} reservation(s) expired", robot.id, dropped);
        }

        if Some(robot.id) == exclude {
            continue;
        }

        if robot.ledger.is_empty() {
            match robot.stationary_obstacle(now_ms) {
                Ok(cylinder) => obstacles.push(Obstacle {
                    owner: robot.id,
                    cylinder,
                    kind: None,
                }),
                Err(e) => log::warn!("Robot {}: leaving it out of the obstacle set: {}", robot.id, e),
            }
        } else {
            obstacles.extend(robot.ledger.active(now_ms).map(|r| Obstacle {
                owner: r.owner,
                cylinder: r.cylinder,
                kind: Some(r.kind),
            }));
        }
    }

    obstacles.sort_by_key(|o| o.owner);
    Ok(obstacles)
}
