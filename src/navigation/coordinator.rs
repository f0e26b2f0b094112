//! Fleet coordinator
//!
//! Turns planning decisions into motor commands. Planning itself happens
//! synchronously under the fleet write lock; everything time-based (the
//! settling pause, the drive duration, the re-plan after a deflection) runs
//! on spawned tokio tasks.
//!
//! An external command that commits a leg bumps the robot's command sequence.
//! Pending legs and re-plans carry the sequence they were issued under and give
//! up once a newer leg has taken over. A command that holds or fails leaves
//! the leg in flight alone.

use super::planner::{Leg, PlanDecision, Planner};
use crate::comms::CommandSink;
use crate::common::types::{Point2D, RobotId};
use crate::common::Clock;
use crate::control::MotorCommand;
use crate::error::{FleetError, Result};
use crate::fleet::Fleet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// New command from outside; supersedes anything in flight once it commits
    Fresh,
    /// Re-plan belonging to the given command sequence
    Retry(u64),
}

/// Plans legs for robots and executes them over a [`CommandSink`]
#[derive(Clone)]
pub struct Coordinator {
    fleet: Arc<Fleet>,
    planner: Arc<Planner>,
    sink: Arc<dyn CommandSink>,
    clock: Arc<dyn Clock>,
}

impl Coordinator {
    pub fn new(fleet: Arc<Fleet>, planner: Planner, sink: Arc<dyn CommandSink>, clock: Arc<dyn Clock>) -> Self {
        Coordinator {
            fleet,
            planner: Arc::new(planner),
            sink,
            clock,
        }
    }

    pub fn fleet(&self) -> &Arc<Fleet> {
        &self.fleet
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Plan a move of robot `id` to `target` and start executing it.
    ///
    /// Returns the decision of the first planning attempt. Must be called
    /// from within a tokio runtime.
    pub fn plan_and_execute(&self, id: RobotId, target: Point2D) -> Result<PlanDecision> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(FleetError::Lifecycle(
                "plan_and_execute needs a running tokio runtime".to_string(),
            ));
        }

        let decision = self.attempt(id, target, Attempt::Fresh)?;
        Ok(decision.unwrap_or(PlanDecision::Hold))
    }

    /// One planning attempt. `None` when a retry has been superseded.
    fn attempt(&self, id: RobotId, target: Point2D, attempt: Attempt) -> Result<Option<PlanDecision>> {
        let now_ms = self.clock.now_ms();

        let (decision, seq, address) = {
            let mut robots = self.fleet.write()?;
            let robot = robots.get(&id).ok_or(FleetError::UnknownRobot(id))?;
            let address = robot.address;

            if let Attempt::Retry(seq) = attempt {
                if seq != robot.command_seq() {
                    log::debug!(
                        "Robot {}: dropping re-plan of command {} (now at {})",
                        id,
                        seq,
                        robot.command_seq()
                    );
                    return Ok(None);
                }
            }

            let decision = self.planner.plan(&mut robots, id, target, now_ms)?;
            let robot = robots.get_mut(&id).ok_or(FleetError::UnknownRobot(id))?;
            let seq = match (attempt, &decision) {
                (Attempt::Retry(seq), _) => seq,
                (Attempt::Fresh, PlanDecision::Hold) => robot.command_seq(),
                (Attempt::Fresh, _) => robot.next_command(),
            };
            (decision, seq, address)
        };

        match &decision {
            PlanDecision::Hold => {
                log::info!("Robot {} reached ({:.1}, {:.1})", id, target.0, target.1);
            }
            PlanDecision::Commit(leg) => {
                self.execute(leg.clone(), seq, address);
            }
            PlanDecision::Deflect {
                leg,
                resume_after_ms,
                ..
            } => {
                self.execute(leg.clone(), seq, address);
                self.schedule_retry(id, target, seq, *resume_after_ms);
            }
        }

        Ok(Some(decision))
    }

    /// Send turn, drive and stop for a leg on a background task
    fn execute(&self, leg: Leg, seq: u64, address: Option<SocketAddr>) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.run_leg(&leg, seq, address).await {
                log::warn!("Robot {}: leg to ({:.1}, {:.1}) aborted: {}", leg.robot, leg.to.0, leg.to.1, e);
            }
        });
    }

    async fn run_leg(&self, leg: &Leg, seq: u64, address: Option<SocketAddr>) -> Result<()> {
        let (settle, travel) = match (millis(leg.settle_ms), millis(leg.travel_ms)) {
            (Ok(settle), Ok(travel)) => (settle, travel),
            (Err(e), _) | (_, Err(e)) => {
                self.sink.send(leg.robot, address, MotorCommand::stop())?;
                return Err(e);
            }
        };

        self.sink.send(leg.robot, address, leg.turn)?;

        tokio::time::sleep(settle).await;
        if !self.is_current(leg.robot, seq)? {
            log::debug!("Robot {}: command {} superseded before driving", leg.robot, seq);
            return Ok(());
        }
        self.sink.send(leg.robot, address, leg.drive)?;

        tokio::time::sleep(travel).await;
        if !self.is_current(leg.robot, seq)? {
            log::debug!("Robot {}: command {} superseded while driving", leg.robot, seq);
            return Ok(());
        }
        self.sink.send(leg.robot, address, MotorCommand::stop())
    }

    /// Re-plan toward the original target once the deflected leg is done
    fn schedule_retry(&self, id: RobotId, target: Point2D, seq: u64, delay_ms: f64) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            match millis(delay_ms) {
                Ok(delay) => tokio::time::sleep(delay).await,
                Err(e) => {
                    log::warn!("Robot {}: re-plan not scheduled: {}", id, e);
                    return;
                }
            }
            log::debug!("Robot {}: re-planning toward ({:.1}, {:.1})", id, target.0, target.1);
            if let Err(e) = coordinator.attempt(id, target, Attempt::Retry(seq)) {
                log::warn!(
                    "Robot {}: re-plan toward ({:.1}, {:.1}) failed: {}",
                    id,
                    target.0,
                    target.1,
                    e
                );
            }
        });
    }

    fn is_current(&self, id: RobotId, seq: u64) -> Result<bool> {
        let robots = self.fleet.read()?;
        Ok(robots.get(&id).is_some_and(|r| r.command_seq() == seq))
    }
}

fn millis(ms: f64) -> Result<Duration> {
    let unusable = |reason: String| FleetError::DegenerateGeometry(format!("unusable duration of {} ms: {}", ms, reason));
    if ms.is_nan() {
        return Err(unusable("not a number".to_string()));
    }
    Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).map_err(|e| unusable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comms::RecordingSink;
    use crate::common::types::Pose2D;
    use crate::common::ManualClock;
    use crate::config::FleetConfig;

    fn coordinator() -> (Coordinator, Arc<RecordingSink>) {
        let config = FleetConfig::default();
        let fleet = Arc::new(Fleet::from_config(&config).unwrap());
        let sink = Arc::new(RecordingSink::new());
        let coordinator = Coordinator::new(
            fleet,
            Planner::new(config.planner.clone()),
            sink.clone(),
            Arc::new(ManualClock::new(0.0)),
        );
        (coordinator, sink)
    }

    #[test]
    fn needs_a_runtime() {
        let (coordinator, _) = coordinator();
        coordinator.fleet().spawn(1, Pose2D::new(0.0, 0.0, 0.0)).unwrap();
        let result = coordinator.plan_and_execute(1, (10.0, 0.0));
        assert!(matches!(result, Err(FleetError::Lifecycle(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_robot_sends_nothing() {
        let (coordinator, sink) = coordinator();
        let result = coordinator.plan_and_execute(5, (10.0, 0.0));
        assert!(matches!(result, Err(FleetError::UnknownRobot(5))));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(sink.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn turn_is_sent_immediately() {
        let (coordinator, sink) = coordinator();
        coordinator.fleet().spawn(1, Pose2D::new(0.0, 0.0, 0.0)).unwrap();

        let decision = coordinator.plan_and_execute(1, (0.0, 50.0)).unwrap();
        assert!(matches!(decision, PlanDecision::Commit(_)));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sink.commands(), vec![MotorCommand::turn(25)]);
    }

    #[tokio::test(start_paused = true)]
    async fn infinite_target_sends_nothing() {
        let (coordinator, sink) = coordinator();
        coordinator.fleet().spawn(1, Pose2D::new(0.0, 0.0, 0.0)).unwrap();

        let result = coordinator.plan_and_execute(1, (f64::INFINITY, 0.0));
        assert!(matches!(result, Err(FleetError::InvalidTarget { .. })));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(sink.commands().is_empty());
        assert_eq!(coordinator.fleet().robot(1).unwrap().command_seq(), 0);
    }

    #[test]
    fn durations_must_be_representable() {
        assert_eq!(millis(1500.0).unwrap(), Duration::from_millis(1500));
        assert_eq!(millis(-3.0).unwrap(), Duration::ZERO);
        assert!(millis(f64::INFINITY).is_err());
        assert!(millis(f64::NAN).is_err());
    }
}
