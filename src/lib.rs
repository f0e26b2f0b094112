pub mod comms;
pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod fleet;
pub mod geometry;
pub mod lifecycle;
pub mod navigation;
pub mod perception;
pub mod trajectory;

use crate::comms::{CommandSink, TelemetryListener, UdpCommandLink};
use crate::common::types::RobotId;
use crate::common::{Clock, RuntimeClock};
use crate::config::FleetConfig;
use crate::error::Result;
use crate::fleet::{Fleet, Obstacle};
use crate::lifecycle::LifecycleNode;
use crate::navigation::{Coordinator, PlanDecision, Planner};
use std::sync::Arc;

pub use crate::error::FleetError;

/// Core of the fleet coordinator
pub struct FleetCore {
    components: Vec<Box<dyn LifecycleNode>>,
    coordinator: Coordinator,
}

impl FleetCore {
    /// Create a core sending commands through `sink` and reading time from `clock`
    pub fn new(config: &FleetConfig, sink: Arc<dyn CommandSink>, clock: Arc<dyn Clock>) -> Result<Self> {
        let fleet = Arc::new(Fleet::from_config(config)?);
        let planner = Planner::new(config.planner.clone());
        Ok(FleetCore {
            components: Vec::new(),
            coordinator: Coordinator::new(fleet, planner, sink, clock),
        })
    }

    /// Create a networked core: UDP command link plus a telemetry listener
    /// on the configured endpoints
    pub fn from_config(config: &FleetConfig) -> Result<Self> {
        let link = UdpCommandLink::bind("0.0.0.0:0")?;
        let clock: Arc<dyn Clock> = Arc::new(RuntimeClock::new());
        let mut core = Self::new(config, Arc::new(link), Arc::clone(&clock))?;

        let listener = TelemetryListener::new(
            &config.network.telemetry_bind,
            Arc::clone(core.coordinator.fleet()),
            clock,
        );
        core.register(listener);
        Ok(core)
    }

    /// Register a component with the core
    pub fn register<T: LifecycleNode + 'static>(&mut self, component: T) {
        self.components.push(Box::new(component));
    }

    /// Initialize all registered components
    pub fn init(&mut self) -> Result<()> {
        for component in &mut self.components {
            component.on_configure()?;
            component.on_activate()?;
        }
        Ok(())
    }

    /// Shutdown all registered components
    pub fn shutdown(&mut self) -> Result<()> {
        for component in &mut self.components {
            component.on_deactivate()?;
            component.on_cleanup()?;
        }
        Ok(())
    }

    /// Get a reference to the telemetry listener
    pub fn telemetry_listener_mut(&mut self) -> Option<&mut TelemetryListener> {
        self.components
            .iter_mut()
            .find_map(|component| component.as_any_mut().downcast_mut::<TelemetryListener>())
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn fleet(&self) -> &Arc<Fleet> {
        self.coordinator.fleet()
    }

    /// Move robot `id` to `(x, y)`, deflecting around other robots as needed
    pub fn plan_and_execute(&self, id: RobotId, x: f64, y: f64) -> Result<PlanDecision> {
        self.coordinator.plan_and_execute(id, (x, y))
    }

    /// Apply a pose report; returns `true` if the robot was new
    pub fn update_pose(&self, id: RobotId, x: f64, y: f64, theta: f64) -> Result<bool> {
        self.fleet().update_pose(id, x, y, theta, self.coordinator.now_ms())
    }

    /// Space-time volumes currently claimed by every robot except `exclude`
    pub fn current_trajectories(&self, exclude: Option<RobotId>) -> Result<Vec<Obstacle>> {
        self.fleet().current_trajectories(exclude, self.coordinator.now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comms::RecordingSink;
    use crate::common::ManualClock;

    fn core() -> (FleetCore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10_000.0));
        let core = FleetCore::new(&FleetConfig::default(), Arc::new(RecordingSink::new()), clock.clone()).unwrap();
        (core, clock)
    }

    #[test]
    fn update_pose_registers_robots() {
        let (core, _) = core();
        assert!(core.update_pose(1, 0.0, 0.0, 0.0).unwrap());
        assert!(core.update_pose(2, 80.0, 0.0, 0.0).unwrap());
        assert!(!core.update_pose(1, 1.0, 0.0, 0.0).unwrap());

        let obstacles = core.current_trajectories(Some(1)).unwrap();
        assert_eq!(obstacles.len(), 1);
        assert_eq!(obstacles[0].owner, 2);
    }

    #[tokio::test]
    async fn committed_leg_shows_up_in_trajectories() {
        let (core, clock) = core();
        core.update_pose(1, 0.0, 0.0, 0.0).unwrap();
        core.update_pose(2, 0.0, 200.0, 0.0).unwrap();

        let decision = core.plan_and_execute(1, 100.0, 0.0).unwrap();
        assert!(matches!(decision, PlanDecision::Commit(_)));

        let seen_by_two = core.current_trajectories(Some(2)).unwrap();
        assert_eq!(seen_by_two.len(), 2);
        assert!(seen_by_two.iter().all(|o| o.owner == 1 && !o.is_stationary()));

        // Well after arrival the reservations have expired
        clock.advance(60_000.0);
        let seen_by_two = core.current_trajectories(Some(2)).unwrap();
        assert_eq!(seen_by_two.len(), 1);
        assert!(seen_by_two[0].is_stationary());
    }

    #[test]
    fn init_without_components_is_a_no_op() {
        let (mut core, _) = core();
        core.init().unwrap();
        assert!(core.telemetry_listener_mut().is_none());
        core.shutdown().unwrap();
    }
}
