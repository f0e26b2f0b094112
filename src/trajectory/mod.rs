//! Trajectory reservations
//!
//! Every leg a robot commits to is recorded as a cylinder in (x, y, time)
//! space. The ledger holds one robot's reservations until their time window
//! has passed.

use crate::common::types::RobotId;
use crate::error::{FleetError, Result};
use crate::geometry::{Cylinder, Vector3D};

/// What a reservation stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationKind {
    /// Robot stays at a point, e.g. while turning in place
    Holding,
    /// Robot drives a straight leg
    Travel,
}

/// A claimed space-time tube owned by one robot
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub owner: RobotId,
    pub kind: ReservationKind,
    /// When the robot enters the tube (ms)
    pub start_ms: f64,
    pub duration_ms: f64,
    pub cylinder: Cylinder,
}

impl Reservation {
    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms
    }

    /// Whether the whole time window lies before `now_ms`
    pub fn is_expired(&self, now_ms: f64) -> bool {
        self.end_ms() < now_ms
    }
}

/// Per-robot list of active reservations
#[derive(Debug, Clone)]
pub struct TrajectoryLedger {
    owner: RobotId,
    reservation_radius: f64,
    reservations: Vec<Reservation>,
}

impl TrajectoryLedger {
    /// Create an empty ledger. `reservation_radius` is the tube radius used
    /// for every reservation, normally twice the robot radius plus a margin.
    pub fn new(owner: RobotId, reservation_radius: f64) -> Self {
        TrajectoryLedger {
            owner,
            reservation_radius,
            reservations: Vec::new(),
        }
    }

    pub fn owner(&self) -> RobotId {
        self.owner
    }

    pub fn reservation_radius(&self) -> f64 {
        self.reservation_radius
    }

    /// Reserve the straight move from `(x1, y1)` to `(x2, y2)` that starts
    /// `start_offset_ms` after `now_ms` and lasts `duration_ms`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_trajectory(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        duration_ms: f64,
        start_offset_ms: f64,
        kind: ReservationKind,
        now_ms: f64,
    ) -> Result<&Reservation> {
        if !(duration_ms > 0.0) {
            return Err(FleetError::DegenerateGeometry(format!(
                "reservation duration must be positive, got {}",
                duration_ms
            )));
        }

        let start_ms = now_ms + start_offset_ms;
        let from = Vector3D::new(x1, y1, start_ms);
        let to = Vector3D::new(x2, y2, start_ms + duration_ms);

        let cylinder = Cylinder::new(
            x1,
            y1,
            start_ms,
            x2,
            y2,
            start_ms + duration_ms,
            self.reservation_radius,
            from.distance(&to),
        )?;

        self.reservations.push(Reservation {
            owner: self.owner,
            kind,
            start_ms,
            duration_ms,
            cylinder,
        });

        let index = self.reservations.len() - 1;
        Ok(&self.reservations[index])
    }

    /// Drop every reservation whose window ended before `now_ms`.
    ///
    /// Returns how many were removed.
    pub fn prune_expired(&mut self, now_ms: f64) -> usize {
        let before = self.reservations.len();
        self.reservations.retain(|r| !r.is_expired(now_ms));
        before - self.reservations.len()
    }

    /// Reservations that have not expired at `now_ms`
    pub fn active(&self, now_ms: f64) -> impl Iterator<Item = &Reservation> {
        self.reservations.iter().filter(move |r| !r.is_expired(now_ms))
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    pub fn clear(&mut self) {
        self.reservations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reservation_is_present_until_window_passes() {
        let mut ledger = TrajectoryLedger::new(7, 25.0);
        ledger
            .add_trajectory(0.0, 0.0, 100.0, 0.0, 6000.0, 0.0, ReservationKind::Travel, 1000.0)
            .unwrap();

        assert_eq!(ledger.active(1000.0).count(), 1);
        assert_eq!(ledger.prune_expired(6999.0), 0);
        assert_eq!(ledger.prune_expired(7000.0), 0);
        assert_eq!(ledger.prune_expired(7000.5), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn start_offset_delays_the_window() {
        let mut ledger = TrajectoryLedger::new(1, 25.0);
        let reservation = ledger
            .add_trajectory(0.0, 0.0, 0.0, 0.0, 2000.0, 500.0, ReservationKind::Holding, 100.0)
            .unwrap()
            .clone();

        assert_relative_eq!(reservation.start_ms, 600.0);
        assert_relative_eq!(reservation.end_ms(), 2600.0);
        assert_relative_eq!(reservation.cylinder.radius, 25.0);
        assert_relative_eq!(reservation.cylinder.extent, 2000.0);
        assert_eq!(reservation.owner, 1);
    }

    #[test]
    fn travel_cylinder_spans_the_leg() {
        let mut ledger = TrajectoryLedger::new(1, 10.0);
        let reservation = ledger
            .add_trajectory(0.0, 0.0, 30.0, 40.0, 120.0, 0.0, ReservationKind::Travel, 0.0)
            .unwrap()
            .clone();

        let end = reservation.cylinder.axis.point_at(reservation.cylinder.extent);
        assert_relative_eq!(end.x(), 30.0, epsilon = 1e-9);
        assert_relative_eq!(end.y(), 40.0, epsilon = 1e-9);
        assert_relative_eq!(end.z(), 120.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let mut ledger = TrajectoryLedger::new(1, 10.0);
        let result = ledger.add_trajectory(0.0, 0.0, 1.0, 1.0, 0.0, 0.0, ReservationKind::Travel, 0.0);
        assert!(matches!(result, Err(FleetError::DegenerateGeometry(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn prune_keeps_only_live_entries() {
        let mut ledger = TrajectoryLedger::new(3, 10.0);
        ledger
            .add_trajectory(0.0, 0.0, 0.0, 0.0, 100.0, 0.0, ReservationKind::Holding, 0.0)
            .unwrap();
        ledger
            .add_trajectory(0.0, 0.0, 50.0, 0.0, 1000.0, 100.0, ReservationKind::Travel, 0.0)
            .unwrap();

        assert_eq!(ledger.prune_expired(500.0), 1);
        let remaining: Vec<_> = ledger.active(500.0).map(|r| r.kind).collect();
        assert_eq!(remaining, vec![ReservationKind::Travel]);
    }
}
