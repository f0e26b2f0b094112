//! Controllers for the robot

use super::commands::MotorCommand;
use crate::common::types::Point2D;
use std::f64::consts::PI;

/// Working units (cm) travelled per encoder tick
pub const UNITS_PER_TICK: f64 = 0.325;

/// Turn ticks for a full revolution in place
pub const TURN_TICKS_PER_REVOLUTION: f64 = 100.0;

/// Normalize an angle to (-pi, pi]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Turn-then-drive controller for differential drive robots
#[derive(Debug, Clone)]
pub struct DriveController {
    /// Subtracted from a robot's max speed
    speed_margin: f64,
}

impl DriveController {
    /// Create a new controller
    pub fn new(speed_margin: f64) -> Self {
        DriveController { speed_margin }
    }

    /// Signed turn in degrees, in (-180, 180], to face `to` from `from`.
    ///
    /// An unknown heading is treated as facing along +x.
    pub fn turn_angle_degrees(&self, heading: Option<f64>, from: Point2D, to: Point2D) -> f64 {
        let bearing = (to.1 - from.1).atan2(to.0 - from.0);
        normalize_angle(bearing - heading.unwrap_or(0.0)).to_degrees()
    }

    /// Encoder ticks per wheel for a turn of `degrees`
    pub fn turn_ticks(&self, degrees: f64) -> i16 {
        let ticks = (TURN_TICKS_PER_REVOLUTION * degrees / 360.0).round();
        ticks.clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }

    pub fn turn_command(&self, degrees: f64) -> MotorCommand {
        MotorCommand::turn(self.turn_ticks(degrees))
    }

    /// Wheel speed used for a robot with the given max speed
    pub fn commanded_speed(&self, max_speed: f64) -> f64 {
        (max_speed - self.speed_margin).max(1.0)
    }

    pub fn drive_command(&self, speed: f64) -> MotorCommand {
        MotorCommand::drive(speed.round().clamp(0.0, i16::MAX as f64) as i16)
    }

    /// Time in milliseconds to drive `distance` working units at `speed` ticks/s
    pub fn travel_time_ms(&self, distance: f64, speed: f64) -> f64 {
        distance / UNITS_PER_TICK / speed * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn angles_wrap_into_half_open_range() {
        assert_relative_eq!(normalize_angle(3.0 * PI), PI, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(-0.5), -0.5, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(2.0 * PI + 0.25), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn turn_angle_is_relative_to_heading() {
        let controller = DriveController::new(15.0);
        let origin = (0.0, 0.0);

        assert_relative_eq!(controller.turn_angle_degrees(Some(0.0), origin, (100.0, 0.0)), 0.0);
        assert_relative_eq!(
            controller.turn_angle_degrees(Some(0.0), origin, (0.0, 10.0)),
            90.0,
            epsilon = 1e-9
        );
        // Facing +y, target behind-right: shortest turn is clockwise
        assert_relative_eq!(
            controller.turn_angle_degrees(Some(PI / 2.0), origin, (10.0, -10.0)),
            -135.0,
            epsilon = 1e-9
        );
        // Directly behind turns the positive way
        assert_relative_eq!(
            controller.turn_angle_degrees(Some(0.0), origin, (-10.0, 0.0)),
            180.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn unknown_heading_faces_x_axis() {
        let controller = DriveController::new(15.0);
        assert_relative_eq!(
            controller.turn_angle_degrees(None, (0.0, 0.0), (0.0, -5.0)),
            -90.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn turn_ticks_scale_with_degrees() {
        let controller = DriveController::new(15.0);
        assert_eq!(controller.turn_ticks(90.0), 25);
        assert_eq!(controller.turn_ticks(-180.0), -50);
        assert_eq!(
            controller.turn_command(90.0),
            MotorCommand::Turn { left: 25, right: -25 }
        );
    }

    #[test]
    fn travel_time_uses_tick_conversion() {
        let controller = DriveController::new(15.0);
        let speed = controller.commanded_speed(65.0);
        assert_relative_eq!(speed, 50.0);
        assert_relative_eq!(controller.travel_time_ms(32.5, speed), 2000.0, epsilon = 1e-9);
        assert_eq!(controller.drive_command(speed), MotorCommand::drive(50));
    }
}
