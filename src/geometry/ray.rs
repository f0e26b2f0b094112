//! Rays in space-time

use super::Vector3D;
use crate::error::Result;

/// A ray with an origin and a unit direction.
///
/// When built from two timed positions it describes straight-line motion
/// between them: the z components carry the start and end times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vector3D,
    pub direction: Vector3D,
}

impl Ray {
    /// Ray from `p1` towards `p2`. Fails if the two points coincide.
    pub fn through(p1: Vector3D, p2: Vector3D) -> Result<Self> {
        let direction = p2.minus(&p1).normalized()?;
        Ok(Ray {
            origin: p1,
            direction,
        })
    }

    pub fn new(x1: f64, y1: f64, z1: f64, x2: f64, y2: f64, z2: f64) -> Result<Self> {
        Self::through(Vector3D::new(x1, y1, z1), Vector3D::new(x2, y2, z2))
    }

    /// Point at parameter `t` (distance along the ray)
    pub fn point_at(&self, t: f64) -> Vector3D {
        self.origin.add(&self.direction.scaled(t))
    }

    /// Parameter of the orthogonal projection of `point` onto the ray's line
    pub fn project(&self, point: &Vector3D) -> f64 {
        point.minus(&self.origin).dot(&self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FleetError;
    use approx::assert_relative_eq;

    #[test]
    fn coincident_points_are_rejected() {
        let result = Ray::new(1.0, 1.0, 5.0, 1.0, 1.0, 5.0);
        assert!(matches!(result, Err(FleetError::DegenerateVector)));
    }

    #[test]
    fn point_at_walks_the_direction() {
        let ray = Ray::new(0.0, 0.0, 0.0, 30.0, 40.0, 0.0).unwrap();
        let p = ray.point_at(50.0);
        assert_relative_eq!(p.x(), 30.0, epsilon = 1e-9);
        assert_relative_eq!(p.y(), 40.0, epsilon = 1e-9);
        assert_relative_eq!(ray.project(&p), 50.0, epsilon = 1e-9);
    }
}
