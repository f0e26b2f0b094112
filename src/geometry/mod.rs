//! Space-time geometry
//!
//! X and Y are points on the floor plane and Z is time. A robot moving in a
//! straight line at constant speed traces a straight line in this space, and
//! the disc it occupies sweeps out a cylinder.

pub mod cylinder;
pub mod ray;

pub use cylinder::Cylinder;
pub use ray::Ray;

use crate::error::{FleetError, Result};
use nalgebra::Vector3;

/// A point or direction in (x, y, time) space.
///
/// Internally uses [`nalgebra::Vector3<f64>`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3D(pub Vector3<f64>);

impl Vector3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    pub fn x(&self) -> f64 {
        self.0.x
    }

    pub fn y(&self) -> f64 {
        self.0.y
    }

    /// Time coordinate
    pub fn z(&self) -> f64 {
        self.0.z
    }

    /// Length of this vector
    pub fn magnitude(&self) -> f64 {
        self.0.norm()
    }

    /// Sum of this and another vector
    pub fn add(&self, other: &Vector3D) -> Vector3D {
        Self(self.0 + other.0)
    }

    /// Difference of this and another vector
    pub fn minus(&self, other: &Vector3D) -> Vector3D {
        Self(self.0 - other.0)
    }

    /// This vector scaled by `s`
    pub fn scaled(&self, s: f64) -> Vector3D {
        Self(self.0 * s)
    }

    pub fn dot(&self, other: &Vector3D) -> f64 {
        self.0.dot(&other.0)
    }

    /// Unit vector in the same direction.
    ///
    /// Fails with [`FleetError::DegenerateVector`] for the zero vector.
    pub fn normalized(&self) -> Result<Vector3D> {
        let magnitude = self.magnitude();
        if magnitude > 0.0 && magnitude.is_finite() {
            Ok(self.scaled(1.0 / magnitude))
        } else {
            Err(FleetError::DegenerateVector)
        }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Vector3D) -> f64 {
        (other.0 - self.0).norm()
    }

    /// Distance in the floor plane, ignoring time
    pub fn planar_distance(&self, other: &Vector3D) -> f64 {
        let dx = other.x() - self.x();
        let dy = other.y() - self.y();
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalized_has_unit_length() {
        let samples = [
            Vector3D::new(3.0, 4.0, 0.0),
            Vector3D::new(-1.0, 2.0, 1500.0),
            Vector3D::new(1e-9, 0.0, 0.0),
            Vector3D::new(0.0, 0.0, -7.5),
        ];
        for v in samples {
            let unit = v.normalized().unwrap();
            assert_relative_eq!(unit.magnitude(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn normalizing_zero_vector_fails() {
        let zero = Vector3D::new(0.0, 0.0, 0.0);
        assert!(matches!(zero.normalized(), Err(FleetError::DegenerateVector)));
    }

    #[test]
    fn component_arithmetic() {
        let a = Vector3D::new(1.0, 2.0, 3.0);
        let b = Vector3D::new(-4.0, 0.5, 2.0);
        assert_eq!(a.add(&b), Vector3D::new(-3.0, 2.5, 5.0));
        assert_eq!(a.minus(&b), Vector3D::new(5.0, 1.5, 1.0));
        assert_eq!(a.scaled(2.0), Vector3D::new(2.0, 4.0, 6.0));
        assert_relative_eq!(a.dot(&b), -4.0 + 1.0 + 6.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Vector3D::new(0.0, 0.0, 0.0);
        let b = Vector3D::new(3.0, 4.0, 12.0);
        assert_relative_eq!(a.distance(&b), 13.0);
        assert_relative_eq!(b.distance(&a), 13.0);
        assert_relative_eq!(a.planar_distance(&b), 5.0);
    }
}
