//! Cylinders in space-time and the ray/cylinder collision oracle

use super::{Ray, Vector3D};
use crate::error::{FleetError, Result};
use std::f64::consts::FRAC_PI_2;

/// Below this squared length the ray is treated as parallel to the axis
pub const PARALLEL_EPSILON: f64 = 1e-12;

/// Length of the time window used for the axis of a stationary robot
pub const STATIONARY_WINDOW_MS: f64 = 1.0;

/// A tube of radius `radius` around an axis ray.
///
/// `extent` is the length of the tube along its axis, measured from the axis
/// origin. `f64::INFINITY` means the tube never ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    pub axis: Ray,
    pub radius: f64,
    pub extent: f64,
}

/// How a ray's line meets the infinite tube
#[derive(Debug, Clone, Copy, PartialEq)]
enum Crossing {
    Miss,
    /// Parallel to the axis and inside the tube along its whole length
    Parallel,
    Through { t_near: f64, t_far: f64 },
}

impl Cylinder {
    /// Cylinder whose axis runs from `(x1, y1, z1)` towards `(x2, y2, z2)`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x1: f64,
        y1: f64,
        z1: f64,
        x2: f64,
        y2: f64,
        z2: f64,
        radius: f64,
        extent: f64,
    ) -> Result<Self> {
        Self::from_axis(Ray::new(x1, y1, z1, x2, y2, z2)?, radius, extent)
    }

    pub fn from_axis(axis: Ray, radius: f64, extent: f64) -> Result<Self> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(FleetError::DegenerateGeometry(format!(
                "cylinder radius must be positive, got {}",
                radius
            )));
        }
        if !(extent > 0.0) {
            return Err(FleetError::DegenerateGeometry(format!(
                "cylinder extent must be positive, got {}",
                extent
            )));
        }
        Ok(Cylinder {
            axis,
            radius,
            extent,
        })
    }

    /// Upright, unbounded cylinder standing at `(x, y)` from `start_ms` onwards
    pub fn stationary(x: f64, y: f64, start_ms: f64, radius: f64) -> Result<Self> {
        Self::new(
            x,
            y,
            start_ms,
            x,
            y,
            start_ms + STATIONARY_WINDOW_MS,
            radius,
            f64::INFINITY,
        )
    }

    pub fn origin(&self) -> Vector3D {
        self.axis.origin
    }

    pub fn direction(&self) -> Vector3D {
        self.axis.direction
    }

    /// Coefficients of `a t² + b t + c`, the squared distance of `ray(t)` from
    /// the axis minus the squared radius.
    fn coefficients(&self, ray: &Ray) -> (f64, f64, f64) {
        let axis = self.direction();
        let dot1 = ray.direction.dot(&axis);
        let deltap = ray.origin.minus(&self.origin());
        let dot2 = deltap.dot(&axis);

        let a_vec = ray.direction.minus(&axis.scaled(dot1));
        let c_vec = deltap.minus(&axis.scaled(dot2));

        let a = a_vec.dot(&a_vec);
        let b = 2.0 * a_vec.dot(&c_vec);
        let c = c_vec.dot(&c_vec) - self.radius * self.radius;
        (a, b, c)
    }

    fn crossing(&self, ray: &Ray) -> Crossing {
        let (a, b, c) = self.coefficients(ray);

        // Parallel lines never cross the wall; the distance between them is fixed
        if a < PARALLEL_EPSILON {
            return if c <= 0.0 {
                Crossing::Parallel
            } else {
                Crossing::Miss
            };
        }

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return Crossing::Miss;
        }

        let root = discriminant.sqrt();
        let t1 = (-b + root) / (2.0 * a);
        let t2 = (-b - root) / (2.0 * a);
        Crossing::Through {
            t_near: t2,
            t_far: t1,
        }
    }

    /// Whether the line of `ray` enters the tube.
    ///
    /// The axial extent is not considered, and neither is the sign of the ray
    /// parameter: this is the existence test of the quadratic only. Use
    /// [`Cylinder::conflict_span`] for a bounded check.
    pub fn collides(&self, ray: &Ray) -> bool {
        !matches!(self.crossing(ray), Crossing::Miss)
    }

    /// Where the line of `ray` meets the tube wall.
    ///
    /// Returns the points at `t1 = (-b + √disc) / 2a` and `t2 = (-b - √disc) / 2a`
    /// in that order. A ray running parallel inside the tube reports its own
    /// origin twice.
    pub fn collides_at(&self, ray: &Ray) -> Option<[Vector3D; 2]> {
        match self.crossing(ray) {
            Crossing::Miss => None,
            Crossing::Parallel => Some([ray.origin, ray.origin]),
            Crossing::Through { t_near, t_far } => Some([ray.point_at(t_far), ray.point_at(t_near)]),
        }
    }

    /// Range of ray parameters inside the tube, restricted to the first
    /// `ray_length` units of the ray and to the tube's own axial extent.
    pub fn conflict_span(&self, ray: &Ray, ray_length: f64) -> Option<(f64, f64)> {
        let (mut enter, mut exit) = match self.crossing(ray) {
            Crossing::Miss => return None,
            Crossing::Parallel => (f64::NEG_INFINITY, f64::INFINITY),
            Crossing::Through { t_near, t_far } => (t_near, t_far),
        };

        enter = enter.max(0.0);
        exit = exit.min(ray_length);

        // Axial position of ray(t) is linear in t: s(t) = s0 + k t
        let s0 = ray.origin.minus(&self.origin()).dot(&self.direction());
        let k = ray.direction.dot(&self.direction());
        if k.abs() < PARALLEL_EPSILON {
            if s0 < 0.0 || s0 > self.extent {
                return None;
            }
        } else {
            let ta = -s0 / k;
            let tb = (self.extent - s0) / k;
            enter = enter.max(ta.min(tb));
            exit = exit.min(ta.max(tb));
        }

        if enter <= exit {
            Some((enter, exit))
        } else {
            None
        }
    }

    /// Centre of the cross-section at time `z`
    pub fn axis_point_at_time(&self, z: f64) -> Result<Vector3D> {
        let dz = self.direction().z();
        if dz.abs() < PARALLEL_EPSILON {
            return Err(FleetError::DegenerateGeometry(
                "cylinder axis has no time component".to_string(),
            ));
        }
        let t = (z - self.origin().z()) / dz;
        Ok(self.axis.point_at(t))
    }

    /// Points on the cross-section circle at time `z` whose tangent lines pass
    /// through `(x, y)`.
    ///
    /// The first point is the clockwise one as seen from the circle centre.
    /// Fails when `(x, y)` is on or inside the circle.
    pub fn circle_tangents(&self, x: f64, y: f64, z: f64) -> Result<[Vector3D; 2]> {
        let centre = self.axis_point_at_time(z)?;

        // Move circle to origin
        let px = x - centre.x();
        let py = y - centre.y();

        let d = (px * px + py * py).sqrt();
        if !(d > self.radius) {
            return Err(FleetError::DegenerateGeometry(format!(
                "point ({:.2}, {:.2}) is {:.2} from the obstacle centre, inside radius {:.2}",
                x, y, d, self.radius
            )));
        }

        let a = (self.radius / d).asin();
        let b = py.atan2(px);

        // Angle at the centre between the point and each tangent point
        let spread = FRAC_PI_2 - a;

        let t = b - spread;
        let p1 = Vector3D::new(
            centre.x() + self.radius * t.cos(),
            centre.y() + self.radius * t.sin(),
            z,
        );

        let t = b + spread;
        let p2 = Vector3D::new(
            centre.x() + self.radius * t.cos(),
            centre.y() + self.radius * t.sin(),
            z,
        );

        Ok([p1, p2])
    }
}
