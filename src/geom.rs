//! Geometry primitives shared by every panning subsystem.
//!
//! Positions, angle-range predicates, and the local coordinate frame used by
//! extent conversion. Cartesian/unit-vector algebra itself is delegated to
//! `glam`, the same way the donor panner math does.

use glam::{DMat3, DVec3};

/// A polar position: azimuth and elevation in degrees, distance in `[0, 1]`.
///
/// Azimuth convention follows ITU-R BS.2127: `0°` is straight ahead, positive
/// azimuth is to the left, in `(-180, 180]`. Elevation is in `[-90, 90]`,
/// positive is up.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolarPosition {
    pub azimuth: f64,
    pub elevation: f64,
    pub distance: f64,
}

impl PolarPosition {
    pub fn new(azimuth: f64, elevation: f64, distance: f64) -> Self {
        Self {
            azimuth,
            elevation,
            distance,
        }
    }

    /// Unit direction vector, ignoring distance.
    pub fn direction(&self) -> DVec3 {
        let (az_sin, az_cos) = self.azimuth.to_radians().sin_cos();
        let (el_sin, el_cos) = self.elevation.to_radians().sin_cos();
        DVec3::new(-az_sin * el_cos, az_cos * el_cos, el_sin)
    }

    /// Cartesian point at `azimuth`/`elevation`/`distance` (not the ADM cube
    /// mapping — see [`crate::adm_conversion`] for that piecewise remap).
    pub fn to_point(&self) -> DVec3 {
        self.direction() * self.distance.max(0.0)
    }
}

/// A cartesian position, typically inside the unit cube for ADM-cartesian
/// metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CartesianPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn as_vec3(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    pub fn from_vec3(v: DVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// A position that is either polar or cartesian, carrying an `is_polar`
/// predicate the way the parent ADM schema tags `position` by the object's
/// `cartesian` flag.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Position {
    Polar(PolarPosition),
    Cartesian(CartesianPosition),
}

impl Position {
    pub fn is_polar(&self) -> bool {
        matches!(self, Position::Polar(_))
    }

    pub fn as_polar(&self) -> Option<PolarPosition> {
        match self {
            Position::Polar(p) => Some(*p),
            Position::Cartesian(_) => None,
        }
    }

    pub fn as_cartesian(&self) -> Option<CartesianPosition> {
        match self {
            Position::Cartesian(c) => Some(*c),
            Position::Polar(_) => None,
        }
    }
}

/// Tolerance used throughout the panning pipeline for "non-negative enough"
/// and boundary-inclusive comparisons.
pub const EPSILON: f64 = 1e-6;

/// True when `az` (degrees) lies on the arc swept anti-clockwise from
/// `start` to `end`, inclusive on both ends within `tol`. `end < start`
/// denotes a wrap-around arc through +/-180.
pub fn inside_angle_range(az: f64, start: f64, end: f64, tol: f64) -> bool {
    let az = normalize_angle(az);
    let start = normalize_angle(start);
    let mut end = normalize_angle(end);
    if end < start {
        end += 360.0;
    }
    let rel = relative_angle(start, az);
    rel >= -tol && rel <= (end - start) + tol
}

/// Wrap `az` into `[0, 360)`.
fn normalize_angle(az: f64) -> f64 {
    let mut a = az % 360.0;
    if a < 0.0 {
        a += 360.0;
    }
    a
}

/// The representative of `az` in `[reference, reference + 360)`.
pub fn relative_angle(reference: f64, az: f64) -> f64 {
    let mut rel = az - reference;
    rel %= 360.0;
    if rel < 0.0 {
        rel += 360.0;
    }
    rel
}

/// Rows are the local right/front/up unit vectors at direction
/// `(azimuth, elevation)`, i.e. the frame that extent conversion rotates the
/// (width, height, depth) box into before applying `whd2xyz`.
pub fn local_coordinate_system(azimuth: f64, elevation: f64) -> DMat3 {
    let front = PolarPosition::new(azimuth, elevation, 1.0).direction();
    let up_hint = DVec3::Z;
    let mut right = front.cross(up_hint);
    if right.length_squared() < 1e-12 {
        // front is coincident with the pole: pick an arbitrary right vector.
        right = DVec3::X;
    } else {
        right = right.normalize();
    }
    let up = right.cross(front).normalize();
    // glam matrices are column-major; build from rows via transpose so that
    // `local_coordinate_system(...) * v` expresses `v` (given in the local
    // frame) back in the world frame, and the inverse does the opposite.
    DMat3::from_cols(right, front, up).transpose()
}
