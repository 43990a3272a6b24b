//! ADM polar <-> cartesian metadata conversion.
//!
//! This is a piecewise, non-linear remapping between the polar
//! (azimuth/elevation/distance) and cartesian (x, y, z) ADM position
//! conventions — distinct from the plain spherical-to-cartesian conversion in
//! [`crate::geom`], which is used for ordinary direction vectors inside the
//! panners. See `DESIGN.md` for the calibration this module settles on where
//! the parent formula's reference frame is ambiguous without the filtered
//! reference source.

use crate::geom::{CartesianPosition, PolarPosition};

/// One of the five azimuth sectors of the ADM polar/cartesian mapping,
/// identified by its two boundary azimuths (in the "clockwise, starting at
/// +30" unwrapped representation used internally to avoid wrap-around
/// arithmetic) and the cube-corner vertex at each boundary.
struct AzSector {
    az_l: f64,
    az_r: f64,
    v_l: (f64, f64),
    v_r: (f64, f64),
}

/// Sectors in decreasing-azimuth (clockwise) order, unwrapped so that
/// `az_l > az_r` always holds, per §4.2.
const AZ_SECTORS: [AzSector; 5] = [
    AzSector {
        az_l: 30.0,
        az_r: 0.0,
        v_l: (-1.0, 1.0),
        v_r: (0.0, 1.0),
    },
    AzSector {
        az_l: 0.0,
        az_r: -30.0,
        v_l: (0.0, 1.0),
        v_r: (1.0, 1.0),
    },
    AzSector {
        az_l: -30.0,
        az_r: -110.0,
        v_l: (1.0, 1.0),
        v_r: (1.0, -1.0),
    },
    AzSector {
        az_l: -110.0,
        az_r: -250.0, // == 110 deg, wrapped through +/-180
        v_l: (1.0, -1.0),
        v_r: (-1.0, -1.0),
    },
    AzSector {
        az_l: -250.0, // == 110 deg
        az_r: -330.0, // == 30 deg
        v_l: (-1.0, -1.0),
        v_r: (-1.0, 1.0),
    },
];

/// Find the sector containing `az` (degrees, any representation) and the
/// unwrapped azimuth value that lies within `[sector.az_r, sector.az_l]`.
fn find_sector(az: f64) -> (&'static AzSector, f64) {
    for sector in &AZ_SECTORS {
        for k in [-360.0, 0.0, 360.0] {
            let candidate = az + k;
            if candidate <= sector.az_l + 1e-9 && candidate >= sector.az_r - 1e-9 {
                return (sector, candidate);
            }
        }
    }
    // Unreachable for finite az: the five sectors tile the full circle.
    (&AZ_SECTORS[0], az)
}

/// `MapAzToLinear(azL, azR, az) = (2/pi) * atan2(g_r, 1 - g_r)`, with `g_r`
/// computed relative to the sector midpoint so that it is 0 at `az_l`, 0.5 at
/// the sector centre, and 1 at `az_r` — the only calibration of the parent
/// formula that is monotonic and invertible across the whole sector.
fn map_az_to_linear(az_l: f64, az_r: f64, az: f64) -> f64 {
    let half_range = (az_l - az_r) / 2.0;
    let centre = (az_l + az_r) / 2.0;
    let az_rel = az - centre;
    if half_range.abs() < 1e-12 {
        return 0.5;
    }
    let g_r = 0.5 * (1.0 + az_rel.to_radians().tan() / half_range.to_radians().tan());
    let g_r = g_r.clamp(0.0, 1.0);
    (2.0 / std::f64::consts::PI) * g_r.atan2(1.0 - g_r)
}

/// Inverse of [`map_az_to_linear`]: given a fraction `p` in `[0, 1]` and the
/// same sector boundaries, recover the azimuth.
fn map_linear_to_az(az_l: f64, az_r: f64, p: f64) -> f64 {
    let half_range = (az_l - az_r) / 2.0;
    let centre = (az_l + az_r) / 2.0;
    if half_range.abs() < 1e-12 {
        return centre;
    }
    let theta = p.clamp(0.0, 1.0) * std::f64::consts::PI / 2.0;
    let g_r = theta.tan() / (1.0 + theta.tan());
    let ratio = (2.0 * g_r - 1.0).clamp(-1.0 + 1e-12, 1.0 - 1e-12);
    let az_rel = (ratio * half_range.to_radians().tan()).atan().to_degrees();
    centre + az_rel
}

/// Piecewise-linear elevation remap: `|el| <= 30` maps linearly onto
/// `|el'| <= 45`; `|el| > 30` maps linearly into `(45, 90]`.
fn elevation_to_linear(el: f64) -> f64 {
    let sign = el.signum();
    let mag = el.abs();
    if mag <= 30.0 {
        sign * mag * (45.0 / 30.0)
    } else {
        sign * (45.0 + (mag - 30.0) * (45.0 / 60.0))
    }
}

fn linear_to_elevation(el_linear: f64) -> f64 {
    let sign = el_linear.signum();
    let mag = el_linear.abs();
    if mag <= 45.0 {
        sign * mag * (30.0 / 45.0)
    } else {
        sign * (30.0 + (mag - 45.0) * (60.0 / 45.0))
    }
}

/// Convert an ADM polar position to its ADM cartesian equivalent.
///
/// The horizontal direction is read off the cube-perimeter vertex
/// interpolation of §4.2; elevation squeezes that perimeter point toward the
/// pole as `|elevation|` approaches 90, so the result always has Chebyshev
/// norm `distance` (the cube-surface analogue of a unit sphere).
pub fn point_polar_to_cart(p: PolarPosition) -> CartesianPosition {
    let el_linear = elevation_to_linear(p.elevation);
    let t = (el_linear.abs() / 90.0).clamp(0.0, 1.0);

    let (sector, az_unwrapped) = find_sector(p.azimuth);
    let frac = map_az_to_linear(sector.az_l, sector.az_r, az_unwrapped);
    let gx = sector.v_l.0 + (sector.v_r.0 - sector.v_l.0) * frac;
    let gy = sector.v_l.1 + (sector.v_r.1 - sector.v_l.1) * frac;

    let x = (1.0 - t) * gx;
    let y = (1.0 - t) * gy;
    let z = el_linear.signum() * t;

    let dist = p.distance.max(0.0);
    CartesianPosition::new(x * dist, y * dist, z * dist)
}

/// Inverse of [`point_polar_to_cart`]. The `x == y == 0` case (directly
/// above/below, or at the origin) maps to `(0, +/-90, |z|)` per §4.2.
pub fn point_cart_to_polar(c: CartesianPosition) -> PolarPosition {
    let dist = c.x.abs().max(c.y.abs()).max(c.z.abs());
    if dist < 1e-12 {
        return PolarPosition::new(0.0, 0.0, 0.0);
    }
    let (ux, uy, uz) = (c.x / dist, c.y / dist, c.z / dist);

    if ux.abs() < 1e-9 && uy.abs() < 1e-9 {
        let el = if uz >= 0.0 { 90.0 } else { -90.0 };
        return PolarPosition::new(0.0, el, dist);
    }

    let t = uz.abs();
    let el_linear = uz.signum() * t * 90.0;
    let elevation = linear_to_elevation(el_linear);

    let denom = (1.0 - t).max(1e-9);
    let gx = ux / denom;
    let gy = uy / denom;

    let sector = AZ_SECTORS
        .iter()
        .min_by(|a, b| {
            edge_distance(a, gx, gy)
                .total_cmp(&edge_distance(b, gx, gy))
        })
        .expect("AZ_SECTORS is non-empty");

    let frac = edge_fraction(sector, gx, gy);
    let azimuth = wrap_azimuth(map_linear_to_az(sector.az_l, sector.az_r, frac));

    PolarPosition::new(azimuth, elevation, dist)
}

/// Squared distance from `(gx, gy)` to the segment `v_l -> v_r` of a sector,
/// used to pick the sector whose edge the horizontal point actually lies on.
fn edge_distance(sector: &AzSector, gx: f64, gy: f64) -> f64 {
    let (lx, ly) = sector.v_l;
    let (rx, ry) = sector.v_r;
    let (dx, dy) = (rx - lx, ry - ly);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq < 1e-12 {
        0.0
    } else {
        (((gx - lx) * dx + (gy - ly) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (px, py) = (lx + dx * t, ly + dy * t);
    (gx - px).powi(2) + (gy - py).powi(2)
}

fn edge_fraction(sector: &AzSector, gx: f64, gy: f64) -> f64 {
    let (lx, ly) = sector.v_l;
    let (rx, ry) = sector.v_r;
    let (dx, dy) = (rx - lx, ry - ly);
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-12 {
        0.0
    } else {
        (((gx - lx) * dx + (gy - ly) * dy) / len_sq).clamp(0.0, 1.0)
    }
}

fn wrap_azimuth(az: f64) -> f64 {
    let mut a = az % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// `whd2xyz`: convert ADM width/height/depth (degrees, degrees, `[0,1]`) to
/// the three independent extent-size components used by the extent panners.
pub fn whd_to_xyz(width: f64, height: f64, depth: f64) -> (f64, f64, f64) {
    let s_x = if width < 180.0 {
        (width.to_radians() / 2.0).sin()
    } else {
        1.0
    };
    let s_z = if height < 180.0 {
        (height.to_radians() / 2.0).sin()
    } else {
        1.0
    };
    let half_cos_w = 0.5 * (1.0 - (width.to_radians() / 2.0).cos());
    let half_cos_h = 0.5 * (1.0 - (height.to_radians() / 2.0).cos());
    let s_y = half_cos_w.max(half_cos_h).max(depth);
    (s_x, s_y, s_z)
}

/// Inverse of [`whd_to_xyz`]. Depth recovery is lossy when the original
/// depth was smaller than the width/height floor it was `max`-ed against in
/// the forward direction — this matches §4.2's "non-degenerate extent"
/// caveat (property 5 of §8 assumes depth is the dominant term).
pub fn xyz_to_whd(s_x: f64, s_y: f64, s_z: f64) -> (f64, f64, f64) {
    let width = 2.0 * s_x.clamp(-1.0, 1.0).asin().to_degrees();
    let height = 2.0 * s_z.clamp(-1.0, 1.0).asin().to_degrees();
    let half_cos_w = 0.5 * (1.0 - (width.to_radians() / 2.0).cos());
    let half_cos_h = 0.5 * (1.0 - (height.to_radians() / 2.0).cos());
    let depth = (s_y - half_cos_w.max(half_cos_h)).max(0.0);
    (width, height, depth)
}

/// Rotate an extent vector (already in `(right, front, up)` local
/// coordinates) into world space using the local coordinate frame at
/// `position`, per §4.2's "directional extent" rule. A position at the
/// origin (distance 0) leaves the extent unrotated.
pub fn rotate_extent_to_world(position: PolarPosition, extent_xyz: glam::DVec3) -> glam::DVec3 {
    if position.distance < 1e-9 {
        return extent_xyz;
    }
    let frame = crate::geom::local_coordinate_system(position.azimuth, position.elevation);
    frame * extent_xyz
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn point_polar_to_cart_front() {
        let c = point_polar_to_cart(PolarPosition::new(0.0, 0.0, 1.0));
        assert_relative_eq!(c.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(c.y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(c.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn point_polar_to_cart_above() {
        let c = point_polar_to_cart(PolarPosition::new(45.0, 90.0, 1.0));
        assert_relative_eq!(c.x, 0.0, epsilon = 1e-8);
        assert_relative_eq!(c.y, 0.0, epsilon = 1e-8);
        assert_relative_eq!(c.z, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn round_trip_many_directions() {
        for az in [-179.0, -110.0, -90.0, -45.0, -10.0, 0.0, 10.0, 45.0, 90.0, 110.0, 170.0] {
            for el in [-89.0, -60.0, -30.0, -5.0, 0.0, 5.0, 30.0, 60.0, 89.0] {
                let p = PolarPosition::new(az, el, 1.0);
                let c = point_polar_to_cart(p);
                let back = point_cart_to_polar(c);
                assert_relative_eq!(back.distance, 1.0, epsilon = 1e-6);
                let c2 = point_polar_to_cart(back);
                assert_relative_eq!(c.x, c2.x, epsilon = 1e-6);
                assert_relative_eq!(c.y, c2.y, epsilon = 1e-6);
                assert_relative_eq!(c.z, c2.z, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn whd_xyz_round_trip_dominant_depth() {
        for (w, h, d) in [(60.0, 40.0, 0.9), (10.0, 10.0, 0.95), (170.0, 5.0, 0.99)] {
            let (sx, sy, sz) = whd_to_xyz(w, h, d);
            let (w2, h2, d2) = xyz_to_whd(sx, sy, sz);
            assert_relative_eq!(w, w2, epsilon = 1e-6);
            assert_relative_eq!(h, h2, epsilon = 1e-6);
            assert_relative_eq!(d, d2, epsilon = 1e-6);
        }
    }

    #[test]
    fn whd_xyz_full_surround_caps_at_one() {
        let (sx, sy, sz) = whd_to_xyz(200.0, 200.0, 1.0);
        assert_relative_eq!(sx, 1.0, epsilon = 1e-12);
        assert_relative_eq!(sz, 1.0, epsilon = 1e-12);
        assert_relative_eq!(sy, 1.0, epsilon = 1e-12);
    }

    proptest! {
        /// §8 property 4: `PointCartToPolar(PointPolarToCart(p)) ~= p` for
        /// every in-domain `p` with positive distance.
        #[test]
        fn round_trip_holds_for_arbitrary_directions(
            az in -179.999f64..180.0,
            el in -89.999f64..90.0,
            distance in 0.001f64..10.0,
        ) {
            let p = PolarPosition::new(az, el, distance);
            let c = point_polar_to_cart(p);
            let back = point_cart_to_polar(c);
            prop_assert!((back.distance - distance).abs() < 1e-6);
            let c2 = point_polar_to_cart(back);
            prop_assert!((c.x - c2.x).abs() < 1e-6);
            prop_assert!((c.y - c2.y).abs() < 1e-6);
            prop_assert!((c.z - c2.z).abs() < 1e-6);
        }
    }
}
