//! Region handlers: Triplet, VirtualNgon, and QuadRegion gain solvers.
//!
//! All three share one contract (§4.3): `calculate_gains(direction)` returns
//! a vector the same length as the region's channel index list, all-zero iff
//! `direction` falls outside the region. This mirrors the donor's
//! `InverseMatrix` 2D/3D tagged enum (`config.rs`), generalized from "2 or 3
//! speaker directions" to the three BS.2127 region kinds.

use glam::DMat3;
use glam::DVec3;

use crate::geom::EPSILON;

/// A triangular VBAP region over three loudspeaker directions.
#[derive(Clone, Debug)]
pub struct Triplet {
    pub indices: [usize; 3],
    inv: DMat3,
}

impl Triplet {
    /// `None` if the three directions are coplanar with the origin
    /// (degenerate matrix).
    pub fn new(indices: [usize; 3], positions: [DVec3; 3]) -> Option<Self> {
        let mat = DMat3::from_cols(positions[0], positions[1], positions[2]);
        if mat.determinant().abs() < 1e-10 {
            return None;
        }
        Some(Self {
            indices,
            inv: mat.inverse(),
        })
    }

    fn calculate_gains(&self, direction: DVec3) -> [f64; 3] {
        let raw = self.inv * direction;
        let raw = [raw.x, raw.y, raw.z];
        if raw.iter().any(|g| *g < -EPSILON) {
            return [0.0; 3];
        }
        normalize3(raw)
    }
}

fn normalize3(raw: [f64; 3]) -> [f64; 3] {
    let sum_sq: f64 = raw.iter().map(|g| g * g).sum();
    if sum_sq < 1e-20 {
        return [0.0; 3];
    }
    let norm = 1.0 / sum_sq.sqrt();
    [
        (raw[0] * norm).max(0.0),
        (raw[1] * norm).max(0.0),
        (raw[2] * norm).max(0.0),
    ]
}

/// A virtual-speaker N-gon: a ring of `N` real speakers with no common
/// non-degenerate triplet, closed by synthesizing a virtual centre speaker
/// (typically the nadir for an all-horizontal ring) so VBAP triplet math
/// still applies. §4.3.
#[derive(Clone, Debug)]
pub struct VirtualNgon {
    /// Real channel indices, in their original (caller-supplied) order.
    pub indices: Vec<usize>,
    /// `indices[vertex_order[i]]` is the i-th vertex going around the ring.
    vertex_order: Vec<usize>,
    /// One inverse matrix per consecutive (vertex_order[i], vertex_order[i+1],
    /// virtual centre) triplet, in vertex order.
    triplet_invs: Vec<DMat3>,
}

impl VirtualNgon {
    pub fn new(indices: Vec<usize>, positions: Vec<DVec3>, centre: DVec3) -> Option<Self> {
        let n = indices.len();
        if n < 3 || positions.len() != n {
            return None;
        }
        // Sort vertices by angle around `centre`.
        let up_hint = if centre.z.abs() < 0.99 { DVec3::Z } else { DVec3::X };
        let e1 = centre.cross(up_hint).normalize();
        let e2 = centre.cross(e1).normalize();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| {
            let ai = positions[i].dot(e1).atan2(positions[i].dot(e2));
            let aj = positions[j].dot(e1).atan2(positions[j].dot(e2));
            ai.total_cmp(&aj)
        });

        let mut triplet_invs = Vec::with_capacity(n);
        for k in 0..n {
            let a = positions[order[k]];
            let b = positions[order[(k + 1) % n]];
            let mat = DMat3::from_cols(a, b, centre);
            if mat.determinant().abs() < 1e-10 {
                return None;
            }
            triplet_invs.push(mat.inverse());
        }

        Some(Self {
            indices,
            vertex_order: order,
            triplet_invs,
        })
    }

    fn calculate_gains(&self, direction: DVec3) -> Vec<f64> {
        let n = self.indices.len();
        let sqrt_n = (n as f64).sqrt();

        for k in 0..n {
            let raw = self.triplet_invs[k] * direction;
            let (ga, gb, gc) = (raw.x, raw.y, raw.z);
            if ga >= -EPSILON && gb >= -EPSILON && gc >= -EPSILON && (ga + gb + gc) > EPSILON {
                let mut gains = vec![0.0; n];
                gains[self.vertex_order[k]] += ga.max(0.0);
                gains[self.vertex_order[(k + 1) % n]] += gb.max(0.0);
                // Redistribute the virtual centre gain uniformly across all
                // real speakers, scaled for energy preservation.
                let centre_share = gc.max(0.0) / sqrt_n;
                for g in gains.iter_mut() {
                    *g += centre_share;
                }
                let sum_sq: f64 = gains.iter().map(|g| g * g).sum();
                if sum_sq < 1e-20 {
                    return vec![0.0; n];
                }
                let norm = 1.0 / sum_sq.sqrt();
                for g in gains.iter_mut() {
                    *g *= norm;
                }
                return gains;
            }
        }
        vec![0.0; n]
    }
}

/// A quadrilateral panning region, solved as a bilinear patch reduced to two
/// univariate quadratics. §4.3.
#[derive(Clone, Debug)]
pub struct QuadRegion {
    pub indices: [usize; 4],
    vertices: [DVec3; 4],
}

impl QuadRegion {
    /// `vertices` must already be ordered anti-clockwise around their
    /// cartesian mean (the point-source panner does this at construction).
    pub fn new(indices: [usize; 4], vertices: [DVec3; 4]) -> Self {
        Self { indices, vertices }
    }

    fn calculate_gains(&self, direction: DVec3) -> [f64; 4] {
        let d = direction.normalize_or_zero();
        if d == DVec3::ZERO {
            return [0.0; 4];
        }
        let up_hint = if d.z.abs() < 0.99 { DVec3::Z } else { DVec3::X };
        let e1 = d.cross(up_hint).normalize();
        let e2 = d.cross(e1).normalize();

        let cross: Vec<DVec3> = self.vertices.iter().map(|v| v.cross(d)).collect();
        let a: Vec<f64> = cross.iter().map(|c| c.dot(e1)).collect();
        let b: Vec<f64> = cross.iter().map(|c| c.dot(e2)).collect();

        match solve_bilinear(&a, &b) {
            Some((x, y)) => {
                if !(-EPSILON..=1.0 + EPSILON).contains(&x)
                    || !(-EPSILON..=1.0 + EPSILON).contains(&y)
                {
                    return [0.0; 4];
                }
                let (x, y) = (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
                let point = (1.0 - x) * (1.0 - y) * self.vertices[0]
                    + x * (1.0 - y) * self.vertices[1]
                    + x * y * self.vertices[2]
                    + (1.0 - x) * y * self.vertices[3];
                if point.dot(d) <= 0.0 {
                    return [0.0; 4];
                }
                let raw = [(1.0 - x) * (1.0 - y), x * (1.0 - y), x * y, (1.0 - x) * y];
                normalize4(raw)
            }
            None => [0.0; 4],
        }
    }
}

/// Solve the bilinear system `P(x, y) parallel to d` given the two
/// cross-product component sequences `a[0..4]`, `b[0..4]` (one per vertex,
/// `v_k cross d` dotted against two axes perpendicular to `d`). Returns the
/// `(x, y)` in-patch parameters, if a root in range exists.
fn solve_bilinear(a: &[f64], b: &[f64]) -> Option<(f64, f64)> {
    // x = -(p0 + p1*y) / (q0 + q1*y), from eliminating x out of the `a`
    // equation; same shape for `b` with r0/r1/s0/s1. Equating the two and
    // clearing denominators gives a quadratic in y: A*y^2 + B*y + C = 0.
    let (p0, p1, q0, q1) = (a[0], a[3] - a[0], a[1] - a[0], a[0] - a[1] + a[2] - a[3]);
    let (r0, r1, s0, s1) = (b[0], b[3] - b[0], b[1] - b[0], b[0] - b[1] + b[2] - b[3]);

    let coeff_a = p1 * s1 - r1 * q1;
    let coeff_b = p0 * s1 + p1 * s0 - r0 * q1 - r1 * q0;
    let coeff_c = p0 * s0 - r0 * q0;

    let y_candidates: Vec<f64> = if coeff_a.abs() < EPSILON {
        if coeff_b.abs() < EPSILON {
            return None;
        }
        vec![-coeff_c / coeff_b]
    } else {
        let disc = coeff_b * coeff_b - 4.0 * coeff_a * coeff_c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        vec![
            (-coeff_b + sqrt_disc) / (2.0 * coeff_a),
            (-coeff_b - sqrt_disc) / (2.0 * coeff_a),
        ]
    };

    for y in y_candidates {
        if !(-EPSILON..=1.0 + EPSILON).contains(&y) {
            continue;
        }
        let denom_a = q0 + q1 * y;
        let denom_b = s0 + s1 * y;
        let x = if denom_a.abs() >= denom_b.abs() && denom_a.abs() > 1e-12 {
            -(p0 + p1 * y) / denom_a
        } else if denom_b.abs() > 1e-12 {
            -(r0 + r1 * y) / denom_b
        } else {
            continue;
        };
        if (-EPSILON..=1.0 + EPSILON).contains(&x) {
            return Some((x, y));
        }
    }
    None
}

fn normalize4(raw: [f64; 4]) -> [f64; 4] {
    let sum_sq: f64 = raw.iter().map(|g| g * g).sum();
    if sum_sq < 1e-20 {
        return [0.0; 4];
    }
    let norm = 1.0 / sum_sq.sqrt();
    let mut out = [0.0; 4];
    for i in 0..4 {
        out[i] = (raw[i] * norm).max(0.0);
    }
    out
}

/// A tagged region, dispatching `calculate_gains` without heap indirection —
/// the same shape the donor uses for its `InverseMatrix` 2D/3D tag.
#[derive(Clone, Debug)]
pub enum Region {
    Triplet(Triplet),
    VirtualNgon(VirtualNgon),
    Quad(QuadRegion),
}

impl Region {
    pub fn indices(&self) -> &[usize] {
        match self {
            Region::Triplet(t) => &t.indices,
            Region::VirtualNgon(n) => &n.indices,
            Region::Quad(q) => &q.indices,
        }
    }

    /// Gains in the same order as `indices()`.
    pub fn calculate_gains(&self, direction: DVec3) -> Vec<f64> {
        match self {
            Region::Triplet(t) => t.calculate_gains(direction).to_vec(),
            Region::VirtualNgon(n) => n.calculate_gains(direction),
            Region::Quad(q) => q.calculate_gains(direction).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dir(az_deg: f64, el_deg: f64) -> DVec3 {
        crate::geom::PolarPosition::new(az_deg, el_deg, 1.0).direction()
    }

    #[test]
    fn triplet_exact_hit_on_vertex() {
        let positions = [dir(30.0, 0.0), dir(-30.0, 0.0), dir(0.0, 90.0)];
        let t = Triplet::new([0, 1, 2], positions).unwrap();
        let gains = t.calculate_gains(positions[0]);
        assert_relative_eq!(gains[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(gains[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(gains[2], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn triplet_outside_region_is_zero() {
        let positions = [dir(10.0, 0.0), dir(20.0, 0.0), dir(0.0, 90.0)];
        let t = Triplet::new([0, 1, 2], positions).unwrap();
        let gains = t.calculate_gains(dir(180.0, 0.0));
        assert_eq!(gains, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn virtual_ngon_ring_normalizes() {
        let indices = vec![0, 1, 2, 3, 4];
        let positions: Vec<DVec3> = (0..5)
            .map(|i| dir(i as f64 * 72.0, 0.0))
            .collect();
        let ngon = VirtualNgon::new(indices, positions.clone(), DVec3::new(0.0, 0.0, -1.0)).unwrap();
        let gains = ngon.calculate_gains(positions[0]);
        let sum_sq: f64 = gains.iter().map(|g| g * g).sum();
        assert_relative_eq!(sum_sq, 1.0, epsilon = 1e-6);
        assert!(gains[0] > gains[1]);
    }

    #[test]
    fn quad_region_centre_has_all_positive_gains() {
        let vertices = [
            dir(-20.0, 20.0),
            dir(20.0, 20.0),
            dir(20.0, -20.0),
            dir(-20.0, -20.0),
        ];
        let quad = QuadRegion::new([0, 1, 2, 3], vertices);
        let gains = quad.calculate_gains(dir(0.0, 0.0));
        assert!(gains.iter().all(|g| *g >= 0.0));
        assert!(gains.iter().sum::<f64>() > 0.0);
    }
}
