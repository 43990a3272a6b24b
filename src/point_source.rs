//! Point-source panner: assembles a [`crate::region::Region`] list from a
//! layout's nominal channel directions, and answers per-call gain queries.
//!
//! Region assembly generalizes the donor's `choose_speaker_triplets` convex
//! hull algorithm (`config.rs`): layouts whose channels cluster into two or
//! more horizontal elevation rings (e.g. a mid layer plus a height layer) are
//! triangulated ring-by-ring, connecting each adjacent pair of rings with
//! [`crate::region::QuadRegion`]s (falling back to a [`crate::region::Triplet`]
//! wherever a ring-to-ring edge collapses onto a shared vertex). Layouts with
//! a single horizontal ring, or with elevations that don't cleanly cluster
//! into rings, fall back to the donor's full-sphere convex hull, which
//! produces [`crate::region::Triplet`]s only. Either way, any pole left
//! uncovered is capped with a [`crate::region::VirtualNgon`] around a
//! synthesized virtual centre speaker.

use glam::DVec3;

use crate::error::{GainError, Result};
use crate::geom::EPSILON;
use crate::layout::Layout;
use crate::region::{QuadRegion, Region, Triplet, VirtualNgon};

/// Minimum volume/perimeter ratio for a valid 3D triplet — filters
/// near-degenerate (near-coplanar) candidates. Same threshold the donor uses.
const MIN_VOL_P_SIDE_LGTH: f64 = 0.01;

/// Computes direct-path gains for a single point-source direction, per
/// §4.4/§4.5. Built once per [`Layout`] and reused across calls — the region
/// list is immutable after construction.
#[derive(Clone, Debug)]
pub struct PointSourcePanner {
    /// Non-LFE channel indices, in layout order — the gain vector this
    /// panner produces is indexed 0..non_lfe_indices.len(), matching
    /// [`Layout::non_lfe_indices`].
    n_ch: usize,
    regions: Vec<Region>,
}

impl PointSourcePanner {
    pub fn new(layout: &Layout) -> Result<Self> {
        let non_lfe = layout.non_lfe_indices();
        let n_ch = non_lfe.len();
        if n_ch < 2 {
            return Err(GainError::UnsupportedLayout {
                name: layout.name().to_string(),
                reason: "need at least 2 non-LFE channels to triangulate".into(),
            });
        }
        // Local index (0..n_ch, matching non_lfe order) to direction vector.
        let dirs: Vec<DVec3> = non_lfe
            .iter()
            .map(|&i| layout.channels()[i].nominal_position.direction())
            .collect();

        let regions = assemble_regions(&dirs)?;
        Ok(Self { n_ch, regions })
    }

    /// Gains over non-LFE channels only, unit-L2-normalized. §4.5: every
    /// region is queried and its contribution accumulated — a well-formed
    /// layout has exactly one region return non-zero gains for any given
    /// direction, but overlapping contributions at region boundaries are
    /// intended behavior, not an error, so they simply add before the final
    /// renormalization.
    pub fn calculate_gains(&self, direction: DVec3) -> Vec<f64> {
        let mut gains = vec![0.0; self.n_ch];
        let direction = direction.normalize_or_zero();
        if direction == DVec3::ZERO {
            return gains;
        }
        let mut hit_any = false;
        for region in &self.regions {
            let region_gains = region.calculate_gains(direction);
            if region_gains.iter().any(|g| *g > EPSILON) {
                hit_any = true;
                for (&idx, g) in region.indices().iter().zip(region_gains) {
                    gains[idx] += g;
                }
            }
        }
        if !hit_any {
            let (azimuth, elevation) = direction_to_degrees(direction);
            tracing::trace!(azimuth, elevation, "point source direction fell in zero regions");
            return gains;
        }
        let sum_sq: f64 = gains.iter().map(|g| g * g).sum();
        if sum_sq > EPSILON {
            let norm = 1.0 / sum_sq.sqrt();
            for g in gains.iter_mut() {
                *g *= norm;
            }
        }
        gains
    }
}

/// Inverse of [`crate::geom::PolarPosition::direction`], for diagnostics only.
fn direction_to_degrees(d: DVec3) -> (f64, f64) {
    let elevation = d.z.clamp(-1.0, 1.0).asin().to_degrees();
    let azimuth = (-d.x).atan2(d.y).to_degrees();
    (azimuth, elevation)
}

/// Build the region list covering the full sphere for a set of nominal
/// channel directions (indexed 0..n to match the caller's local index space).
fn assemble_regions(dirs: &[DVec3]) -> Result<Vec<Region>> {
    let n = dirs.len();
    let all_horizontal = dirs.iter().all(|d| d.z.abs() < 1e-6);

    if all_horizontal {
        let indices: Vec<usize> = (0..n).collect();
        let up = VirtualNgon::new(indices.clone(), dirs.to_vec(), DVec3::Z);
        let down = VirtualNgon::new(indices, dirs.to_vec(), -DVec3::Z);
        let mut regions = Vec::new();
        if let Some(up) = up {
            regions.push(Region::VirtualNgon(up));
        }
        if let Some(down) = down {
            regions.push(Region::VirtualNgon(down));
        }
        if regions.is_empty() {
            return Err(GainError::UnsupportedLayout {
                name: "<point source panner>".into(),
                reason: "horizontal ring could not form a virtual n-gon".into(),
            });
        }
        return Ok(regions);
    }

    // Layouts that cluster into two or more horizontal elevation rings (each
    // with at least two members) are triangulated ring-by-ring instead of
    // with a blind full-sphere hull, connecting adjacent rings with
    // QuadRegion/Triplet per §4.4.1.
    let rings = group_rings(dirs);
    if rings.len() >= 2 && rings.iter().all(|(_, members)| members.len() >= 2) {
        return assemble_ringed_regions(dirs, &rings);
    }

    let mut regions: Vec<Region> = choose_triplets(dirs)
        .into_iter()
        .map(Region::Triplet)
        .collect();

    for &pole in &[DVec3::Z, -DVec3::Z] {
        if query_sum(&regions, pole) > EPSILON {
            continue;
        }
        if let Some(rim) = find_rim(dirs, pole) {
            let (indices, rim_dirs): (Vec<usize>, Vec<DVec3>) = rim.into_iter().unzip();
            if indices.len() >= 3 {
                if let Some(ngon) = VirtualNgon::new(indices, rim_dirs, pole) {
                    regions.push(Region::VirtualNgon(ngon));
                }
            }
        }
    }

    if regions.is_empty() {
        return Err(GainError::UnsupportedLayout {
            name: "<point source panner>".into(),
            reason: "no valid triplets or n-gons could be formed".into(),
        });
    }
    Ok(regions)
}

/// Clusters directions by elevation (`asin(z)`, rounded within `1e-3`
/// radians) into horizontal rings, returned sorted bottom-to-top.
fn group_rings(dirs: &[DVec3]) -> Vec<(f64, Vec<usize>)> {
    let mut rings: Vec<(f64, Vec<usize>)> = Vec::new();
    for (i, d) in dirs.iter().enumerate() {
        let el = d.z.clamp(-1.0, 1.0).asin();
        match rings.iter_mut().find(|(ring_el, _)| (*ring_el - el).abs() < 1e-3) {
            Some(ring) => ring.1.push(i),
            None => rings.push((el, vec![i])),
        }
    }
    rings.sort_by(|a, b| a.0.total_cmp(&b.0));
    rings
}

/// Assembles regions for a layout whose channels cluster into `rings`
/// (bottom-to-top, each with >= 2 members): connects every adjacent ring pair
/// via [`connect_rings`], then caps any pole [`connect_rings`] left
/// uncovered with a [`VirtualNgon`], the same way the generic hull path does.
fn assemble_ringed_regions(dirs: &[DVec3], rings: &[(f64, Vec<usize>)]) -> Result<Vec<Region>> {
    let mut regions = Vec::new();
    for pair in rings.windows(2) {
        regions.extend(connect_rings(dirs, &pair[0].1, &pair[1].1));
    }

    for &pole in &[DVec3::Z, -DVec3::Z] {
        if query_sum(&regions, pole) > EPSILON {
            continue;
        }
        if let Some(rim) = find_rim(dirs, pole) {
            let (indices, rim_dirs): (Vec<usize>, Vec<DVec3>) = rim.into_iter().unzip();
            if indices.len() >= 3 {
                if let Some(ngon) = VirtualNgon::new(indices, rim_dirs, pole) {
                    regions.push(Region::VirtualNgon(ngon));
                }
            }
        }
    }

    if regions.is_empty() {
        return Err(GainError::UnsupportedLayout {
            name: "<point source panner>".into(),
            reason: "no valid quads, triplets, or n-gons could connect the rings".into(),
        });
    }
    Ok(regions)
}

/// Connects two adjacent horizontal rings by walking `lo` in azimuth order
/// and, for each edge, pairing it with the `hi`-ring member(s) nearest in
/// azimuth to its endpoints: a [`QuadRegion`] when the two endpoints have
/// distinct nearest neighbors in `hi`, or a [`Triplet`] when they share one
/// (the quad would otherwise collapse onto a repeated vertex).
fn connect_rings(dirs: &[DVec3], lo: &[usize], hi: &[usize]) -> Vec<Region> {
    let lo_sorted = sort_by_azimuth(dirs, lo);
    let hi_sorted = sort_by_azimuth(dirs, hi);
    let n = lo_sorted.len();
    let mut regions = Vec::with_capacity(n);

    for k in 0..n {
        let l0 = lo_sorted[k];
        let l1 = lo_sorted[(k + 1) % n];
        let h0 = nearest_by_azimuth(azimuth_rad(dirs[l0]), &hi_sorted, dirs);
        let h1 = nearest_by_azimuth(azimuth_rad(dirs[l1]), &hi_sorted, dirs);
        if h0 == h1 {
            if let Some(t) = Triplet::new([l0, l1, h0], [dirs[l0], dirs[l1], dirs[h0]]) {
                regions.push(Region::Triplet(t));
            }
        } else {
            let vertices = [dirs[l0], dirs[l1], dirs[h1], dirs[h0]];
            regions.push(Region::Quad(QuadRegion::new([l0, l1, h1, h0], vertices)));
        }
    }
    regions
}

fn azimuth_rad(d: DVec3) -> f64 {
    (-d.x).atan2(d.y)
}

fn sort_by_azimuth(dirs: &[DVec3], members: &[usize]) -> Vec<usize> {
    let mut sorted = members.to_vec();
    sorted.sort_by(|&a, &b| azimuth_rad(dirs[a]).total_cmp(&azimuth_rad(dirs[b])));
    sorted
}

fn nearest_by_azimuth(target: f64, ring: &[usize], dirs: &[DVec3]) -> usize {
    *ring
        .iter()
        .min_by(|&&a, &&b| {
            circular_diff(target, azimuth_rad(dirs[a])).total_cmp(&circular_diff(target, azimuth_rad(dirs[b])))
        })
        .expect("ring is non-empty")
}

fn circular_diff(a: f64, b: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let mut d = (a - b).rem_euclid(tau);
    if d > std::f64::consts::PI {
        d = tau - d;
    }
    d
}

fn query_sum(regions: &[Region], direction: DVec3) -> f64 {
    regions
        .iter()
        .map(|r| r.calculate_gains(direction).iter().sum::<f64>())
        .sum()
}

/// Find the ring of directions closest to `pole` (but not already
/// coincident with it) that should close the cap, by taking every direction
/// within a small elevation band of the closest one.
fn find_rim(dirs: &[DVec3], pole: DVec3) -> Option<Vec<(usize, DVec3)>> {
    let projections: Vec<(usize, f64)> = dirs
        .iter()
        .enumerate()
        .map(|(i, d)| (i, d.dot(pole)))
        .filter(|(_, p)| *p < 0.999)
        .collect();
    let max_proj = projections
        .iter()
        .map(|(_, p)| *p)
        .fold(f64::NEG_INFINITY, f64::max);
    if !max_proj.is_finite() {
        return None;
    }
    let rim: Vec<(usize, DVec3)> = projections
        .into_iter()
        .filter(|(_, p)| (*p - max_proj).abs() < 1e-3)
        .map(|(i, _)| (i, dirs[i]))
        .collect();
    if rim.len() >= 3 {
        Some(rim)
    } else {
        None
    }
}

/// Adapted from the donor's `choose_speaker_triplets` (`config.rs`): a
/// convex-hull-like facet search over direction vectors, generalized to
/// return [`Triplet`] regions instead of raw inverse matrices.
fn choose_triplets(dirs: &[DVec3]) -> Vec<Triplet> {
    let n = dirs.len();
    if n < 3 {
        return Vec::new();
    }

    let mut candidates: Vec<(usize, usize, usize, f64)> = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let (v1, v2, v3) = (dirs[i], dirs[j], dirs[k]);
                let vol = v1.cross(v2).dot(v3).abs();
                let side_sum = v1.angle_between(v2) + v1.angle_between(v3) + v2.angle_between(v3);
                if side_sum < 1e-10 {
                    continue;
                }
                let vol_p_side = vol / side_sum;
                if vol_p_side > MIN_VOL_P_SIDE_LGTH {
                    candidates.push((i, j, k, vol_p_side));
                }
            }
        }
    }

    let mut connections = vec![true; n * n];
    let mut distances: Vec<(usize, usize, f64)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j, dirs[i].angle_between(dirs[j]))))
        .collect();
    distances.sort_by(|a, b| a.2.total_cmp(&b.2));

    for (a, b, _) in &distances {
        let (va, vb) = (dirs[*a], dirs[*b]);
        for (c, d, _) in &distances {
            if a == c || a == d || b == c || b == d {
                continue;
            }
            if !connections[*c * n + *d] {
                continue;
            }
            let (vc, vd) = (dirs[*c], dirs[*d]);
            if great_circle_arcs_cross(va, vb, vc, vd) {
                let (dist_ab, dist_cd) = (va.angle_between(vb), vc.angle_between(vd));
                if dist_cd > dist_ab {
                    connections[*c * n + *d] = false;
                    connections[*d * n + *c] = false;
                }
            }
        }
    }

    let mut triplets = Vec::new();
    for (i, j, k, _) in candidates {
        if !connections[i * n + j] || !connections[i * n + k] || !connections[j * n + k] {
            continue;
        }
        let (v1, v2, v3) = (dirs[i], dirs[j], dirs[k]);
        let has_interior = dirs
            .iter()
            .enumerate()
            .any(|(m, &d)| m != i && m != j && m != k && is_inside_spherical_triangle(d, v1, v2, v3));
        if has_interior {
            continue;
        }
        if let Some(t) = Triplet::new([i, j, k], [v1, v2, v3]) {
            triplets.push(t);
        }
    }
    triplets
}

fn great_circle_arcs_cross(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> bool {
    let n1 = a.cross(b);
    let n2 = c.cross(d);
    let line = n1.cross(n2);
    if line.length_squared() < 1e-18 {
        return false;
    }
    let candidates = [line.normalize(), -line.normalize()];
    candidates.iter().any(|&p| {
        is_between(p, a, b) && is_between(p, c, d)
    })
}

fn is_between(p: DVec3, a: DVec3, b: DVec3) -> bool {
    let ab_angle = a.angle_between(b);
    (a.angle_between(p) + p.angle_between(b) - ab_angle).abs() < 1e-6
}

fn is_inside_spherical_triangle(p: DVec3, v1: DVec3, v2: DVec3, v3: DVec3) -> bool {
    let n1 = v1.cross(v2);
    let n2 = v2.cross(v3);
    let n3 = v3.cross(v1);
    let (d1, d2, d3) = (p.dot(n1), p.dot(n2), p.dot(n3));
    (d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0) || (d1 <= 0.0 && d2 <= 0.0 && d3 <= 0.0)
}
