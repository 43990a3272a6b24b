//! Extent (spread-source) panners: spatially integrate a point-source or
//! allocentric panner over a fixed weighted grid covering the source's
//! (width, height) solid angle, per §4.7.

use glam::DVec3;

use crate::allocentric::AllocentricPanner;
use crate::geom::PolarPosition;
use crate::point_source::PointSourcePanner;

/// One grid sample: an offset direction (degrees, degrees) and its weight.
/// Degenerates to a single `(0, 0, 1.0)` sample when width and height are
/// both zero, which is exactly a point-source query.
fn weighted_grid(width: f64, height: f64) -> Vec<(f64, f64, f64)> {
    if width <= 1e-9 && height <= 1e-9 {
        return vec![(0.0, 0.0, 1.0)];
    }
    let az_offsets = tent_offsets(width);
    let el_offsets = tent_offsets(height);
    let mut grid = Vec::with_capacity(az_offsets.len() * el_offsets.len());
    for &(az_off, az_w) in &az_offsets {
        for &(el_off, el_w) in &el_offsets {
            let w = az_w * el_w;
            if w > 1e-9 {
                grid.push((az_off, el_off, w));
            }
        }
    }
    grid
}

/// Three samples `(-extent/2, extent/4, extent/2)` with triangular weights
/// `(0.5, 1.0, 0.5)`, or a single zero-weight-one sample when `extent <= 0`.
fn tent_offsets(extent: f64) -> Vec<(f64, f64)> {
    if extent <= 1e-9 {
        return vec![(0.0, 1.0)];
    }
    let half = extent / 2.0;
    vec![(-half, 0.5), (0.0, 1.0), (half, 0.5)]
}

fn normalize_unit_l2(gains: &mut [f64]) {
    let sum_sq: f64 = gains.iter().map(|g| g * g).sum();
    if sum_sq < 1e-20 {
        gains.fill(0.0);
        return;
    }
    let norm = 1.0 / sum_sq.sqrt();
    for g in gains.iter_mut() {
        *g = (*g * norm).max(0.0);
    }
}

/// Spread-source panner over a loudspeaker layout. §4.7.
pub struct PolarExtentHandler<'a> {
    panner: &'a PointSourcePanner,
    n_ch: usize,
}

impl<'a> PolarExtentHandler<'a> {
    pub fn new(panner: &'a PointSourcePanner, n_ch_no_lfe: usize) -> Self {
        Self {
            panner,
            n_ch: n_ch_no_lfe,
        }
    }

    /// `width`/`height` in degrees, `depth` in `[0, 1]`.
    pub fn calculate_gains(&self, position: PolarPosition, width: f64, height: f64, depth: f64) -> Vec<f64> {
        let grid = weighted_grid(width, height);
        let mut gains = vec![0.0; self.n_ch];
        let mut weight_sum = 0.0;
        for (az_off, el_off, w) in grid {
            let sample = PolarPosition::new(
                position.azimuth + az_off,
                (position.elevation + el_off).clamp(-90.0, 90.0),
                position.distance,
            );
            let g = self.panner.calculate_gains(sample.direction());
            for (acc, v) in gains.iter_mut().zip(g) {
                *acc += w * v;
            }
            weight_sum += w;
        }
        if weight_sum > 1e-9 {
            for g in gains.iter_mut() {
                *g /= weight_sum;
            }
        }

        if depth > 1e-9 {
            let uniform = 1.0 / (self.n_ch as f64).sqrt();
            let d = depth.clamp(0.0, 1.0);
            for g in gains.iter_mut() {
                *g = (1.0 - d) * *g + d * uniform;
            }
        }

        normalize_unit_l2(&mut gains);
        gains
    }
}

/// Encodes a direction into Ambisonic coefficients. The coefficient table and
/// normalization convention live entirely with the implementor — this crate
/// only calls the trait, per §1/§4.7.
pub trait AmbisonicEncoder {
    fn encode(&self, direction: DVec3, order: usize) -> Vec<f64>;
}

/// Spread-source panner for an Ambisonic bus: identical grid integration to
/// [`PolarExtentHandler`], but each sample is Ambisonic-encoded instead of
/// looked up in a loudspeaker layout. §4.7.
pub struct AmbisonicPolarExtentHandler<'a, E: AmbisonicEncoder> {
    encoder: &'a E,
    order: usize,
}

impl<'a, E: AmbisonicEncoder> AmbisonicPolarExtentHandler<'a, E> {
    pub fn new(encoder: &'a E, order: usize) -> Self {
        Self { encoder, order }
    }

    pub fn calculate_coefficients(&self, position: PolarPosition, width: f64, height: f64) -> Vec<f64> {
        let grid = weighted_grid(width, height);
        let n_coeffs = (self.order + 1) * (self.order + 1);
        let mut coeffs = vec![0.0; n_coeffs];
        let mut weight_sum = 0.0;
        for (az_off, el_off, w) in grid {
            let sample = PolarPosition::new(
                position.azimuth + az_off,
                (position.elevation + el_off).clamp(-90.0, 90.0),
                position.distance,
            );
            let enc = self.encoder.encode(sample.direction(), self.order);
            for (acc, v) in coeffs.iter_mut().zip(enc) {
                *acc += w * v;
            }
            weight_sum += w;
        }
        if weight_sum > 1e-9 {
            for c in coeffs.iter_mut() {
                *c /= weight_sum;
            }
        }
        coeffs
    }
}

/// Spread-source panner in cube coordinates, using [`AllocentricPanner`].
/// §4.7.
pub struct AllocentricExtentHandler<'a> {
    panner: &'a AllocentricPanner,
    n_ch: usize,
}

impl<'a> AllocentricExtentHandler<'a> {
    pub fn new(panner: &'a AllocentricPanner, n_ch_no_lfe: usize) -> Self {
        Self {
            panner,
            n_ch: n_ch_no_lfe,
        }
    }

    /// `extent_xyz` are cube-coordinate half-extents along each axis.
    pub fn calculate_gains(&self, position: DVec3, extent_xyz: DVec3) -> Vec<f64> {
        let samples = cube_grid(extent_xyz);
        let mut gains = vec![0.0; self.n_ch];
        let mut weight_sum = 0.0;
        for (offset, w) in samples {
            let sample = (position + offset).clamp(DVec3::splat(-1.0), DVec3::splat(1.0));
            let g = self.panner.calculate_gains(sample);
            for (acc, v) in gains.iter_mut().zip(g) {
                *acc += w * v;
            }
            weight_sum += w;
        }
        if weight_sum > 1e-9 {
            for g in gains.iter_mut() {
                *g /= weight_sum;
            }
        }
        normalize_unit_l2(&mut gains);
        gains
    }
}

fn cube_grid(extent_xyz: DVec3) -> Vec<(DVec3, f64)> {
    if extent_xyz.length_squared() < 1e-18 {
        return vec![(DVec3::ZERO, 1.0)];
    }
    let x_offsets = tent_offsets(extent_xyz.x.abs() * 2.0);
    let y_offsets = tent_offsets(extent_xyz.y.abs() * 2.0);
    let z_offsets = tent_offsets(extent_xyz.z.abs() * 2.0);
    let mut grid = Vec::new();
    for &(ox, wx) in &x_offsets {
        for &(oy, wy) in &y_offsets {
            for &(oz, wz) in &z_offsets {
                let w = wx * wy * wz;
                if w > 1e-9 {
                    grid.push((DVec3::new(ox, oy, oz), w));
                }
            }
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Layout, LayoutName};
    use approx::assert_relative_eq;

    #[test]
    fn zero_extent_matches_point_source() {
        let layout = Layout::from_catalog(LayoutName::Surround0_5_0).unwrap();
        let panner = PointSourcePanner::new(&layout).unwrap();
        let handler = PolarExtentHandler::new(&panner, layout.n_ch_no_lfe());
        let position = PolarPosition::new(0.0, 0.0, 1.0);
        let direct = panner.calculate_gains(position.direction());
        let extent = handler.calculate_gains(position, 0.0, 0.0, 0.0);
        for (a, b) in direct.iter().zip(&extent) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn wide_extent_is_normalized() {
        let layout = Layout::from_catalog(LayoutName::Surround0_5_0).unwrap();
        let panner = PointSourcePanner::new(&layout).unwrap();
        let handler = PolarExtentHandler::new(&panner, layout.n_ch_no_lfe());
        let gains = handler.calculate_gains(PolarPosition::new(0.0, 0.0, 1.0), 60.0, 30.0, 0.0);
        let sum_sq: f64 = gains.iter().map(|g| g * g).sum();
        if sum_sq > 1e-9 {
            assert_relative_eq!(sum_sq, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn depth_blends_toward_uniform() {
        let layout = Layout::from_catalog(LayoutName::Surround0_5_0).unwrap();
        let panner = PointSourcePanner::new(&layout).unwrap();
        let handler = PolarExtentHandler::new(&panner, layout.n_ch_no_lfe());
        let gains = handler.calculate_gains(PolarPosition::new(0.0, 0.0, 1.0), 0.0, 0.0, 1.0);
        let max = gains.iter().cloned().fold(0.0_f64, f64::max);
        let min = gains.iter().cloned().fold(f64::MAX, f64::min);
        assert!(max - min < 0.5, "full depth should spread gain more evenly");
    }
}
