//! Allocentric (room/cube-relative) panner, §4.6.
//!
//! Positions are cube coordinates in `[-1, 1]^3`. Gains are computed as a
//! separable, per-axis triangular (hat) basis over each axis's distinct
//! nominal speaker coordinates, combined into a per-speaker tensor-product
//! weight — generalizing the donor's 2x2/3x3 inverse-matrix VBAP solve
//! (`panner.rs`) from "gains from a matrix inverse" to "gains from a
//! coordinate grid", which is what a room-relative (rather than
//! direction-relative) layout calls for.

use glam::DVec3;

use crate::adm_conversion::point_polar_to_cart;
use crate::error::{GainError, Result};
use crate::layout::Layout;

#[derive(Clone, Debug)]
pub struct AllocentricPanner {
    /// Cube coordinates of each non-LFE channel, in local (non-LFE) index
    /// order.
    positions: Vec<DVec3>,
    /// Layer priority of each non-LFE channel (§7.3.6), same order.
    layer_priority: Vec<i32>,
    distinct_x: Vec<f64>,
    distinct_y: Vec<f64>,
    distinct_z: Vec<f64>,
}

impl AllocentricPanner {
    pub fn new(layout: &Layout) -> Result<Self> {
        if !layout.supports_allocentric() {
            return Err(GainError::UnsupportedLayout {
                name: layout.name().to_string(),
                reason: "layout does not support allocentric panning".into(),
            });
        }
        let non_lfe = layout.non_lfe_indices();
        let channels = layout.channels();
        let positions: Vec<DVec3> = non_lfe
            .iter()
            .map(|&i| point_polar_to_cart(channels[i].nominal_position).as_vec3())
            .collect();
        let layer_priority: Vec<i32> = non_lfe.iter().map(|&i| channels[i].layer_priority()).collect();

        let distinct_x = distinct_sorted(positions.iter().map(|p| p.x));
        let distinct_y = distinct_sorted(positions.iter().map(|p| p.y));
        let distinct_z = distinct_sorted(positions.iter().map(|p| p.z));

        Ok(Self {
            positions,
            layer_priority,
            distinct_x,
            distinct_y,
            distinct_z,
        })
    }

    /// Gains over non-LFE channels, unit-L2-normalized. `position` is a cube
    /// coordinate, typically from `whd_to_xyz`/`point_polar_to_cart`.
    pub fn calculate_gains(&self, position: DVec3) -> Vec<f64> {
        let n = self.positions.len();
        let mut raw: Vec<f64> = (0..n)
            .map(|i| {
                let p = self.positions[i];
                axis_weight(&self.distinct_x, p.x, position.x)
                    * axis_weight(&self.distinct_y, p.y, position.y)
                    * axis_weight(&self.distinct_z, p.z, position.z)
            })
            .collect();

        self.correct_sparse_rows(&mut raw);

        let sum_sq: f64 = raw.iter().map(|g| g * g).sum();
        if sum_sq < 1e-20 {
            return vec![0.0; n];
        }
        let norm = 1.0 / sum_sq.sqrt();
        raw.iter().map(|g| (g * norm).max(0.0)).collect()
    }

    /// When more than one channel shares the same `(x, y)` column (a sparse
    /// layer: the ideal z-layer for the query is absent at this column),
    /// redistribute that column's weight onto the member with the highest
    /// layer priority. §4.6.
    fn correct_sparse_rows(&self, raw: &mut [f64]) {
        let n = raw.len();
        let mut visited = vec![false; n];
        for i in 0..n {
            if visited[i] {
                continue;
            }
            let (xi, yi) = (self.positions[i].x, self.positions[i].y);
            let mut group: Vec<usize> = (i..n)
                .filter(|&j| {
                    !visited[j]
                        && (self.positions[j].x - xi).abs() < 1e-6
                        && (self.positions[j].y - yi).abs() < 1e-6
                })
                .collect();
            if group.len() <= 1 {
                visited[i] = true;
                continue;
            }
            group.sort_by_key(|&j| std::cmp::Reverse(self.layer_priority[j]));
            let winner = group[0];
            let total: f64 = group.iter().map(|&j| raw[j]).sum();
            for &j in &group {
                visited[j] = true;
                raw[j] = if j == winner { total } else { 0.0 };
            }
        }
    }
}

fn distinct_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(f64::total_cmp);
    v.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    v
}

/// Triangular (hat) basis: 1.0 at `query == value`, falling linearly to 0.0
/// at `value`'s neighbors in `distinct`, 0.0 beyond them.
fn axis_weight(distinct: &[f64], value: f64, query: f64) -> f64 {
    if distinct.len() <= 1 {
        return 1.0;
    }
    let idx = distinct
        .iter()
        .position(|&v| (v - value).abs() < 1e-9)
        .unwrap_or(0);
    let left = if idx > 0 {
        distinct[idx - 1]
    } else {
        value - (distinct[idx + 1] - value)
    };
    let right = if idx + 1 < distinct.len() {
        distinct[idx + 1]
    } else {
        value + (value - distinct[idx - 1])
    };

    if (query - value).abs() < 1e-12 {
        1.0
    } else if query <= value {
        if query <= left || (value - left).abs() < 1e-12 {
            0.0
        } else {
            ((query - left) / (value - left)).clamp(0.0, 1.0)
        }
    } else if query >= right || (right - value).abs() < 1e-12 {
        0.0
    } else {
        ((right - query) / (right - value)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutName;
    use approx::assert_relative_eq;

    #[test]
    fn coincident_position_has_unit_gain() {
        let layout = Layout::from_catalog(LayoutName::NinePlusTenPlusThree).unwrap();
        let panner = AllocentricPanner::new(&layout).unwrap();
        for &pos in &panner.positions.clone() {
            let gains = panner.calculate_gains(pos);
            let max = gains.iter().cloned().fold(0.0_f64, f64::max);
            assert_relative_eq!(max, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn non_allocentric_layout_is_rejected() {
        let layout = Layout::from_catalog(LayoutName::Surround0_5_0).unwrap();
        assert!(AllocentricPanner::new(&layout).is_err());
    }

    #[test]
    fn gains_are_non_negative_and_normalized() {
        let layout = Layout::from_catalog(LayoutName::NinePlusTenPlusThree).unwrap();
        let panner = AllocentricPanner::new(&layout).unwrap();
        let gains = panner.calculate_gains(DVec3::new(0.3, 0.2, -0.1));
        assert!(gains.iter().all(|g| *g >= 0.0));
        let sum_sq: f64 = gains.iter().map(|g| g * g).sum();
        if sum_sq > 1e-9 {
            assert_relative_eq!(sum_sq, 1.0, epsilon = 1e-6);
        }
    }
}
