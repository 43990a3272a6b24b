//! Object divergence: splits a point source into up to three symmetric
//! virtual sources, §4.10.

use crate::geom::PolarPosition;
use crate::metadata::ObjectDivergence;

/// One of the (up to three) virtual sources produced by [`diverge`], with
/// the gain weight to apply to its panned result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DivergedSource {
    pub position: PolarPosition,
    pub gain: f64,
}

/// `v = 0` or no divergence metadata returns the original position
/// unweighted. Otherwise returns the centre plus two azimuth-rotated copies
/// with weights `(1-v)/(1+v), v/(1+v), v/(1+v)` — these three weights sum to
/// exactly 1 for every `v`, the invariant the formula is built to preserve
/// (§8 property 6; see `DESIGN.md` for why this is a sum, not a
/// sum-of-squares, identity).
pub fn diverge(position: PolarPosition, divergence: Option<ObjectDivergence>) -> Vec<DivergedSource> {
    let Some(div) = divergence else {
        return vec![DivergedSource { position, gain: 1.0 }];
    };
    let v = div.value.clamp(0.0, 1.0);
    if v <= 0.0 {
        return vec![DivergedSource { position, gain: 1.0 }];
    }
    let centre_gain = (1.0 - v) / (1.0 + v);
    let side_gain = v / (1.0 + v);
    vec![
        DivergedSource {
            position,
            gain: centre_gain,
        },
        DivergedSource {
            position: rotate_azimuth(position, div.azimuth_range),
            gain: side_gain,
        },
        DivergedSource {
            position: rotate_azimuth(position, -div.azimuth_range),
            gain: side_gain,
        },
    ]
}

fn rotate_azimuth(position: PolarPosition, delta: f64) -> PolarPosition {
    let mut az = (position.azimuth + delta) % 360.0;
    if az <= -180.0 {
        az += 360.0;
    } else if az > 180.0 {
        az -= 360.0;
    }
    PolarPosition::new(az, position.elevation, position.distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn no_divergence_is_a_single_unweighted_source() {
        let p = PolarPosition::new(10.0, 5.0, 1.0);
        let sources = diverge(p, None);
        assert_eq!(sources.len(), 1);
        assert_relative_eq!(sources[0].gain, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn gains_sum_to_one_for_every_v() {
        for v in [0.0, 0.1, 0.3, 0.5, 0.75, 1.0] {
            let sources = diverge(
                PolarPosition::new(0.0, 0.0, 1.0),
                Some(ObjectDivergence {
                    value: v,
                    azimuth_range: 45.0,
                }),
            );
            let sum: f64 = sources.iter().map(|s| s.gain).sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn full_divergence_splits_evenly_to_sides() {
        let sources = diverge(
            PolarPosition::new(0.0, 0.0, 1.0),
            Some(ObjectDivergence {
                value: 1.0,
                azimuth_range: 45.0,
            }),
        );
        assert_relative_eq!(sources[0].gain, 0.0, epsilon = 1e-12);
        assert_relative_eq!(sources[1].gain, sources[2].gain, epsilon = 1e-12);
    }

    #[test]
    fn side_sources_are_rotated_symmetrically() {
        let sources = diverge(
            PolarPosition::new(10.0, 0.0, 1.0),
            Some(ObjectDivergence {
                value: 0.5,
                azimuth_range: 30.0,
            }),
        );
        assert_relative_eq!(sources[1].position.azimuth, 40.0, epsilon = 1e-9);
        assert_relative_eq!(sources[2].position.azimuth, -20.0, epsilon = 1e-9);
    }

    proptest! {
        /// §8 property 6: the three divergence weights sum to 1 for every
        /// `v in [0, 1]`, regardless of azimuth, elevation, or spread angle.
        #[test]
        fn gain_sum_is_always_one(
            az in -180.0f64..180.0,
            el in -90.0f64..90.0,
            v in 0.0f64..=1.0,
            spread in 0.0f64..180.0,
        ) {
            let sources = diverge(
                PolarPosition::new(az, el, 1.0),
                Some(ObjectDivergence { value: v, azimuth_range: spread }),
            );
            let sum: f64 = sources.iter().map(|s| s.gain).sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }

        /// The centre source's position is never rotated, no matter the spread.
        #[test]
        fn centre_source_position_is_unchanged(
            az in -180.0f64..180.0,
            el in -90.0f64..90.0,
            v in 0.0f64..=1.0,
            spread in 0.0f64..180.0,
        ) {
            let position = PolarPosition::new(az, el, 1.0);
            let sources = diverge(position, Some(ObjectDivergence { value: v, azimuth_range: spread }));
            prop_assert_eq!(sources[0].position, position);
        }
    }
}
