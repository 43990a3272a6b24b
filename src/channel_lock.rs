//! Channel lock: snaps a position onto the nearest eligible loudspeaker.
//! §4.9, tie-break per BS.2127-1 §7.3.6.

use glam::DVec3;

use crate::geom::PolarPosition;
use crate::layout::Channel;
use crate::metadata::ChannelLock;

/// Deterministic tie-break key: `(-layerPriority, |az|, |el|)`, compared
/// lexicographically with a stable minimum (not a sort) to match ties in
/// input order when every field is equal.
fn tie_break_key(channel: &Channel) -> (i32, f64, f64) {
    (
        -channel.layer_priority(),
        channel.nominal_position.azimuth.abs(),
        channel.nominal_position.elevation.abs(),
    )
}

fn select_by_min_distance<'a>(
    channels: &'a [Channel],
    candidates: &[(usize, f64)],
) -> Option<&'a Channel> {
    let dmin = candidates
        .iter()
        .map(|(_, d)| *d)
        .fold(f64::INFINITY, f64::min);
    if !dmin.is_finite() {
        return None;
    }
    const TOL: f64 = 1e-6;
    candidates
        .iter()
        .filter(|(_, d)| *d <= dmin + TOL)
        .map(|(i, _)| &channels[*i])
        .min_by(|a, b| tie_break_key(a).partial_cmp(&tie_break_key(b)).unwrap())
}

/// Lock `position` onto the nearest non-excluded, non-LFE speaker by
/// great-circle angular distance (radians). Returns `position` unchanged if
/// no speaker is eligible.
pub fn polar_channel_lock(
    position: PolarPosition,
    channels: &[Channel],
    excluded: &[bool],
    lock: ChannelLock,
) -> PolarPosition {
    let direction = position.direction();
    let candidates: Vec<(usize, f64)> = channels
        .iter()
        .enumerate()
        .filter(|(i, ch)| !ch.is_lfe && !excluded[*i])
        .map(|(i, ch)| (i, direction.angle_between(ch.nominal_position.direction())))
        .filter(|(_, d)| lock.max_distance.map_or(true, |max| *d <= max))
        .collect();

    match select_by_min_distance(channels, &candidates) {
        Some(ch) => PolarPosition::new(ch.nominal_position.azimuth, ch.nominal_position.elevation, position.distance),
        None => position,
    }
}

/// Allocentric variant of [`polar_channel_lock`]: Euclidean distance on cube
/// coordinates instead of angular distance on the unit sphere.
pub fn allocentric_channel_lock(
    position: DVec3,
    channels: &[Channel],
    channel_cube_positions: &[DVec3],
    excluded: &[bool],
    lock: ChannelLock,
) -> DVec3 {
    let candidates: Vec<(usize, f64)> = channels
        .iter()
        .enumerate()
        .filter(|(i, ch)| !ch.is_lfe && !excluded[*i])
        .map(|(i, _)| (i, position.distance(channel_cube_positions[i])))
        .filter(|(_, d)| lock.max_distance.map_or(true, |max| *d <= max))
        .collect();

    match select_by_min_distance(channels, &candidates) {
        Some(ch) => {
            let idx = channels.iter().position(|c| std::ptr::eq(c, ch)).unwrap();
            channel_cube_positions[idx]
        }
        None => position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Layout, LayoutName};
    use proptest::prelude::*;

    #[test]
    fn locks_onto_nearest_speaker() {
        let layout = Layout::from_catalog(LayoutName::Surround0_5_0).unwrap();
        let locked = polar_channel_lock(
            PolarPosition::new(29.0, 0.0, 1.0),
            layout.channels(),
            &vec![false; layout.n_ch()],
            ChannelLock { max_distance: None },
        );
        assert_eq!(locked.azimuth, 30.0);
    }

    #[test]
    fn max_distance_filters_out_far_speakers() {
        let layout = Layout::from_catalog(LayoutName::Surround0_5_0).unwrap();
        let original = PolarPosition::new(29.0, 0.0, 1.0);
        let locked = polar_channel_lock(
            original,
            layout.channels(),
            &vec![false; layout.n_ch()],
            ChannelLock {
                max_distance: Some(1e-6),
            },
        );
        assert_eq!(locked.azimuth, original.azimuth);
    }

    #[test]
    fn excluded_speakers_are_skipped() {
        let layout = Layout::from_catalog(LayoutName::Surround0_5_0).unwrap();
        let mut excluded = vec![false; layout.n_ch()];
        let idx = layout.index_of("M+030").unwrap();
        excluded[idx] = true;
        let locked = polar_channel_lock(
            PolarPosition::new(29.0, 0.0, 1.0),
            layout.channels(),
            &excluded,
            ChannelLock { max_distance: None },
        );
        assert_ne!(locked.azimuth, 30.0);
    }

    #[test]
    fn expanding_max_distance_never_shrinks_candidate_set() {
        let layout = Layout::from_catalog(LayoutName::Surround0_5_0).unwrap();
        let excluded = vec![false; layout.n_ch()];
        let direction = PolarPosition::new(10.0, 0.0, 1.0).direction();
        let narrow: Vec<usize> = layout
            .channels()
            .iter()
            .enumerate()
            .filter(|(i, ch)| {
                !ch.is_lfe
                    && !excluded[*i]
                    && direction.angle_between(ch.nominal_position.direction()) <= 0.2
            })
            .map(|(i, _)| i)
            .collect();
        let wide: Vec<usize> = layout
            .channels()
            .iter()
            .enumerate()
            .filter(|(i, ch)| {
                !ch.is_lfe
                    && !excluded[*i]
                    && direction.angle_between(ch.nominal_position.direction()) <= 0.6
            })
            .map(|(i, _)| i)
            .collect();
        assert!(narrow.iter().all(|i| wide.contains(i)));
    }

    proptest! {
        /// §8 property 7: increasing `channelLock.maxDistance` never removes a
        /// candidate that was eligible at the smaller distance.
        #[test]
        fn increasing_max_distance_never_shrinks_candidate_set(
            az in -180.0f64..180.0,
            el in -90.0f64..90.0,
            narrow_max in 0.0f64..2.0,
            widen_by in 0.0f64..2.0,
        ) {
            let layout = Layout::from_catalog(LayoutName::NinePlusTenPlusThree).unwrap();
            let excluded = vec![false; layout.n_ch()];
            let direction = PolarPosition::new(az, el, 1.0).direction();

            let candidates_at = |max: f64| -> Vec<usize> {
                layout
                    .channels()
                    .iter()
                    .enumerate()
                    .filter(|(_, ch)| !ch.is_lfe)
                    .filter(|(i, _)| !excluded[*i])
                    .filter(|(_, ch)| direction.angle_between(ch.nominal_position.direction()) <= max)
                    .map(|(i, _)| i)
                    .collect()
            };

            let narrow = candidates_at(narrow_max);
            let wide = candidates_at(narrow_max + widen_by);
            prop_assert!(narrow.iter().all(|i| wide.contains(i)));
        }
    }
}
