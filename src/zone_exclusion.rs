//! Zone exclusion: excluded-speaker membership testing and downmix gain
//! redistribution, §4.11.

use crate::adm_conversion::point_polar_to_cart;
use crate::geom::inside_angle_range;
use crate::layout::Channel;
use crate::metadata::ExclusionZone;

/// Boolean excluded vector, one entry per channel (including LFE, which are
/// never considered excluded by this computation — they are dropped from
/// panning entirely upstream).
pub fn compute_excluded(channels: &[Channel], zones: &[ExclusionZone]) -> Vec<bool> {
    channels
        .iter()
        .map(|ch| zones.iter().any(|z| channel_in_zone(ch, z)))
        .collect()
}

fn channel_in_zone(channel: &Channel, zone: &ExclusionZone) -> bool {
    match zone {
        ExclusionZone::Polar {
            min_azimuth,
            max_azimuth,
            min_elevation,
            max_elevation,
            min_distance,
            max_distance,
        } => {
            let p = channel.nominal_position;
            inside_angle_range(p.azimuth, *min_azimuth, *max_azimuth, 1e-6)
                && p.elevation >= *min_elevation - 1e-9
                && p.elevation <= *max_elevation + 1e-9
                && p.distance >= *min_distance - 1e-9
                && p.distance <= *max_distance + 1e-9
        }
        ExclusionZone::Cartesian {
            min_x,
            max_x,
            min_y,
            max_y,
            min_z,
            max_z,
        } => {
            let c = point_polar_to_cart(channel.nominal_position);
            c.x >= *min_x - 1e-9
                && c.x <= *max_x + 1e-9
                && c.y >= *min_y - 1e-9
                && c.y <= *max_y + 1e-9
                && c.z >= *min_z - 1e-9
                && c.z <= *max_z + 1e-9
        }
    }
}

/// Redistribute gain off excluded speakers and onto eligible non-excluded
/// ones, in-place, per the §4.11 cascade: prefer the nearest speaker in the
/// same layer (row), then the nearest layer by priority distance, then the
/// nearest speaker overall. `gains` and `channels` must be `nCh`-wide
/// (LFE-inclusive); LFE channels are skipped as redistribution targets since
/// they never carry panned gain.
pub fn handle(gains: &mut [f64], channels: &[Channel], excluded: &[bool]) {
    debug_assert_eq!(gains.len(), channels.len());
    debug_assert_eq!(excluded.len(), channels.len());

    let any_eligible = channels
        .iter()
        .zip(excluded)
        .any(|(ch, excl)| !ch.is_lfe && !excl);
    if !any_eligible {
        tracing::warn!("zone exclusion excludes every non-LFE speaker; emitting silence");
        gains.fill(0.0);
        return;
    }

    for i in 0..channels.len() {
        if !excluded[i] || gains[i].abs() < 1e-12 || channels[i].is_lfe {
            continue;
        }
        let direction = channels[i].nominal_position.direction();
        let priority = channels[i].layer_priority();
        let target = (0..channels.len())
            .filter(|&j| j != i && !excluded[j] && !channels[j].is_lfe)
            .min_by(|&a, &b| {
                let key = |j: usize| {
                    let priority_diff = (channels[j].layer_priority() - priority).abs();
                    let angular = direction.angle_between(channels[j].nominal_position.direction());
                    (priority_diff, angular)
                };
                let (pa, aa) = key(a);
                let (pb, ab) = key(b);
                pa.cmp(&pb).then(aa.total_cmp(&ab))
            });
        if let Some(target) = target {
            gains[target] += gains[i];
            gains[i] = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Layout, LayoutName};

    #[test]
    fn excludes_speakers_in_polar_zone() {
        let layout = Layout::from_catalog(LayoutName::Surround0_5_0).unwrap();
        let zones = vec![ExclusionZone::Polar {
            min_azimuth: 100.0,
            max_azimuth: 120.0,
            min_elevation: -10.0,
            max_elevation: 10.0,
            min_distance: 0.0,
            max_distance: 1.0,
        }];
        let excluded = compute_excluded(layout.channels(), &zones);
        let idx = layout.index_of("M+110").unwrap();
        assert!(excluded[idx]);
        let idx2 = layout.index_of("M+030").unwrap();
        assert!(!excluded[idx2]);
    }

    #[test]
    fn redistributes_gain_onto_non_excluded() {
        let layout = Layout::from_catalog(LayoutName::Surround0_5_0).unwrap();
        let mut gains = vec![0.0; layout.n_ch()];
        let excluded_idx = layout.index_of("M+110").unwrap();
        gains[excluded_idx] = 1.0;
        let mut excluded = vec![false; layout.n_ch()];
        excluded[excluded_idx] = true;
        handle(&mut gains, layout.channels(), &excluded);
        assert_eq!(gains[excluded_idx], 0.0);
        let total: f64 = gains.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn all_excluded_yields_silence() {
        let layout = Layout::from_catalog(LayoutName::Stereo0_2_0).unwrap();
        let mut gains = vec![0.5; layout.n_ch()];
        let excluded = vec![true; layout.n_ch()];
        handle(&mut gains, layout.channels(), &excluded);
        assert!(gains.iter().all(|g| *g == 0.0));
    }
}
