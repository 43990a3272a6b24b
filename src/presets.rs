//! Cataloged BS.2051-style loudspeaker layouts.
//!
//! All angles are in degrees with the ITU-R BS.2127 convention:
//! - Azimuth 0 deg = front centre, positive azimuth = left.
//! - Elevation 0 deg = horizontal plane, positive = above.
//!
//! Each entry is `(channel name, azimuth, elevation, is_lfe)`. See
//! `SPEC_FULL.md` §4.4.1 for the reasoning behind treating these tables as
//! nominal *positions* (triangulated at construction time) rather than
//! hand-enumerated region lists.

/// `0+2+0`: plain stereo.
pub const LAYOUT_0_2_0: &[(&str, f64, f64, bool)] =
    &[("M+030", 30.0, 0.0, false), ("M-030", -30.0, 0.0, false)];

/// `0+5+0`: ITU-R BS.775 5.0/5.1 bed (LFE carried separately, per channel).
pub const LAYOUT_0_5_0: &[(&str, f64, f64, bool)] = &[
    ("M+030", 30.0, 0.0, false),
    ("M-030", -30.0, 0.0, false),
    ("M+000", 0.0, 0.0, false),
    ("M+110", 110.0, 0.0, false),
    ("M-110", -110.0, 0.0, false),
    ("LFE1", -45.0, -30.0, true),
];

/// `4+5+0`: 5.0 bed plus four upper-layer speakers at 30 deg elevation.
pub const LAYOUT_4_5_0: &[(&str, f64, f64, bool)] = &[
    ("M+030", 30.0, 0.0, false),
    ("M-030", -30.0, 0.0, false),
    ("M+000", 0.0, 0.0, false),
    ("M+110", 110.0, 0.0, false),
    ("M-110", -110.0, 0.0, false),
    ("U+030", 30.0, 30.0, false),
    ("U-030", -30.0, 30.0, false),
    ("U+110", 110.0, 30.0, false),
    ("U-110", -110.0, 30.0, false),
    ("LFE1", -45.0, -30.0, true),
];

/// `4+9+0`: nine-speaker horizontal bed plus four upper-layer speakers.
pub const LAYOUT_4_9_0: &[(&str, f64, f64, bool)] = &[
    ("M+000", 0.0, 0.0, false),
    ("M+030", 30.0, 0.0, false),
    ("M-030", -30.0, 0.0, false),
    ("M+060", 60.0, 0.0, false),
    ("M-060", -60.0, 0.0, false),
    ("M+090", 90.0, 0.0, false),
    ("M-090", -90.0, 0.0, false),
    ("M+135", 135.0, 0.0, false),
    ("M-135", -135.0, 0.0, false),
    ("U+030", 30.0, 30.0, false),
    ("U-030", -30.0, 30.0, false),
    ("U+110", 110.0, 30.0, false),
    ("U-110", -110.0, 30.0, false),
    ("LFE1", -45.0, -30.0, true),
];

/// `9+10+3`: a BS.2051-derived three-layer bed (bottom/middle/top).
pub const LAYOUT_9_10_3: &[(&str, f64, f64, bool)] = &[
    // Bottom layer.
    ("B+000", 0.0, -30.0, false),
    ("B+045", 45.0, -30.0, false),
    ("B-045", -45.0, -30.0, false),
    // Middle layer.
    ("M+000", 0.0, 0.0, false),
    ("M+022", 22.5, 0.0, false),
    ("M-022", -22.5, 0.0, false),
    ("M+030", 30.0, 0.0, false),
    ("M-030", -30.0, 0.0, false),
    ("M+090", 90.0, 0.0, false),
    ("M-090", -90.0, 0.0, false),
    ("M+135", 135.0, 0.0, false),
    ("M-135", -135.0, 0.0, false),
    ("M+180", 180.0, 0.0, false),
    // Top layer.
    ("U+000", 0.0, 60.0, false),
    ("U+045", 45.0, 60.0, false),
    ("U-045", -45.0, 60.0, false),
    ("LFE1", -45.0, -30.0, true),
    ("LFE2", 45.0, -30.0, true),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_sizes() {
        assert_eq!(LAYOUT_0_2_0.len(), 2);
        assert_eq!(LAYOUT_0_5_0.len(), 6);
        assert_eq!(LAYOUT_4_5_0.len(), 10);
        assert_eq!(LAYOUT_4_9_0.len(), 14);
        assert_eq!(LAYOUT_9_10_3.len(), 18);
    }

    #[test]
    fn exactly_one_lfe_flag_set_per_channel_that_says_lfe() {
        for table in [LAYOUT_0_5_0, LAYOUT_4_5_0, LAYOUT_4_9_0] {
            let lfe_count = table.iter().filter(|(_, _, _, lfe)| *lfe).count();
            assert_eq!(lfe_count, 1);
        }
    }
}
