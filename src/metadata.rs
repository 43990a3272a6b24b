//! Per-object ADM metadata: the input to [`crate::gain_calculator::GainCalculator`].

use crate::geom::Position;

/// Azimuth/elevation/distance range describing a polar exclusion zone, or
/// the axis-aligned box of a cartesian one.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExclusionZone {
    Polar {
        min_azimuth: f64,
        max_azimuth: f64,
        min_elevation: f64,
        max_elevation: f64,
        min_distance: f64,
        max_distance: f64,
    },
    Cartesian {
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
        min_z: f64,
        max_z: f64,
    },
}

/// `objectDivergence`: splits a point source into up to three symmetric
/// virtual sources, per §4.9/§4.10.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectDivergence {
    /// `v in [0, 1]`: 0 disables divergence, 1 splits power evenly between
    /// the two side sources.
    pub value: f64,
    /// Azimuth offset (degrees) of each side source from the centre.
    pub azimuth_range: f64,
}

/// `channelLock`: snaps the object to the nearest speaker, per §4.9 (of
/// `SPEC_FULL.md`; §4.8 numbering therein).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelLock {
    pub max_distance: Option<f64>,
}

/// Reference reproduction screen geometry, used by screen scale/edge-lock.
/// Angles in degrees, matching the nominal reference screen convention.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScreenRef {
    pub azimuth_range: (f64, f64),
    pub elevation_range: (f64, f64),
    pub aspect_ratio: f64,
}

impl ScreenRef {
    /// BS.2127 default reference screen: +/-30 azimuth, +/-17.5 elevation.
    pub fn default_reference() -> Self {
        Self {
            azimuth_range: (-30.0, 30.0),
            elevation_range: (-17.5, 17.5),
            aspect_ratio: 1.78,
        }
    }
}

impl Default for ScreenRef {
    fn default() -> Self {
        Self::default_reference()
    }
}

/// Horizontal and/or vertical screen-edge lock flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScreenEdgeLockFlags {
    pub horizontal: bool,
    pub vertical: bool,
}

/// One ADM `AudioBlockFormat` of object metadata.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectMetadata {
    pub position: Position,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub object_divergence: Option<ObjectDivergence>,
    pub channel_lock: Option<ChannelLock>,
    pub exclusion_zones: Vec<ExclusionZone>,
    pub screen_ref: ScreenRef,
    pub screen_edge_lock: ScreenEdgeLockFlags,
    pub diffuse: f64,
    pub gain: f64,
    /// When true, skip any interpolation across blocks (sample-accurate
    /// interpolation is out of scope per §1; this flag is preserved so a
    /// caller doing its own interpolation can honor it).
    pub jump_position: bool,
}

impl ObjectMetadata {
    /// Build metadata for a simple point source: the common case of §8's
    /// scenarios A-D.
    pub fn point_source(position: Position, gain: f64, diffuse: f64) -> Self {
        Self {
            position,
            width: 0.0,
            height: 0.0,
            depth: 0.0,
            object_divergence: None,
            channel_lock: None,
            exclusion_zones: Vec::new(),
            screen_ref: ScreenRef::default_reference(),
            screen_edge_lock: ScreenEdgeLockFlags::default(),
            diffuse,
            gain,
            jump_position: true,
        }
    }

    pub fn has_extent(&self) -> bool {
        self.width > 1e-9 || self.height > 1e-9 || self.depth > 1e-9
    }

    /// Basic field-range / NaN validation, run at the top of
    /// `calculate_gains` (§7's `InvalidMetadata`).
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::GainError;
        let checks: &[(&'static str, f64)] = &[
            ("width", self.width),
            ("height", self.height),
            ("depth", self.depth),
            ("diffuse", self.diffuse),
            ("gain", self.gain),
        ];
        for (field, value) in checks {
            if value.is_nan() {
                return Err(GainError::InvalidMetadata {
                    field,
                    reason: "value is NaN".into(),
                });
            }
        }
        if self.gain < 0.0 {
            return Err(GainError::InvalidMetadata {
                field: "gain",
                reason: "gain must be non-negative".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.diffuse) {
            return Err(GainError::InvalidMetadata {
                field: "diffuse",
                reason: "diffuse must be in [0, 1]".into(),
            });
        }
        if let Position::Polar(p) = self.position {
            if p.azimuth.is_nan() || p.elevation.is_nan() || p.distance.is_nan() {
                return Err(GainError::InvalidMetadata {
                    field: "position",
                    reason: "polar position contains NaN".into(),
                });
            }
        }
        if let Some(div) = self.object_divergence {
            if !(0.0..=1.0).contains(&div.value) {
                return Err(GainError::InvalidMetadata {
                    field: "object_divergence.value",
                    reason: "divergence value must be in [0, 1]".into(),
                });
            }
        }
        Ok(())
    }
}
