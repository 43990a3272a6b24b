//! Screen scaling and screen-edge lock, §4.8.

use crate::geom::PolarPosition;
use crate::metadata::{ScreenEdgeLockFlags, ScreenRef};

/// Remaps a position so a source at the nominal reference screen's edge is
/// reproduced at the reproduction screen's edge, via a piecewise-linear
/// azimuth/elevation warp centred on each screen's midpoint.
pub struct ScreenScaleHandler {
    reference: ScreenRef,
    reproduction: ScreenRef,
}

impl ScreenScaleHandler {
    pub fn new(reference: ScreenRef, reproduction: ScreenRef) -> Self {
        Self {
            reference,
            reproduction,
        }
    }

    pub fn scale_position(&self, position: PolarPosition) -> PolarPosition {
        let az = scale_axis(
            position.azimuth,
            self.reference.azimuth_range,
            self.reproduction.azimuth_range,
        );
        let el = scale_axis(
            position.elevation,
            self.reference.elevation_range,
            self.reproduction.elevation_range,
        );
        PolarPosition::new(wrap_azimuth(az), el.clamp(-90.0, 90.0), position.distance)
    }
}

fn scale_axis(value: f64, reference_range: (f64, f64), reproduction_range: (f64, f64)) -> f64 {
    let ref_centre = (reference_range.0 + reference_range.1) / 2.0;
    let ref_half = (reference_range.1 - reference_range.0) / 2.0;
    let repro_centre = (reproduction_range.0 + reproduction_range.1) / 2.0;
    let repro_half = (reproduction_range.1 - reproduction_range.0) / 2.0;
    if ref_half.abs() < 1e-9 {
        return value;
    }
    repro_centre + (value - ref_centre) * (repro_half / ref_half)
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

/// Snaps a position onto the reproduction screen's edge on whichever axes
/// the metadata's screen-edge-lock flags select. A position already inside
/// the screen bounds on a locked axis is left unchanged; one outside is
/// clamped to the nearest edge.
pub struct ScreenEdgeLock {
    screen: ScreenRef,
}

impl ScreenEdgeLock {
    pub fn new(screen: ScreenRef) -> Self {
        Self { screen }
    }

    pub fn apply(&self, position: PolarPosition, flags: ScreenEdgeLockFlags) -> PolarPosition {
        let mut az = position.azimuth;
        let mut el = position.elevation;
        if flags.horizontal {
            az = az.clamp(self.screen.azimuth_range.0.min(self.screen.azimuth_range.1), self.screen.azimuth_range.0.max(self.screen.azimuth_range.1));
        }
        if flags.vertical {
            el = el.clamp(
                self.screen.elevation_range.0.min(self.screen.elevation_range.1),
                self.screen.elevation_range.0.max(self.screen.elevation_range.1),
            );
        }
        PolarPosition::new(az, el, position.distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identical_screens_are_a_no_op() {
        let handler = ScreenScaleHandler::new(ScreenRef::default_reference(), ScreenRef::default_reference());
        let p = PolarPosition::new(15.0, 5.0, 1.0);
        let scaled = handler.scale_position(p);
        assert_relative_eq!(scaled.azimuth, p.azimuth, epsilon = 1e-9);
        assert_relative_eq!(scaled.elevation, p.elevation, epsilon = 1e-9);
    }

    #[test]
    fn wider_reproduction_screen_scales_up_edge_position() {
        let reference = ScreenRef::default_reference();
        let reproduction = ScreenRef {
            azimuth_range: (-45.0, 45.0),
            ..ScreenRef::default_reference()
        };
        let handler = ScreenScaleHandler::new(reference, reproduction);
        let scaled = handler.scale_position(PolarPosition::new(30.0, 0.0, 1.0));
        assert_relative_eq!(scaled.azimuth, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn edge_lock_clamps_outside_positions() {
        let lock = ScreenEdgeLock::new(ScreenRef::default_reference());
        let flags = ScreenEdgeLockFlags {
            horizontal: true,
            vertical: false,
        };
        let locked = lock.apply(PolarPosition::new(60.0, 10.0, 1.0), flags);
        assert_relative_eq!(locked.azimuth, 30.0, epsilon = 1e-9);
        assert_relative_eq!(locked.elevation, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn edge_lock_leaves_interior_positions_untouched() {
        let lock = ScreenEdgeLock::new(ScreenRef::default_reference());
        let flags = ScreenEdgeLockFlags {
            horizontal: true,
            vertical: true,
        };
        let locked = lock.apply(PolarPosition::new(10.0, 5.0, 1.0), flags);
        assert_relative_eq!(locked.azimuth, 10.0, epsilon = 1e-9);
        assert_relative_eq!(locked.elevation, 5.0, epsilon = 1e-9);
    }
}
