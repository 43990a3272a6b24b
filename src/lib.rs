//! # admgain — ITU-R BS.2127 ADM object gain calculator
//!
//! Converts per-object ADM metadata (position, extent, divergence, channel
//! lock, zone exclusion, screen scaling, cartesian/polar mode) into direct
//! and diffuse loudspeaker gain vectors for a fixed [`Layout`].
//!
//! ## Quick Start
//!
//! ```rust
//! use admgain::{GainCalculator, Layout, LayoutName, ObjectMetadata, Position, PolarPosition};
//!
//! let mut calc = GainCalculator::new(Layout::from_catalog(LayoutName::Surround0_5_0)?).unwrap();
//!
//! let metadata = ObjectMetadata::point_source(
//!     Position::Polar(PolarPosition::new(0.0, 0.0, 1.0)),
//!     1.0,
//!     0.0,
//! );
//! let (direct, diffuse) = calc.calculate_gains(&metadata)?;
//! println!("direct gains: {direct:?}");
//! # Ok::<(), admgain::GainError>(())
//! ```
//!
//! ## Cataloged layouts
//!
//! `0+2+0`, `0+5+0`, `4+5+0`, `4+9+0`, and `9+10+3` (the only layout in this
//! catalog dense enough to support allocentric/room-relative panning).
//!
//! ## Angle conventions
//!
//! - **Azimuth**: 0° = front centre, 90° = left, -90° = right, 180° = rear.
//! - **Elevation**: 0° = horizontal, 90° = above, -90° = below.
//!
//! ## References
//!
//! ITU-R BS.2127-1, "Audio Definition Model renderer for advanced sound
//! systems" — the reference algorithm this crate's point-source/extent/
//! allocentric panning is built from.

pub mod adm_conversion;
pub mod allocentric;
pub mod channel_lock;
pub mod divergence;
pub mod error;
pub mod extent;
pub mod gain_calculator;
pub mod geom;
pub mod layout;
pub mod metadata;
pub mod point_source;
pub mod presets;
pub mod region;
pub mod screen;
pub mod zone_exclusion;

// Re-exports for ergonomic API.
pub use error::{GainError, Result};
pub use gain_calculator::{GainCalculator, GainCalculatorBuilder};
pub use geom::{CartesianPosition, PolarPosition, Position};
pub use layout::{Channel, Layout, LayoutName};
pub use metadata::{
    ChannelLock, ExclusionZone, ObjectDivergence, ObjectMetadata, ScreenEdgeLockFlags, ScreenRef,
};
pub use point_source::PointSourcePanner;
