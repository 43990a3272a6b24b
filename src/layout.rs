//! Loudspeaker layout: an ordered sequence of named channels.

use std::collections::HashMap;

use crate::error::GainError;
use crate::geom::PolarPosition;
use crate::presets;

/// Which cataloged BS.2051-style layout to build, or a caller-supplied one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutName {
    Stereo0_2_0,
    Surround0_5_0,
    FourPlusFivePlusZero,
    FourPlusNinePlusZero,
    NinePlusTenPlusThree,
}

impl LayoutName {
    fn table(self) -> &'static [(&'static str, f64, f64, bool)] {
        match self {
            LayoutName::Stereo0_2_0 => presets::LAYOUT_0_2_0,
            LayoutName::Surround0_5_0 => presets::LAYOUT_0_5_0,
            LayoutName::FourPlusFivePlusZero => presets::LAYOUT_4_5_0,
            LayoutName::FourPlusNinePlusZero => presets::LAYOUT_4_9_0,
            LayoutName::NinePlusTenPlusThree => presets::LAYOUT_9_10_3,
        }
    }

    fn label(self) -> &'static str {
        match self {
            LayoutName::Stereo0_2_0 => "0+2+0",
            LayoutName::Surround0_5_0 => "0+5+0",
            LayoutName::FourPlusFivePlusZero => "4+5+0",
            LayoutName::FourPlusNinePlusZero => "4+9+0",
            LayoutName::NinePlusTenPlusThree => "9+10+3",
        }
    }

    /// Whether this layout supports allocentric (room-relative) panning, per
    /// §4.6. Only the 9+10+3 bed is dense enough in this catalog to carry a
    /// meaningful tensor-product grid on all three axes.
    pub fn supports_allocentric(self) -> bool {
        matches!(self, LayoutName::NinePlusTenPlusThree)
    }
}

/// One loudspeaker: its name, nominal and "real" (as-measured) polar
/// position, and whether it is an LFE channel.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Channel {
    pub name: String,
    pub nominal_position: PolarPosition,
    pub real_position: PolarPosition,
    pub is_lfe: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>, position: PolarPosition, is_lfe: bool) -> Self {
        let name = name.into();
        Self {
            name,
            nominal_position: position,
            real_position: position,
            is_lfe,
        }
    }

    /// BS.2127-1 §7.3.6 layer priority, derived from the channel-name
    /// prefix: ceiling > upper > mid > lower > floor/bottom.
    pub fn layer_priority(&self) -> i32 {
        match self.name.as_bytes().first() {
            Some(b'T') => 4, // Top/ceiling (e.g. "T+000")
            Some(b'U') => 3, // Upper
            Some(b'M') => 2, // Mid (screen height)
            Some(b'L') => 1, // Lower
            Some(b'B') => 0, // Bottom
            _ => 2,
        }
    }
}

/// An ordered, immutable loudspeaker layout.
#[derive(Clone, Debug)]
pub struct Layout {
    name: String,
    channels: Vec<Channel>,
    name_to_index: HashMap<String, usize>,
    allocentric: bool,
}

impl Layout {
    /// Build a layout from a cataloged BS.2051-style name.
    pub fn from_catalog(catalog: LayoutName) -> Result<Self, GainError> {
        let channels: Vec<Channel> = catalog
            .table()
            .iter()
            .map(|(name, az, el, lfe)| Channel::new(*name, PolarPosition::new(*az, *el, 1.0), *lfe))
            .collect();
        Self::custom(catalog.label(), channels, catalog.supports_allocentric())
    }

    /// Build a layout from caller-supplied channels (§6: the external
    /// `layoutExcludingLFE` constructor input, generalized to accept any
    /// well-formed channel list rather than only the catalog).
    pub fn custom(
        name: impl Into<String>,
        channels: Vec<Channel>,
        allocentric: bool,
    ) -> Result<Self, GainError> {
        let name = name.into();
        if channels.is_empty() {
            return Err(GainError::UnsupportedLayout {
                name,
                reason: "layout has no channels".into(),
            });
        }
        let non_lfe = channels.iter().filter(|c| !c.is_lfe).count();
        if non_lfe < 2 {
            return Err(GainError::UnsupportedLayout {
                name,
                reason: "layout needs at least 2 non-LFE channels".into(),
            });
        }
        let mut name_to_index = HashMap::with_capacity(channels.len());
        for (i, ch) in channels.iter().enumerate() {
            if name_to_index.insert(ch.name.clone(), i).is_some() {
                return Err(GainError::UnsupportedLayout {
                    name,
                    reason: format!("duplicate channel name {:?}", ch.name),
                });
            }
        }
        Ok(Self {
            name,
            channels,
            name_to_index,
            allocentric,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn n_ch(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn n_ch_no_lfe(&self) -> usize {
        self.channels.iter().filter(|c| !c.is_lfe).count()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn supports_allocentric(&self) -> bool {
        self.allocentric
    }

    /// Indices of non-LFE channels, in layout order — the index space the
    /// point-source/allocentric panners and extent handlers compute gains
    /// over internally, before `insert_lfe` (§4.12 step 11) expands back to
    /// `n_ch`.
    pub fn non_lfe_indices(&self) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_lfe)
            .map(|(i, _)| i)
            .collect()
    }

    /// Expand a gain vector indexed over non-LFE channels (length
    /// `n_ch_no_lfe`) into one indexed over all channels (length `n_ch`),
    /// inserting 0 at each LFE position. §4.12 step 11.
    pub fn insert_lfe(&self, no_lfe_gains: &[f64]) -> Vec<f64> {
        debug_assert_eq!(no_lfe_gains.len(), self.n_ch_no_lfe());
        let mut out = vec![0.0; self.n_ch()];
        let mut src = no_lfe_gains.iter();
        for (i, ch) in self.channels.iter().enumerate() {
            if !ch.is_lfe {
                out[i] = *src.next().unwrap_or(&0.0);
            }
        }
        out
    }
}
