//! Error types for gain-calculation operations.

use thiserror::Error;

/// Errors that can occur while constructing a [`crate::layout::Layout`] or a
/// [`crate::gain_calculator::GainCalculator`].
///
/// Per-call numerical degeneracies (§7's `DegenerateGeometry`) are recovered
/// internally as an all-zero gain vector and never surface here; this type
/// only carries the two failure modes that must reach the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GainError {
    /// Construction-time: the supplied layout is not one of the recognized
    /// BS.2127 layouts and no custom region table was supplied for it.
    #[error("unsupported layout {name:?}: {reason}")]
    UnsupportedLayout { name: String, reason: String },

    /// Call-time: a metadata field is out of its nominal range or NaN.
    #[error("invalid metadata field {field}: {reason}")]
    InvalidMetadata { field: &'static str, reason: String },
}

/// Result type alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, GainError>;
