//! Configuration errors
//!
//! Everything that can go wrong is caught while building a simulation, so a
//! running chain never divides by a zero length or indexes an empty palette.

use thiserror::Error;

/// Errors that can occur when constructing a chain simulation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No colors to draw from.
    #[error("palette must contain at least one color")]
    EmptyPalette,
    /// A curve needs a start and an end.
    #[error("curve needs at least 2 points, got {0}")]
    TooFewPoints(usize),
    /// All curve points coincide.
    #[error("curve has zero length")]
    DegenerateCurve,
    /// A field that must be strictly positive (and finite).
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    /// A field that must be zero or positive (and finite).
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    /// Matches of fewer than two balls would destroy every insertion.
    #[error("min_match_count must be at least 2, got {0}")]
    MinMatchTooSmall(usize),
    /// Group sizes for sequence generation.
    #[error("group sizes must satisfy 1 <= min <= max, got {min}..={max}")]
    InvalidRunLength { min: usize, max: usize },
    /// A color in a provided sequence does not fit the palette.
    #[error("color {color} is outside palette of size {palette}")]
    ColorOutOfPalette { color: u8, palette: u8 },
    /// Sampling counts must be non-zero.
    #[error("sampling resolution must be non-zero")]
    ZeroSampling,
    /// Malformed JSON config.
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}
