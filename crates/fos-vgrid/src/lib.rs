//! fOS VGrid - GPU Vector Text Preprocessing
//!
//! This crate prepares font glyphs for resolution-independent GPU text:
//! - Outline decomposition into clockwise quadratic Béziers (cubics approximated)
//! - Per-glyph grid of curve incidence and inside/outside cell midpoints
//! - Packing of curve data and grid cells into fixed-size atlas groups
//! - Glyph cache keyed by font and codepoint
//! - Font loading (ttf-parser, fontdb)

pub mod geometry;
pub mod cubic;
pub mod outline;
pub mod vgrid;
pub mod atlas;
pub mod font;
pub mod config;
pub mod preprocessor;

pub use geometry::{Bezier2, Vec2};
pub use outline::{decompose, Orientation, Outline, OutlineCommand};
pub use vgrid::VGrid;
pub use atlas::{
    AtlasGroup, ATLAS_CHANNELS, BEZIER_ATLAS_SIZE, GRID_ATLAS_SIZE, GRID_MAX_SIZE,
};
pub use font::{FontId, FontSource, GlyphMetrics, LoadedGlyph, TtfFont};
pub use config::PreprocessorConfig;
pub use preprocessor::{AtlasRef, Glyph, GlyphPreprocessor};

/// Glyph preprocessing error types
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Failed to parse font: {0}")]
    FontParsing(String),

    #[error("Glyph {0} is not in the font")]
    MissingGlyph(u16),

    #[error("Invalid outline: {0}")]
    InvalidOutline(String),

    #[error("Unknown font handle: {0:?}")]
    UnknownFont(FontId),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TextError>;
