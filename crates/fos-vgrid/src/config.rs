//! Preprocessor Configuration

use crate::atlas::GRID_MAX_SIZE;

/// Glyph preprocessing options
#[derive(Debug, Clone)]
pub struct PreprocessorConfig {
    /// VGrid cells per axis (at most `GRID_MAX_SIZE`)
    pub grid_size: u16,

    /// Cubic approximation error, as a fraction of the average bbox side
    pub cubic_tolerance: f32,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_MAX_SIZE,
            cubic_tolerance: 0.05,
        }
    }
}

impl PreprocessorConfig {
    /// Grid size clamped into `1..=GRID_MAX_SIZE`
    pub fn effective_grid_size(&self) -> u16 {
        self.grid_size.clamp(1, GRID_MAX_SIZE)
    }
}
