//! Glyph preprocessor: font handles, glyph cache, atlas groups

use std::collections::HashMap;
use std::path::Path;

use crate::atlas::{record_pixels, AtlasGroup, Slot, GLYPH_DATA_PIXELS};
use crate::config::PreprocessorConfig;
use crate::font::{FontId, FontSource, GlyphMetrics, TtfFont};
use crate::geometry::Vec2;
use crate::outline::decompose;
use crate::vgrid::VGrid;
use crate::{Result, TextError};

/// Location of a glyph record in the atlas groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtlasRef {
    /// Index into the atlas groups, `-1` for an empty glyph
    pub group_index: i16,
    /// Offset of the record in the group's glyph-data buffer, in pixels
    pub data_offset: u32,
}

impl AtlasRef {
    /// Nothing to draw (whitespace, or a glyph that could not be stored)
    pub const EMPTY: AtlasRef = AtlasRef {
        group_index: -1,
        data_offset: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.group_index < 0
    }

    /// Vertex attribute for one corner of the glyph quad: the data offset
    /// with the corner's normalized coordinates in the two low bits
    pub fn vertex_data(&self, norm_x: bool, norm_y: bool) -> u32 {
        (self.data_offset << 2) | ((norm_x as u32) << 1) | norm_y as u32
    }
}

/// A preprocessed glyph, in font units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Glyph {
    /// Width and height
    pub size: (u16, u16),
    /// Bearing x, and bearing y minus height (bottom of the glyph)
    pub offset: (i16, i16),
    pub advance: i16,
    pub atlas_ref: AtlasRef,
}

impl Glyph {
    fn from_metrics(metrics: &GlyphMetrics, atlas_ref: AtlasRef) -> Self {
        Self {
            size: (to_u16(metrics.width), to_u16(metrics.height)),
            offset: (
                to_i16(metrics.hori_bearing_x),
                to_i16(metrics.hori_bearing_y - metrics.height),
            ),
            advance: to_i16(metrics.hori_advance),
            atlas_ref,
        }
    }

    fn empty(metrics: &GlyphMetrics) -> Self {
        Self::from_metrics(metrics, AtlasRef::EMPTY)
    }

    /// Whether there is anything to draw
    pub fn is_empty(&self) -> bool {
        self.atlas_ref.is_empty()
    }
}

fn to_u16(v: f32) -> u16 {
    v.round().clamp(0.0, u16::MAX as f32) as u16
}

fn to_i16(v: f32) -> i16 {
    v.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Turns font glyphs into GPU-ready curve data and grid cells.
///
/// Owns the open fonts, the `(font, codepoint)` glyph cache and the atlas
/// groups. Groups are only ever appended and glyph records never move, so
/// a renderer can upload groups incrementally (see [`pending_uploads`]).
///
/// [`pending_uploads`]: GlyphPreprocessor::pending_uploads
pub struct GlyphPreprocessor {
    fonts: Vec<Option<Box<dyn FontSource>>>,
    glyphs: HashMap<(FontId, u32), Glyph>,
    groups: Vec<AtlasGroup>,
    config: PreprocessorConfig,
}

impl Default for GlyphPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl GlyphPreprocessor {
    /// Create a preprocessor with default settings
    pub fn new() -> Self {
        Self::with_config(PreprocessorConfig::default())
    }

    pub fn with_config(config: PreprocessorConfig) -> Self {
        Self {
            fonts: Vec::new(),
            glyphs: HashMap::new(),
            groups: Vec::new(),
            config,
        }
    }

    /// Set VGrid cells per axis (clamped to `1..=GRID_MAX_SIZE`)
    pub fn grid_size(mut self, grid_size: u16) -> Self {
        self.config.grid_size = grid_size;
        self
    }

    /// Set the cubic approximation tolerance
    pub fn cubic_tolerance(mut self, tolerance: f32) -> Self {
        self.config.cubic_tolerance = tolerance;
        self
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Open a font file
    pub fn open_font(&mut self, path: impl AsRef<Path>) -> Result<FontId> {
        let path = path.as_ref();
        let font = TtfFont::open(path)?;
        let id = self.add_font(font);
        tracing::info!("Opened font {} as {:?}", path.display(), id);
        Ok(id)
    }

    /// Open a system font by family name
    pub fn open_system_font(&mut self, family: &str) -> Result<FontId> {
        let font = TtfFont::from_system(family)?;
        let id = self.add_font(font);
        tracing::info!("Opened system font '{}' as {:?}", family, id);
        Ok(id)
    }

    /// Register any glyph source
    pub fn add_font(&mut self, source: impl FontSource + 'static) -> FontId {
        let id = FontId(self.fonts.len() as u32);
        self.fonts.push(Some(Box::new(source)));
        id
    }

    /// Release a font. Glyphs already preprocessed stay in the atlas.
    pub fn close_font(&mut self, font: FontId) -> Result<()> {
        self.fonts
            .get_mut(font.0 as usize)
            .and_then(Option::take)
            .map(|_| ())
            .ok_or(TextError::UnknownFont(font))
    }

    /// Glyph record for a codepoint, preprocessing it on first use
    pub fn get_glyph(&mut self, font: FontId, codepoint: u32) -> Result<Glyph> {
        let source = self
            .fonts
            .get(font.0 as usize)
            .and_then(|slot| slot.as_deref())
            .ok_or(TextError::UnknownFont(font))?;

        if let Some(glyph) = self.glyphs.get(&(font, codepoint)) {
            return Ok(*glyph);
        }

        let glyph = preprocess_glyph(source, codepoint, &self.config, &mut self.groups);
        self.glyphs.insert((font, codepoint), glyph);
        Ok(glyph)
    }

    /// Preprocess codepoint 0 and the printable ASCII range
    pub fn load_ascii(&mut self, font: FontId) -> Result<()> {
        for codepoint in std::iter::once(0).chain(32..128) {
            self.get_glyph(font, codepoint)?;
        }
        Ok(())
    }

    /// Cached glyph record, without preprocessing
    pub fn cached_glyph(&self, font: FontId, codepoint: u32) -> Option<&Glyph> {
        self.glyphs.get(&(font, codepoint))
    }

    /// Number of cached glyph records
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// All atlas groups, in creation order
    pub fn atlas_groups(&self) -> &[AtlasGroup] {
        &self.groups
    }

    /// Indices of groups written since they were last uploaded
    pub fn pending_uploads(&self) -> Vec<usize> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.uploaded)
            .map(|(i, _)| i)
            .collect()
    }

    /// Record that the renderer has copied group `index` to the GPU
    pub fn mark_uploaded(&mut self, index: usize) {
        if let Some(group) = self.groups.get_mut(index) {
            group.uploaded = true;
        }
    }
}

/// Decompose, grid, and store one glyph. Glyph-level failures come back as
/// empty records.
fn preprocess_glyph(
    source: &dyn FontSource,
    codepoint: u32,
    config: &PreprocessorConfig,
    groups: &mut Vec<AtlasGroup>,
) -> Glyph {
    let glyph_index = source.glyph_index(codepoint);
    let loaded = match source.load_glyph(glyph_index) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::warn!(
                "Failed to load glyph {} for U+{:04X}: {}",
                glyph_index,
                codepoint,
                e
            );
            return Glyph::empty(&GlyphMetrics::default());
        }
    };
    let metrics = loaded.metrics;

    let curves = decompose(&loaded.outline, config.cubic_tolerance);
    let Some(cbox) = loaded.outline.cbox().filter(|_| !curves.is_empty()) else {
        return Glyph::empty(&metrics);
    };

    let glyph_size = Vec2::new(cbox.width(), cbox.height());
    if glyph_size.w() <= 0.0 || glyph_size.h() <= 0.0 {
        tracing::debug!("U+{:04X} has a degenerate outline", codepoint);
        return Glyph::empty(&metrics);
    }

    if record_pixels(curves.len()) > GLYPH_DATA_PIXELS as u64 {
        tracing::warn!(
            "U+{:04X} has too many curves ({}) for an atlas group; stored as empty",
            codepoint,
            curves.len()
        );
        return Glyph::empty(&metrics);
    }

    let grid_size = config.effective_grid_size() as usize;
    let grid = VGrid::new(&curves, glyph_size, grid_size, grid_size);

    let (group_index, slot) = match place(groups, curves.len()) {
        Some(placed) => placed,
        None => {
            tracing::warn!("U+{:04X} does not fit in an empty atlas group", codepoint);
            return Glyph::empty(&metrics);
        }
    };
    groups[group_index].write_glyph(slot, &curves, glyph_size, &grid);

    tracing::debug!(
        "U+{:04X}: {} curves in group {} at {} (grid {},{})",
        codepoint,
        curves.len(),
        group_index,
        slot.data_offset,
        slot.grid_x,
        slot.grid_y
    );

    let atlas_ref = AtlasRef {
        group_index: group_index as i16,
        data_offset: slot.data_offset,
    };
    Glyph::from_metrics(&metrics, atlas_ref)
}

/// Reserve room in the last group, opening a new group when it is full
fn place(groups: &mut Vec<AtlasGroup>, curve_count: usize) -> Option<(usize, Slot)> {
    if let Some(last) = groups.last_mut() {
        if let Some(slot) = last.reserve(curve_count) {
            return Some((groups.len() - 1, slot));
        }
    }

    if groups.len() >= i16::MAX as usize {
        return None;
    }
    if !groups.is_empty() {
        tracing::debug!(
            "Atlas group {} full, opening group {}",
            groups.len() - 1,
            groups.len()
        );
    }
    let mut group = AtlasGroup::new();
    let slot = group.reserve(curve_count)?;
    groups.push(group);
    Some((groups.len() - 1, slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_data_packing() {
        let r = AtlasRef {
            group_index: 0,
            data_offset: 455,
        };
        assert_eq!(r.vertex_data(false, false), 455 << 2);
        assert_eq!(r.vertex_data(true, false), (455 << 2) | 2);
        assert_eq!(r.vertex_data(false, true), (455 << 2) | 1);
        assert_eq!(r.vertex_data(true, true) >> 2, 455);
    }

    #[test]
    fn test_glyph_from_metrics() {
        let metrics = GlyphMetrics {
            width: 500.0,
            height: 700.0,
            hori_bearing_x: 40.0,
            hori_bearing_y: 690.0,
            hori_advance: 600.0,
        };
        let glyph = Glyph::from_metrics(&metrics, AtlasRef::EMPTY);
        assert_eq!(glyph.size, (500, 700));
        assert_eq!(glyph.offset, (40, -10));
        assert_eq!(glyph.advance, 600);
        assert!(glyph.is_empty());
    }

    #[test]
    fn test_place_opens_groups_lazily() {
        let mut groups = Vec::new();
        let (index, slot) = place(&mut groups, 3).expect("placed");
        assert_eq!(index, 0);
        assert_eq!(slot.data_offset, 0);
        assert_eq!(groups.len(), 1);

        groups[0].full = true;
        let (index, slot) = place(&mut groups, 3).expect("placed");
        assert_eq!(index, 1);
        assert_eq!(slot.data_offset, 0);
    }

    #[test]
    fn test_unknown_font() {
        let mut pre = GlyphPreprocessor::new();
        assert!(matches!(
            pre.get_glyph(FontId(3), 'a' as u32),
            Err(TextError::UnknownFont(FontId(3)))
        ));
        assert!(pre.close_font(FontId(0)).is_err());
    }
}
